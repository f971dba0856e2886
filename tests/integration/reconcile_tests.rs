use super::*;
use argus_cart::models::BASE_SKU_ID;
use argus_cart::repository::ProductRepository;
use argus_cart::snapshot::parse_cart_html;

#[tokio::test]
async fn test_full_snapshot_reconciliation_workflow() -> anyhow::Result<()> {
    let repository = create_test_repository().await;
    let account = create_test_account();

    // 1. Parse the scraped cart
    let items = parse_cart_html(CART_PAGE_HTML)?;
    assert_eq!(items.len(), 2);

    // 2. Batch-then-write reconciliation
    for item in &items {
        repository.upsert_cart_item(&account.id, item).await?;
    }

    // 3. Both rows exist under the account, keyed by product/SKU
    let rows = repository.list_for_account(&account.id).await?;
    assert_eq!(rows.len(), 2);

    let shoe = repository
        .find("p-100", "sku-7", &account.id)
        .await?
        .expect("shoe row should exist");
    assert_eq!(shoe.price.as_deref(), Some("89.95"));
    assert_eq!(shoe.quantity, Some(2));

    let sock = repository
        .find("p-200", BASE_SKU_ID, &account.id)
        .await?
        .expect("sock row should exist");
    assert_eq!(sock.price.as_deref(), Some("7.50"));

    Ok(())
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() -> anyhow::Result<()> {
    let repository = create_test_repository().await;
    let account = create_test_account();
    let items = parse_cart_html(CART_PAGE_HTML)?;

    // First pass
    for item in &items {
        repository.upsert_cart_item(&account.id, item).await?;
    }
    let first_rows = repository.list_for_account(&account.id).await?;

    // Second pass against an unchanged cart
    for item in &items {
        repository.upsert_cart_item(&account.id, item).await?;
    }
    let second_rows = repository.list_for_account(&account.id).await?;

    // No duplicate rows, identical field values
    assert_eq!(first_rows.len(), second_rows.len());
    for (first, second) in first_rows.iter().zip(second_rows.iter()) {
        assert_eq!(first.product_id, second.product_id);
        assert_eq!(first.sku_id, second.sku_id);
        assert_eq!(first.price, second.price);
        assert_eq!(first.quantity, second.quantity);
        assert_eq!(first.sku_snapshot_json, second.sku_snapshot_json);
    }

    Ok(())
}

#[tokio::test]
async fn test_structural_failure_writes_nothing() {
    let repository = create_test_repository().await;
    let account = create_test_account();

    // Batch-then-write means a failed parse never reaches the store
    let parsed = parse_cart_html("<html><body><p>maintenance page</p></body></html>");
    assert!(parsed.is_err());

    let rows = repository.list_for_account(&account.id).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_price_change_updates_existing_row() -> anyhow::Result<()> {
    let repository = create_test_repository().await;
    let account = create_test_account();

    for item in &parse_cart_html(CART_PAGE_HTML)? {
        repository.upsert_cart_item(&account.id, item).await?;
    }

    // Same cart, discounted shoe
    let discounted = CART_PAGE_HTML.replace("$89.95", "$79.95");
    for item in &parse_cart_html(&discounted)? {
        repository.upsert_cart_item(&account.id, item).await?;
    }

    let shoe = repository
        .find("p-100", "sku-7", &account.id)
        .await?
        .expect("shoe row should exist");
    assert_eq!(shoe.price.as_deref(), Some("79.95"));
    assert_eq!(repository.list_for_account(&account.id).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_file_backed_repository_roundtrip() -> anyhow::Result<()> {
    use argus_cart::config::DatabaseConfig;
    use argus_cart::repository::SqliteProductRepository;

    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("argus-test.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 2,
        min_connections: 1,
        acquire_timeout: 10,
    };

    let repository = SqliteProductRepository::connect(&config).await?;
    repository.ensure_schema().await?;

    let items = parse_cart_html(CART_PAGE_HTML)?;
    for item in &items {
        repository.upsert_cart_item("acc-file", item).await?;
    }

    assert_eq!(repository.list_for_account("acc-file").await?.len(), 2);
    Ok(())
}
