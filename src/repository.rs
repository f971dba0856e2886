use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::models::{CartLineItem, MonitorMode, MonitoredProduct, BASE_SKU_ID};
use crate::utils::error::Result;

/// Persistence boundary for monitored rows, injected into the reconciliation
/// step so a test double can stand in. The store itself (schema, migrations)
/// belongs to the operator; rows are keyed on
/// (product_id, sku_id, owner_account_id).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert on first sight, update price/last-seen fields on match.
    async fn upsert_cart_item(&self, account_id: &str, item: &CartLineItem) -> Result<()>;

    /// Upsert the row's last_error field, creating the row if needed.
    async fn record_error(
        &self,
        product_id: &str,
        sku_id: &str,
        account_id: &str,
        url: &str,
        error: &str,
    ) -> Result<()>;

    async fn find(
        &self,
        product_id: &str,
        sku_id: &str,
        account_id: &str,
    ) -> Result<Option<MonitoredProduct>>;

    async fn list_for_account(&self, account_id: &str) -> Result<Vec<MonitoredProduct>>;
}

pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// For the test harness and first-run operator setup; the automation core
    /// itself never manages schema.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS monitored_products (
                product_id TEXT NOT NULL,
                sku_id TEXT NOT NULL,
                owner_account_id TEXT NOT NULL,
                monitor_mode TEXT NOT NULL,
                url TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                price TEXT,
                quantity INTEGER,
                last_seen TEXT,
                last_error TEXT,
                sku_snapshot_json TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (product_id, sku_id, owner_account_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn upsert_cart_item(&self, account_id: &str, item: &CartLineItem) -> Result<()> {
        let Some(product_id) = item.product_id.as_deref() else {
            // Without a stable product id there is nothing to key the row on
            warn!(title = %item.title, "cart line item has no product id; skipping");
            return Ok(());
        };
        let sku_id = item.sku_id.as_deref().unwrap_or(BASE_SKU_ID);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO monitored_products (
                product_id, sku_id, owner_account_id, monitor_mode, url,
                is_active, price, quantity, last_seen, last_error,
                sku_snapshot_json, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, NULL, ?, ?, ?)
            ON CONFLICT(product_id, sku_id, owner_account_id) DO UPDATE SET
                price = COALESCE(excluded.price, monitored_products.price),
                quantity = excluded.quantity,
                last_seen = excluded.last_seen,
                last_error = NULL,
                sku_snapshot_json = COALESCE(excluded.sku_snapshot_json, monitored_products.sku_snapshot_json),
                url = excluded.url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(sku_id)
        .bind(account_id)
        .bind(MonitorMode::Snapshot)
        .bind(item.link.as_deref().unwrap_or_default())
        .bind(item.price.map(|p| p.to_string()))
        .bind(item.quantity)
        .bind(now)
        .bind(item.sku_properties.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_error(
        &self,
        product_id: &str,
        sku_id: &str,
        account_id: &str,
        url: &str,
        error: &str,
    ) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO monitored_products (
                product_id, sku_id, owner_account_id, monitor_mode, url,
                is_active, last_error, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
            ON CONFLICT(product_id, sku_id, owner_account_id) DO UPDATE SET
                last_error = excluded.last_error,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(sku_id)
        .bind(account_id)
        .bind(MonitorMode::CartAdd)
        .bind(url)
        .bind(error)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        product_id: &str,
        sku_id: &str,
        account_id: &str,
    ) -> Result<Option<MonitoredProduct>> {
        let row = sqlx::query_as::<_, MonitoredProduct>(
            r#"
            SELECT * FROM monitored_products
            WHERE product_id = ? AND sku_id = ? AND owner_account_id = ?
            "#,
        )
        .bind(product_id)
        .bind(sku_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_account(&self, account_id: &str) -> Result<Vec<MonitoredProduct>> {
        let rows = sqlx::query_as::<_, MonitoredProduct>(
            r#"
            SELECT * FROM monitored_products
            WHERE owner_account_id = ?
            ORDER BY product_id, sku_id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
