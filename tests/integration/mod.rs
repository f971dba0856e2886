// Integration tests for argus-cart
// These tests verify that the automation components work together correctly
// without requiring a live browser.

pub mod cart_batch_tests;
pub mod enumeration_tests;
pub mod reconcile_tests;
pub mod session_tests;

use argus_cart::config::{
    AppConfig, AutomationConfig, BrowserConfig, CartConfig, DatabaseConfig,
};
use argus_cart::models::{Account, Cookie, SkuSelection};
use argus_cart::repository::SqliteProductRepository;
use sqlx::SqlitePool;

/// Test configuration for integration tests
pub fn get_test_config() -> AppConfig {
    AppConfig {
        browser: BrowserConfig {
            debug_host: "127.0.0.1".to_string(),
            debug_port: 9222,
            launch: false,
            chrome_path: None,
            headless: true,
            page_timeout: 10,
            user_agent: "ArgusCart-Test/1.0".to_string(),
        },
        automation: AutomationConfig {
            max_attempts: 2,
            action_delay_min_ms: 1,
            action_delay_max_ms: 5,
            settle_delay_ms: 1,
            confirm_timeout_ms: 200,
            batch_deadline_secs: 5,
            navigation_retries: 1,
        },
        cart: CartConfig {
            product_url_template: "https://shop.example.com/item/{product_id}".to_string(),
            cart_url: "https://shop.example.com/cart".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 2,
            min_connections: 1,
            acquire_timeout: 10,
        },
    }
}

/// Create an in-memory repository with the schema applied
pub async fn create_test_repository() -> SqliteProductRepository {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should connect");
    let repository = SqliteProductRepository::new(pool);
    repository
        .ensure_schema()
        .await
        .expect("schema creation should succeed");
    repository
}

pub fn create_test_account() -> Account {
    Account {
        id: "acc-test".to_string(),
        display_name: "Test Account".to_string(),
        cookies: vec![
            Cookie {
                name: "session_id".to_string(),
                value: "abc123".to_string(),
                domain: ".shop.example.com".to_string(),
            },
            Cookie {
                name: "csrf_token".to_string(),
                value: "tok456".to_string(),
                domain: ".shop.example.com".to_string(),
            },
        ],
        is_active: true,
    }
}

pub fn single_prop_selection(value: &str) -> SkuSelection {
    SkuSelection::new(vec![("Variant".to_string(), value.to_string())])
}

/// Product detail fixture: two property groups, one disabled option
pub const PRODUCT_PAGE_HTML: &str = r#"
    <html><body>
        <h1 class="product-title">Trail Shoe</h1>
        <span class="price-current">$89.95</span>
        <div class="sku-panel">
            <div class="sku-prop">
                <div class="sku-prop-name">Color</div>
                <ul class="sku-prop-value"><li>Red</li><li>Blue</li></ul>
            </div>
            <div class="sku-prop">
                <div class="sku-prop-name">Size</div>
                <ul class="sku-prop-value"><li>41</li><li class="disabled">42</li></ul>
            </div>
        </div>
    </body></html>
"#;

/// Cart listing fixture: two line items with different id sources
pub const CART_PAGE_HTML: &str = r#"
    <html><body>
        <div class="cart-list">
            <div class="cart-item" data-sku-id="sku-7">
                <div class="item-title"><a href="https://shop.example.com/item/p-100">Trail Shoe</a></div>
                <div class="sku-props">Color: Blue; Size: 42</div>
                <span class="item-price">$89.95</span>
                <input class="qty" value="2">
            </div>
            <div class="cart-item">
                <div class="item-title"><a href="https://shop.example.com/detail?id=p-200">Wool Sock</a></div>
                <span class="item-price">€7.50</span>
                <span class="quantity">1</span>
            </div>
        </div>
    </body></html>
"#;
