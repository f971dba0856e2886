use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::models::{CartLineItem, MonitorMode, BASE_SKU_ID};

/// One persisted monitored row, uniquely keyed by
/// (product_id, sku_id, owner_account_id). A row with `sku_id == BASE_SKU_ID`
/// is the base row of a multi-SKU product; its variant detail lives in
/// `sku_snapshot_json`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MonitoredProduct {
    pub product_id: String,
    pub sku_id: String,
    pub owner_account_id: String,

    // Monitoring settings
    pub monitor_mode: MonitorMode,
    pub url: String,
    pub is_active: bool,

    // Last observation (price kept as a decimal string for SQLite)
    pub price: Option<String>,
    pub quantity: Option<i64>,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub sku_snapshot_json: Option<String>,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonitoredProduct {
    /// Build a fresh row from a scraped cart line item.
    pub fn from_line_item(item: &CartLineItem, owner_account_id: &str) -> Self {
        let now = Utc::now();
        Self {
            product_id: item.product_id.clone().unwrap_or_default(),
            sku_id: item
                .sku_id
                .clone()
                .unwrap_or_else(|| BASE_SKU_ID.to_string()),
            owner_account_id: owner_account_id.to_string(),
            monitor_mode: MonitorMode::Snapshot,
            url: item.link.clone().unwrap_or_default(),
            is_active: true,
            price: item.price.map(|p| p.to_string()),
            quantity: Some(item.quantity),
            last_seen: Some(now),
            last_error: None,
            sku_snapshot_json: item.sku_properties.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_base_row(&self) -> bool {
        self.sku_id == BASE_SKU_ID
    }

    pub fn price_decimal(&self) -> Option<Decimal> {
        self.price
            .as_deref()
            .and_then(|p| Decimal::from_str(p).ok())
    }

    /// Apply a fresh observation to an existing row.
    pub fn observe(&mut self, price: Option<Decimal>, quantity: Option<i64>) {
        let now = Utc::now();
        if let Some(price) = price {
            self.price = Some(price.to_string());
        }
        self.quantity = quantity.or(self.quantity);
        self.last_seen = Some(now);
        self.last_error = None;
        self.updated_at = now;
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();
    }
}
