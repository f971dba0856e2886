use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod account;
pub mod cart;
pub mod product;

// Re-exports for convenience
pub use account::*;
pub use cart::*;
pub use product::*;

/// Sentinel SKU id for the "base" row of a multi-SKU product. The per-variant
/// detail of such a product lives in the row's `sku_snapshot_json` field.
pub const BASE_SKU_ID: &str = "0";

// Common enums used across models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT")]
pub enum MonitorMode {
    #[sqlx(rename = "cart_add")]
    CartAdd,
    #[sqlx(rename = "snapshot")]
    Snapshot,
}

// Helper function to generate UUIDs in the format expected by the database
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
