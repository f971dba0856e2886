use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One purchasable variant, as an ordered property-name → property-value
/// mapping (e.g. Color → Red, Size → M). Order follows the page's own
/// property-group order and is part of the selection's identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkuSelection {
    properties: Vec<(String, String)>,
}

impl SkuSelection {
    pub fn new(properties: Vec<(String, String)>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Display string used in reports, e.g. "Color: Red; Size: M".
    pub fn label(&self) -> String {
        self.properties
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for SkuSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-SKU failure categories. The display name is what lands in the
/// `SkuAddResult::error` field of a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkuError {
    /// Definitive sold-out signal; never retried.
    OutOfStock,
    /// The page structure changed under us.
    SelectorNotFound,
    /// The add was issued but no confirmation arrived in time. Reported as
    /// failure; the next cart snapshot reconciles the truth.
    ConfirmationTimeout,
    /// The batch deadline expired before this SKU was attempted.
    Timeout,
    Unknown,
}

impl SkuError {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkuError::OutOfStock => "OutOfStock",
            SkuError::SelectorNotFound => "SelectorNotFound",
            SkuError::ConfirmationTimeout => "ConfirmationTimeout",
            SkuError::Timeout => "Timeout",
            SkuError::Unknown => "Unknown",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SkuError::SelectorNotFound | SkuError::Unknown)
    }
}

impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one add-to-cart attempt, in enumeration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkuAddResult {
    pub sku_properties: String,
    pub success: bool,
    pub error: Option<String>,
}

impl SkuAddResult {
    pub fn ok(selection: &SkuSelection) -> Self {
        Self {
            sku_properties: selection.label(),
            success: true,
            error: None,
        }
    }

    pub fn failed(selection: &SkuSelection, error: SkuError) -> Self {
        Self {
            sku_properties: selection.label(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Batch report for one "add all SKUs" run.
/// `success_count + failed_count == total_skus == results.len()` always,
/// including partial runs cut short by the batch deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartAddAllResult {
    pub total_skus: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub results: Vec<SkuAddResult>,
}

impl CartAddAllResult {
    pub fn empty() -> Self {
        Self {
            total_skus: 0,
            success_count: 0,
            failed_count: 0,
            results: Vec::new(),
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0 && self.success_count == self.total_skus
    }
}

/// One line scraped from the cart listing. Ephemeral until reconciled into
/// `MonitoredProduct` rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineItem {
    pub title: String,
    pub price: Option<Decimal>,
    pub product_id: Option<String>,
    pub sku_id: Option<String>,
    pub sku_properties: Option<String>,
    pub quantity: i64,
    pub link: Option<String>,
}
