use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

use crate::config::{AutomationConfig, CartConfig};
use crate::models::CartLineItem;
use crate::repository::ProductRepository;
use crate::selectors::{self, Role};
use crate::session::BrowserSessionManager;
use crate::utils::error::{AppError, Result};

/// Re-scrapes the cart listing into structured line items and reconciles
/// them against the persisted monitored rows. The whole cart is read before
/// anything is written, so a scrape that dies midway leaves no partial state.
pub struct CartSnapshotReader<'a> {
    session: &'a BrowserSessionManager,
    automation: &'a AutomationConfig,
    cart: &'a CartConfig,
}

impl<'a> CartSnapshotReader<'a> {
    pub fn new(
        session: &'a BrowserSessionManager,
        automation: &'a AutomationConfig,
        cart: &'a CartConfig,
    ) -> Self {
        Self {
            session,
            automation,
            cart,
        }
    }

    /// Navigate to the cart listing, parse every visible line item, then
    /// upsert each one keyed on (product_id, sku_id, owner_account_id).
    /// Returns the number of reconciled items.
    pub async fn update_prices_from_cart(
        &self,
        tab: &headless_chrome::Tab,
        account_id: &str,
        repository: &dyn ProductRepository,
    ) -> Result<usize> {
        self.session
            .navigate(tab, &self.cart.cart_url, self.automation.navigation_retries)
            .await?;

        // Cart contents render client-side; wait for them to settle
        tokio::time::sleep(std::time::Duration::from_millis(
            self.automation.settle_delay_ms,
        ))
        .await;

        if crate::session::login_redirected(tab) {
            return Err(AppError::AuthExpired {
                account_id: account_id.to_string(),
            });
        }

        let html = tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to read cart content: {}", e)))?;

        // Batch-then-write: the full cart parses before the first upsert
        let items = parse_cart_html(&html)?;
        debug!(account_id, items = items.len(), "parsed cart snapshot");

        for item in &items {
            repository.upsert_cart_item(account_id, item).await?;
        }

        info!(account_id, reconciled = items.len(), "cart snapshot reconciled");
        Ok(items.len())
    }
}

/// Pure extraction of line items from cart markup. A page where no list
/// container strategy matches is a structural-parse failure for the whole
/// pass; an empty but recognized cart is just zero items.
pub fn parse_cart_html(html: &str) -> Result<Vec<CartLineItem>> {
    let doc = Html::parse_document(html);

    let list = selectors::resolve(&doc, Role::CartList).ok_or_else(|| AppError::StructuralParse {
        context: "cart line-item container matched no selector strategy".to_string(),
    })?;
    debug!(strategy = list.strategy, "located cart list");

    let mut items = Vec::new();
    if let Some(item_match) = selectors::resolve_within(list.elements[0], Role::CartItem) {
        for element in item_match.elements {
            items.push(parse_line_item(element));
        }
    }

    Ok(items)
}

fn parse_line_item(element: ElementRef<'_>) -> CartLineItem {
    let title = selectors::resolve_within(element, Role::ItemTitle)
        .map(|m| selectors::element_text(m.elements[0]))
        .unwrap_or_default();

    let price = selectors::resolve_within(element, Role::ItemPrice)
        .map(|m| selectors::element_text(m.elements[0]))
        .and_then(|text| parse_price_text(&text));

    let quantity = selectors::resolve_within(element, Role::ItemQuantity)
        .and_then(|m| {
            let el = m.elements[0];
            // Quantity may live in an input's value or in plain text
            el.value()
                .attr("value")
                .map(str::to_string)
                .or_else(|| Some(selectors::element_text(el)))
        })
        .and_then(|text| parse_quantity_text(&text))
        .unwrap_or(1);

    let sku_element = selectors::resolve_within(element, Role::ItemSku);
    let sku_id = element
        .value()
        .attr("data-sku-id")
        .map(str::to_string)
        .or_else(|| {
            sku_element
                .as_ref()
                .and_then(|m| m.elements[0].value().attr("data-sku-id").map(str::to_string))
        });
    let sku_properties = sku_element
        .map(|m| selectors::element_text(m.elements[0]))
        .filter(|text| !text.is_empty());

    let link = selectors::resolve_within(element, Role::ItemLink)
        .and_then(|m| m.elements[0].value().attr("href").map(str::to_string));
    let product_id = link.as_deref().and_then(extract_product_id);

    CartLineItem {
        title,
        price,
        product_id,
        sku_id,
        sku_properties,
        quantity,
        link,
    }
}

/// Pull a decimal amount out of a price display string ("$1,299.00" etc).
pub fn parse_price_text(text: &str) -> Option<Decimal> {
    let price_regex =
        Regex::new(r"(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)").ok()?;
    let captures = price_regex.captures(text)?;
    let normalized = captures.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&normalized).ok()
}

fn parse_quantity_text(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Derive the stable product identifier from a line item's detail link:
/// an `id` query parameter when present, else the path segment after
/// `item`/`product`.
pub fn extract_product_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "id") {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    for window in segments.windows(2) {
        if window[0] == "item" || window[0] == "product" {
            return Some(window[1].to_string());
        }
    }
    segments.last().map(|s| s.to_string())
}
