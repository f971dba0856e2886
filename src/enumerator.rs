use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::config::{AutomationConfig, CartConfig};
use crate::models::SkuSelection;
use crate::selectors::{self, Role};
use crate::session::BrowserSessionManager;
use crate::utils::error::{AppError, Result};

/// What one read of a product detail page yielded. When no variant-container
/// strategy matched, `structure_recognized` is false and `selections` is
/// empty; callers fall back to single-SKU handling instead of failing.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub title: Option<String>,
    pub price_text: Option<String>,
    pub image: Option<String>,
    pub detail_link: Option<String>,
    pub structure_recognized: bool,
    pub matched_strategy: Option<&'static str>,
    pub selections: Vec<SkuSelection>,
}

/// Reads a product detail page and produces the ordered list of purchasable
/// variant combinations the page actually offers.
pub struct SkuEnumerator<'a> {
    session: &'a BrowserSessionManager,
    automation: &'a AutomationConfig,
    cart: &'a CartConfig,
}

impl<'a> SkuEnumerator<'a> {
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

    /// Navigate to the product page and enumerate its variants. The returned
    /// order is document order and is the canonical order for all downstream
    /// reporting.
    pub async fn enumerate(
        &self,
        tab: &headless_chrome::Tab,
        product_id: &str,
    ) -> Result<ProductPage> {
        let url = self.cart.product_url(product_id);
        self.session
            .navigate(tab, &url, self.automation.navigation_retries)
            .await?;

        // Give client-side rendering a moment to settle before reading
        tokio::time::sleep(std::time::Duration::from_millis(
            self.automation.settle_delay_ms,
        ))
        .await;

        let html = tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to read page content: {}", e)))?;

        let page = parse_product_html(&html);
        if page.structure_recognized {
            debug!(
                product_id,
                strategy = ?page.matched_strategy,
                variants = page.selections.len(),
                "enumerated product variants"
            );
        } else {
            warn!(product_id, "no variant container strategy matched; treating as single-SKU page");
        }
        Ok(page)
    }
}

/// Pure extraction over fetched markup. Running this twice on identical
/// content yields identical lists in identical order.
pub fn parse_product_html(html: &str) -> ProductPage {
    let doc = Html::parse_document(html);

    let title = selectors::resolve(&doc, Role::Title)
        .map(|m| selectors::element_text(m.elements[0]));
    let price_text = selectors::resolve(&doc, Role::Price)
        .map(|m| selectors::element_text(m.elements[0]));
    let image = selectors::resolve(&doc, Role::Image)
        .and_then(|m| m.elements[0].value().attr("src").map(str::to_string));
    let detail_link = selectors::resolve(&doc, Role::DetailLink)
        .and_then(|m| m.elements[0].value().attr("href").map(str::to_string));

    let Some(panel) = selectors::resolve(&doc, Role::VariantPanel) else {
        return ProductPage {
            title,
            price_text,
            image,
            detail_link,
            structure_recognized: false,
            matched_strategy: None,
            selections: Vec::new(),
        };
    };

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    if let Some(group_match) = selectors::resolve_within(panel.elements[0], Role::VariantGroup) {
        for (index, group) in group_match.elements.iter().enumerate() {
            let label = selectors::resolve_within(*group, Role::GroupLabel)
                .map(|m| selectors::element_text(m.elements[0]))
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("Option {}", index + 1));

            let values: Vec<String> = selectors::resolve_within(*group, Role::OptionItem)
                .map(|m| {
                    m.elements
                        .iter()
                        .filter(|el| is_selectable(**el))
                        .map(|el| selectors::element_text(*el))
                        .filter(|text| !text.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            groups.push((label, values));
        }
    }

    ProductPage {
        title,
        price_text,
        image,
        detail_link,
        structure_recognized: true,
        matched_strategy: Some(panel.strategy),
        selections: cartesian(&groups),
    }
}

/// The page marks unavailable options rather than removing them; only
/// options it exposes as selectable count.
fn is_selectable(element: ElementRef<'_>) -> bool {
    if element.value().attr("disabled").is_some() {
        return false;
    }
    if element.value().attr("aria-disabled") == Some("true") {
        return false;
    }
    if let Some(class) = element.value().attr("class") {
        let class = class.to_ascii_lowercase();
        for marker in ["disabled", "sold-out", "out-of-stock", "forbidden"] {
            if class.contains(marker) {
                return false;
            }
        }
    }
    true
}

/// Ordered cartesian product of the property groups. The first group varies
/// slowest, matching the page's reading order.
fn cartesian(groups: &[(String, Vec<String>)]) -> Vec<SkuSelection> {
    if groups.is_empty() {
        return Vec::new();
    }

    let mut partials: Vec<Vec<(String, String)>> = vec![Vec::new()];
    for (name, values) in groups {
        let mut next = Vec::with_capacity(partials.len() * values.len());
        for partial in &partials {
            for value in values {
                let mut extended = partial.clone();
                extended.push((name.clone(), value.clone()));
                next.push(extended);
            }
        }
        partials = next;
    }

    partials.into_iter().map(SkuSelection::new).collect()
}
