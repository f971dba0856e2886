use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Semantic page roles the automation needs to locate. Markup drifts, so each
/// role is backed by an ordered chain of named selector strategies; the first
/// strategy matching at least one element wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    // Product detail page
    VariantPanel,
    VariantGroup,
    GroupLabel,
    OptionItem,
    Title,
    Price,
    Image,
    DetailLink,
    AddToCart,
    CartCount,
    ConfirmToast,
    SoldOut,
    // Cart listing page
    CartList,
    CartItem,
    ItemTitle,
    ItemPrice,
    ItemQuantity,
    ItemSku,
    ItemLink,
}

#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub selector: &'static str,
}

/// Elements matched for a role, plus which strategy found them.
#[derive(Debug)]
pub struct RoleMatch<'a> {
    pub strategy: &'static str,
    pub elements: Vec<ElementRef<'a>>,
}

const VARIANT_PANEL: &[Strategy] = &[
    Strategy { name: "sku-panel", selector: ".sku-panel" },
    Strategy { name: "sku-wrapper", selector: ".sku-wrapper, .product-sku" },
    Strategy { name: "data-role", selector: "[data-role='sku']" },
];

const VARIANT_GROUP: &[Strategy] = &[
    Strategy { name: "sku-prop", selector: ".sku-prop" },
    Strategy { name: "sku-line", selector: "dl.sku-line, .sku-row" },
    Strategy { name: "option-group", selector: ".option-group" },
];

const GROUP_LABEL: &[Strategy] = &[
    Strategy { name: "prop-name", selector: ".sku-prop-name" },
    Strategy { name: "dt", selector: "dt" },
    Strategy { name: "option-title", selector: ".option-title, .group-title" },
];

const OPTION_ITEM: &[Strategy] = &[
    Strategy { name: "prop-item", selector: ".sku-prop-value li" },
    Strategy { name: "option-item", selector: ".option-item" },
    Strategy { name: "swatch", selector: ".swatch, [data-option-value]" },
];

const TITLE: &[Strategy] = &[
    Strategy { name: "product-title", selector: ".product-title" },
    Strategy { name: "item-title", selector: ".item-title, h1.title" },
    Strategy { name: "h1", selector: "h1" },
];

const PRICE: &[Strategy] = &[
    Strategy { name: "price-current", selector: ".price-current, .price-now" },
    Strategy { name: "price", selector: ".price" },
    Strategy { name: "data-price", selector: "[data-price]" },
];

const IMAGE: &[Strategy] = &[
    Strategy { name: "main-image", selector: ".product-image img" },
    Strategy { name: "gallery", selector: ".gallery img, .main-img img" },
    Strategy { name: "itemprop", selector: "img[itemprop='image']" },
];

const DETAIL_LINK: &[Strategy] = &[
    Strategy { name: "canonical", selector: "link[rel='canonical']" },
    Strategy { name: "product-link", selector: "a.product-link" },
];

const ADD_TO_CART: &[Strategy] = &[
    Strategy { name: "add-to-cart", selector: "#add-to-cart, .add-to-cart" },
    Strategy { name: "add-cart-btn", selector: "button.add-cart, [data-role='add-to-cart']" },
    Strategy { name: "basket-btn", selector: ".add-to-basket" },
];

const CART_COUNT: &[Strategy] = &[
    Strategy { name: "cart-count", selector: ".cart-count" },
    Strategy { name: "cart-badge", selector: ".cart-badge, #cart-counter" },
    Strategy { name: "data-count", selector: "[data-cart-count]" },
];

const CONFIRM_TOAST: &[Strategy] = &[
    Strategy { name: "toast-success", selector: ".toast-success" },
    Strategy { name: "added-tip", selector: ".cart-added-tip, .add-success" },
];

const SOLD_OUT: &[Strategy] = &[
    Strategy { name: "sold-out", selector: ".sold-out, .out-of-stock" },
    Strategy { name: "no-stock", selector: ".no-stock, [data-stock='0']" },
];

const CART_LIST: &[Strategy] = &[
    Strategy { name: "cart-list", selector: ".cart-list" },
    Strategy { name: "cart-items", selector: ".cart-items, #cart-items" },
    Strategy { name: "data-role", selector: "[data-role='cart-list']" },
];

const CART_ITEM: &[Strategy] = &[
    Strategy { name: "cart-item", selector: ".cart-item" },
    Strategy { name: "line-item", selector: ".line-item, .cart-row" },
    Strategy { name: "data-item", selector: "[data-cart-item]" },
];

const ITEM_TITLE: &[Strategy] = &[
    Strategy { name: "item-title", selector: ".item-title" },
    Strategy { name: "title-link", selector: ".title a" },
    Strategy { name: "name", selector: ".name, .product-name" },
];

const ITEM_PRICE: &[Strategy] = &[
    Strategy { name: "item-price", selector: ".item-price" },
    Strategy { name: "price", selector: ".price, .price-current" },
    Strategy { name: "data-price", selector: "[data-price]" },
];

const ITEM_QUANTITY: &[Strategy] = &[
    Strategy { name: "qty-input", selector: "input.qty, input[name='quantity']" },
    Strategy { name: "qty-text", selector: ".quantity, .qty" },
    Strategy { name: "data-qty", selector: "[data-quantity]" },
];

const ITEM_SKU: &[Strategy] = &[
    Strategy { name: "sku-props", selector: ".sku-props" },
    Strategy { name: "item-props", selector: ".item-props, .sku-info" },
    Strategy { name: "data-sku", selector: "[data-sku-id]" },
];

const ITEM_LINK: &[Strategy] = &[
    Strategy { name: "title-link", selector: ".item-title a" },
    Strategy { name: "item-link", selector: "a.item-link" },
    Strategy { name: "any-link", selector: "a[href]" },
];

pub fn strategies(role: Role) -> &'static [Strategy] {
    match role {
        Role::VariantPanel => VARIANT_PANEL,
        Role::VariantGroup => VARIANT_GROUP,
        Role::GroupLabel => GROUP_LABEL,
        Role::OptionItem => OPTION_ITEM,
        Role::Title => TITLE,
        Role::Price => PRICE,
        Role::Image => IMAGE,
        Role::DetailLink => DETAIL_LINK,
        Role::AddToCart => ADD_TO_CART,
        Role::CartCount => CART_COUNT,
        Role::ConfirmToast => CONFIRM_TOAST,
        Role::SoldOut => SOLD_OUT,
        Role::CartList => CART_LIST,
        Role::CartItem => CART_ITEM,
        Role::ItemTitle => ITEM_TITLE,
        Role::ItemPrice => ITEM_PRICE,
        Role::ItemQuantity => ITEM_QUANTITY,
        Role::ItemSku => ITEM_SKU,
        Role::ItemLink => ITEM_LINK,
    }
}

/// CSS candidates for a role, in priority order. Used when probing a live tab
/// where matching happens browser-side.
pub fn css_candidates(role: Role) -> impl Iterator<Item = &'static str> {
    strategies(role).iter().map(|s| s.selector)
}

/// Try the role's strategies against a whole document. Matched elements come
/// back in document order, which downstream reporting treats as canonical.
pub fn resolve<'a>(doc: &'a Html, role: Role) -> Option<RoleMatch<'a>> {
    for strategy in strategies(role) {
        let Ok(selector) = Selector::parse(strategy.selector) else {
            continue;
        };
        let elements: Vec<ElementRef<'a>> = doc.select(&selector).collect();
        if !elements.is_empty() {
            debug!(role = ?role, strategy = strategy.name, matches = elements.len(), "selector strategy matched");
            return Some(RoleMatch {
                strategy: strategy.name,
                elements,
            });
        }
    }
    None
}

/// Same as `resolve`, scoped to one element's subtree.
pub fn resolve_within<'a>(scope: ElementRef<'a>, role: Role) -> Option<RoleMatch<'a>> {
    for strategy in strategies(role) {
        let Ok(selector) = Selector::parse(strategy.selector) else {
            continue;
        };
        let elements: Vec<ElementRef<'a>> = scope.select(&selector).collect();
        if !elements.is_empty() {
            return Some(RoleMatch {
                strategy: strategy.name,
                elements,
            });
        }
    }
    None
}

/// Collapse an element's text nodes into one trimmed string.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
