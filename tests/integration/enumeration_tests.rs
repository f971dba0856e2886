use super::*;
use argus_cart::enumerator::parse_product_html;

#[test]
fn test_enumeration_yields_document_order_cartesian() {
    let page = parse_product_html(PRODUCT_PAGE_HTML);

    assert!(page.structure_recognized);
    assert_eq!(page.title.as_deref(), Some("Trail Shoe"));

    // Disabled size 42 is not offered: 2 colors x 1 size
    let labels: Vec<String> = page.selections.iter().map(|s| s.label()).collect();
    assert_eq!(labels, vec!["Color: Red; Size: 41", "Color: Blue; Size: 41"]);
}

#[test]
fn test_enumeration_idempotent_on_unchanged_content() {
    let first = parse_product_html(PRODUCT_PAGE_HTML);
    let second = parse_product_html(PRODUCT_PAGE_HTML);

    // Equal in both content and order
    assert_eq!(first.selections, second.selections);
    assert_eq!(first.matched_strategy, second.matched_strategy);
}

#[test]
fn test_unrecognized_page_signals_unknown_structure() {
    let page = parse_product_html("<html><body><main>blog post</main></body></html>");

    assert!(!page.structure_recognized);
    assert!(page.selections.is_empty());
}

#[test]
fn test_fallback_strategy_handles_markup_drift() {
    // Same product, different container class generation
    let drifted = PRODUCT_PAGE_HTML.replace("sku-panel", "sku-wrapper");
    let page = parse_product_html(&drifted);

    assert!(page.structure_recognized);
    assert_eq!(page.matched_strategy, Some("sku-wrapper"));
    assert_eq!(page.selections.len(), 2);
}
