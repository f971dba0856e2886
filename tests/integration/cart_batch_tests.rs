use super::*;
use argus_cart::cart::{aggregate, run_batch};
use argus_cart::models::{SkuAddResult, SkuError};
use rstest::rstest;
use std::time::Duration;
use tokio::time::Instant;

#[rstest]
#[case(0)]
#[case(1)]
#[case(7)]
#[tokio::test]
async fn test_counts_always_sum_to_total(#[case] n: usize) {
    let selections: Vec<_> = (0..n)
        .map(|i| single_prop_selection(&format!("V{}", i)))
        .collect();
    let deadline = Instant::now() + Duration::from_secs(5);

    // Alternate success and failure
    let report = run_batch(&selections, deadline, |sel| async move {
        if sel.label().ends_with(['0', '2', '4', '6']) {
            SkuAddResult::ok(&sel)
        } else {
            SkuAddResult::failed(&sel, SkuError::Unknown)
        }
    })
    .await;

    assert_eq!(report.total_skus, n);
    assert_eq!(report.results.len(), n);
    assert_eq!(report.success_count + report.failed_count, report.total_skus);
}

#[tokio::test]
async fn test_out_of_stock_middle_sku_scenario() {
    // Product with SKUs [A, B, C] where B is out of stock
    let selections = vec![
        single_prop_selection("A"),
        single_prop_selection("B"),
        single_prop_selection("C"),
    ];
    let deadline = Instant::now() + Duration::from_secs(5);

    let report = run_batch(&selections, deadline, |sel| async move {
        if sel.label() == "Variant: B" {
            SkuAddResult::failed(&sel, SkuError::OutOfStock)
        } else {
            SkuAddResult::ok(&sel)
        }
    })
    .await;

    assert_eq!(report.total_skus, 3);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failed_count, 1);

    // Exact report shape and order
    assert_eq!(report.results[0].sku_properties, "Variant: A");
    assert!(report.results[0].success);
    assert_eq!(report.results[1].sku_properties, "Variant: B");
    assert!(!report.results[1].success);
    assert_eq!(report.results[1].error.as_deref(), Some("OutOfStock"));
    assert_eq!(report.results[2].sku_properties, "Variant: C");
    assert!(report.results[2].success);
}

#[tokio::test]
async fn test_empty_enumeration_short_circuits() {
    let deadline = Instant::now() + Duration::from_secs(1);
    let report = run_batch(&[], deadline, |sel| async move { SkuAddResult::ok(&sel) }).await;

    assert_eq!(report.total_skus, 0);
    assert_eq!(report.success_count, 0);
    assert_eq!(report.failed_count, 0);
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn test_deadline_bound_and_timeout_marking() {
    let selections: Vec<_> = (0..20)
        .map(|i| single_prop_selection(&format!("V{}", i)))
        .collect();
    let window = Duration::from_millis(120);
    let started = Instant::now();

    let report = run_batch(&selections, started + window, |sel| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        SkuAddResult::ok(&sel)
    })
    .await;

    // The batch returns within the deadline plus a small fixed overhead
    assert!(started.elapsed() < window + Duration::from_millis(500));

    // Every selection is accounted for; the unattempted tail is Timeout
    assert_eq!(report.total_skus, 20);
    assert_eq!(report.success_count + report.failed_count, 20);
    assert!(report.success_count >= 1);
    assert!(report.failed_count >= 1);

    let last = report.results.last().unwrap();
    assert_eq!(last.error.as_deref(), Some("Timeout"));

    // Partial results obtained before expiry are never discarded
    assert!(report.results[0].success);
}

#[tokio::test]
async fn test_attempts_run_strictly_sequentially() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let selections: Vec<_> = (0..5)
        .map(|i| single_prop_selection(&format!("V{}", i)))
        .collect();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let deadline = Instant::now() + Duration::from_secs(5);

    let report = run_batch(&selections, deadline, |sel| {
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            SkuAddResult::ok(&sel)
        }
    })
    .await;

    assert_eq!(report.success_count, 5);
    assert_eq!(max_in_flight.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_aggregate_is_a_pure_ordered_fold() {
    let selections: Vec<_> = ["A", "B", "C"]
        .iter()
        .map(|v| single_prop_selection(v))
        .collect();
    let results: Vec<SkuAddResult> = selections.iter().map(SkuAddResult::ok).collect();

    let once = aggregate(results.clone());
    let twice = aggregate(results);
    assert_eq!(once, twice);

    let labels: Vec<&str> = once
        .results
        .iter()
        .map(|r| r.sku_properties.as_str())
        .collect();
    assert_eq!(labels, vec!["Variant: A", "Variant: B", "Variant: C"]);
}
