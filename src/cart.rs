use headless_chrome::Tab;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::AutomationConfig;
use crate::models::{CartAddAllResult, SkuAddResult, SkuError, SkuSelection};
use crate::selectors::{self, Role};

/// Drives one variant through select-options → add-to-cart → confirmation on
/// a live tab. Calls against the same tab must be serialized by the caller;
/// the batch driver below does exactly that.
pub struct CartMutator<'a> {
    automation: &'a AutomationConfig,
}

impl<'a> CartMutator<'a> {
    pub fn new(automation: &'a AutomationConfig) -> Self {
        Self { automation }
    }

    /// Attempt one SKU, retrying stale/disabled interactions up to the
    /// configured attempt count. A definitive out-of-stock signal and a
    /// missed confirmation are never retried.
    pub async fn add_sku_to_cart(&self, tab: &Tab, selection: &SkuSelection) -> SkuAddResult {
        let mut last_error = SkuError::Unknown;

        for attempt in 1..=self.automation.max_attempts {
            match self.try_add(tab, selection).await {
                Ok(()) => {
                    debug!(sku = %selection, attempt, "added SKU to cart");
                    return SkuAddResult::ok(selection);
                }
                Err(err) => {
                    warn!(sku = %selection, attempt, error = %err, "add-to-cart attempt failed");
                    last_error = err;
                    if !err.is_retryable() {
                        break;
                    }
                    tokio::time::sleep(self.pacing_delay()).await;
                }
            }
        }

        SkuAddResult::failed(selection, last_error)
    }

    async fn try_add(&self, tab: &Tab, selection: &SkuSelection) -> Result<(), SkuError> {
        if self.sold_out_visible(tab) {
            return Err(SkuError::OutOfStock);
        }

        // Select every property option, pacing like a person would
        for (name, value) in selection.properties() {
            tokio::time::sleep(self.pacing_delay()).await;
            match self.click_option(tab, name, value)?.as_str() {
                "clicked" => {}
                "disabled" => return Err(SkuError::OutOfStock),
                "not-found" => return Err(SkuError::SelectorNotFound),
                other => {
                    warn!(outcome = other, "unexpected option click outcome");
                    return Err(SkuError::Unknown);
                }
            }
        }

        // Let the page's own stock/price refresh settle before acting on it
        tokio::time::sleep(Duration::from_millis(self.automation.settle_delay_ms)).await;
        if self.sold_out_visible(tab) {
            return Err(SkuError::OutOfStock);
        }

        let count_before = self.cart_count(tab);

        tokio::time::sleep(self.pacing_delay()).await;
        match self.click_add_to_cart(tab)?.as_str() {
            "clicked" => {}
            "sold-out" => return Err(SkuError::OutOfStock),
            // A disabled control is usually a stale reactive state; the
            // caller re-selects options and tries again fresh.
            "disabled" => return Err(SkuError::Unknown),
            "not-found" => return Err(SkuError::SelectorNotFound),
            other => {
                warn!(outcome = other, "unexpected add-to-cart outcome");
                return Err(SkuError::Unknown);
            }
        }

        self.await_confirmation(tab, count_before).await
    }

    /// Wait for a positive signal that the add registered: the cart counter
    /// incremented or a confirmation toast became visible.
    async fn await_confirmation(&self, tab: &Tab, count_before: Option<i64>) -> Result<(), SkuError> {
        let deadline = Instant::now() + Duration::from_millis(self.automation.confirm_timeout_ms);

        while Instant::now() < deadline {
            if let (Some(before), Some(now)) = (count_before, self.cart_count(tab)) {
                if now > before {
                    return Ok(());
                }
            }
            if self.toast_visible(tab) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        Err(SkuError::ConfirmationTimeout)
    }

    /// Randomized pause between interactions. Bounds come from config and are
    /// validated to never be zero.
    fn pacing_delay(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let millis = rng.gen_range(
            self.automation.action_delay_min_ms..=self.automation.action_delay_max_ms,
        );
        Duration::from_millis(millis)
    }

    fn click_option(&self, tab: &Tab, name: &str, value: &str) -> Result<String, SkuError> {
        let js = click_option_js(name, value);
        eval_string(tab, &js).ok_or(SkuError::Unknown)
    }

    fn click_add_to_cart(&self, tab: &Tab) -> Result<String, SkuError> {
        eval_string(tab, &click_add_to_cart_js()).ok_or(SkuError::Unknown)
    }

    fn cart_count(&self, tab: &Tab) -> Option<i64> {
        eval_number(tab, &cart_count_js())
    }

    fn sold_out_visible(&self, tab: &Tab) -> bool {
        eval_bool(tab, &visible_js(Role::SoldOut)).unwrap_or(false)
    }

    fn toast_visible(&self, tab: &Tab) -> bool {
        eval_bool(tab, &visible_js(Role::ConfirmToast)).unwrap_or(false)
    }
}

/// Fold the ordered attempt outcomes into the batch report. Pure; encounter
/// order is preserved exactly.
pub fn aggregate(results: Vec<SkuAddResult>) -> CartAddAllResult {
    let success_count = results.iter().filter(|r| r.success).count();
    CartAddAllResult {
        total_skus: results.len(),
        success_count,
        failed_count: results.len() - success_count,
        results,
    }
}

/// Run the enumerated selections strictly sequentially under one overall
/// deadline. On expiry no further attempts are issued; every unattempted
/// selection is reported as a `Timeout` failure and the partial report is
/// still returned. Generic over the attempt so the contract is testable
/// without a browser.
pub async fn run_batch<F, Fut>(
    selections: &[SkuSelection],
    deadline: Instant,
    mut attempt: F,
) -> CartAddAllResult
where
    F: FnMut(SkuSelection) -> Fut,
    Fut: Future<Output = SkuAddResult>,
{
    let mut results = Vec::with_capacity(selections.len());
    let mut expired = false;

    for selection in selections {
        if expired || Instant::now() >= deadline {
            expired = true;
            results.push(SkuAddResult::failed(selection, SkuError::Timeout));
            continue;
        }

        match tokio::time::timeout_at(deadline, attempt(selection.clone())).await {
            Ok(result) => results.push(result),
            Err(_) => {
                expired = true;
                results.push(SkuAddResult::failed(selection, SkuError::Timeout));
            }
        }
    }

    aggregate(results)
}

// ---- Browser-side probes -------------------------------------------------
//
// Matching happens in the page so clicks land on live elements; each probe
// walks the role's selector candidates in priority order.

fn eval_string(tab: &Tab, js: &str) -> Option<String> {
    match tab.evaluate(js, false) {
        Ok(remote) => remote
            .value
            .and_then(|v| v.as_str().map(str::to_string)),
        Err(err) => {
            warn!("page evaluation failed: {}", err);
            None
        }
    }
}

fn eval_number(tab: &Tab, js: &str) -> Option<i64> {
    tab.evaluate(js, false)
        .ok()
        .and_then(|remote| remote.value)
        .and_then(|v| v.as_i64())
}

fn eval_bool(tab: &Tab, js: &str) -> Option<bool> {
    tab.evaluate(js, false)
        .ok()
        .and_then(|remote| remote.value)
        .and_then(|v| v.as_bool())
}

fn candidates_json(role: Role) -> String {
    let list: Vec<&str> = selectors::css_candidates(role).collect();
    serde_json::to_string(&list).unwrap_or_else(|_| "[]".to_string())
}

fn click_option_js(name: &str, value: &str) -> String {
    format!(
        r#"
        (function() {{
            const panels = {panels};
            const groupSelectors = {groups};
            const labelSelectors = {labels};
            const optionSelectors = {options};
            const propName = {name};
            const propValue = {value};

            let panel = null;
            for (const sel of panels) {{
                panel = document.querySelector(sel);
                if (panel) break;
            }}
            if (!panel) return 'not-found';

            const unavailable = (el) => {{
                const cls = (el.getAttribute('class') || '').toLowerCase();
                return el.hasAttribute('disabled') ||
                    el.getAttribute('aria-disabled') === 'true' ||
                    cls.includes('disabled') || cls.includes('sold-out') ||
                    cls.includes('out-of-stock') || cls.includes('forbidden');
            }};

            const clickIn = (scope) => {{
                for (const sel of optionSelectors) {{
                    for (const el of scope.querySelectorAll(sel)) {{
                        if (el.textContent.trim() !== propValue) continue;
                        if (unavailable(el)) return 'disabled';
                        el.click();
                        return 'clicked';
                    }}
                }}
                return 'not-found';
            }};

            // Prefer the group whose label matches the property name;
            // positional names fall back to a panel-wide match.
            for (const groupSel of groupSelectors) {{
                for (const group of panel.querySelectorAll(groupSel)) {{
                    for (const labelSel of labelSelectors) {{
                        const label = group.querySelector(labelSel);
                        if (label && label.textContent.trim() === propName) {{
                            return clickIn(group);
                        }}
                    }}
                }}
            }}
            return clickIn(panel);
        }})()
        "#,
        panels = candidates_json(Role::VariantPanel),
        groups = candidates_json(Role::VariantGroup),
        labels = candidates_json(Role::GroupLabel),
        options = candidates_json(Role::OptionItem),
        name = serde_json::to_string(name).unwrap_or_else(|_| "\"\"".to_string()),
        value = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string()),
    )
}

fn click_add_to_cart_js() -> String {
    format!(
        r#"
        (function() {{
            const soldOut = {sold_out};
            for (const sel of soldOut) {{
                const el = document.querySelector(sel);
                if (el && el.offsetParent !== null) return 'sold-out';
            }}
            const buttons = {buttons};
            for (const sel of buttons) {{
                const el = document.querySelector(sel);
                if (!el) continue;
                const cls = (el.getAttribute('class') || '').toLowerCase();
                if (el.disabled || el.getAttribute('aria-disabled') === 'true' ||
                    cls.includes('disabled')) {{
                    return 'disabled';
                }}
                el.click();
                return 'clicked';
            }}
            return 'not-found';
        }})()
        "#,
        sold_out = candidates_json(Role::SoldOut),
        buttons = candidates_json(Role::AddToCart),
    )
}

fn cart_count_js() -> String {
    format!(
        r#"
        (function() {{
            const counters = {counters};
            for (const sel of counters) {{
                const el = document.querySelector(sel);
                if (!el) continue;
                const n = parseInt(el.textContent.replace(/[^0-9]/g, ''), 10);
                if (!isNaN(n)) return n;
            }}
            return null;
        }})()
        "#,
        counters = candidates_json(Role::CartCount),
    )
}

fn visible_js(role: Role) -> String {
    format!(
        r#"
        (function() {{
            const candidates = {candidates};
            for (const sel of candidates) {{
                const el = document.querySelector(sel);
                if (el && el.offsetParent !== null) return true;
            }}
            return false;
        }})()
        "#,
        candidates = candidates_json(role),
    )
}
