use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cart::{self, CartMutator};
use crate::config::AppConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::enumerator::SkuEnumerator;
use crate::models::{Account, CartAddAllResult, CartLineItem, BASE_SKU_ID};
use crate::repository::ProductRepository;
use crate::session::{self, AccountLocks, BrowserSessionManager};
use crate::snapshot::{self, CartSnapshotReader};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct AddAllOptions {
    pub headless: bool,
}

/// Invocation surface of the automation core. Owns the account locks and the
/// injected persistence/diagnostics collaborators; each call runs one whole
/// session under its account's lock.
pub struct CartManager {
    config: AppConfig,
    locks: AccountLocks,
    /// The attached browser's cookie state is context-wide, so attach mode
    /// admits one session at a time; launch mode gets a process per session.
    attach_gate: Arc<Mutex<()>>,
    repository: Arc<dyn ProductRepository>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl CartManager {
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn ProductRepository>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            config,
            locks: AccountLocks::new(),
            attach_gate: Arc::new(Mutex::new(())),
            repository,
            diagnostics,
        }
    }

    async fn attach_gate_guard(&self) -> Option<OwnedMutexGuard<()>> {
        if self.config.browser.launch {
            None
        } else {
            Some(self.attach_gate.clone().lock_owned().await)
        }
    }

    /// Add every purchasable variant of the product to the account's cart
    /// and report per-variant outcomes in enumeration order. Fatal errors
    /// (unreachable browser, rejected cookies, database failures) abort the
    /// whole call with no result object; everything else lands in the report.
    pub async fn add_all_skus(
        &self,
        account: &Account,
        product_id: &str,
        options: &AddAllOptions,
    ) -> Result<CartAddAllResult> {
        if !account.is_active {
            return Err(AppError::Validation(format!(
                "account {} is inactive",
                account.id
            )));
        }

        // One session per account at a time, held for the whole flow
        let _session_guard = self.locks.acquire(&account.id).await;
        let _attach_guard = self.attach_gate_guard().await;
        info!(account = %account.id, product_id, "starting add-all-SKUs session");

        let session = self.open_session(options.headless).await?;
        let page = session.authenticated_tab(&account.cookies)?;

        let enumerator =
            SkuEnumerator::new(&session, &self.config.automation, &self.config.cart);
        let product_page = enumerator.enumerate(page.tab(), product_id).await?;

        if session::login_redirected(page.tab()) {
            return Err(AppError::AuthExpired {
                account_id: account.id.clone(),
            });
        }

        if !product_page.structure_recognized {
            // Single-SKU fallback: keep a persisted base row carrying the
            // structural error so the product stays visible to the operator.
            self.repository
                .record_error(
                    product_id,
                    BASE_SKU_ID,
                    &account.id,
                    &self.config.cart.product_url(product_id),
                    "unrecognized product page structure",
                )
                .await?;
            return Ok(CartAddAllResult::empty());
        }

        if product_page.selections.is_empty() {
            info!(product_id, "no purchasable variants offered; nothing to add");
            return Ok(CartAddAllResult::empty());
        }

        let mutator = CartMutator::new(&self.config.automation);
        let deadline =
            Instant::now() + Duration::from_secs(self.config.automation.batch_deadline_secs);
        let tab = page.tab();
        let mutator = &mutator;

        let report = cart::run_batch(&product_page.selections, deadline, move |selection| {
            async move { mutator.add_sku_to_cart(tab, &selection).await }
        })
        .await;

        info!(
            account = %account.id,
            product_id,
            total = report.total_skus,
            succeeded = report.success_count,
            failed = report.failed_count,
            "add-all-SKUs batch finished"
        );

        if report.success_count > 0 {
            self.record_batch_row(account, product_id, &product_page, &report)
                .await?;
        }

        Ok(report)
    }

    /// Re-scrape the account's cart and reconcile observed prices/quantities
    /// into the persisted rows. Returns nothing; state lives in the store.
    pub async fn sync_cart(&self, account: &Account) -> Result<()> {
        if !account.is_active {
            return Err(AppError::Validation(format!(
                "account {} is inactive",
                account.id
            )));
        }

        let _session_guard = self.locks.acquire(&account.id).await;
        let _attach_guard = self.attach_gate_guard().await;
        info!(account = %account.id, "starting cart snapshot session");

        let session = self.open_session(self.config.browser.headless).await?;
        let page = session.authenticated_tab(&account.cookies)?;

        let reader =
            CartSnapshotReader::new(&session, &self.config.automation, &self.config.cart);
        match reader
            .update_prices_from_cart(page.tab(), &account.id, self.repository.as_ref())
            .await
        {
            Ok(count) => {
                info!(account = %account.id, reconciled = count, "cart snapshot session finished");
                Ok(())
            }
            Err(err @ AppError::StructuralParse { .. }) => {
                warn!(account = %account.id, "cart structure unrecognized; capturing diagnostics");
                self.diagnostics
                    .capture_failure(page.tab(), "cart-structure")
                    .await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn open_session(&self, headless: bool) -> Result<BrowserSessionManager> {
        if self.config.browser.launch {
            BrowserSessionManager::launch(&self.config.browser, headless)
        } else {
            BrowserSessionManager::connect(&self.config.browser).await
        }
    }

    /// After a batch with at least one success the product's base row is
    /// refreshed, with the per-variant outcomes attached as the snapshot.
    async fn record_batch_row(
        &self,
        account: &Account,
        product_id: &str,
        product_page: &crate::enumerator::ProductPage,
        report: &CartAddAllResult,
    ) -> Result<()> {
        let item = CartLineItem {
            title: product_page.title.clone().unwrap_or_default(),
            price: product_page
                .price_text
                .as_deref()
                .and_then(snapshot::parse_price_text),
            product_id: Some(product_id.to_string()),
            sku_id: None,
            sku_properties: Some(serde_json::to_string(&report.results)?),
            quantity: report.success_count as i64,
            link: Some(self.config.cart.product_url(product_id)),
        };
        self.repository.upsert_cart_item(&account.id, &item).await
    }
}
