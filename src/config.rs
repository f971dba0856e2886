use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub automation: AutomationConfig,
    pub cart: CartConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Debugging endpoint of the already-running browser process.
    pub debug_host: String,
    pub debug_port: u16,
    /// Launch a dedicated browser process instead of attaching. Attach mode
    /// treats an unreachable endpoint as fatal; there is no silent fallback.
    pub launch: bool,
    pub chrome_path: Option<String>,
    pub headless: bool,
    /// Per-navigation deadline in seconds.
    pub page_timeout: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Attempts per SKU before the failure is reported.
    pub max_attempts: u32,
    /// Randomized pause between option selections and clicks. Both bounds
    /// are milliseconds and must be non-zero.
    pub action_delay_min_ms: u64,
    pub action_delay_max_ms: u64,
    /// Pause for the page's own reactive refresh after selecting options.
    pub settle_delay_ms: u64,
    /// Window to observe a cart-counter increment or toast after the add.
    pub confirm_timeout_ms: u64,
    /// Overall deadline for one "add all SKUs" batch, in seconds.
    pub batch_deadline_secs: u64,
    pub navigation_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Product detail URL template; `{product_id}` is substituted.
    pub product_url_template: String,
    pub cart_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

impl CartConfig {
    pub fn product_url(&self, product_id: &str) -> String {
        self.product_url_template
            .replace("{product_id}", product_id)
    }
}

impl BrowserConfig {
    pub fn debug_endpoint(&self) -> String {
        format!("http://{}:{}", self.debug_host, self.debug_port)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "ARGUS_"
            .add_source(Environment::with_prefix("ARGUS").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate browser configuration
        if self.browser.debug_host.is_empty() {
            return Err(ConfigError::Message("Browser debug_host must not be empty".into()));
        }

        if self.browser.debug_port == 0 {
            return Err(ConfigError::Message("Browser debug_port must be greater than 0".into()));
        }

        if self.browser.page_timeout == 0 {
            return Err(ConfigError::Message("Browser page_timeout must be greater than 0".into()));
        }

        // Validate automation configuration. Zero delays would present a
        // bot-like interaction cadence, so they are rejected outright.
        if self.automation.max_attempts == 0 {
            return Err(ConfigError::Message("Automation max_attempts must be greater than 0".into()));
        }

        if self.automation.action_delay_min_ms == 0 {
            return Err(ConfigError::Message("Automation action_delay_min_ms must be greater than 0".into()));
        }

        if self.automation.action_delay_max_ms < self.automation.action_delay_min_ms {
            return Err(ConfigError::Message(
                "Automation action_delay_max_ms cannot be less than action_delay_min_ms".into(),
            ));
        }

        if self.automation.confirm_timeout_ms == 0 {
            return Err(ConfigError::Message("Automation confirm_timeout_ms must be greater than 0".into()));
        }

        if self.automation.batch_deadline_secs == 0 {
            return Err(ConfigError::Message("Automation batch_deadline_secs must be greater than 0".into()));
        }

        // Validate cart configuration
        if !self.cart.product_url_template.contains("{product_id}") {
            return Err(ConfigError::Message(
                "Cart product_url_template must contain a {product_id} placeholder".into(),
            ));
        }

        if Url::parse(&self.cart.cart_url).is_err() {
            return Err(ConfigError::Message("Invalid cart URL format".into()));
        }

        // Validate database configuration
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message("Database min_connections cannot exceed max_connections".into()));
        }

        Ok(())
    }
}
