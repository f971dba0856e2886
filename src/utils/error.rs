use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Browser connection error ({endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    #[error("Session cookies rejected for account {account_id}")]
    AuthExpired { account_id: String },

    #[error("Navigation timed out: {url}")]
    NavigationTimeout { url: String },

    #[error("Page structure not recognized: {context}")]
    StructuralParse { context: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Fatal errors abort the whole run; everything else is handled locally
    /// (retried, or folded into a per-SKU result entry).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Connection { .. }
                | AppError::AuthExpired { .. }
                | AppError::Database(_)
                | AppError::Config(_)
        )
    }

    /// Wrap an error coming out of the browser layer.
    pub fn browser(err: impl std::fmt::Display) -> Self {
        AppError::Browser(err.to_string())
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
