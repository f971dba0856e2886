pub mod cart;
pub mod config;
pub mod diagnostics;
pub mod enumerator;
pub mod manager;
pub mod models;
pub mod repository;
pub mod selectors;
pub mod session;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use manager::{AddAllOptions, CartManager};
pub use models::{Account, CartAddAllResult, CartLineItem, SkuAddResult, SkuSelection};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
