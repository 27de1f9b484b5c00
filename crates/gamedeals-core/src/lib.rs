pub mod app_config;
pub mod config;
pub mod sort;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, SelectorConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use sort::sort_by_field;
pub use types::{DiscountRecord, GameRecord, ListingIdentity, PriceFact};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
