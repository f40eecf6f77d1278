mod loader;
mod types;
mod validate;

pub use loader::{
    load_input_config, load_input_config_from_str, load_pipeline_config,
    load_pipeline_config_from_str,
};
pub use types::*;
pub use validate::{validate_destination, validate_input_config, validate_pipeline_config};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unsupported destination URL: {0} (only gs:// URLs are supported)")]
    UnsupportedDestination(String),
}
