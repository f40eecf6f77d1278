use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use std::path::Path;

use super::{
    types::{InputConfig, PipelineConfig},
    ConfigError,
};

/// Load the input config from a YAML file with environment variable overrides.
pub fn load_input_config(path: &Path) -> Result<InputConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: InputConfig = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("STREAMPRESS_INPUT_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load the pipeline config from a YAML file with environment variable overrides.
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: PipelineConfig = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("STREAMPRESS_PIPELINE_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load an input config from a YAML string (useful for testing).
pub fn load_input_config_from_str(yaml: &str) -> Result<InputConfig, ConfigError> {
    Figment::from(Yaml::string(yaml))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load a pipeline config from a YAML string (useful for testing).
pub fn load_pipeline_config_from_str(yaml: &str) -> Result<PipelineConfig, ConfigError> {
    Figment::from(Yaml::string(yaml))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
