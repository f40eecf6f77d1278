use std::collections::HashSet;

use super::{
    types::{InputConfig, PipelineConfig},
    ConfigError,
};

/// Validate an input config:
/// - at least one input
/// - input names are unique and non-empty
pub fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.inputs.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one input is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for input in &config.inputs {
        if input.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "input name cannot be empty".to_string(),
            ));
        }
        if !names.insert(input.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate input name: {}",
                input.name
            )));
        }
    }

    Ok(())
}

/// Validate a pipeline config:
/// - at least one variant and one packaging unit
/// - variant and unit names are unique
/// - packaging unit variant references resolve
/// - segment durations and bitrate overrides are positive
pub fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.variants.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one output variant is required".to_string(),
        ));
    }
    if config.packaging.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one packaging unit is required".to_string(),
        ));
    }

    let mut variant_names = HashSet::new();
    for variant in &config.variants {
        if variant.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "variant name cannot be empty".to_string(),
            ));
        }
        if !variant_names.insert(variant.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate variant name: {}",
                variant.name
            )));
        }
        if variant.bitrate_kbps == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "variant {} has a zero bitrate",
                variant.name
            )));
        }
    }

    let mut unit_names = HashSet::new();
    for unit in &config.packaging {
        if !unit_names.insert(unit.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate packaging unit name: {}",
                unit.name
            )));
        }
        if unit.segment_duration_secs <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "packaging unit {} has a non-positive segment duration",
                unit.name
            )));
        }
        if let Some(selected) = &unit.variants {
            for name in selected {
                if !variant_names.contains(name.as_str()) {
                    return Err(ConfigError::ValidationError(format!(
                        "packaging unit {} references unknown variant: {}",
                        unit.name, name
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Validate a remote destination URL. Only Google Cloud Storage URLs are
/// recognized.
pub fn validate_destination(url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("gs://") {
        return Err(ConfigError::UnsupportedDestination(url.to_string()));
    }
    Ok(())
}
