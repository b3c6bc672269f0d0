//! Config validation
//!
//! Rules:
//! - at least two sources, ids unique and non-empty
//! - base_source_index points at a configured source
//! - max_skew_seconds finite and >= 0
//! - polling_interval_seconds finite and > 0
//! - replay sources carry a path
//! - synthetic period > 0, jitter >= 0
//! - synced log path non-empty

use std::collections::HashSet;

use contracts::{AlignerBlueprint, ContractError, SourceType};

/// Validate an AlignerBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &AlignerBlueprint) -> Result<(), ContractError> {
    validate_source_ids(blueprint)?;
    validate_sync_settings(blueprint)?;
    validate_sources(blueprint)?;
    validate_output(blueprint)?;
    Ok(())
}

/// Source count and id uniqueness
fn validate_source_ids(blueprint: &AlignerBlueprint) -> Result<(), ContractError> {
    if blueprint.sources.len() < 2 {
        return Err(ContractError::config_validation(
            "sources",
            format!(
                "at least 2 sources are required, got {}",
                blueprint.sources.len()
            ),
        ));
    }

    let mut seen = HashSet::new();
    for (idx, source) in blueprint.sources.iter().enumerate() {
        if source.id.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sources[{idx}].id"),
                "source id cannot be empty",
            ));
        }
        if !seen.insert(source.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("sources[id={}]", source.id),
                "duplicate source id",
            ));
        }
    }
    Ok(())
}

/// Sync strategy bounds
fn validate_sync_settings(blueprint: &AlignerBlueprint) -> Result<(), ContractError> {
    let sync = &blueprint.sync;

    if sync.base_source_index >= blueprint.sources.len() {
        return Err(ContractError::config_validation(
            "sync.base_source_index",
            format!(
                "base_source_index ({}) must be < source count ({})",
                sync.base_source_index,
                blueprint.sources.len()
            ),
        ));
    }

    if !sync.max_skew_seconds.is_finite() || sync.max_skew_seconds < 0.0 {
        return Err(ContractError::config_validation(
            "sync.max_skew_seconds",
            format!(
                "max_skew_seconds must be finite and >= 0, got {}",
                sync.max_skew_seconds
            ),
        ));
    }

    if !sync.polling_interval_seconds.is_finite() || sync.polling_interval_seconds <= 0.0 {
        return Err(ContractError::config_validation(
            "sync.polling_interval_seconds",
            format!(
                "polling_interval_seconds must be finite and > 0, got {}",
                sync.polling_interval_seconds
            ),
        ));
    }

    Ok(())
}

/// Per-type source settings
fn validate_sources(blueprint: &AlignerBlueprint) -> Result<(), ContractError> {
    for source in &blueprint.sources {
        match source.source_type {
            SourceType::Replay => {
                let missing = source
                    .path
                    .as_ref()
                    .map_or(true, |path| path.as_os_str().is_empty());
                if missing {
                    return Err(ContractError::config_validation(
                        format!("sources[{}].path", source.id),
                        "replay source requires a path",
                    ));
                }
            }
            SourceType::Synthetic => {
                let synthetic = &source.synthetic;
                if !synthetic.period_s.is_finite() || synthetic.period_s <= 0.0 {
                    return Err(ContractError::config_validation(
                        format!("sources[{}].synthetic.period_s", source.id),
                        format!("period_s must be > 0, got {}", synthetic.period_s),
                    ));
                }
                if !synthetic.jitter_s.is_finite() || synthetic.jitter_s < 0.0 {
                    return Err(ContractError::config_validation(
                        format!("sources[{}].synthetic.jitter_s", source.id),
                        format!("jitter_s must be >= 0, got {}", synthetic.jitter_s),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Output locations
fn validate_output(blueprint: &AlignerBlueprint) -> Result<(), ContractError> {
    if blueprint.output.synced_log_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "output.synced_log_path",
            "synced_log_path cannot be empty",
        ));
    }
    Ok(())
}
