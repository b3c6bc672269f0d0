//! Aligner configuration loading.
//!
//! An aligner config names the sources to align (the base source first by
//! default), the skew tolerance and polling interval of the coordinator, and
//! where the synced log and optional buffer snapshots are written. Files are
//! TOML or JSON, chosen by extension, and every load is validated before an
//! [`AlignerBlueprint`] is handed out.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("aligner.toml")).unwrap();
//! let engine_config = blueprint.to_sync_engine_config();
//! println!("aligning {} sources", engine_config.source_count());
//! ```

mod parser;
mod validator;

pub use contracts::AlignerBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry point for reading and writing aligner configs
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate the config at `path`.
    ///
    /// # Errors
    /// `ConfigParse` for an unreadable file, an unknown extension or bad
    /// syntax. `ConfigValidation` naming the first offending field otherwise.
    pub fn load_from_path(path: &Path) -> Result<AlignerBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate config text already in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<AlignerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Check a blueprint that was changed after loading, such as by CLI
    /// overrides of the skew tolerance or output paths.
    pub fn validate(blueprint: &AlignerBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &AlignerBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &AlignerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "unsupported config format for {} (expected .toml or .json)",
                    path.display()
                ))
            })
    }
}
