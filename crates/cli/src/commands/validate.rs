//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AlignerBlueprint, SourceType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source_count: usize,
    base_source: String,
    max_skew_seconds: f64,
    synced_log_path: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    source_count: blueprint.sources.len(),
                    base_source: blueprint
                        .base_source()
                        .map(|s| s.id.clone())
                        .unwrap_or_default(),
                    max_skew_seconds: blueprint.sync.max_skew_seconds,
                    synced_log_path: blueprint.output.synced_log_path.display().to_string(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &AlignerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sync.max_skew_seconds == 0.0 {
        warnings.push("sync.max_skew_seconds is 0 - only exact matches will align".to_string());
    }

    for source in &blueprint.sources {
        if source.source_type != SourceType::Synthetic {
            continue;
        }
        let synthetic = &source.synthetic;
        if synthetic.jitter_s * 2.0 > synthetic.period_s {
            warnings.push(format!(
                "Source '{}' jitter ({}s) exceeds half its period ({}s) - frames may arrive out of order",
                source.id, synthetic.jitter_s, synthetic.period_s
            ));
        }
        if !synthetic.realtime && synthetic.max_records.is_none() {
            warnings.push(format!(
                "Source '{}' is unbounded and not paced - it will produce as fast as possible",
                source.id
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sources: {}", summary.source_count);
            println!("  Base source: {}", summary.base_source);
            println!("  Max skew: {}s", summary.max_skew_seconds);
            println!("  Synced log: {}", summary.synced_log_path);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
