//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::AlignerBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args)?;

    info!(
        sources = blueprint.sources.len(),
        base = blueprint.base_source().map(|s| s.id.as_str()).unwrap_or("?"),
        max_skew_s = blueprint.sync.max_skew_seconds,
        output = %blueprint.output.synced_log_path.display(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_tuples: (args.max_tuples != 0).then_some(args.max_tuples as usize),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
    });

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        tuples = stats.report.tuples,
        stop_reason = %stats.stop_reason,
        duration_secs = stats.duration.as_secs_f64(),
        "Stream aligner finished"
    );
    stats.print_summary();

    Ok(())
}

/// Apply command-line overrides, then re-run validation
fn apply_overrides(blueprint: &mut AlignerBlueprint, args: &RunArgs) -> Result<()> {
    if let Some(max_skew) = args.max_skew {
        if !max_skew.is_finite() || max_skew < 0.0 {
            return Err(CliError::invalid_override("max-skew", "must be finite and >= 0").into());
        }
        info!(max_skew_s = max_skew, "Overriding max skew from CLI");
        blueprint.sync.max_skew_seconds = max_skew;
    }
    if let Some(interval) = args.polling_interval {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(
                CliError::invalid_override("polling-interval", "must be finite and > 0").into(),
            );
        }
        info!(polling_interval_s = interval, "Overriding polling interval from CLI");
        blueprint.sync.polling_interval_seconds = interval;
    }
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding synced log path from CLI");
        blueprint.output.synced_log_path = output.clone();
    }
    if let Some(ref dir) = args.snapshot_dir {
        blueprint.output.snapshot_dir = Some(dir.clone());
    }

    config_loader::ConfigLoader::validate(blueprint).context("Invalid configuration after overrides")?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &AlignerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sync:");
    println!("  Max skew: {}s", blueprint.sync.max_skew_seconds);
    println!(
        "  Polling interval: {}s",
        blueprint.sync.polling_interval_seconds
    );
    println!("  Skew policy: {:?}", blueprint.sync.skew_policy);
    println!("\nSources ({}):", blueprint.sources.len());
    for (index, source) in blueprint.sources.iter().enumerate() {
        let marker = if index == blueprint.sync.base_source_index {
            " [base]"
        } else {
            ""
        };
        println!("  - {} ({:?}){}", source.id, source.source_type, marker);
    }
    println!(
        "\nOutput: {}",
        blueprint.output.synced_log_path.display()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[sync]
max_skew_seconds = 0.2

[[sources]]
id = "cam"
source_type = "synthetic"

[[sources]]
id = "lidar"
source_type = "synthetic"
"#;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["run"];
        argv.extend_from_slice(extra);
        RunArgs::parse_from(argv)
    }

    fn blueprint() -> AlignerBlueprint {
        config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    #[test]
    fn test_overrides_applied() {
        let mut bp = blueprint();
        let args = run_args(&["--max-skew", "0.05", "--output", "out/synced.json"]);
        apply_overrides(&mut bp, &args).unwrap();

        assert_eq!(bp.sync.max_skew_seconds, 0.05);
        assert_eq!(bp.output.synced_log_path, PathBuf::from("out/synced.json"));
    }

    #[test]
    fn test_negative_skew_override_rejected() {
        let mut bp = blueprint();
        let args = run_args(&["--max-skew=-1"]);
        let err = apply_overrides(&mut bp, &args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidOverride { .. })
        ));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("aligner.toml");
        std::fs::write(&config, CONFIG).unwrap();
        let output = dir.path().join("synced.json");

        let args = run_args(&[
            "--config",
            config.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--dry-run",
        ]);
        run_pipeline(&args).await.unwrap();
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_missing_config() {
        let args = run_args(&["--config", "/nonexistent/aligner.toml"]);
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigNotFound { .. })
        ));
    }
}
