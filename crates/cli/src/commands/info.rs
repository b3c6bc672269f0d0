//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AlignerBlueprint, SourceType};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sync: SyncInfo,
    output: OutputInfo,
    sources: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SyncInfo {
    base_source: String,
    max_skew_seconds: f64,
    polling_interval_seconds: f64,
    skew_policy: String,
}

#[derive(Serialize)]
struct OutputInfo {
    synced_log_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_dir: Option<String>,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    source_type: String,
    is_base: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn source_detail(blueprint: &AlignerBlueprint, index: usize) -> String {
    let source = &blueprint.sources[index];
    match source.source_type {
        SourceType::Replay => format!(
            "replay {}",
            source
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ),
        SourceType::Synthetic => {
            let s = &source.synthetic;
            format!(
                "period {}s, jitter ±{}s, offset {}s, {} objects/frame, {}{}",
                s.period_s,
                s.jitter_s,
                s.offset_s,
                s.objects_per_frame,
                if s.realtime { "paced" } else { "unpaced" },
                s.max_records
                    .map(|n| format!(", {n} records"))
                    .unwrap_or_default()
            )
        }
    }
}

fn build_config_info(blueprint: &AlignerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sources = blueprint
        .sources
        .iter()
        .enumerate()
        .map(|(index, source)| SourceInfo {
            id: source.id.clone(),
            source_type: format!("{:?}", source.source_type),
            is_base: index == blueprint.sync.base_source_index,
            detail: args.sources.then(|| source_detail(blueprint, index)),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sync: SyncInfo {
            base_source: blueprint
                .base_source()
                .map(|s| s.id.clone())
                .unwrap_or_default(),
            max_skew_seconds: blueprint.sync.max_skew_seconds,
            polling_interval_seconds: blueprint.sync.polling_interval_seconds,
            skew_policy: format!("{:?}", blueprint.sync.skew_policy),
        },
        output: OutputInfo {
            synced_log_path: blueprint.output.synced_log_path.display().to_string(),
            snapshot_dir: blueprint
                .output
                .snapshot_dir
                .as_ref()
                .map(|d| d.display().to_string()),
        },
        sources,
    }
}

fn print_config_info(blueprint: &AlignerBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Stream Aligner Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let sync = &blueprint.sync;
    println!("⚙️  Sync Settings");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Max skew: {}s", sync.max_skew_seconds);
    println!("   ├─ Polling interval: {}s", sync.polling_interval_seconds);
    println!("   └─ Skew policy: {:?}", sync.skew_policy);

    println!("\n📡 Sources ({})", blueprint.sources.len());
    for (i, source) in blueprint.sources.iter().enumerate() {
        let is_last = i == blueprint.sources.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let base = if i == sync.base_source_index { " [base]" } else { "" };

        println!("   {} {} ({:?}){}", prefix, source.id, source.source_type, base);
        if args.sources {
            println!("   {}  └─ {}", child_prefix, source_detail(blueprint, i));
        }
    }

    println!("\n📤 Output");
    println!(
        "   ├─ Synced log: {}",
        blueprint.output.synced_log_path.display()
    );
    match &blueprint.output.snapshot_dir {
        Some(dir) => println!("   └─ Snapshots: {}", dir.display()),
        None => println!("   └─ Snapshots: disabled"),
    }

    println!();
}
