//! Release Publisher CLI
//!
//! Archives a build directory and publishes it to a GitHub release and/or an
//! S3-compatible bucket

use anyhow::{Context, Result};
use clap::Parser;
use release_publisher::{
    ConfigLoadOptions, ConfigLoader, PublishError, ReleasePublisher, RunOutcome, RunReport,
    SecureTokenManager,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Archive a build and publish it as a release
#[derive(Parser)]
#[command(name = "release-publisher")]
#[command(version)]
#[command(about = "Archive a build and publish it to GitHub releases and S3", long_about = None)]
struct Cli {
    /// Configuration file (defaults to .release-publisher.yaml when present)
    #[arg(short, long, env = "RELEASE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Archive the build but skip every upload
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("release_publisher=info")),
        )
        .init();

    let cli = Cli::parse();
    let env: HashMap<String, String> = std::env::vars().collect();
    let tokens = SecureTokenManager::from_env(&env);

    match run(cli, env).await {
        Ok(report) => {
            print_report(&report);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("\n❌ Release failed");
            eprintln!("{}", tokens.mask_tokens_in_string(&format!("{e:#}")));

            if let Some(publish_error) = e.downcast_ref::<PublishError>() {
                eprintln!("   code: {}", publish_error.code());
                let actions = publish_error.suggested_actions();
                if !actions.is_empty() {
                    eprintln!("\n💡 Suggested actions:");
                    for action in actions {
                        eprintln!("  - {action}");
                    }
                }
            }
            process::exit(1);
        }
    }
}

async fn run(cli: Cli, env: HashMap<String, String>) -> Result<RunReport> {
    let working_dir = std::env::current_dir().context("cannot read the current directory")?;

    let config = ConfigLoader::load(ConfigLoadOptions {
        config_path: cli.config,
        working_dir,
        env,
        dry_run: cli.dry_run,
    })
    .await?;

    println!("\n📦 release-publisher\n");

    let publisher = ReleasePublisher::from_config(&config)?;
    let report = publisher.run().await?;

    Ok(report)
}

fn print_report(report: &RunReport) {
    println!("  Release:  {}", report.identifier);
    println!("  Artifact: {}", report.artifact_name);

    match report.outcome {
        RunOutcome::Published => {
            for upload in &report.uploads {
                println!("  ✅ {}: {} ({} bytes)", upload.target, upload.location, upload.bytes);
            }
            println!("\n✅ Release published in {:.1}s", report.duration.as_secs_f64());
        }
        RunOutcome::DryRun => {
            if let Some(path) = &report.archive_path {
                println!("  Archive:  {}", path.display());
            }
            let targets: Vec<String> = report
                .planned_targets
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("\n🧪 Dry run: would upload to {}", targets.join(", "));
        }
        RunOutcome::ArchiveMissing => {
            println!("\n⚠️  No release found! Nothing was uploaded");
        }
        RunOutcome::NothingToPublish => {
            println!("\n⚠️  No upload target configured, nothing to publish");
        }
    }
}
