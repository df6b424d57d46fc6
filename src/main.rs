//! rocky-publish CLI
//!
//! Entry point for the `rocky-publish` command-line tool. Any error is
//! fatal: one diagnostic line on stderr, exit 1, no partial output.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rocky_publish_tools::aws::AwsCli;
use rocky_publish_tools::quota::{self, IncreaseOutcome, QuotaClient, PUBLIC_AMI_QUOTA_NAME};
use rocky_publish_tools::regions::{self, ImageInventory};
use rocky_publish_tools::{find_latest_images, find_latest_isos, ReleaseVersion, ToolConfig};

#[derive(Parser)]
#[command(name = "rocky-publish")]
#[command(about = "Operator utilities for the Rocky Linux image publishing pipeline", version)]
struct Cli {
    /// Path to config file (default: ~/.config/rocky-publish/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the most recently published machine images for a release
    LatestImages {
        /// Release version, e.g. "9.3"
        version: String,

        /// Artifact bucket (default from config)
        #[arg(long)]
        bucket: Option<String>,

        /// Key prefix (default: buildimage-MAJOR.MINOR-)
        #[arg(long)]
        prefix: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find the most recently published installer ISOs for a release
    LatestIsos {
        /// Release version, e.g. "9.3"
        version: String,

        /// Artifact bucket (default from config)
        #[arg(long)]
        bucket: Option<String>,

        /// Key prefix (default: buildiso-MAJOR-)
        #[arg(long)]
        prefix: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Compare public machine-image inventories across regions
    CompareRegions {
        /// Reference region to compare against (default from config)
        #[arg(long)]
        source_region: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Audit or raise the per-region "Public AMIs" quota
    Quotas {
        #[command(subcommand)]
        action: QuotasCommands,
    },
}

#[derive(Subcommand)]
enum QuotasCommands {
    /// List the quota and last increase request for every region
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Request an increase in every region below the target value
    Request {
        /// Target quota value
        value: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ToolConfig::load(cli.config.as_deref())?;
    let aws = AwsCli::new(config.storage_region.clone());

    match cli.command {
        Commands::LatestImages {
            version,
            bucket,
            prefix,
            json,
        } => {
            let version: ReleaseVersion = version.parse()?;
            let bucket = bucket.unwrap_or(config.bucket);
            let mut images = find_latest_images(&aws, &bucket, prefix.as_deref(), version)?;
            // Deterministic output: identity, then architecture
            images.sort_by(|a, b| {
                a.type_variant()
                    .cmp(&b.type_variant())
                    .then_with(|| a.architecture.cmp(&b.architecture))
            });

            if json {
                println!("{}", serde_json::to_string_pretty(&images)?);
            } else {
                for image in &images {
                    println!("{image}");
                }
            }
        }

        Commands::LatestIsos {
            version,
            bucket,
            prefix,
            json,
        } => {
            let version: ReleaseVersion = version.parse()?;
            let bucket = bucket.unwrap_or(config.bucket);
            let mut isos = find_latest_isos(&aws, &bucket, prefix.as_deref(), version)?;
            isos.sort_by(|a, b| a.architecture.cmp(&b.architecture));

            if json {
                println!("{}", serde_json::to_string_pretty(&isos)?);
            } else {
                for iso in &isos {
                    println!("{iso}");
                }
            }
        }

        Commands::CompareRegions {
            source_region,
            json,
        } => {
            let source_region = source_region.unwrap_or(config.source_region);
            let all_regions = ImageInventory::regions(&aws)?;
            let report = regions::compare_regions(&aws, &source_region, &all_regions)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Source: {source_region}");
                for comparison in &report {
                    if comparison.is_complete() {
                        println!(
                            "{}: {} images (complete)",
                            comparison.region, comparison.total_images
                        );
                    } else {
                        println!(
                            "{}: {} images (missing {})",
                            comparison.region,
                            comparison.total_images,
                            comparison.missing_count()
                        );
                        for name in &comparison.missing {
                            println!("  - {name}");
                        }
                    }
                }
            }
        }

        Commands::Quotas { action } => match action {
            QuotasCommands::List { json } => {
                let all_regions = QuotaClient::regions(&aws)?;
                let rows = quota::audit_quotas(&aws, PUBLIC_AMI_QUOTA_NAME, &all_regions)?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    println!("Region\tQuota\tDesired\tStatus\tCaseId");
                    for row in &rows {
                        let (desired, status) = match &row.last_request {
                            Some(request) => (request.desired, request.status.as_str()),
                            None => (0.0, ""),
                        };
                        println!(
                            "{}\t{:.0}\t{:.0}\t{}\t{}",
                            row.region,
                            row.current,
                            desired,
                            status,
                            row.case_column()?
                        );
                    }
                }
            }

            QuotasCommands::Request { value } => {
                let all_regions = QuotaClient::regions(&aws)?;
                let outcomes = quota::request_increases(&aws, PUBLIC_AMI_QUOTA_NAME, &all_regions, value)?;

                for outcome in &outcomes {
                    match outcome {
                        IncreaseOutcome::AlreadySufficient { region, current } => println!(
                            "{region}: quota already at {current:.0}, skipping request"
                        ),
                        IncreaseOutcome::Requested { region, desired } => {
                            println!("{region}: requested increase to {desired:.0}")
                        }
                    }
                }
            }
        },
    }

    Ok(())
}
