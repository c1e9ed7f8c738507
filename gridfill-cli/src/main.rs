//! gridfill CLI
//!
//! Usage:
//!   gridfill fill                        # fill one batch with the default records
//!   gridfill fill --records rows.yaml    # fill one batch from a file
//!   gridfill prompt                      # enter the times interactively, then fill
//!   gridfill defaults --format yaml      # print a records template
//!   gridfill selectors                   # print the effective selectors

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gridfill::datetime::parse_iso_date;
use gridfill::{default_records, BatchController, BridgePage, ExtensionBridge, FillConfig, RowRecord};
use tracing::info;

mod prompt;
mod settings;
mod summary;

use settings::Overrides;

#[derive(Parser)]
#[command(name = "gridfill")]
#[command(about = "📋 gridfill - add and fill time-entry rows in the service grid")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON or YAML configuration file.
    #[arg(long, global = true, env = "GRIDFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Address the page client connects to.
    #[arg(long, global = true, env = "GRIDFILL_BRIDGE_ADDR")]
    bridge_addr: Option<String>,

    /// Rows to add per batch.
    #[arg(long, global = true, env = "GRIDFILL_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
#[clap(rename_all = "lower")]
enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Add one batch of rows and fill them from a records file.
    Fill {
        /// JSON or YAML array of records; the built-in defaults when omitted.
        #[arg(long, env = "GRIDFILL_RECORDS")]
        records: Option<PathBuf>,
    },
    /// Ask for the times on the terminal, then fill like `fill`.
    Prompt {
        /// Date the form starts with (YYYY-MM-DD); today when omitted.
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the default records as a template.
    Defaults {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Print the effective selector registry.
    Selectors,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        bridge_addr: cli.bridge_addr.clone(),
        batch_size: cli.batch_size,
    };

    match cli.command {
        Commands::Defaults { format } => {
            let records = default_records();
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&records)?,
                OutputFormat::Yaml => serde_yaml::to_string(&records)?,
            };
            println!("{text}");
        }
        Commands::Selectors => {
            let config = settings::load_config(cli.config.as_deref(), &overrides)?;
            print!("{}", serde_yaml::to_string(&config.selectors)?);
        }
        Commands::Fill { records } => {
            let config = settings::load_config(cli.config.as_deref(), &overrides)?;
            let records = settings::load_records(records.as_deref())?;
            fill(config, records).await?;
        }
        Commands::Prompt { date } => {
            let config = settings::load_config(cli.config.as_deref(), &overrides)?;
            let today = match date {
                Some(date) => parse_iso_date(&date)?,
                None => chrono::Local::now().date_naive(),
            };
            let records = {
                let stdin = io::stdin();
                prompt::Prompt::new(stdin.lock(), io::stdout()).collect(today)?
            };
            match records {
                Some(records) => fill(config, records).await?,
                None => println!("👋 Nothing saved."),
            }
        }
    }
    Ok(())
}

async fn fill(config: FillConfig, records: Vec<RowRecord>) -> Result<()> {
    let bridge = ExtensionBridge::start_for_page(&config.bridge_addr, &config.page_url)
        .await
        .context("Failed to start the extension bridge")?;
    println!(
        "🔌 Waiting for the grid page to connect to ws://{} ...",
        bridge.local_addr()
    );
    bridge
        .wait_for_client(&config.connect_poll)
        .await
        .context("The grid page never connected")?;

    info!(records = records.len(), "Page connected, starting batch");
    let page = Arc::new(BridgePage::new(bridge.clone(), config.eval_timeout));
    let report = BatchController::new(page, config).run(&records).await;
    summary::display(&report);
    Ok(())
}
