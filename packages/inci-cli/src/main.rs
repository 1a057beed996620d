//! `inci` - run the INCI pipeline against configured sites.
//!
//! Reports are printed to stdout as JSON, logs go to stderr.
//!
//! Exit codes: 0 on success, 1 on configuration or I/O errors, 2 when the
//! model budget ran out with fields left unresolved (partial results are
//! still persisted).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cmd;

#[derive(Parser)]
#[command(name = "inci")]
#[command(about = "Hair product discovery, INCI extraction and seal inference")]
struct Cli {
    /// Directory holding `<slug>.yaml` site documents
    #[arg(long, global = true, env = "INCI_SITES_DIR", default_value = "config/sites")]
    sites_dir: PathBuf,

    /// SQLite database URL
    #[arg(
        long,
        global = true,
        env = "INCI_DATABASE_URL",
        default_value = "sqlite:inci.db?mode=rwc"
    )]
    database_url: String,

    /// Seal rules file replacing the bundled ones
    #[arg(long, global = true, env = "INCI_LABELS")]
    labels: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover a site's products, extract them and write coverage
    DiscoverAndExtract {
        #[arg(long)]
        site: String,

        /// Ceiling on model-assisted calls for this run
        #[arg(long)]
        max_calls: Option<u32>,
    },

    /// Re-gate stored records without fetching
    Audit {
        #[arg(long)]
        site: String,
    },

    /// Recompute seals over stored records
    Labels {
        #[arg(long)]
        site: String,

        /// Print the would-be results without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = cmd::Context {
        sites_dir: cli.sites_dir,
        database_url: cli.database_url,
        labels_path: cli.labels,
    };

    let result = match cli.command {
        Commands::DiscoverAndExtract { site, max_calls } => {
            cmd::discover::run(&ctx, &site, max_calls).await
        }
        Commands::Audit { site } => cmd::audit::run(&ctx, &site).await,
        Commands::Labels { site, dry_run } => cmd::labels::run(&ctx, &site, dry_run).await,
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
