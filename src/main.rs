//! tickit-report - Runs analytical SQL queries and exports each result to CSV.

use tickit_report::catalog::QueryCatalog;
use tickit_report::cli::Cli;
use tickit_report::config::Config;
use tickit_report::error::Result;
use tickit_report::export::CsvExporter;
use tickit_report::logging;
use tickit_report::runner::QueryRunner;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.quiet, cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let catalog = match cli.catalog_path(&config) {
        Some(path) => {
            info!("Loading queries from: {}", path.display());
            QueryCatalog::from_file(path)?
        }
        None => QueryCatalog::builtin()?,
    };

    if cli.list {
        for (i, spec) in catalog.queries().iter().enumerate() {
            println!("{:>3}. {}", i + 1, spec.display_label());
        }
        return Ok(());
    }

    let specs = catalog.select(&cli.only)?;
    let connection = cli.resolve_connection(&config)?;

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.dir.clone());
    let preview_rows = cli.preview_rows.unwrap_or(config.output.preview_rows);

    let mut runner = QueryRunner::new(CsvExporter::new(output_dir), preview_rows);

    // The connection is released on every path once it was opened
    let outcome = match runner.connect(&connection).await {
        Ok(()) => runner.run_batch(&specs).await.map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = runner.close().await {
        warn!("Failed to close connection: {e}");
    }

    outcome
}
