//! GEDI L2 point retrieval CLI.
//!
//! Resolves a query geometry and date range to dataset partitions and:
//! - lists the covering tiles and partition addresses
//! - counts points without reading column data
//! - retrieves selected columns into a single Parquet file
//! - writes bounding-box filtered subsets per partition
//! - downloads whole partitions

mod input;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use gedi_retrieval::{ColumnSelector, GediL2, RetrievalConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use input::QueryArgs;

#[derive(Parser, Debug)]
#[command(name = "gedi-fetch")]
#[command(about = "Retrieve GEDI L2 points by geometry and date range")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// YAML configuration file (defaults come from GEDI_* environment variables)
    #[arg(long, env = "GEDI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Worker count; negative values leave that many cores idle
    #[arg(long, allow_hyphen_values = true, global = true)]
    n_jobs: Option<i32>,

    /// Answer yes to the large retrieval prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Print retrieval counters in Prometheus text format on exit
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List covering tiles and partition addresses
    Tiles {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Count points and print the schema
    Scan {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Retrieve columns of every point into one Parquet file
    Retrieve {
        #[command(flatten)]
        query: QueryArgs,

        /// Columns: "*" for all, or a comma-separated list
        #[arg(short, long, default_value = "*")]
        columns: String,

        /// Output Parquet file
        #[arg(short, long, default_value = "gedi_l2.parquet")]
        output: PathBuf,

        /// Print the first rows of the result
        #[arg(long)]
        preview: Option<usize>,
    },

    /// Write one bounding-box filtered Parquet file per partition
    Query {
        #[command(flatten)]
        query: QueryArgs,

        /// Columns: "*" for all, or a comma-separated list
        #[arg(short, long, default_value = "*")]
        columns: String,

        /// Output directory
        #[arg(long, default_value = "gedi_subsets")]
        out_dir: PathBuf,
    },

    /// Download whole partitions
    Download {
        #[command(flatten)]
        query: QueryArgs,

        /// Output directory
        #[arg(long, default_value = "gedi_partitions")]
        out_dir: PathBuf,
    },
}

impl Command {
    fn query(&self) -> &QueryArgs {
        match self {
            Command::Tiles { query }
            | Command::Scan { query }
            | Command::Retrieve { query, .. }
            | Command::Query { query, .. }
            | Command::Download { query, .. } => query,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let mut config = match &args.config {
        Some(path) => RetrievalConfig::from_yaml(path)?,
        None => RetrievalConfig::from_env(),
    };
    if let Some(n_jobs) = args.n_jobs {
        config.n_jobs = n_jobs;
    }

    let query = args.command.query();
    let geometry = query.geometry()?;
    let period = query.period()?;

    let assume_yes = args.yes;
    let gedi = GediL2::builder(geometry)
        .period(period)
        .config(config)
        .confirm(move |n| assume_yes || confirm_large_retrieval(n))
        .build()?;

    info!(
        workers = gedi.config().workers(),
        dataset = %gedi.config().storage.dataset_root,
        "Starting GEDI L2 retrieval"
    );

    match &args.command {
        Command::Tiles { .. } => {
            for tile in gedi.tiles()? {
                println!("{}", tile);
            }
            for address in gedi.addresses()? {
                println!("{}", address);
            }
        }

        Command::Scan { .. } => {
            let summary = gedi.scan().await?;
            let columns: Vec<String> = summary
                .schema
                .as_ref()
                .map(|s| s.fields().iter().map(|f| f.name().clone()).collect())
                .unwrap_or_default();
            let report = serde_json::json!({
                "addresses": summary.addresses,
                "partitions": summary.partitions,
                "row_count": summary.row_count,
                "columns": columns,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Retrieve {
            columns,
            output,
            preview,
            ..
        } => {
            let selector: ColumnSelector = columns.parse()?;
            let table = gedi.retrieve(&selector).await?;
            if let Some(limit) = preview {
                println!("{}", table.preview(*limit)?);
            }
            table
                .write_parquet(output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(
                rows = table.n_rows(),
                columns = table.width(),
                output = %output.display(),
                "Wrote points"
            );
        }

        Command::Query {
            columns,
            out_dir,
            ..
        } => {
            let selector: ColumnSelector = columns.parse()?;
            tokio::fs::create_dir_all(out_dir).await?;
            for query in gedi.bbox_queries(&selector).await? {
                let (path, rows) = query.sink_parquet(out_dir).await?;
                info!(rows = rows, output = %path.display(), "Wrote subset");
            }
        }

        Command::Download { out_dir, .. } => {
            let report = gedi.download(out_dir).await?;
            info!(
                partitions = report.partitions,
                files = report.files.len(),
                bytes = report.bytes,
                "Download finished"
            );
        }
    }

    if args.metrics {
        eprint!("{}", prometheus_handle.render());
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Ask on the terminal before pulling a very large number of points.
fn confirm_large_retrieval(n_points: usize) -> bool {
    eprint!(
        "The query covers {} points, which may take a long time. Continue? [y/N] ",
        n_points
    );
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
