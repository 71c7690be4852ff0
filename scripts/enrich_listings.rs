//! 掲載データ（JSON 配列）を読み込み、分類・要約して JSON / CSV に書き出すバッチ。
//!
//! Usage:
//!   enrich_listings --input listings.json --output-dir output --prefix services
//!
//! 外部サービスの接続先や分類の閾値は環境変数（`Config::from_env`）で指定する。
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use casebook_worker::{
    app::{build_classifier, build_enricher},
    config::Config,
    observability::Telemetry,
    pipeline::{RawListing, export_records, prepare_listings},
};

/// Enrich case-study listings and export them as JSON and CSV
#[derive(Parser, Debug)]
#[command(name = "enrich_listings")]
struct Args {
    /// JSON file containing an array of listings (title, url, content, company)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Directory the timestamped JSON / CSV files are written to
    #[arg(long, short = 'o', default_value = "output")]
    output_dir: PathBuf,

    /// File name prefix of the exported files
    #[arg(long, default_value = "services")]
    prefix: String,

    /// Skip summary, title and solution generation even if ENRICH_SUMMARIZE is set
    #[arg(long)]
    no_summarize: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let telemetry = Telemetry::new()?;

    let mut config = Config::from_env().context("failed to load configuration")?;
    if args.no_summarize {
        config = config.without_summarize();
    }

    let run_id = Uuid::now_v7();
    run(args, config, &telemetry)
        .instrument(info_span!("enrich_listings", %run_id))
        .await
}

async fn run(args: Args, config: Config, telemetry: &Telemetry) -> Result<()> {
    let listings = read_listings(&args.input)?;
    let received = listings.len();
    let listings = prepare_listings(listings);
    if listings.len() < received {
        warn!(
            received,
            kept = listings.len(),
            "dropped listings without URL or with duplicate URL"
        );
    }

    let classifier = Arc::new(build_classifier(&config)?);
    let enricher = build_enricher(&config, classifier, Some(telemetry.metrics_arc()))?;

    let started = Instant::now();
    let records = enricher.enrich_all(&listings).await;
    info!(
        records = records.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "enrichment finished"
    );

    match export_records(&records, &args.output_dir, &args.prefix, Local::now())
        .context("failed to export records")?
    {
        Some(paths) => info!(
            json = %paths.json.display(),
            csv = %paths.csv.display(),
            "export complete"
        ),
        None => warn!("nothing exported"),
    }

    Ok(())
}

fn read_listings(path: &Path) -> Result<Vec<RawListing>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse listings from {}", path.display()))
}
