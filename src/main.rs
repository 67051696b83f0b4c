use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chartsight::services::{export, ReferenceGradient, RiskClassifier, SignalTracker};
use chartsight::sources::load_corpus;
use chartsight::Config;

/// Extract trading signals from a folder of chart screenshots.
#[derive(Parser, Debug)]
#[command(name = "chartsight", version, about)]
struct Args {
    /// Folder holding the chart screenshots.
    #[arg(long)]
    folder: PathBuf,

    /// Date prefix selecting the day to analyze, e.g. 2026-03-01.
    #[arg(long)]
    date: String,

    /// Reference colorbar image for risk classification.
    #[arg(long)]
    colorbar: Option<PathBuf>,

    /// CSV output path.
    #[arg(long, default_value = "signals.csv")]
    output: PathBuf,

    /// Also write a JSON copy of the signals next to the CSV.
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartsight=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let classifier = match &args.colorbar {
        Some(path) => match ReferenceGradient::load(path) {
            Ok(gradient) => Some(RiskClassifier::new(gradient)),
            Err(err) => {
                warn!(%err, "risk classification disabled");
                None
            }
        },
        None => None,
    };

    let frames = load_corpus(&args.folder, &args.date)?;
    info!(frames = frames.len(), date = %args.date, "corpus loaded");

    let mut tracker = SignalTracker::new(&config, classifier);
    let signals = tracker.run(&frames);

    for signal in &signals {
        info!(
            "signal#{} {} {} at {} risk={}",
            signal.sequence_number,
            signal.timestamp.format("%H:%M:%S"),
            signal.direction,
            signal
                .price
                .map(|p| format!("{p:.2}"))
                .unwrap_or_else(|| "?".into()),
            signal.risk
        );
    }

    export::write_csv(&args.output, &signals)?;
    if let Some(path) = &args.json {
        export::write_json(path, &signals)?;
    }

    Ok(())
}
