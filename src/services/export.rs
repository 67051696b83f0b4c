//! Signal export in CSV and JSON form.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::types::Signal;

const CSV_HEADER: [&str; 6] = ["signal#", "timestamp", "price", "buy/sell", "color", "risk"];

/// Write signals as CSV with one row per signal, ordered as given.
pub fn write_csv(path: &Path, signals: &[Signal]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for signal in signals {
        writer.write_record(csv_row(signal))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = signals.len(), "csv written");
    Ok(())
}

fn csv_row(signal: &Signal) -> [String; 6] {
    [
        signal.sequence_number.to_string(),
        signal.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        signal
            .price
            .map(|p| format!("{p:.2}"))
            .unwrap_or_default(),
        signal.direction.to_string(),
        signal.color.to_string(),
        signal.risk.to_string(),
    ]
}

/// Write signals as a pretty-printed JSON array.
pub fn write_json(path: &Path, signals: &[Signal]) -> Result<()> {
    let mut file = File::create(path)?;
    serde_json::to_writer_pretty(&mut file, signals)?;
    file.write_all(b"\n")?;
    info!(path = %path.display(), rows = signals.len(), "json written");
    Ok(())
}
