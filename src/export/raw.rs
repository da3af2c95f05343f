//! Raw JSON dump of harvested objects

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write `records` to `path` as one JSON array, exactly as received
pub fn write_raw_json<P: AsRef<Path>>(path: P, records: &[Value]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    info!(records = records.len(), path = %path.display(), "Wrote raw JSON");
    Ok(())
}
