//! CSV fallback output

use std::path::Path;

use anyhow::{Context, Result};
use sismos_core::SeismicRecord;

/// Write `records` to `path` as UTF-8 CSV. Returns the number of data rows.
///
/// The header is the field keys of the first record; later records are
/// written against that header, with blanks for keys they lack. An empty
/// batch has no header to write, so a previous file at `path` is removed.
pub fn write_csv(path: &Path, records: &[SeismicRecord]) -> Result<usize> {
    let Some(first) = records.first() else {
        log::warn!("No records to write, removing {}", path.display());
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", path.display()));
            }
        }
        return Ok(0);
    };
    let header: Vec<&str> = first.fields().into_iter().map(|(key, _)| key).collect();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(&header)?;
    for record in records {
        writer.write_record(header.iter().map(|key| record.get(key).unwrap_or("")))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(records.len())
}
