use crate::model::UsageRecord;
use crate::schema::{self, REPORT_HEADER};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes the merged collection as a CSV report at `path`, header first, one
/// row per record in the given order. The report is staged in a scratch file
/// and published with a rename, so a failed run never leaves a partial
/// artifact at the output path. Reruns overwrite the previous report.
pub fn write_report(path: &Path, records: &[UsageRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let scratch = NamedTempFile::new_in(dir).with_context(|| {
        format!(
            "failed to create report scratch file in {}",
            dir.display()
        )
    })?;

    let mut writer = csv::Writer::from_writer(scratch.as_file());
    writer
        .write_record(REPORT_HEADER)
        .context("failed to write report header")?;
    for record in records {
        let row = [
            record.client_address.clone(),
            record.client_guid.clone(),
            schema::format_request_time(&record.request_time),
            record.service_guid.clone(),
            record.retries_request.to_string(),
            record.packets_requested.to_string(),
            record.packets_serviced.to_string(),
            record.max_hole_size.to_string(),
        ];
        writer
            .write_record(&row)
            .context("failed to write report row")?;
    }
    writer.flush().context("failed to flush report rows")?;
    drop(writer);

    scratch
        .persist(path)
        .with_context(|| format!("failed to publish report at {}", path.display()))?;
    Ok(())
}

/// Occurrence count per service identifier. Keyed by a sorted map so the
/// console summary is deterministic run to run.
pub fn service_guid_counts(records: &[UsageRecord]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::<String, u64>::new();
    for record in records {
        *counts.entry(record.service_guid.clone()).or_insert(0) += 1;
    }
    counts
}
