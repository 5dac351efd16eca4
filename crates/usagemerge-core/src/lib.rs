mod csv_source;
mod json_source;
mod merge;
mod xml_source;

pub mod error;
pub mod model;
pub mod report;
pub mod schema;
pub mod source;

pub use csv_source::CsvSource;
pub use json_source::JsonSource;
pub use merge::merge_sorted;
pub use source::{MalformedPolicy, RecordSource};
pub use xml_source::XmlSource;

use anyhow::{Context, Result};
use error::SourceError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use usagemerge_config::{AppConfig, OnMalformed, SourceFormat, SourceSpec};

#[derive(Debug)]
pub struct PipelineSummary {
    pub report_path: PathBuf,
    pub records_written: usize,
    pub service_counts: BTreeMap<String, u64>,
}

fn build_source(spec: &SourceSpec) -> Box<dyn RecordSource> {
    match spec.format {
        SourceFormat::Csv => Box::new(CsvSource::new(&spec.path)),
        SourceFormat::Json => Box::new(JsonSource::new(&spec.path)),
        SourceFormat::Xml => Box::new(XmlSource::new(&spec.path)),
    }
}

fn malformed_policy(config: &AppConfig) -> MalformedPolicy {
    match config.pipeline.on_malformed {
        OnMalformed::Abort => MalformedPolicy::Abort,
        OnMalformed::Skip => MalformedPolicy::Skip,
    }
}

/// Runs the whole parse -> filter -> merge -> sort -> report pipeline once,
/// sequentially, one source at a time. An unreadable source contributes
/// nothing but does not fail the run; a malformed record fails the run before
/// any report is written (unless the skip policy is configured).
pub fn run_pipeline(config: &AppConfig) -> Result<PipelineSummary> {
    let sources: Vec<Box<dyn RecordSource>> = config
        .sources
        .iter()
        .filter(|spec| spec.enabled)
        .map(build_source)
        .collect();
    let policy = malformed_policy(config);

    let mut batches = Vec::with_capacity(sources.len());
    for source in &sources {
        match source.parse(policy) {
            Ok(batch) => {
                info!(
                    "parsed {} serviced records from {}",
                    batch.len(),
                    source.describe()
                );
                batches.push(batch);
            }
            Err(error @ SourceError::Unavailable { .. }) => {
                warn!("{error}; continuing without {}", source.describe());
                batches.push(Vec::new());
            }
            Err(error) => {
                return Err(anyhow::Error::new(error)
                    .context(format!("failed to parse {}", source.describe())));
            }
        }
    }

    let records = merge_sorted(batches);
    let report_path = Path::new(&config.report.path);
    report::write_report(report_path, &records)
        .with_context(|| format!("failed to write report {}", report_path.display()))?;
    let service_counts = report::service_guid_counts(&records);

    Ok(PipelineSummary {
        report_path: report_path.to_path_buf(),
        records_written: records.len(),
        service_counts,
    })
}
