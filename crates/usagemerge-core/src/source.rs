use crate::error::{SourceError, SourceResult};
use crate::model::UsageRecord;
use std::path::Path;
use tracing::warn;

/// What to do when one record inside a source cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// The first malformed record fails the whole source parse.
    #[default]
    Abort,
    /// Malformed records are logged and skipped; the rest still contribute.
    Skip,
}

/// One input location plus its encoding. `parse` materializes the whole
/// resource, converts every record via the field contract, and drops records
/// with zero serviced packets. Document order is preserved; no sorting
/// happens here.
pub trait RecordSource {
    fn describe(&self) -> String;

    fn parse(&self, policy: MalformedPolicy) -> SourceResult<Vec<UsageRecord>>;
}

pub(crate) fn read_source(path: &Path) -> SourceResult<String> {
    std::fs::read_to_string(path).map_err(|source| SourceError::unavailable(path, source))
}

/// Applies the service filter and the malformed-record policy to one parsed
/// outcome. Under `Skip` the error is logged and swallowed.
pub(crate) fn admit_record(
    outcome: Result<UsageRecord, SourceError>,
    policy: MalformedPolicy,
    records: &mut Vec<UsageRecord>,
) -> SourceResult<()> {
    match outcome {
        Ok(record) => {
            if record.is_serviced() {
                records.push(record);
            }
            Ok(())
        }
        Err(error) => match policy {
            MalformedPolicy::Abort => Err(error),
            MalformedPolicy::Skip => {
                warn!("skipping record: {error}");
                Ok(())
            }
        },
    }
}
