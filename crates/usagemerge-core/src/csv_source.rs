use crate::error::{SourceError, SourceResult};
use crate::model::UsageRecord;
use crate::schema;
use crate::source::{admit_record, read_source, MalformedPolicy, RecordSource};
use csv::StringRecord;
use std::path::{Path, PathBuf};

/// Delimited-text adapter. The first row is a header naming the 8 canonical
/// fields; column order does not need to match the report order.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for CsvSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn parse(&self, policy: MalformedPolicy) -> SourceResult<Vec<UsageRecord>> {
        let content = read_source(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|error| SourceError::malformed(&self.path, "header", error.to_string()))?
            .clone();

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            // Header occupies line 1.
            let line = index + 2;
            let outcome = row
                .map_err(|error| {
                    SourceError::malformed(&self.path, format!("line {line}"), error.to_string())
                })
                .and_then(|row| record_from_row(&self.path, line, &headers, &row));
            admit_record(outcome, policy, &mut records)?;
        }

        Ok(records)
    }
}

fn record_from_row(
    path: &Path,
    line: usize,
    headers: &StringRecord,
    row: &StringRecord,
) -> Result<UsageRecord, SourceError> {
    let location = format!("line {line}");
    let raw_time = field(path, &location, headers, row, schema::REQUEST_TIME)?;
    let request_time = schema::parse_request_time(raw_time)
        .map_err(|error| SourceError::malformed(path, &location, format!("{error:#}")))?;

    Ok(UsageRecord {
        client_address: field(path, &location, headers, row, schema::CLIENT_ADDRESS)?.to_string(),
        client_guid: field(path, &location, headers, row, schema::CLIENT_GUID)?.to_string(),
        request_time,
        service_guid: field(path, &location, headers, row, schema::SERVICE_GUID)?.to_string(),
        retries_request: int_field(path, &location, headers, row, schema::RETRIES_REQUEST)?,
        packets_requested: int_field(path, &location, headers, row, schema::PACKETS_REQUESTED)?,
        packets_serviced: int_field(path, &location, headers, row, schema::PACKETS_SERVICED)?,
        max_hole_size: int_field(path, &location, headers, row, schema::MAX_HOLE_SIZE)?,
    })
}

fn field<'a>(
    path: &Path,
    location: &str,
    headers: &StringRecord,
    row: &'a StringRecord,
    name: &str,
) -> Result<&'a str, SourceError> {
    headers
        .iter()
        .position(|header| header == name)
        .and_then(|index| row.get(index))
        .ok_or_else(|| SourceError::malformed(path, location, format!("missing field `{name}`")))
}

fn int_field(
    path: &Path,
    location: &str,
    headers: &StringRecord,
    row: &StringRecord,
    name: &str,
) -> Result<u64, SourceError> {
    let raw = field(path, location, headers, row, name)?;
    raw.parse::<u64>().map_err(|_| {
        SourceError::malformed(
            path,
            location,
            format!("field `{name}` is not a non-negative integer: `{raw}`"),
        )
    })
}
