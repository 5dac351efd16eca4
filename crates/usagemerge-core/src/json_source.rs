use crate::error::{SourceError, SourceResult};
use crate::model::UsageRecord;
use crate::schema;
use crate::source::{admit_record, read_source, MalformedPolicy, RecordSource};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Structured-object adapter. The document root is an array of flat objects
/// keyed by the canonical field names; `request-time` is epoch milliseconds.
pub struct JsonSource {
    path: PathBuf,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonSource {
    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn parse(&self, policy: MalformedPolicy) -> SourceResult<Vec<UsageRecord>> {
        let content = read_source(&self.path)?;
        // Document-level faults are not per-record conditions; they fail the
        // source even under the skip policy.
        let root: Value = serde_json::from_str(&content)
            .map_err(|error| SourceError::malformed(&self.path, "document", error.to_string()))?;
        let Value::Array(items) = root else {
            return Err(SourceError::malformed(
                &self.path,
                "document",
                "root is not an array of records",
            ));
        };

        let mut records = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let outcome = record_from_value(&self.path, index, item);
            admit_record(outcome, policy, &mut records)?;
        }

        Ok(records)
    }
}

fn record_from_value(path: &Path, index: usize, item: &Value) -> Result<UsageRecord, SourceError> {
    let location = format!("record {index}");
    let object = item
        .as_object()
        .ok_or_else(|| SourceError::malformed(path, &location, "record is not an object"))?;

    let raw_millis = int_key(path, &location, object, schema::REQUEST_TIME)?;
    let millis = i64::try_from(raw_millis).map_err(|_| {
        SourceError::malformed(
            path,
            &location,
            format!("key `{}` out of range: {raw_millis}", schema::REQUEST_TIME),
        )
    })?;
    let request_time = schema::request_time_from_millis(millis)
        .map_err(|error| SourceError::malformed(path, &location, format!("{error:#}")))?;

    Ok(UsageRecord {
        client_address: str_key(path, &location, object, schema::CLIENT_ADDRESS)?,
        client_guid: str_key(path, &location, object, schema::CLIENT_GUID)?,
        request_time,
        service_guid: str_key(path, &location, object, schema::SERVICE_GUID)?,
        retries_request: int_key(path, &location, object, schema::RETRIES_REQUEST)?,
        packets_requested: int_key(path, &location, object, schema::PACKETS_REQUESTED)?,
        packets_serviced: int_key(path, &location, object, schema::PACKETS_SERVICED)?,
        max_hole_size: int_key(path, &location, object, schema::MAX_HOLE_SIZE)?,
    })
}

fn str_key(
    path: &Path,
    location: &str,
    object: &Map<String, Value>,
    name: &str,
) -> Result<String, SourceError> {
    match object.get(name) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(SourceError::malformed(
            path,
            location,
            format!("key `{name}` is not a string"),
        )),
        None => Err(SourceError::malformed(
            path,
            location,
            format!("missing key `{name}`"),
        )),
    }
}

fn int_key(
    path: &Path,
    location: &str,
    object: &Map<String, Value>,
    name: &str,
) -> Result<u64, SourceError> {
    match object.get(name) {
        Some(Value::Number(number)) => number.as_u64().ok_or_else(|| {
            SourceError::malformed(
                path,
                location,
                format!("key `{name}` is not a non-negative integer: {number}"),
            )
        }),
        Some(_) => Err(SourceError::malformed(
            path,
            location,
            format!("key `{name}` is not a number"),
        )),
        None => Err(SourceError::malformed(
            path,
            location,
            format!("missing key `{name}`"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::format_request_time;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_source(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp json");
        file.write_all(contents.as_bytes())
            .expect("write temp json");
        file
    }

    #[test]
    fn parses_epoch_millis_into_canonical_instant() {
        let file = write_source(
            r#"[{
                "client-address": "10.0.0.1",
                "client-guid": "aaa",
                "request-time": 1704099600000,
                "service-guid": "svc-1",
                "retries-request": 0,
                "packets-requested": 10,
                "packets-serviced": 5,
                "max-hole-size": 2
            }]"#,
        );
        let records = JsonSource::new(file.path())
            .parse(MalformedPolicy::Abort)
            .expect("json should parse");

        assert_eq!(records.len(), 1);
        assert_eq!(
            format_request_time(&records[0].request_time),
            "2024-01-01 09:00:00 UTC"
        );
    }

    #[test]
    fn drops_unserviced_records() {
        let file = write_source(
            r#"[
                {"client-address": "a", "client-guid": "g1", "request-time": 1704106800000,
                 "service-guid": "svc-1", "retries-request": 0, "packets-requested": 4,
                 "packets-serviced": 0, "max-hole-size": 0},
                {"client-address": "b", "client-guid": "g2", "request-time": 1704106800000,
                 "service-guid": "svc-2", "retries-request": 0, "packets-requested": 4,
                 "packets-serviced": 4, "max-hole-size": 0}
            ]"#,
        );
        let records = JsonSource::new(file.path())
            .parse(MalformedPolicy::Abort)
            .expect("json should parse");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].service_guid, "svc-2");
    }

    #[test]
    fn missing_key_is_malformed() {
        let file = write_source(
            r#"[{"client-address": "a", "client-guid": "g1", "request-time": 1704106800000,
                 "service-guid": "svc-1", "retries-request": 0, "packets-requested": 4,
                 "packets-serviced": 4}]"#,
        );
        let err = JsonSource::new(file.path())
            .parse(MalformedPolicy::Abort)
            .expect_err("missing max-hole-size key should fail");
        assert!(
            err.to_string().contains("max-hole-size"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn non_integer_number_is_malformed() {
        let file = write_source(
            r#"[{"client-address": "a", "client-guid": "g1", "request-time": 1704106800000,
                 "service-guid": "svc-1", "retries-request": 0.5, "packets-requested": 4,
                 "packets-serviced": 4, "max-hole-size": 0}]"#,
        );
        let err = JsonSource::new(file.path())
            .parse(MalformedPolicy::Abort)
            .expect_err("fractional retries-request should fail");
        assert!(
            err.to_string().contains("retries-request"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn oversized_epoch_millis_is_malformed() {
        let file = write_source(
            r#"[{"client-address": "a", "client-guid": "g1", "request-time": 18446744073709550616,
                 "service-guid": "svc-1", "retries-request": 0, "packets-requested": 4,
                 "packets-serviced": 4, "max-hole-size": 0}]"#,
        );
        let err = JsonSource::new(file.path())
            .parse(MalformedPolicy::Abort)
            .expect_err("epoch millis beyond i64 range should fail");
        assert!(
            err.to_string().contains("request-time"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn non_array_root_fails_even_under_skip() {
        let file = write_source(r#"{"not": "an array"}"#);
        let err = JsonSource::new(file.path())
            .parse(MalformedPolicy::Skip)
            .expect_err("non-array root should fail");
        assert!(
            err.to_string().contains("root is not an array"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = JsonSource::new("/definitely/not/here/reports.json")
            .parse(MalformedPolicy::Abort)
            .expect_err("missing file should fail");
        assert!(err.is_unavailable(), "unexpected error: {err}");
    }
}
