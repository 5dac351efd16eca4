use crate::error::{SourceError, SourceResult};
use crate::model::UsageRecord;
use crate::schema;
use crate::source::{admit_record, read_source, MalformedPolicy, RecordSource};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const RECORD_TAG: &[u8] = b"report";

/// Hierarchical-markup adapter. Every `<report>` element anywhere in the
/// document yields one record; each canonical field is a child element whose
/// tag equals the field name.
pub struct XmlSource {
    path: PathBuf,
}

impl XmlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for XmlSource {
    fn describe(&self) -> String {
        format!("xml:{}", self.path.display())
    }

    fn parse(&self, policy: MalformedPolicy) -> SourceResult<Vec<UsageRecord>> {
        let content = read_source(&self.path)?;
        let mut reader = Reader::from_reader(content.as_bytes());
        reader.config_mut().trim_text(true);

        let mut records = Vec::new();
        let mut report_index = 0usize;
        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) if start.name().as_ref() == RECORD_TAG => {
                    report_index += 1;
                    let outcome = record_from_report(&self.path, report_index, &mut reader);
                    admit_record(outcome, policy, &mut records)?;
                }
                // A self-closing <report/> has no child elements at all.
                Ok(Event::Empty(start)) if start.name().as_ref() == RECORD_TAG => {
                    report_index += 1;
                    let outcome = Err(SourceError::malformed(
                        &self.path,
                        format!("report {report_index}"),
                        format!("missing element `{}`", schema::REQUEST_TIME),
                    ));
                    admit_record(outcome, policy, &mut records)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(error) => {
                    return Err(SourceError::malformed(
                        &self.path,
                        format!("offset {}", reader.buffer_position()),
                        error.to_string(),
                    ))
                }
            }
        }

        Ok(records)
    }
}

fn record_from_report(
    path: &Path,
    report_index: usize,
    reader: &mut Reader<&[u8]>,
) -> Result<UsageRecord, SourceError> {
    let location = format!("report {report_index}");
    let mut fields = HashMap::<String, String>::new();
    let mut current_tag: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|error| SourceError::malformed(path, &location, error.to_string()))?;
        match event {
            Event::Start(start) => {
                current_tag = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
            }
            Event::Text(text) => {
                if let Some(tag) = current_tag.as_ref() {
                    let value = text
                        .unescape()
                        .map_err(|error| SourceError::malformed(path, &location, error.to_string()))?
                        .into_owned();
                    fields.insert(tag.clone(), value);
                }
            }
            Event::CData(data) => {
                if let Some(tag) = current_tag.as_ref() {
                    fields.insert(tag.clone(), String::from_utf8_lossy(&data).into_owned());
                }
            }
            Event::End(end) => {
                if end.name().as_ref() == RECORD_TAG {
                    break;
                }
                current_tag = None;
            }
            Event::Eof => {
                return Err(SourceError::malformed(
                    path,
                    &location,
                    "unterminated <report> element",
                ))
            }
            _ => {}
        }
    }

    let raw_time = take_field(path, &location, &mut fields, schema::REQUEST_TIME)?;
    let request_time = schema::parse_request_time(&raw_time)
        .map_err(|error| SourceError::malformed(path, &location, format!("{error:#}")))?;

    Ok(UsageRecord {
        client_address: take_field(path, &location, &mut fields, schema::CLIENT_ADDRESS)?,
        client_guid: take_field(path, &location, &mut fields, schema::CLIENT_GUID)?,
        request_time,
        service_guid: take_field(path, &location, &mut fields, schema::SERVICE_GUID)?,
        retries_request: int_field(path, &location, &mut fields, schema::RETRIES_REQUEST)?,
        packets_requested: int_field(path, &location, &mut fields, schema::PACKETS_REQUESTED)?,
        packets_serviced: int_field(path, &location, &mut fields, schema::PACKETS_SERVICED)?,
        max_hole_size: int_field(path, &location, &mut fields, schema::MAX_HOLE_SIZE)?,
    })
}

fn take_field(
    path: &Path,
    location: &str,
    fields: &mut HashMap<String, String>,
    name: &str,
) -> Result<String, SourceError> {
    fields.remove(name).ok_or_else(|| {
        SourceError::malformed(path, location, format!("missing element `{name}`"))
    })
}

fn int_field(
    path: &Path,
    location: &str,
    fields: &mut HashMap<String, String>,
    name: &str,
) -> Result<u64, SourceError> {
    let raw = take_field(path, location, fields, name)?;
    raw.trim().parse::<u64>().map_err(|_| {
        SourceError::malformed(
            path,
            location,
            format!("element `{name}` is not a non-negative integer: `{raw}`"),
        )
    })
}
