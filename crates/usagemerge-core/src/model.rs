use chrono::{DateTime, Utc};

/// The normalized representation of one usage event, independent of source
/// encoding. Constructed by a source adapter at parse time and read-only from
/// that point on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub client_address: String,
    pub client_guid: String,
    pub request_time: DateTime<Utc>,
    pub service_guid: String,
    pub retries_request: u64,
    pub packets_requested: u64,
    pub packets_serviced: u64,
    pub max_hole_size: u64,
}

impl UsageRecord {
    /// Records that serviced no packets are excluded from reporting.
    pub fn is_serviced(&self) -> bool {
        self.packets_serviced > 0
    }
}
