use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Canonical field names shared by every source encoding and the report
/// header. The input vocabulary and the output header can never drift apart
/// because both are defined here and nowhere else.
pub const CLIENT_ADDRESS: &str = "client-address";
pub const CLIENT_GUID: &str = "client-guid";
pub const REQUEST_TIME: &str = "request-time";
pub const SERVICE_GUID: &str = "service-guid";
pub const RETRIES_REQUEST: &str = "retries-request";
pub const PACKETS_REQUESTED: &str = "packets-requested";
pub const PACKETS_SERVICED: &str = "packets-serviced";
pub const MAX_HOLE_SIZE: &str = "max-hole-size";

/// Report column order, fixed.
pub const REPORT_HEADER: [&str; 8] = [
    CLIENT_ADDRESS,
    CLIENT_GUID,
    REQUEST_TIME,
    SERVICE_GUID,
    RETRIES_REQUEST,
    PACKETS_REQUESTED,
    PACKETS_SERVICED,
    MAX_HOLE_SIZE,
];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses the fixed textual timestamp format `YYYY-MM-DD HH:MM:SS <zone>`.
///
/// The hour field is 24-hour. The trailing zone token must name UTC; other
/// zone abbreviations are rejected rather than silently misread.
pub fn parse_request_time(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    let Some((datetime_part, zone)) = trimmed.rsplit_once(' ') else {
        bail!("timestamp `{trimmed}` is missing a zone token");
    };

    match zone {
        "UTC" | "GMT" | "Z" => {}
        other => bail!("unsupported zone `{other}` in timestamp `{trimmed}`"),
    }

    let naive = NaiveDateTime::parse_from_str(datetime_part, DATETIME_FORMAT)
        .with_context(|| format!("timestamp `{trimmed}` does not match `{DATETIME_FORMAT}`"))?;
    Ok(naive.and_utc())
}

/// Converts an epoch-milliseconds value (structured-object encoding) into the
/// canonical instant.
pub fn request_time_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .with_context(|| format!("epoch milliseconds {millis} out of range"))
}

pub fn format_request_time(time: &DateTime<Utc>) -> String {
    format!("{} UTC", time.format(DATETIME_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_utc_zone_tokens() {
        for raw in [
            "2024-01-01 09:00:00 UTC",
            "2024-01-01 09:00:00 GMT",
            "2024-01-01 09:00:00 Z",
            "  2024-01-01 09:00:00 UTC  ",
        ] {
            let parsed = parse_request_time(raw).expect("timestamp should parse");
            assert_eq!(format_request_time(&parsed), "2024-01-01 09:00:00 UTC");
        }
    }

    #[test]
    fn parse_handles_afternoon_hours() {
        let parsed = parse_request_time("2024-01-01 16:30:00 UTC").expect("timestamp should parse");
        assert_eq!(format_request_time(&parsed), "2024-01-01 16:30:00 UTC");
    }

    #[test]
    fn parse_rejects_unknown_zone() {
        let err = parse_request_time("2024-01-01 09:00:00 EST")
            .expect_err("non-UTC zone should be rejected");
        assert!(
            err.to_string().contains("unsupported zone"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn parse_rejects_missing_zone_and_garbage() {
        assert!(parse_request_time("2024-01-01T09:00:00Z").is_err());
        assert!(parse_request_time("not-a-timestamp UTC").is_err());
        assert!(parse_request_time("").is_err());
    }

    #[test]
    fn millis_round_trip_matches_string_form() {
        let from_millis =
            request_time_from_millis(1_704_099_600_000).expect("millis should convert");
        let from_string =
            parse_request_time("2024-01-01 09:00:00 UTC").expect("timestamp should parse");
        assert_eq!(from_millis, from_string);
        assert_eq!(format_request_time(&from_millis), "2024-01-01 09:00:00 UTC");
    }

    #[test]
    fn header_lists_all_eight_fields_in_fixed_order() {
        assert_eq!(
            REPORT_HEADER,
            [
                "client-address",
                "client-guid",
                "request-time",
                "service-guid",
                "retries-request",
                "packets-requested",
                "packets-serviced",
                "max-hole-size",
            ]
        );
    }
}
