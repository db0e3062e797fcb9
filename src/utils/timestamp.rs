use time::OffsetDateTime;
use time::macros::format_description;

/// UTC timestamp in `YYYYMMDD_HHMMSS` form, used in room and transfer names
pub fn compact_timestamp() -> String {
    compact_timestamp_at(OffsetDateTime::now_utc())
}

pub fn compact_timestamp_at(at: OffsetDateTime) -> String {
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    at.format(&format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Current UTC time as RFC 3339, for JSON payloads
pub fn rfc3339_now() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
