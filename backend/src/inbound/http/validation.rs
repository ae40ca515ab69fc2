//! Shared validation helpers for inbound HTTP adapters.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::Error;
use crate::domain::table::TableId;

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }
}

/// Parse an RFC 3339 timestamp, normalising to UTC.
pub(crate) fn parse_rfc3339_timestamp(
    field: FieldName,
    value: &str,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            Error::invalid_request(format!("{} must be an RFC 3339 timestamp", field.0))
                .with_details(json!({
                    "field": field.0,
                    "value": value,
                    "code": "invalid_timestamp",
                }))
        })
}

/// Validate a path-supplied table identifier.
pub(crate) fn parse_table_id(raw: i64) -> Result<TableId, Error> {
    if raw > 0 {
        Ok(raw)
    } else {
        Err(
            Error::invalid_request("table id must be a positive integer").with_details(json!({
                "field": "tableId",
                "value": raw,
                "code": "invalid_table_id",
            })),
        )
    }
}
