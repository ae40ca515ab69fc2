//! Domain-level error payload.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses; the domain only classifies failures into the stable taxonomy
//! below and carries a human-readable message plus optional details.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::middleware::trace::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or misses required fields.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// The referenced table or user does not exist.
    NotFound,
    /// The caller already occupies the table they tried to join.
    AlreadyMember,
    /// The caller tried to leave a table they do not occupy.
    NotMember,
    /// The table is already at capacity.
    TableFull,
    /// The store could not be reached; the whole unit of work was rolled back.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// API error payload returned by every failing operation.
///
/// # Examples
/// ```
/// use parlour_backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("no such table");
/// assert_eq!(err.code, ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct Error {
    /// Stable machine-readable error code.
    #[schema(example = "table_full")]
    pub code: ErrorCode,
    /// Human-readable error message.
    #[schema(example = "table 42 is already at capacity")]
    pub message: String,
    /// Correlation identifier for tracing this error across systems.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(alias = "trace_id")]
    pub trace_id: Option<String>,
    /// Supplementary structured details, e.g. the offending field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Error {
    /// Create a new error, capturing the trace identifier currently in scope
    /// so the payload is correlated automatically.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Attach a trace identifier to the error.
    #[must_use]
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use parlour_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "startTime" }));
    /// assert!(err.details.is_some());
    /// ```
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyMember`].
    pub fn already_member(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyMember, message)
    }

    /// Convenience constructor for [`ErrorCode::NotMember`].
    pub fn not_member(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotMember, message)
    }

    /// Convenience constructor for [`ErrorCode::TableFull`].
    pub fn table_full(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TableFull, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    //! Regression coverage for error construction and serialisation.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
    #[case(Error::unauthorized("no token"), ErrorCode::Unauthorized)]
    #[case(Error::not_found("missing"), ErrorCode::NotFound)]
    #[case(Error::already_member("seated"), ErrorCode::AlreadyMember)]
    #[case(Error::not_member("absent"), ErrorCode::NotMember)]
    #[case(Error::table_full("full"), ErrorCode::TableFull)]
    #[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
    #[case(Error::internal("boom"), ErrorCode::InternalError)]
    fn constructors_set_code(#[case] err: Error, #[case] expected: ErrorCode) {
        assert_eq!(err.code, expected);
    }

    #[rstest]
    fn details_round_trip_through_json() {
        let err = Error::invalid_request("bad")
            .with_trace_id("abc")
            .with_details(json!({ "field": "startTime" }));

        let value = serde_json::to_value(&err).expect("error serialises");
        assert_eq!(value["code"], "invalid_request");
        assert_eq!(value["traceId"], "abc");
        assert_eq!(value["details"]["field"], "startTime");

        let restored: Error = serde_json::from_value(value).expect("error deserialises");
        assert_eq!(restored, err);
    }

    #[rstest]
    fn trace_id_absent_outside_scope() {
        let err = Error::internal("boom");
        assert!(err.trace_id.is_none());
    }
}
