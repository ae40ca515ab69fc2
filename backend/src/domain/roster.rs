//! Roster codec: the single typed decode step at the store boundary.
//!
//! The persisted participant list has existed in three shapes: absent, a
//! JSON string containing a list, and a JSON list. `decode` accepts all of
//! them and yields a well-typed roster so nothing downstream ever touches
//! the raw column. Malformed input decodes to an empty roster and is logged;
//! decoding never fails.

use serde_json::Value;
use tracing::warn;

use crate::domain::user::UserId;

/// Decode the persisted roster representation into an ordered id sequence.
///
/// Entries that are not positive integers are dropped (with a warning), and
/// duplicates are kept in first-seen order only, preserving the roster's
/// uniqueness invariant against historical bad writes.
///
/// # Examples
/// ```
/// use parlour_backend::domain::roster;
/// use serde_json::json;
///
/// let roster = roster::decode(Some(&json!([7, 3, 9])));
/// assert_eq!(roster.len(), 3);
/// assert!(roster::decode(None).is_empty());
/// assert!(roster::decode(Some(&json!("not json"))).is_empty());
/// ```
#[must_use]
pub fn decode(raw: Option<&Value>) -> Vec<UserId> {
    let Some(value) = raw else {
        return Vec::new();
    };

    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => decode_items(items),
        // Legacy rows carry the list serialised inside a JSON string.
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => decode_items(&items),
            Ok(other) => {
                warn!(kind = %json_kind(&other), "roster string did not contain a list");
                Vec::new()
            }
            Err(error) => {
                warn!(%error, "roster string is not valid JSON");
                Vec::new()
            }
        },
        other => {
            warn!(kind = %json_kind(other), "unexpected roster representation");
            Vec::new()
        }
    }
}

/// Encode a roster for persistence.
///
/// The empty roster encodes to an explicit empty list, never to NULL, so
/// "zero participants" stays distinguishable from "field never set".
#[must_use]
pub fn encode(participants: &[UserId]) -> Value {
    Value::Array(
        participants
            .iter()
            .map(|id| Value::from(id.get()))
            .collect(),
    )
}

fn decode_items(items: &[Value]) -> Vec<UserId> {
    let mut roster = Vec::with_capacity(items.len());
    for item in items {
        let id = match item {
            Value::Number(n) => n.as_i64(),
            // Some historical writers stored ids as strings.
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match id.map(UserId::new) {
            Some(Ok(user)) if !roster.contains(&user) => roster.push(user),
            Some(Ok(_)) => warn!(entry = %item, "duplicate roster entry dropped"),
            _ => warn!(entry = %item, "invalid roster entry dropped"),
        }
    }
    roster
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
