//! Decoding of source lines into log records.
//!
//! Source lines are compact JSON objects. The fields `id`, `@l` (severity),
//! `@m` (message) and `@t` (timestamp) are lifted into the record; every other
//! field is carried over unchanged as an attribute.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use logship_proto::{AttributeValue, LogRecord, zero_timestamp};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding the entry id.
pub const ID_KEY: &str = "id";
/// Key holding the severity.
pub const SEVERITY_KEY: &str = "@l";
/// Key holding the rendered message.
pub const MESSAGE_KEY: &str = "@m";
/// Key holding the timestamp.
pub const TIMESTAMP_KEY: &str = "@t";

const TIMESTAMP_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Errors produced while decoding a line.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The line is valid JSON but not an object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Turns one framed line into a [`LogRecord`].
pub trait SourceDecoder: Send + Sync {
    /// Decodes `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is structurally invalid.
    fn decode(&self, data: &[u8]) -> Result<LogRecord, DecodeError>;
}

/// Decoder for compact JSON log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl SourceDecoder for JsonDecoder {
    fn decode(&self, data: &[u8]) -> Result<LogRecord, DecodeError> {
        let mut fields = match serde_json::from_slice::<Value>(data)? {
            Value::Object(map) => map,
            other => return Err(DecodeError::NotAnObject(kind(&other))),
        };

        let id = take_string(&mut fields, ID_KEY);
        let severity = take_string(&mut fields, SEVERITY_KEY);
        let message = take_string(&mut fields, MESSAGE_KEY);
        let timestamp = match fields.remove(TIMESTAMP_KEY) {
            Some(Value::String(raw)) => parse_timestamp(&raw).unwrap_or_else(zero_timestamp),
            _ => zero_timestamp(),
        };

        Ok(LogRecord {
            id,
            message,
            severity,
            timestamp,
            attributes: fields
                .into_iter()
                .map(|(k, v)| (k, AttributeValue::from(v)))
                .collect(),
        })
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a source timestamp, dropping any fractional seconds.
///
/// RFC 3339 values keep their offset. Anything else is cut at the last `.`
/// and read as UTC. Returns `None` when no supported layout matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|| {
            let whole_seconds = raw.rfind('.').map_or(raw, |dot| &raw[..dot]);
            TIMESTAMP_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(whole_seconds, layout).ok())
                .map(|naive| naive.and_utc())
        })
        .map(|ts| ts.with_nanosecond(0).unwrap_or(ts))
}
