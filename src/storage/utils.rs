//! Column conversion helpers shared by the repositories.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error_handling::DatabaseError;

pub(crate) fn to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn parse_enum<T: FromStr>(column: &'static str, value: &str) -> Result<T, DatabaseError> {
    value.parse::<T>().map_err(|_| DatabaseError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json_opt<T: DeserializeOwned>(
    raw: Option<String>,
) -> Result<Option<T>, DatabaseError> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(Some(serde_json::from_str(&s)?)),
        _ => Ok(None),
    }
}
