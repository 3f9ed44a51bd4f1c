//! Health measurement domain models.
//!
//! Blood pressure is held as two numbers and only rendered as the composed
//! `"systolic/diastolic"` string when crossing the wire. Writes are strict;
//! stored entries may carry free text from older clients and are read as-is.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Server-assigned identifier of a health entry.
pub type EntryId = i64;

/// Blood pressure reading in mmHg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

/// Failure to parse a composed blood pressure string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("blood pressure must look like \"120/80\", got {0:?}")]
pub struct ParseBloodPressureError(pub String);

impl BloodPressure {
    pub fn new(systolic: u16, diastolic: u16) -> Self {
        Self {
            systolic,
            diastolic,
        }
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// Accepts `sys/dia` in canonical decimal form (whitespace around each
/// number is ignored). Signs and leading zeros are rejected so that a parsed
/// reading renders back to the same numbers it was typed with.
impl FromStr for BloodPressure {
    type Err = ParseBloodPressureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseBloodPressureError(s.to_string());
        let (sys, dia) = s.split_once('/').ok_or_else(err)?;
        let systolic = parse_reading(sys).ok_or_else(err)?;
        let diastolic = parse_reading(dia).ok_or_else(err)?;
        Ok(Self::new(systolic, diastolic))
    }
}

fn parse_reading(raw: &str) -> Option<u16> {
    let digits = raw.trim();
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if !canonical {
        return None;
    }
    digits.parse().ok()
}

impl TryFrom<String> for BloodPressure {
    type Error = ParseBloodPressureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BloodPressure> for String {
    fn from(bp: BloodPressure) -> Self {
        bp.to_string()
    }
}

/// Blood pressure as stored by the server.
///
/// Readings in `sys/dia` form are parsed; anything else is kept verbatim so
/// that one legacy entry cannot make the whole list unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoredBloodPressure {
    Parsed(BloodPressure),
    Raw(String),
}

impl StoredBloodPressure {
    pub fn parsed(&self) -> Option<BloodPressure> {
        match self {
            StoredBloodPressure::Parsed(bp) => Some(*bp),
            StoredBloodPressure::Raw(_) => None,
        }
    }
}

impl From<BloodPressure> for StoredBloodPressure {
    fn from(bp: BloodPressure) -> Self {
        StoredBloodPressure::Parsed(bp)
    }
}

impl From<String> for StoredBloodPressure {
    fn from(raw: String) -> Self {
        match raw.parse() {
            Ok(bp) => StoredBloodPressure::Parsed(bp),
            Err(_) => StoredBloodPressure::Raw(raw),
        }
    }
}

impl From<StoredBloodPressure> for String {
    fn from(bp: StoredBloodPressure) -> Self {
        bp.to_string()
    }
}

impl fmt::Display for StoredBloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredBloodPressure::Parsed(bp) => bp.fmt(f),
            StoredBloodPressure::Raw(raw) => f.write_str(raw),
        }
    }
}

/// The three measured values submitted for an entry.
///
/// Serializes as the `POST`/`PUT /healthdata` body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub weight: f64,
    #[serde(rename = "bp")]
    pub blood_pressure: BloodPressure,
    pub glucose: f64,
}

/// A stored health entry as returned by `GET /healthdata/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    pub id: EntryId,
    pub weight: f64,
    #[serde(rename = "bp")]
    pub blood_pressure: StoredBloodPressure,
    pub glucose: f64,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HealthEntry {
    /// The stored values as submittable metrics; `None` when the blood
    /// pressure is free text.
    pub fn metrics(&self) -> Option<Metrics> {
        Some(Metrics {
            weight: self.weight,
            blood_pressure: self.blood_pressure.parsed()?,
            glucose: self.glucose,
        })
    }
}

/// Accepts RFC 3339 timestamps and offset-less ones (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

/// Body returned by a create or update call.
///
/// Backends answer either with the stored entry or with an acknowledgement
/// carrying the new id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MutationResponse {
    Entry(HealthEntry),
    Ack {
        data_id: EntryId,
        #[serde(default)]
        message: Option<String>,
    },
    Other(serde_json::Value),
}

impl MutationResponse {
    /// Id of the affected entry, if the server reported one.
    pub fn entry_id(&self) -> Option<EntryId> {
        match self {
            MutationResponse::Entry(entry) => Some(entry.id),
            MutationResponse::Ack { data_id, .. } => Some(*data_id),
            MutationResponse::Other(_) => None,
        }
    }
}

/// AI-generated narrative derived from the account's stored entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "insights", default)]
    pub text: String,
}
