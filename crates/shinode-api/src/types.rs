// Wire types for the host API.
//
// Every batch the node sends or receives is a JSON array of
// `{ name, unit, measure }` objects; the handshake response carries the
// polling interval plus the descriptors the host expects to see.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Measure ─────────────────────────────────────────────────────────

/// A measured or desired value: numeric or textual.
///
/// Numbers are kept as [`serde_json::Number`] so they round-trip with the
/// exact representation the sensor produced (`22.5` stays `22.5`, `20`
/// stays `20`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Number(serde_json::Number),
    Text(String),
}

impl Measure {
    /// Build a numeric measure from a float. Returns `None` for NaN and
    /// infinities, which have no JSON representation.
    pub fn from_f64(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(Self::Number)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Measure {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Measure {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Measure {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Measure {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Measure {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// ── Readings ────────────────────────────────────────────────────────

/// A named, unit-labelled value.
///
/// The same shape travels in every direction: sensor results going up,
/// control actions coming back, controller outcomes going up again.
/// Hosts running the embedded firmware protocol name the value field
/// `value`; both spellings are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(alias = "value")]
    pub measure: Measure,
}

impl Reading {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, measure: impl Into<Measure>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            measure: measure.into(),
        }
    }
}

/// Result of reading one sensor.
pub type SensorResult = Reading;
/// A control action requested by the host.
pub type ControllerInput = Reading;
/// Outcome reported by a controller after applying an action.
pub type ControllerResult = Reading;

/// An item that failed inside a batch collected with partial results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub name: String,
    pub unit: String,
    pub error: String,
}

/// One element of a batch posted to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Failed(FailedEntry),
    Measured(Reading),
}

impl ReportEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Failed(f) => &f.name,
            Self::Measured(r) => &r.name,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn measure(&self) -> Option<&Measure> {
        match self {
            Self::Failed(_) => None,
            Self::Measured(r) => Some(&r.measure),
        }
    }
}

impl From<Reading> for ReportEntry {
    fn from(reading: Reading) -> Self {
        Self::Measured(reading)
    }
}

// ── Handshake ───────────────────────────────────────────────────────

/// A `{ name, unit }` pair declared by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub unit: String,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }

    pub fn matches(&self, name: &str, unit: &str) -> bool {
        self.name == name && self.unit == unit
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.unit)
    }
}

/// Handshake response: the host's view of this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Minimum time between sync cycles, in milliseconds. Integral floats
    /// (`1000.0`) are accepted since JavaScript hosts may send them.
    #[serde(deserialize_with = "millis")]
    pub polling_interval: u64,
    #[serde(default)]
    pub sensors: Vec<Descriptor>,
    #[serde(default)]
    pub controls: Vec<Descriptor>,
}

impl HostConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Int(u64),
        Float(f64),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Int(ms) => Ok(ms),
        Millis::Float(ms) if (0.0..=9.0e15).contains(&ms) && ms.fract().abs() < f64::EPSILON => {
            Ok(ms as u64)
        }
        Millis::Float(ms) => Err(serde::de::Error::custom(format!(
            "polling_interval must be a non-negative whole number of milliseconds, got {ms}"
        ))),
    }
}
