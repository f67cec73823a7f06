//! Normalization of the per-item resource limits.
//!
//! FPS expresses limits with a unit attribute whose interpretation changed
//! across schema revisions. Whatever the source says, the importer always
//! produces milliseconds and megabytes.

use crate::error::ImportError;
use crate::fps::xml::Element;

/// FPS schema revisions that change how limit units are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchemaVersion {
    /// The `1.1` sentinel: integer limits, lenient time units, memory
    /// always megabytes.
    Legacy,
    /// Every other (or absent) version attribute, unknown future revisions
    /// included: fractional limits, strict units.
    Current,
}

impl SchemaVersion {
    pub fn from_attr(version: Option<&str>) -> SchemaVersion {
        match version {
            Some("1.1") => SchemaVersion::Legacy,
            _ => SchemaVersion::Current,
        }
    }
}

/// Recognized time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    fn parse(unit: &str) -> Option<TimeUnit> {
        match unit {
            "ms" => Some(TimeUnit::Milliseconds),
            "s" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }

    /// Factor converting a value in this unit to milliseconds.
    fn millis_factor(self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1000,
        }
    }
}

/// The unit attribute of a limit element, trimmed and lowercased.
fn unit_of(node: &Element) -> String {
    node.attr("unit").unwrap_or("").trim().to_ascii_lowercase()
}

fn missing(field: &'static str) -> ImportError {
    ImportError::InvalidLimit {
        field,
        value: "<missing>".into(),
    }
}

fn bad_value(field: &'static str, raw: &str) -> ImportError {
    ImportError::InvalidLimit {
        field,
        value: raw.to_string(),
    }
}

/// Extract the time limit of `item`, normalized to milliseconds.
///
/// Legacy documents carry integer values and fall back to seconds when the
/// unit is missing or unknown; current documents carry fractional values and
/// an unknown unit is fatal.
pub(crate) fn time_limit(item: &Element, version: SchemaVersion) -> Result<u64, ImportError> {
    const FIELD: &str = "time limit";
    let node = item.child("time_limit").ok_or_else(|| missing(FIELD))?;
    let unit = unit_of(node);
    let text = node.text_content();
    let raw = text.trim();
    match version {
        SchemaVersion::Legacy => {
            let time_unit = TimeUnit::parse(&unit).unwrap_or(TimeUnit::Seconds);
            let value: u64 = raw.parse().map_err(|_| bad_value(FIELD, raw))?;
            Ok(value * time_unit.millis_factor())
        }
        SchemaVersion::Current => {
            let time_unit = TimeUnit::parse(&unit).ok_or_else(|| ImportError::InvalidUnit {
                field: FIELD,
                unit: unit.clone(),
            })?;
            let value: f64 = raw.parse().map_err(|_| bad_value(FIELD, raw))?;
            Ok((value * time_unit.millis_factor() as f64) as u64)
        }
    }
}

/// Extract the memory limit of `item`, normalized to megabytes.
///
/// Legacy documents carry an integer megabyte count. Current documents
/// default to megabytes, accept `kb`, ceil fractional values, and any other
/// unit is fatal.
pub(crate) fn memory_limit(item: &Element, version: SchemaVersion) -> Result<u64, ImportError> {
    const FIELD: &str = "memory limit";
    let node = item.child("memory_limit").ok_or_else(|| missing(FIELD))?;
    let unit = unit_of(node);
    let text = node.text_content();
    let raw = text.trim();
    match version {
        SchemaVersion::Legacy => raw.parse().map_err(|_| bad_value(FIELD, raw)),
        SchemaVersion::Current => {
            let value: f64 = raw.parse().map_err(|_| bad_value(FIELD, raw))?;
            match unit.as_str() {
                "" | "mb" => Ok(value.ceil() as u64),
                "kb" => Ok((value / 1024.0).ceil() as u64),
                _ => Err(ImportError::InvalidUnit { field: FIELD, unit }),
            }
        }
    }
}
