//! Global scalars of a GLM file: small variables (counts, thresholds,
//! field-of-view bounds, satellite position) and global text attributes.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::error::GlmResult;

/// Shape of a known scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    /// Two-element bounds variable.
    Bounds,
    Text,
}

/// Where a scalar lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarSource {
    Variable,
    GlobalAttribute,
}

/// A scalar the reader knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSpec {
    pub name: &'static str,
    pub kind: ScalarKind,
    pub source: ScalarSource,
}

const fn var(name: &'static str, kind: ScalarKind) -> ScalarSpec {
    ScalarSpec {
        name,
        kind,
        source: ScalarSource::Variable,
    }
}

const fn global(name: &'static str) -> ScalarSpec {
    ScalarSpec {
        name,
        kind: ScalarKind::Text,
        source: ScalarSource::GlobalAttribute,
    }
}

/// Every scalar read by [`crate::GlmFile::scalars`].
pub const KNOWN_SCALARS: &[ScalarSpec] = &[
    var("product_time", ScalarKind::Float),
    var("product_time_bounds", ScalarKind::Bounds),
    var("lightning_wavelength", ScalarKind::Float),
    var("lightning_wavelength_bounds", ScalarKind::Bounds),
    var("group_time_threshold", ScalarKind::Float),
    var("flash_time_threshold", ScalarKind::Float),
    var("lat_field_of_view", ScalarKind::Float),
    var("lat_field_of_view_bounds", ScalarKind::Bounds),
    var("lon_field_of_view", ScalarKind::Float),
    var("lon_field_of_view_bounds", ScalarKind::Bounds),
    var("goes_lat_lon_projection", ScalarKind::Int),
    var("event_count", ScalarKind::Int),
    var("group_count", ScalarKind::Int),
    var("flash_count", ScalarKind::Int),
    var("percent_navigated_L1b_events", ScalarKind::Float),
    var("yaw_flip_flag", ScalarKind::Int),
    var("nominal_satellite_subpoint_lat", ScalarKind::Float),
    var("nominal_satellite_subpoint_lon", ScalarKind::Float),
    var("nominal_satellite_height", ScalarKind::Float),
    var("percent_uncorrectable_L0_errors", ScalarKind::Float),
    var("algorithm_dynamic_input_data_container", ScalarKind::Int),
    var("processing_parm_version_container", ScalarKind::Int),
    var("algorithm_product_version_container", ScalarKind::Int),
    global("title"),
    global("summary"),
    global("platform_ID"),
    global("instrument_ID"),
    global("orbital_slot"),
    global("dataset_name"),
    global("time_coverage_start"),
    global("time_coverage_end"),
];

/// A decoded scalar value.
///
/// Floats compare by bit pattern so defaulted NaNs are equal to each other.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Floats(Vec<f64>),
    Text(String),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a == b,
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ScalarValue::Floats(a), ScalarValue::Floats(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ScalarValue::Text(a), ScalarValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl ScalarValue {
    /// Value reported for a known scalar missing from the file.
    ///
    /// Floats default to NaN, bounds to `[NaN, NaN]`, integers to 0 and
    /// text to the empty string.
    pub fn default_for(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Int => ScalarValue::Int(0),
            ScalarKind::Float => ScalarValue::Float(f64::NAN),
            ScalarKind::Bounds => ScalarValue::Floats(vec![f64::NAN, f64::NAN]),
            ScalarKind::Text => ScalarValue::Text(String::new()),
        }
    }
}

/// Immutable name → value map of file-global scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarSet {
    values: BTreeMap<String, ScalarValue>,
    defaulted: Vec<String>,
}

impl ScalarSet {
    /// Build the set by asking `lookup` for every known scalar.
    ///
    /// `lookup` returns `Ok(None)` for a scalar absent from the file; those
    /// get [`ScalarValue::default_for`] and are listed in `defaulted()`.
    pub fn collect<F>(mut lookup: F) -> GlmResult<Self>
    where
        F: FnMut(&ScalarSpec) -> GlmResult<Option<ScalarValue>>,
    {
        let mut values = BTreeMap::new();
        let mut defaulted = Vec::new();
        for spec in KNOWN_SCALARS {
            let value = match lookup(spec)? {
                Some(value) => value,
                None => {
                    defaulted.push(spec.name.to_string());
                    ScalarValue::default_for(spec.kind)
                }
            };
            values.insert(spec.name.to_string(), value);
        }
        Ok(Self { values, defaulted })
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.values.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ScalarValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        match self.values.get(name)? {
            ScalarValue::Floats(v) if v.len() == 2 => Some((v[0], v[1])),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ScalarValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Names of known scalars that were missing and got a default.
    pub fn defaulted(&self) -> &[String] {
        &self.defaulted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `product_time` as a UTC timestamp.
    pub fn product_time_utc(&self) -> Option<DateTime<Utc>> {
        j2000_to_utc(self.float("product_time")?)
    }

    /// Absolute time of a record `time_offset`, which is relative to
    /// `product_time`.
    pub fn offset_to_utc(&self, offset_seconds: f64) -> Option<DateTime<Utc>> {
        j2000_to_utc(self.float("product_time")? + offset_seconds)
    }
}

/// Convert seconds since the J2000 epoch (2000-01-01T12:00:00Z) to UTC.
///
/// Returns `None` for non-finite input.
pub fn j2000_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).single()?;
    let micros = (seconds * 1_000_000.0).round() as i64;
    j2000.checked_add_signed(Duration::microseconds(micros))
}
