//! Fixed GLM L2 LCFA schema: record families, their sizing dimensions and
//! the typed columns each family decodes.
//!
//! Variable names follow the GOES-R Product Definition and Users' Guide
//! (PUG) Vol. 5 for the GLM L2+ Lightning Cluster-Filter Algorithm files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dimension sizing the event family.
pub const NUMBER_OF_EVENTS: &str = "number_of_events";
/// Dimension sizing the group family.
pub const NUMBER_OF_GROUPS: &str = "number_of_groups";
/// Dimension sizing the flash family.
pub const NUMBER_OF_FLASHES: &str = "number_of_flashes";

/// Auxiliary bounds dimensions. Always length 2 in GLM files.
pub const BOUNDS_DIMENSIONS: [&str; 3] = [
    "number_of_time_bounds",
    "number_of_field_of_view_bounds",
    "number_of_wavelength_bounds",
];

/// Expected extent of every entry in [`BOUNDS_DIMENSIONS`].
pub const BOUNDS_LEN: usize = 2;

/// One of the three nested GLM record families.
///
/// A flash contains groups, a group contains events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Event,
    Group,
    Flash,
}

impl Family {
    /// All families, children first.
    pub const ALL: [Family; 3] = [Family::Event, Family::Group, Family::Flash];

    /// Name of the dimension holding this family's record count.
    pub fn dimension(self) -> &'static str {
        match self {
            Family::Event => NUMBER_OF_EVENTS,
            Family::Group => NUMBER_OF_GROUPS,
            Family::Flash => NUMBER_OF_FLASHES,
        }
    }

    /// Ordered column schema for this family.
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Family::Event => EVENT_COLUMNS,
            Family::Group => GROUP_COLUMNS,
            Family::Flash => FLASH_COLUMNS,
        }
    }

    /// Look up one column of this family by logical name.
    pub fn column(self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|spec| spec.name == name)
    }

    /// The family this one's records point to, if any.
    pub fn parent(self) -> Option<Family> {
        match self {
            Family::Event => Some(Family::Group),
            Family::Group => Some(Family::Flash),
            Family::Flash => None,
        }
    }

    /// Logical name of the foreign-key column referencing the parent.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            Family::Event => Some("parent_group_id"),
            Family::Group => Some("parent_flash_id"),
            Family::Flash => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Event => "event",
            Family::Group => "group",
            Family::Flash => "flash",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "event" | "events" => Ok(Family::Event),
            "group" | "groups" => Ok(Family::Group),
            "flash" | "flashes" => Ok(Family::Flash),
            other => Err(format!(
                "unknown record family '{}' (expected event, group or flash)",
                other
            )),
        }
    }
}

/// Declared in-memory type of a decoded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Record or parent identifier, kept at full width as `i64`.
    Id,
    /// Physical quantity, unpacked to `f64`.
    Float,
    /// Quality flag, decoded to `i32`.
    Flag,
}

impl ColumnKind {
    /// Name of the Rust output type, used in error messages.
    pub fn output_type(self) -> &'static str {
        match self {
            ColumnKind::Id => "i64",
            ColumnKind::Float => "f64",
            ColumnKind::Flag => "i32",
        }
    }
}

/// One typed column of a record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Logical column name (`lat`, `parent_group_id`, ...).
    pub name: &'static str,
    /// Variable name in the file (`event_lat`, ...).
    pub variable: &'static str,
    pub kind: ColumnKind,
    /// Added to the stored integer before scaling, when the variable is
    /// packed. Zero for all but the event and group time offsets.
    pub raw_bias: i64,
}

/// Stored event and group time offsets count up from -65536.
pub const TIME_OFFSET_BIAS: i64 = 65536;

const fn col(name: &'static str, variable: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        name,
        variable,
        kind,
        raw_bias: 0,
    }
}

const fn biased(name: &'static str, variable: &'static str, bias: i64) -> ColumnSpec {
    ColumnSpec {
        name,
        variable,
        kind: ColumnKind::Float,
        raw_bias: bias,
    }
}

const EVENT_COLUMNS: &[ColumnSpec] = &[
    col("id", "event_id", ColumnKind::Id),
    biased("time_offset", "event_time_offset", TIME_OFFSET_BIAS),
    col("lat", "event_lat", ColumnKind::Float),
    col("lon", "event_lon", ColumnKind::Float),
    col("energy", "event_energy", ColumnKind::Float),
    col("parent_group_id", "event_parent_group_id", ColumnKind::Id),
];

const GROUP_COLUMNS: &[ColumnSpec] = &[
    col("id", "group_id", ColumnKind::Id),
    biased("time_offset", "group_time_offset", TIME_OFFSET_BIAS),
    col("frame_time_offset", "group_frame_time_offset", ColumnKind::Float),
    col("lat", "group_lat", ColumnKind::Float),
    col("lon", "group_lon", ColumnKind::Float),
    col("area", "group_area", ColumnKind::Float),
    col("energy", "group_energy", ColumnKind::Float),
    col("parent_flash_id", "group_parent_flash_id", ColumnKind::Id),
    col("quality_flag", "group_quality_flag", ColumnKind::Flag),
];

const FLASH_COLUMNS: &[ColumnSpec] = &[
    col("id", "flash_id", ColumnKind::Id),
    col(
        "time_offset_of_first_event",
        "flash_time_offset_of_first_event",
        ColumnKind::Float,
    ),
    col(
        "time_offset_of_last_event",
        "flash_time_offset_of_last_event",
        ColumnKind::Float,
    ),
    col(
        "frame_time_offset_of_first_event",
        "flash_frame_time_offset_of_first_event",
        ColumnKind::Float,
    ),
    col(
        "frame_time_offset_of_last_event",
        "flash_frame_time_offset_of_last_event",
        ColumnKind::Float,
    ),
    col("lat", "flash_lat", ColumnKind::Float),
    col("lon", "flash_lon", ColumnKind::Float),
    col("area", "flash_area", ColumnKind::Float),
    col("energy", "flash_energy", ColumnKind::Float),
    col("quality_flag", "flash_quality_flag", ColumnKind::Flag),
];

/// Ordered on-disk variable names decoded for a family.
pub fn variable_names(family: Family) -> Vec<&'static str> {
    family.columns().iter().map(|spec| spec.variable).collect()
}
