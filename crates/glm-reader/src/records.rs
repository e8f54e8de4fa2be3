//! Struct-major views of the three record families.

use std::path::Path;

use serde::Serialize;

use crate::column::{Columns, Value};
use crate::error::{GlmError, GlmResult};
use crate::schema::Family;

/// A decoded record of one family.
pub trait Record: Sized {
    const FAMILY: Family;

    /// Build one record per row of `columns`.
    fn from_columns(path: &Path, columns: &Columns) -> GlmResult<Vec<Self>>;

    /// Value of a column by logical name.
    fn value(&self, column: &str) -> Option<Value>;

    fn id(&self) -> i64;
}

/// A record that points at a parent record through its id.
pub trait ChildRecord: Record {
    type Parent: Record;

    fn parent_id(&self) -> i64;
}

/// A single optical pulse detected by one GLM pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: i64,
    /// Seconds relative to `product_time`.
    pub time_offset: f64,
    pub lat: f64,
    pub lon: f64,
    /// Radiant energy in joules.
    pub energy: f64,
    pub parent_group_id: i64,
}

/// Events in adjacent pixels within one integration frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub time_offset: f64,
    pub frame_time_offset: f64,
    pub lat: f64,
    pub lon: f64,
    /// Footprint in square meters.
    pub area: f64,
    pub energy: f64,
    pub parent_flash_id: i64,
    pub quality_flag: i32,
}

/// Groups clustered in space and time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlashRecord {
    pub id: i64,
    pub time_offset_of_first_event: f64,
    pub time_offset_of_last_event: f64,
    pub frame_time_offset_of_first_event: f64,
    pub frame_time_offset_of_last_event: f64,
    pub lat: f64,
    pub lon: f64,
    pub area: f64,
    pub energy: f64,
    pub quality_flag: i32,
}

fn ids<'a>(path: &Path, columns: &'a Columns, name: &str) -> GlmResult<&'a [i64]> {
    columns
        .ids(name)
        .ok_or_else(|| missing(path, columns.family(), name))
}

fn floats<'a>(path: &Path, columns: &'a Columns, name: &str) -> GlmResult<&'a [f64]> {
    columns
        .floats(name)
        .ok_or_else(|| missing(path, columns.family(), name))
}

fn flags<'a>(path: &Path, columns: &'a Columns, name: &str) -> GlmResult<&'a [i32]> {
    columns
        .flags(name)
        .ok_or_else(|| missing(path, columns.family(), name))
}

fn missing(path: &Path, family: Family, name: &str) -> GlmError {
    GlmError::format(
        path,
        format!("{} columns", family),
        format!("a '{}' column", name),
    )
}

fn check_family(path: &Path, columns: &Columns, expected: Family) -> GlmResult<()> {
    if columns.family() != expected {
        return Err(GlmError::format(
            path,
            format!("{} columns", columns.family()),
            format!("{} columns", expected),
        ));
    }
    Ok(())
}

impl Record for EventRecord {
    const FAMILY: Family = Family::Event;

    fn from_columns(path: &Path, columns: &Columns) -> GlmResult<Vec<Self>> {
        check_family(path, columns, Self::FAMILY)?;
        let id = ids(path, columns, "id")?;
        let time_offset = floats(path, columns, "time_offset")?;
        let lat = floats(path, columns, "lat")?;
        let lon = floats(path, columns, "lon")?;
        let energy = floats(path, columns, "energy")?;
        let parent_group_id = ids(path, columns, "parent_group_id")?;

        Ok((0..columns.len())
            .map(|i| EventRecord {
                id: id[i],
                time_offset: time_offset[i],
                lat: lat[i],
                lon: lon[i],
                energy: energy[i],
                parent_group_id: parent_group_id[i],
            })
            .collect())
    }

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "id" => Value::Id(self.id),
            "time_offset" => Value::Float(self.time_offset),
            "lat" => Value::Float(self.lat),
            "lon" => Value::Float(self.lon),
            "energy" => Value::Float(self.energy),
            "parent_group_id" => Value::Id(self.parent_group_id),
            _ => return None,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl ChildRecord for EventRecord {
    type Parent = GroupRecord;

    fn parent_id(&self) -> i64 {
        self.parent_group_id
    }
}

impl Record for GroupRecord {
    const FAMILY: Family = Family::Group;

    fn from_columns(path: &Path, columns: &Columns) -> GlmResult<Vec<Self>> {
        check_family(path, columns, Self::FAMILY)?;
        let id = ids(path, columns, "id")?;
        let time_offset = floats(path, columns, "time_offset")?;
        let frame_time_offset = floats(path, columns, "frame_time_offset")?;
        let lat = floats(path, columns, "lat")?;
        let lon = floats(path, columns, "lon")?;
        let area = floats(path, columns, "area")?;
        let energy = floats(path, columns, "energy")?;
        let parent_flash_id = ids(path, columns, "parent_flash_id")?;
        let quality_flag = flags(path, columns, "quality_flag")?;

        Ok((0..columns.len())
            .map(|i| GroupRecord {
                id: id[i],
                time_offset: time_offset[i],
                frame_time_offset: frame_time_offset[i],
                lat: lat[i],
                lon: lon[i],
                area: area[i],
                energy: energy[i],
                parent_flash_id: parent_flash_id[i],
                quality_flag: quality_flag[i],
            })
            .collect())
    }

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "id" => Value::Id(self.id),
            "time_offset" => Value::Float(self.time_offset),
            "frame_time_offset" => Value::Float(self.frame_time_offset),
            "lat" => Value::Float(self.lat),
            "lon" => Value::Float(self.lon),
            "area" => Value::Float(self.area),
            "energy" => Value::Float(self.energy),
            "parent_flash_id" => Value::Id(self.parent_flash_id),
            "quality_flag" => Value::Flag(self.quality_flag),
            _ => return None,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl ChildRecord for GroupRecord {
    type Parent = FlashRecord;

    fn parent_id(&self) -> i64 {
        self.parent_flash_id
    }
}

impl Record for FlashRecord {
    const FAMILY: Family = Family::Flash;

    fn from_columns(path: &Path, columns: &Columns) -> GlmResult<Vec<Self>> {
        check_family(path, columns, Self::FAMILY)?;
        let id = ids(path, columns, "id")?;
        let first = floats(path, columns, "time_offset_of_first_event")?;
        let last = floats(path, columns, "time_offset_of_last_event")?;
        let frame_first = floats(path, columns, "frame_time_offset_of_first_event")?;
        let frame_last = floats(path, columns, "frame_time_offset_of_last_event")?;
        let lat = floats(path, columns, "lat")?;
        let lon = floats(path, columns, "lon")?;
        let area = floats(path, columns, "area")?;
        let energy = floats(path, columns, "energy")?;
        let quality_flag = flags(path, columns, "quality_flag")?;

        Ok((0..columns.len())
            .map(|i| FlashRecord {
                id: id[i],
                time_offset_of_first_event: first[i],
                time_offset_of_last_event: last[i],
                frame_time_offset_of_first_event: frame_first[i],
                frame_time_offset_of_last_event: frame_last[i],
                lat: lat[i],
                lon: lon[i],
                area: area[i],
                energy: energy[i],
                quality_flag: quality_flag[i],
            })
            .collect())
    }

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "id" => Value::Id(self.id),
            "time_offset_of_first_event" => Value::Float(self.time_offset_of_first_event),
            "time_offset_of_last_event" => Value::Float(self.time_offset_of_last_event),
            "frame_time_offset_of_first_event" => {
                Value::Float(self.frame_time_offset_of_first_event)
            }
            "frame_time_offset_of_last_event" => Value::Float(self.frame_time_offset_of_last_event),
            "lat" => Value::Float(self.lat),
            "lon" => Value::Float(self.lon),
            "area" => Value::Float(self.area),
            "energy" => Value::Float(self.energy),
            "quality_flag" => Value::Flag(self.quality_flag),
            _ => return None,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}
