//! GLM test fixtures: literal record values and a writer for synthetic
//! GLM NetCDF files.

use std::path::{Path, PathBuf};

use crate::generators::{EventRows, FlashRows, GroupRows, Hierarchy};

/// Reference GOES-17 file used by the upstream test suite.
pub const REFERENCE_FILE: &str =
    "OR_GLM-L2-LCFA_G17_s20192692359400_e20192700000000_c20192700000028.nc";

/// Record counts of [`REFERENCE_FILE`].
pub mod reference {
    pub const EVENTS: usize = 4578;
    pub const GROUPS: usize = 1609;
    pub const FLASHES: usize = 123;
}

/// The first five events of the reference file.
pub mod five_events {
    pub const TIME_OFFSET: [f64; 5] = [-0.475699, -0.475699, -0.444037, -0.332646, -0.330739];
    pub const LAT: [f64; 5] = [23.9904, 23.9945, 23.9904, 23.9904, 23.9904];
    pub const LON: [f64; 5] = [-105.711212, -105.619804, -105.711212, -105.711212, -105.711212];
    pub const ENERGY: [f64; 5] = [1.37337e-14, 7.62985e-15, 3.05194e-15, 4.57791e-15, 4.57791e-15];
    pub const PARENT_GROUP_ID: [i64; 5] = [467109464, 467109464, 467109465, 467109472, 467109473];
    pub const ID: [i64; 5] = [1_030_000_001, 1_030_000_002, 1_030_000_003, 1_030_000_004, 1_030_000_005];
    /// Distinct groups the five events point at.
    pub const GROUP_IDS: [i64; 4] = [467109464, 467109465, 467109472, 467109473];
}

/// `product_time` of the reference file, seconds since J2000.
pub const PRODUCT_TIME: f64 = 622_814_380.0;

/// Hierarchy holding the five literal events, their four groups and two
/// flashes.
pub fn five_event_hierarchy() -> Hierarchy {
    let events = EventRows {
        id: five_events::ID.to_vec(),
        time_offset: five_events::TIME_OFFSET.to_vec(),
        lat: five_events::LAT.to_vec(),
        lon: five_events::LON.to_vec(),
        energy: five_events::ENERGY.to_vec(),
        parent_group_id: five_events::PARENT_GROUP_ID.to_vec(),
    };
    let groups = GroupRows {
        id: five_events::GROUP_IDS.to_vec(),
        time_offset: vec![-0.475699, -0.444037, -0.332646, -0.330739],
        frame_time_offset: vec![-0.476, -0.444, -0.333, -0.331],
        lat: vec![23.9925, 23.9904, 23.9904, 23.9904],
        lon: vec![-105.665, -105.711212, -105.711212, -105.711212],
        area: vec![1.5e8, 7.5e7, 7.5e7, 7.5e7],
        energy: vec![2.13635e-14, 3.05194e-15, 4.57791e-15, 4.57791e-15],
        parent_flash_id: vec![6310, 6310, 6311, 6311],
        quality_flag: vec![0, 0, 0, 0],
    };
    let flashes = FlashRows {
        id: vec![6310, 6311],
        time_offset_of_first_event: vec![-0.475699, -0.332646],
        time_offset_of_last_event: vec![-0.444037, -0.330739],
        frame_time_offset_of_first_event: vec![-0.476, -0.333],
        frame_time_offset_of_last_event: vec![-0.444, -0.331],
        lat: vec![23.991, 23.9904],
        lon: vec![-105.68, -105.711212],
        area: vec![1.5e8, 7.5e7],
        energy: vec![2.44154e-14, 9.15582e-15],
        quality_flag: vec![0, 0],
    };
    Hierarchy {
        events,
        groups,
        flashes,
    }
}

/// On-disk type of a fixture variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Storage {
    I16,
    I32,
    I64,
    U64,
    F32,
    F64,
    /// Short holding `round((value - offset) / scale)` for float data, or
    /// the integer data itself (truncated to 16 bits), written with
    /// float `scale_factor`/`add_offset` attributes. With `unsigned`, the
    /// raw value is stored as its 16-bit two's complement and the variable
    /// gets `_Unsigned = "true"`.
    Packed {
        scale: f32,
        offset: f32,
        unsigned: bool,
        fill: Option<i16>,
    },
}

/// Values of a fixture variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Data {
    pub fn len(&self) -> usize {
        match self {
            Data::Int(v) => v.len(),
            Data::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_f64(&self) -> Vec<f64> {
        match self {
            Data::Int(v) => v.iter().map(|&x| x as f64).collect(),
            Data::Float(v) => v.clone(),
        }
    }

    fn as_i64(&self) -> Vec<i64> {
        match self {
            Data::Int(v) => v.clone(),
            Data::Float(v) => v.iter().map(|&x| x as i64).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    dimensions: Vec<String>,
    data: Data,
    storage: Storage,
}

/// Builder for synthetic GLM NetCDF files.
///
/// Starts from a consistent layout and lets a test break exactly one
/// thing: drop a dimension or variable, change a storage type, move a
/// variable to another dimension.
#[derive(Debug, Clone, Default)]
pub struct GlmFixture {
    dimensions: Vec<(String, usize)>,
    variables: Vec<Variable>,
    globals: Vec<(String, String)>,
    numeric_globals: Vec<(String, i32)>,
}

impl GlmFixture {
    /// Empty file: no dimensions, no variables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// File holding [`five_event_hierarchy`].
    pub fn five_events() -> Self {
        Self::from_hierarchy(&five_event_hierarchy())
    }

    /// File holding `h` with the GLM dimensions, bounds, a few scalars and
    /// global attributes. Ids are ints, floats are floats, flags shorts.
    pub fn from_hierarchy(h: &Hierarchy) -> Self {
        let mut fixture = Self::default()
            .dimension("number_of_events", h.events.id.len())
            .dimension("number_of_groups", h.groups.id.len())
            .dimension("number_of_flashes", h.flashes.id.len())
            .dimension("number_of_time_bounds", 2)
            .dimension("number_of_field_of_view_bounds", 2)
            .dimension("number_of_wavelength_bounds", 2);

        let ev = "number_of_events";
        let e = &h.events;
        fixture = fixture
            .variable("event_id", ev, Data::Int(e.id.clone()), Storage::I32)
            .variable("event_time_offset", ev, Data::Float(e.time_offset.clone()), Storage::F32)
            .variable("event_lat", ev, Data::Float(e.lat.clone()), Storage::F32)
            .variable("event_lon", ev, Data::Float(e.lon.clone()), Storage::F32)
            .variable("event_energy", ev, Data::Float(e.energy.clone()), Storage::F32)
            .variable(
                "event_parent_group_id",
                ev,
                Data::Int(e.parent_group_id.clone()),
                Storage::I32,
            );

        let gr = "number_of_groups";
        let g = &h.groups;
        fixture = fixture
            .variable("group_id", gr, Data::Int(g.id.clone()), Storage::I32)
            .variable("group_time_offset", gr, Data::Float(g.time_offset.clone()), Storage::F32)
            .variable(
                "group_frame_time_offset",
                gr,
                Data::Float(g.frame_time_offset.clone()),
                Storage::F32,
            )
            .variable("group_lat", gr, Data::Float(g.lat.clone()), Storage::F32)
            .variable("group_lon", gr, Data::Float(g.lon.clone()), Storage::F32)
            .variable("group_area", gr, Data::Float(g.area.clone()), Storage::F32)
            .variable("group_energy", gr, Data::Float(g.energy.clone()), Storage::F32)
            .variable(
                "group_parent_flash_id",
                gr,
                Data::Int(g.parent_flash_id.clone()),
                Storage::I32,
            )
            .variable("group_quality_flag", gr, Data::Int(g.quality_flag.clone()), Storage::I16);

        let fl = "number_of_flashes";
        let f = &h.flashes;
        fixture = fixture
            .variable("flash_id", fl, Data::Int(f.id.clone()), Storage::I32)
            .variable(
                "flash_time_offset_of_first_event",
                fl,
                Data::Float(f.time_offset_of_first_event.clone()),
                Storage::F32,
            )
            .variable(
                "flash_time_offset_of_last_event",
                fl,
                Data::Float(f.time_offset_of_last_event.clone()),
                Storage::F32,
            )
            .variable(
                "flash_frame_time_offset_of_first_event",
                fl,
                Data::Float(f.frame_time_offset_of_first_event.clone()),
                Storage::F32,
            )
            .variable(
                "flash_frame_time_offset_of_last_event",
                fl,
                Data::Float(f.frame_time_offset_of_last_event.clone()),
                Storage::F32,
            )
            .variable("flash_lat", fl, Data::Float(f.lat.clone()), Storage::F32)
            .variable("flash_lon", fl, Data::Float(f.lon.clone()), Storage::F32)
            .variable("flash_area", fl, Data::Float(f.area.clone()), Storage::F32)
            .variable("flash_energy", fl, Data::Float(f.energy.clone()), Storage::F32)
            .variable("flash_quality_flag", fl, Data::Int(f.quality_flag.clone()), Storage::I16);

        fixture
            .scalar("product_time", Data::Float(vec![PRODUCT_TIME]), Storage::F64)
            .variable(
                "product_time_bounds",
                "number_of_time_bounds",
                Data::Float(vec![PRODUCT_TIME, PRODUCT_TIME + 20.0]),
                Storage::F64,
            )
            .scalar("event_count", Data::Int(vec![e.id.len() as i64]), Storage::I32)
            .scalar("group_count", Data::Int(vec![g.id.len() as i64]), Storage::I32)
            .scalar("flash_count", Data::Int(vec![f.id.len() as i64]), Storage::I32)
            .scalar("nominal_satellite_subpoint_lon", Data::Float(vec![-137.2]), Storage::F32)
            .global("title", "GLM L2 Lightning Detections: Flashes/Groups/Events")
            .global("platform_ID", "G17")
    }

    /// Add or resize a dimension.
    pub fn dimension(mut self, name: &str, len: usize) -> Self {
        match self.dimensions.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = len,
            None => self.dimensions.push((name.to_string(), len)),
        }
        self
    }

    /// Remove a dimension and every variable defined on it.
    pub fn without_dimension(mut self, name: &str) -> Self {
        self.dimensions.retain(|(n, _)| n != name);
        self.variables
            .retain(|v| !v.dimensions.iter().any(|d| d == name));
        self
    }

    /// Add or replace a one-dimensional variable.
    pub fn variable(self, name: &str, dimension: &str, data: Data, storage: Storage) -> Self {
        self.put_variable(name, vec![dimension.to_string()], data, storage)
    }

    /// Add or replace a scalar (zero-dimensional) variable.
    pub fn scalar(self, name: &str, data: Data, storage: Storage) -> Self {
        self.put_variable(name, Vec::new(), data, storage)
    }

    fn put_variable(
        mut self,
        name: &str,
        dimensions: Vec<String>,
        data: Data,
        storage: Storage,
    ) -> Self {
        self.variables.retain(|v| v.name != name);
        self.variables.push(Variable {
            name: name.to_string(),
            dimensions,
            data,
            storage,
        });
        self
    }

    /// Remove a variable.
    pub fn without_variable(mut self, name: &str) -> Self {
        self.variables.retain(|v| v.name != name);
        self
    }

    /// Change the on-disk type of an existing variable.
    pub fn store_as(mut self, name: &str, storage: Storage) -> Self {
        for v in self.variables.iter_mut().filter(|v| v.name == name) {
            v.storage = storage;
        }
        self
    }

    /// Replace the values of an existing variable, keeping its type.
    pub fn values(mut self, name: &str, data: Data) -> Self {
        for v in self.variables.iter_mut().filter(|v| v.name == name) {
            v.data = data.clone();
        }
        self
    }

    /// Move an existing variable onto another dimension.
    pub fn on_dimension(mut self, name: &str, dimension: &str) -> Self {
        for v in self.variables.iter_mut().filter(|v| v.name == name) {
            v.dimensions = vec![dimension.to_string()];
        }
        self
    }

    /// Set a global text attribute.
    pub fn global(mut self, name: &str, value: &str) -> Self {
        self.globals.retain(|(n, _)| n != name);
        self.globals.push((name.to_string(), value.to_string()));
        self
    }

    /// Set a global attribute to an integer, replacing any text value.
    pub fn numeric_global(mut self, name: &str, value: i32) -> Self {
        self.globals.retain(|(n, _)| n != name);
        self.numeric_globals.retain(|(n, _)| n != name);
        self.numeric_globals.push((name.to_string(), value));
        self
    }

    /// Write the fixture as a NetCDF-4 file at `path`.
    pub fn write(&self, path: &Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;

        for (name, len) in &self.dimensions {
            file.add_dimension(name, *len)?;
        }
        for (name, value) in &self.globals {
            file.add_attribute(name, value.as_str())?;
        }
        for (name, value) in &self.numeric_globals {
            file.add_attribute(name, *value)?;
        }
        for v in &self.variables {
            write_variable(&mut file, v)?;
        }
        Ok(())
    }

    /// Write the fixture into `dir` as `name` and return the path.
    pub fn write_in(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        self.write(&path)
            .unwrap_or_else(|e| panic!("failed to write fixture {}: {}", path.display(), e));
        path
    }
}

fn write_variable(file: &mut netcdf::FileMut, v: &Variable) -> Result<(), netcdf::Error> {
    let dims: Vec<&str> = v.dimensions.iter().map(String::as_str).collect();

    macro_rules! put {
        ($t:ty, $values:expr) => {{
            let mut var = file.add_variable::<$t>(&v.name, &dims)?;
            let values: Vec<$t> = $values;
            if !values.is_empty() {
                var.put_values(&values, ..)?;
            }
        }};
    }

    match v.storage {
        Storage::I16 => put!(i16, v.data.as_i64().into_iter().map(|x| x as i16).collect()),
        Storage::I32 => put!(i32, v.data.as_i64().into_iter().map(|x| x as i32).collect()),
        Storage::I64 => put!(i64, v.data.as_i64()),
        Storage::U64 => put!(u64, v.data.as_i64().into_iter().map(|x| x as u64).collect()),
        Storage::F32 => put!(f32, v.data.as_f64().into_iter().map(|x| x as f32).collect()),
        Storage::F64 => put!(f64, v.data.as_f64()),
        Storage::Packed {
            scale,
            offset,
            unsigned,
            fill,
        } => {
            let mut var = file.add_variable::<i16>(&v.name, &dims)?;
            var.put_attribute("scale_factor", scale)?;
            var.put_attribute("add_offset", offset)?;
            if unsigned {
                var.put_attribute("_Unsigned", "true")?;
            }
            if let Some(fill) = fill {
                var.put_attribute("_FillValue", fill)?;
            }
            // Integer data is already in the stored domain
            let raw: Vec<i16> = match &v.data {
                Data::Int(stored) => stored.iter().map(|&x| x as i16).collect(),
                Data::Float(values) => values
                    .iter()
                    .map(|&x| pack(x, scale, offset, unsigned))
                    .collect(),
            };
            if !raw.is_empty() {
                var.put_values(&raw, ..)?;
            }
        }
    }
    Ok(())
}

/// Pack `value` into a short the way GLM files do.
pub fn pack(value: f64, scale: f32, offset: f32, unsigned: bool) -> i16 {
    let raw = ((value - f64::from(offset)) / f64::from(scale)).round() as i64;
    if unsigned {
        raw as u16 as i16
    } else {
        raw as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_event_parents_exist() {
        let h = five_event_hierarchy();
        for id in &h.events.parent_group_id {
            assert!(h.groups.id.contains(id));
        }
        for id in &h.groups.parent_flash_id {
            assert!(h.flashes.id.contains(id));
        }
    }

    #[test]
    fn test_pack_unsigned_wraps() {
        assert_eq!(pack(65535.0, 1.0, 0.0, true), -1);
        assert_eq!(pack(-10.0, 0.5, -10.0, false), 0);
        assert_eq!(pack(1.0, 0.5, 0.0, false), 2);
    }

    #[test]
    fn test_without_dimension_drops_its_variables() {
        let fixture = GlmFixture::five_events().without_dimension("number_of_events");
        assert!(fixture
            .variables
            .iter()
            .all(|v| v.dimensions.iter().all(|d| d != "number_of_events")));
        assert!(fixture.variables.iter().any(|v| v.name == "event_count"));
        assert!(fixture
            .dimensions
            .iter()
            .all(|(name, _)| name != "number_of_events"));
    }

    #[test]
    fn test_write_creates_file() {
        let dir = crate::temp_test_dir();
        let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");
        assert!(path.exists());
    }
}
