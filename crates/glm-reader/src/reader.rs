//! Format reader: opens a GLM NetCDF file and exposes its dimensions,
//! scalars and raw record variables.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::column::Column;
use crate::config::ReaderConfig;
use crate::error::{GlmError, GlmResult};
use crate::native;
use crate::packing::{decode, RawValues, StorageType};
use crate::scalars::{ScalarKind, ScalarSet, ScalarSource, ScalarSpec, ScalarValue};
use crate::schema::{ColumnKind, ColumnSpec, Family, BOUNDS_DIMENSIONS, BOUNDS_LEN};

/// Dimension name → extent, validated against the GLM layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DimensionTable {
    extents: BTreeMap<String, usize>,
}

impl DimensionTable {
    /// Validate raw extents.
    ///
    /// The three family dimensions must be present. With `strict_bounds`,
    /// any auxiliary bounds dimension that is present must have extent 2.
    pub fn from_extents(
        path: &Path,
        extents: BTreeMap<String, usize>,
        strict_bounds: bool,
    ) -> GlmResult<Self> {
        for family in Family::ALL {
            if !extents.contains_key(family.dimension()) {
                return Err(GlmError::format(
                    path,
                    "dimensions",
                    format!("dimension '{}'", family.dimension()),
                ));
            }
        }

        if strict_bounds {
            for name in BOUNDS_DIMENSIONS {
                if let Some(&len) = extents.get(name) {
                    if len != BOUNDS_LEN {
                        return Err(GlmError::format(
                            path,
                            format!("dimension '{}'", name),
                            format!("extent {}, found {}", BOUNDS_LEN, len),
                        ));
                    }
                }
            }
        }

        Ok(Self { extents })
    }

    /// Number of event records.
    pub fn events(&self) -> usize {
        self.count(Family::Event)
    }

    /// Number of group records.
    pub fn groups(&self) -> usize {
        self.count(Family::Group)
    }

    /// Number of flash records.
    pub fn flashes(&self) -> usize {
        self.count(Family::Flash)
    }

    /// Record count of `family`.
    pub fn count(&self, family: Family) -> usize {
        self.extents
            .get(family.dimension())
            .copied()
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.extents.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.extents.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.extents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }
}

/// An open GLM file.
///
/// The underlying NetCDF handle is released by [`GlmFile::close`] or when
/// the value is dropped, whichever comes first. Dimensions are read at
/// open; scalars on first use. Both are cached for the handle's lifetime.
pub struct GlmFile {
    path: PathBuf,
    inner: Option<netcdf::File>,
    /// Temp file backing a handle opened from bytes.
    spilled: Option<PathBuf>,
    config: ReaderConfig,
    extents: BTreeMap<String, usize>,
    dimensions: OnceCell<DimensionTable>,
    scalars: OnceCell<ScalarSet>,
}

impl std::fmt::Debug for GlmFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlmFile")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("spilled", &self.spilled)
            .finish()
    }
}

impl GlmFile {
    /// Open `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> GlmResult<Self> {
        Self::open_with(path, &ReaderConfig::default())
    }

    /// Open `path`.
    ///
    /// Fails with `NotFound` when the path does not exist, `Io` when it
    /// cannot be read and `Format` when it is not a NetCDF container.
    pub fn open_with(path: impl AsRef<Path>, config: &ReaderConfig) -> GlmResult<Self> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {
                return Err(GlmError::io(
                    path,
                    io::Error::new(ErrorKind::Other, "is a directory"),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GlmError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(GlmError::io(path, e)),
        }
        // Surface permission problems as I/O rather than a format failure
        fs::File::open(path).map_err(|e| GlmError::io(path, e))?;

        let inner = netcdf::open(path).map_err(|e| {
            GlmError::format(
                path,
                "container",
                format!("a NetCDF file ({})", e),
            )
        })?;

        let extents = inner
            .dimensions()
            .map(|dim| (dim.name(), dim.len()))
            .collect::<BTreeMap<_, _>>();

        debug!(
            path = %path.display(),
            dimensions = extents.len(),
            "Opened GLM file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Some(inner),
            spilled: None,
            config: config.clone(),
            extents,
            dimensions: OnceCell::new(),
            scalars: OnceCell::new(),
        })
    }

    /// Open an in-memory NetCDF buffer.
    ///
    /// The buffer is spilled to a uniquely named temp file which is removed
    /// when the handle is closed.
    pub fn open_bytes(data: &[u8], config: &ReaderConfig) -> GlmResult<Self> {
        let temp_file = native::spill_dir().join(native::spill_filename());

        let mut file = fs::File::create(&temp_file).map_err(|e| GlmError::io(&temp_file, e))?;
        file.write_all(data)
            .map_err(|e| GlmError::io(&temp_file, e))?;
        drop(file);

        match Self::open_with(&temp_file, config) {
            Ok(mut glm) => {
                glm.spilled = Some(temp_file);
                Ok(glm)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_file);
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// All dimensions of the file.
    ///
    /// Fails with `Format` when a family dimension is missing or, under
    /// `strict_bounds`, a bounds dimension has the wrong extent.
    pub fn dimensions(&self) -> GlmResult<&DimensionTable> {
        if let Some(table) = self.dimensions.get() {
            return Ok(table);
        }
        let table =
            DimensionTable::from_extents(&self.path, self.extents.clone(), self.config.strict_bounds)?;
        Ok(self.dimensions.get_or_init(|| table))
    }

    /// Known global scalars, with defaults for the ones the file lacks.
    pub fn scalars(&self) -> GlmResult<&ScalarSet> {
        if let Some(set) = self.scalars.get() {
            return Ok(set);
        }
        let file = self.handle()?;
        let set = ScalarSet::collect(|spec| self.read_scalar(file, spec))?;
        if !set.defaulted().is_empty() {
            warn!(
                path = %self.path.display(),
                missing = set.defaulted().len(),
                names = ?set.defaulted(),
                "Scalars missing, using defaults"
            );
        }
        Ok(self.scalars.get_or_init(|| set))
    }

    /// Release the NetCDF handle and any spilled temp file. Idempotent.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!(path = %self.path.display(), "Closed GLM file");
        }
        if let Some(temp_file) = self.spilled.take() {
            let _ = fs::remove_file(&temp_file);
        }
    }

    /// Whether the file has a variable called `name`.
    pub fn has_variable(&self, name: &str) -> GlmResult<bool> {
        Ok(self.handle()?.variable(name).is_some())
    }

    fn handle(&self) -> GlmResult<&netcdf::File> {
        self.inner.as_ref().ok_or_else(|| {
            GlmError::io(
                &self.path,
                io::Error::new(ErrorKind::Other, "file handle is closed"),
            )
        })
    }

    /// Decode one record column of `family`, checking it has `len` entries
    /// along the family's dimension.
    pub(crate) fn read_column(
        &self,
        family: Family,
        spec: &ColumnSpec,
        len: usize,
    ) -> GlmResult<Column> {
        let file = self.handle()?;
        let var = file.variable(spec.variable).ok_or_else(|| {
            GlmError::format(
                &self.path,
                format!("{} column '{}'", family, spec.name),
                format!("variable '{}'", spec.variable),
            )
        })?;

        let dims: Vec<String> = var.dimensions().iter().map(|dim| dim.name()).collect();
        if dims.len() != 1 || dims[0] != family.dimension() {
            return Err(GlmError::format(
                &self.path,
                format!("variable '{}'", spec.variable),
                format!(
                    "one dimension '{}', found ({})",
                    family.dimension(),
                    dims.join(", ")
                ),
            ));
        }
        if var.len() != len {
            return Err(GlmError::format(
                &self.path,
                format!("variable '{}'", spec.variable),
                format!("{} values, found {}", len, var.len()),
            ));
        }

        self.read_numeric(&var, spec.variable, spec.kind, spec.raw_bias)
    }

    /// Read and unpack a numeric variable into `kind`. `raw_bias` only
    /// applies to packed integer storage.
    fn read_numeric(
        &self,
        var: &netcdf::Variable,
        name: &str,
        kind: ColumnKind,
        raw_bias: i64,
    ) -> GlmResult<Column> {
        let storage = native::storage_type(var);
        let mut packing = native::packing(var);
        if storage.int_bits().is_some() && packing.scale_factor.is_some() {
            packing.raw_bias = raw_bias;
        }
        let effective = storage.effective(packing.unsigned);
        if !effective.converts_to(kind) {
            return Err(GlmError::type_mismatch(
                &self.path,
                name,
                effective.to_string(),
                kind.output_type(),
            ));
        }

        if var.len() == 0 {
            let empty = RawValues::Float(Vec::new());
            return Ok(decode(empty, kind, storage, &packing, false));
        }

        macro_rules! read_as {
            ($t:ty, $widen:expr) => {
                var.get_values::<$t, _>(..)
                    .map(|values| values.into_iter().map($widen).collect::<Vec<_>>())
                    .map_err(|e| self.read_failed(name, e))?
            };
        }

        let raw = match storage {
            StorageType::I8 => RawValues::from_signed(read_as!(i8, i64::from), 8, packing.unsigned),
            StorageType::I16 => {
                RawValues::from_signed(read_as!(i16, i64::from), 16, packing.unsigned)
            }
            StorageType::I32 => {
                RawValues::from_signed(read_as!(i32, i64::from), 32, packing.unsigned)
            }
            StorageType::I64 => RawValues::from_signed(read_as!(i64, |v| v), 64, packing.unsigned),
            StorageType::U8 => RawValues::Unsigned(read_as!(u8, u64::from)),
            StorageType::U16 => RawValues::Unsigned(read_as!(u16, u64::from)),
            StorageType::U32 => RawValues::Unsigned(read_as!(u32, u64::from)),
            StorageType::U64 => RawValues::Unsigned(read_as!(u64, |v| v)),
            StorageType::F32 => RawValues::Float(read_as!(f32, f64::from)),
            StorageType::F64 => RawValues::Float(read_as!(f64, |v| v)),
            StorageType::Char | StorageType::Str | StorageType::UserDefined => {
                return Err(GlmError::type_mismatch(
                    &self.path,
                    name,
                    storage.to_string(),
                    kind.output_type(),
                ));
            }
        };

        Ok(decode(
            raw,
            kind,
            storage,
            &packing,
            self.config.mask_fill_values,
        ))
    }

    fn read_failed(&self, variable: &str, err: netcdf::Error) -> GlmError {
        GlmError::io(
            &self.path,
            io::Error::new(
                ErrorKind::Other,
                format!("reading variable '{}': {}", variable, err),
            ),
        )
    }

    fn read_scalar(
        &self,
        file: &netcdf::File,
        spec: &ScalarSpec,
    ) -> GlmResult<Option<ScalarValue>> {
        if spec.source == ScalarSource::GlobalAttribute {
            let Some(value) = native::global_attr(file, spec.name) else {
                return Ok(None);
            };
            return native::text_value(value)
                .map(|text| Some(ScalarValue::Text(text)))
                .ok_or_else(|| {
                    GlmError::type_mismatch(
                        &self.path,
                        format!("global attribute {}", spec.name),
                        "numeric attribute",
                        "text",
                    )
                });
        }

        let Some(var) = file.variable(spec.name) else {
            return Ok(None);
        };
        let kind = match spec.kind {
            ScalarKind::Int => ColumnKind::Id,
            _ => ColumnKind::Float,
        };
        let column = self.read_numeric(&var, spec.name, kind, 0)?;

        let value = match (spec.kind, column) {
            (ScalarKind::Int, Column::Id(values)) => values.first().copied().map(ScalarValue::Int),
            (ScalarKind::Float, Column::Float(values)) => {
                values.first().copied().map(ScalarValue::Float)
            }
            (ScalarKind::Bounds, Column::Float(values)) => {
                if values.len() != BOUNDS_LEN {
                    return Err(GlmError::format(
                        &self.path,
                        format!("variable '{}'", spec.name),
                        format!("{} bounds values, found {}", BOUNDS_LEN, values.len()),
                    ));
                }
                Some(ScalarValue::Floats(values))
            }
            _ => None,
        };
        Ok(value)
    }
}

impl Drop for GlmFile {
    fn drop(&mut self) {
        self.close();
    }
}
