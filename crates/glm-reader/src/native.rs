//! Glue over the native netcdf library.
//!
//! libnetcdf (and HDF5 below it) needs a real file path, so in-memory
//! buffers are spilled to a temp file first. On Linux that file goes to
//! `/dev/shm` (memory-backed tmpfs) when it is writable.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use netcdf::AttributeValue;

use crate::packing::{is_unsigned_flag, Packing, StorageType};

/// Silence HDF5's automatic error printing to stderr.
///
/// HDF5 prints a diagnostic stack for every failed lookup, including the
/// optional-attribute probes this crate does on purpose:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Call it before the first NetCDF operation; later calls are no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 with a null handler disables automatic error
        // printing for the default error stack.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Directory for spilled buffers.
///
/// On Linux, uses /dev/shm if it exists and is writable. Falls back to the
/// system temp directory.
pub(crate) fn spill_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        use std::path::Path;
        let shm_path = Path::new("/dev/shm");
        if shm_path.is_dir() {
            let probe = shm_path.join(format!(".glm_probe_{}", std::process::id()));
            if std::fs::write(&probe, b"probe").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return shm_path.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

/// Unique spill file name: process id, thread id and a counter.
pub(crate) fn spill_filename() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let tid = std::thread::current().id();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("glm_native_{}_{:?}_{}.nc", pid, tid, count)
        .replace(['(', ')'], "")
}

/// Map the variable's NetCDF type onto [`StorageType`].
pub(crate) fn storage_type(var: &netcdf::Variable) -> StorageType {
    use netcdf::types::{FloatType, IntType, NcVariableType};

    match var.vartype() {
        NcVariableType::Int(IntType::I8) => StorageType::I8,
        NcVariableType::Int(IntType::U8) => StorageType::U8,
        NcVariableType::Int(IntType::I16) => StorageType::I16,
        NcVariableType::Int(IntType::U16) => StorageType::U16,
        NcVariableType::Int(IntType::I32) => StorageType::I32,
        NcVariableType::Int(IntType::U32) => StorageType::U32,
        NcVariableType::Int(IntType::I64) => StorageType::I64,
        NcVariableType::Int(IntType::U64) => StorageType::U64,
        NcVariableType::Float(FloatType::F32) => StorageType::F32,
        NcVariableType::Float(FloatType::F64) => StorageType::F64,
        NcVariableType::Char => StorageType::Char,
        NcVariableType::String => StorageType::Str,
        _ => StorageType::UserDefined,
    }
}

/// Check if a variable has an attribute with the given name.
/// Probing first avoids HDF5 error spam for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Numeric attribute widened to f64. Single-element arrays count as
/// scalars.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    numeric_value(var.attribute_value(name)?.ok()?)
}

/// Text attribute of a variable.
fn get_text_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    text_value(var.attribute_value(name)?.ok()?)
}

/// Value of a global attribute, `None` when absent or unreadable.
pub(crate) fn global_attr(file: &netcdf::File, name: &str) -> Option<AttributeValue> {
    if !file.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    file.attribute(name)?.value().ok()
}

fn numeric_value(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Shorts(v) if v.len() == 1 => Some(f64::from(v[0])),
        AttributeValue::Ints(v) if v.len() == 1 => Some(f64::from(v[0])),
        AttributeValue::Floats(v) if v.len() == 1 => Some(f64::from(v[0])),
        AttributeValue::Doubles(v) if v.len() == 1 => Some(v[0]),
        _ => None,
    }
}

/// Text of a string attribute; multi-valued ones are joined by newlines.
pub(crate) fn text_value(value: AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(v) => Some(v.join("\n")),
        _ => None,
    }
}

/// Read the packing attributes of a variable.
pub(crate) fn packing(var: &netcdf::Variable) -> Packing {
    Packing {
        unsigned: get_text_attr(var, "_Unsigned").is_some_and(|v| is_unsigned_flag(&v)),
        scale_factor: get_f64_attr(var, "scale_factor"),
        add_offset: get_f64_attr(var, "add_offset"),
        fill_value: get_f64_attr(var, "_FillValue"),
        raw_bias: 0,
    }
}
