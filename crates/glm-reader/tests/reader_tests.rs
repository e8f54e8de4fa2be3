//! Integration tests for opening GLM files, dimensions and scalars.
//!
//! Every test writes its own synthetic GLM file with `GlmFixture`.

use std::fs;

use glm_reader::{glm_read_dims, read_scalars, GlmError, GlmFile, ReaderConfig, ScalarValue};
use test_utils::{temp_test_dir, GlmFixture, PRODUCT_TIME};

#[test]
fn test_open_missing_file_is_not_found() {
    let dir = temp_test_dir();
    let err = GlmFile::open(dir.path().join("absent.nc")).unwrap_err();
    assert!(matches!(err, GlmError::NotFound { .. }), "{err}");
    assert!(err.to_string().contains("absent.nc"));
}

#[test]
fn test_open_non_netcdf_is_format_error() {
    let dir = temp_test_dir();
    let path = dir.path().join("not_glm.nc");
    fs::write(&path, b"this is not a NetCDF container").unwrap();

    let err = GlmFile::open(&path).unwrap_err();
    assert!(err.is_format(), "{err}");
    assert!(err.to_string().contains("not_glm.nc"));
}

#[test]
fn test_dimensions_of_five_event_file() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");

    let file = GlmFile::open(&path).unwrap();
    let dims = glm_read_dims(&file).unwrap();
    assert_eq!(dims.events(), 5);
    assert_eq!(dims.groups(), 4);
    assert_eq!(dims.flashes(), 2);
    assert_eq!(dims.get("number_of_time_bounds"), Some(2));
    assert_eq!(dims.get("no_such_dimension"), None);
}

#[test]
fn test_missing_event_dimension_is_format_error() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .without_dimension("number_of_events")
        .write_in(dir.path(), "no_events.nc");

    let file = GlmFile::open(&path).unwrap();
    let err = file.dimensions().unwrap_err();
    assert!(err.is_format(), "{err}");
    assert!(err.to_string().contains("number_of_events"), "{err}");
}

#[test]
fn test_strict_bounds_is_configurable() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .dimension("number_of_wavelength_bounds", 3)
        .write_in(dir.path(), "odd_bounds.nc");

    let strict = GlmFile::open(&path).unwrap();
    let err = strict.dimensions().unwrap_err();
    assert!(err.to_string().contains("number_of_wavelength_bounds"), "{err}");

    let config = ReaderConfig::default().with_strict_bounds(false);
    let relaxed = GlmFile::open_with(&path, &config).unwrap();
    assert_eq!(relaxed.dimensions().unwrap().events(), 5);
}

#[test]
fn test_scalars_present_and_defaulted() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");

    let file = GlmFile::open(&path).unwrap();
    let scalars = read_scalars(&file).unwrap();

    assert_eq!(scalars.float("product_time"), Some(PRODUCT_TIME));
    assert_eq!(
        scalars.bounds("product_time_bounds"),
        Some((PRODUCT_TIME, PRODUCT_TIME + 20.0))
    );
    assert_eq!(scalars.int("event_count"), Some(5));
    assert_eq!(scalars.int("flash_count"), Some(2));
    assert_eq!(scalars.text("platform_ID"), Some("G17"));

    // Absent from the fixture
    assert!(scalars.float("lightning_wavelength").unwrap().is_nan());
    assert_eq!(scalars.int("yaw_flip_flag"), Some(0));
    assert_eq!(scalars.text("summary"), Some(""));
    assert!(scalars.defaulted().iter().any(|n| n == "lightning_wavelength"));
    assert!(!scalars.defaulted().iter().any(|n| n == "product_time"));

    let nominal = scalars.float("nominal_satellite_subpoint_lon").unwrap();
    assert!((nominal - -137.2).abs() < 1e-4);

    let start = scalars.product_time_utc().unwrap();
    assert_eq!(start.to_rfc3339(), "2019-09-26T23:59:40+00:00");
}

#[test]
fn test_scalars_are_read_once() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");

    let file = GlmFile::open(&path).unwrap();
    let first = file.scalars().unwrap() as *const _;
    let second = file.scalars().unwrap() as *const _;
    assert_eq!(first, second);
    assert_eq!(
        file.scalars().unwrap().get("event_count"),
        Some(&ScalarValue::Int(5))
    );
}

#[test]
fn test_close_is_idempotent() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");

    let mut file = GlmFile::open(&path).unwrap();
    assert!(file.is_open());
    file.close();
    file.close();
    assert!(!file.is_open());

    // Dimensions were read at open; variables need the handle
    assert_eq!(file.dimensions().unwrap().events(), 5);
    assert!(matches!(file.has_variable("event_lat"), Err(GlmError::Io { .. })));
}

#[test]
fn test_open_bytes_removes_spill_file_on_close() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");
    let bytes = fs::read(&path).unwrap();

    let mut file = GlmFile::open_bytes(&bytes, &ReaderConfig::default()).unwrap();
    let spilled = file.path().to_path_buf();
    assert!(spilled.exists());
    assert_ne!(spilled, path);
    assert_eq!(file.dimensions().unwrap().groups(), 4);

    file.close();
    assert!(!spilled.exists());
}

#[test]
fn test_open_bytes_cleans_up_on_format_error() {
    let err = GlmFile::open_bytes(b"garbage", &ReaderConfig::default()).unwrap_err();
    assert!(err.is_format(), "{err}");
    if let GlmError::Format { path, .. } = err {
        assert!(!path.exists());
    }
}

#[test]
fn test_numeric_text_scalar_is_type_mismatch() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .numeric_global("platform_ID", 17)
        .write_in(dir.path(), "numeric_platform.nc");

    let file = GlmFile::open(&path).unwrap();
    match read_scalars(&file).unwrap_err() {
        GlmError::TypeMismatch {
            variable, expected, ..
        } => {
            assert!(variable.contains("platform_ID"), "{variable}");
            assert_eq!(expected, "text");
        }
        other => panic!("unexpected error: {other}"),
    }
}
