//! Integration tests for decoding record families.

use glm_reader::decoder::{read_arrays, read_structs};
use glm_reader::{
    are_same, glm_read_event_arrays, glm_read_event_structs, glm_read_flash_structs,
    glm_read_group_arrays, glm_read_group_structs, read_event_vars, read_group_vars,
    variable_names, EventRecord, Family, FlashRecord, GlmError, GlmFile, GroupRecord, Record,
    ReaderConfig,
};
use test_utils::{
    assert_approx_eq, five_events, generate_hierarchy, pack, temp_test_dir, Data, GlmFixture,
    Storage,
};

/// Every (record, column) pair of the struct view equals the array view.
fn assert_equivalent<R: Record>(file: &GlmFile) {
    let structs = read_structs::<R>(file).unwrap();
    let arrays = read_arrays(file, R::FAMILY).unwrap();
    assert_eq!(structs.len(), arrays.len());
    for (i, record) in structs.iter().enumerate() {
        for name in arrays.names() {
            assert_eq!(
                record.value(name),
                arrays.value(name, i),
                "{} record {} column {}",
                R::FAMILY,
                i,
                name
            );
        }
    }
}

#[test]
fn test_five_event_round_trip() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");
    let file = GlmFile::open(&path).unwrap();

    let events = glm_read_event_structs(&file).unwrap();
    assert_eq!(events.len(), 5);
    for (i, event) in events.iter().enumerate() {
        assert!(are_same(event.time_offset, five_events::TIME_OFFSET[i]), "time {i}");
        assert!(are_same(event.lat, five_events::LAT[i]), "lat {i}");
        assert!(are_same(event.lon, five_events::LON[i]), "lon {i}");
        assert!(are_same(event.energy, five_events::ENERGY[i]), "energy {i}");
        assert_eq!(event.parent_group_id, five_events::PARENT_GROUP_ID[i]);
        assert_eq!(event.id, five_events::ID[i]);
    }

    let arrays = glm_read_event_arrays(&file).unwrap();
    let lat = arrays.floats("lat").unwrap();
    for (got, want) in lat.iter().zip(five_events::LAT) {
        assert_approx_eq!(*got, want, 1e-4);
    }
    assert_eq!(
        arrays.ids("parent_group_id").unwrap(),
        &five_events::PARENT_GROUP_ID[..]
    );
}

#[test]
fn test_struct_and_array_reads_are_equivalent() {
    let dir = temp_test_dir();
    let path = GlmFixture::from_hierarchy(&generate_hierarchy(5, 4, 3))
        .write_in(dir.path(), "hierarchy.nc");
    let file = GlmFile::open(&path).unwrap();

    assert_equivalent::<EventRecord>(&file);
    assert_equivalent::<GroupRecord>(&file);
    assert_equivalent::<FlashRecord>(&file);
}

#[test]
fn test_every_column_has_family_length() {
    let dir = temp_test_dir();
    let path = GlmFixture::from_hierarchy(&generate_hierarchy(3, 2, 4))
        .write_in(dir.path(), "hierarchy.nc");
    let file = GlmFile::open(&path).unwrap();
    let dims = file.dimensions().unwrap().clone();

    for family in Family::ALL {
        let columns = read_arrays(&file, family).unwrap();
        assert_eq!(columns.len(), dims.count(family));
        assert_eq!(
            columns.names().collect::<Vec<_>>(),
            family.columns().iter().map(|c| c.name).collect::<Vec<_>>()
        );
        for (name, column) in columns.iter() {
            assert_eq!(column.len(), dims.count(family), "{family} {name}");
        }
    }
}

#[test]
fn test_empty_families_decode_to_empty_columns() {
    let dir = temp_test_dir();
    let path = GlmFixture::from_hierarchy(&generate_hierarchy(0, 1, 1))
        .write_in(dir.path(), "empty.nc");
    let file = GlmFile::open(&path).unwrap();

    assert!(glm_read_flash_structs(&file).unwrap().is_empty());
    let groups = glm_read_group_arrays(&file).unwrap();
    assert!(groups.is_empty());
    assert_eq!(groups.names().count(), Family::Group.columns().len());
}

#[test]
fn test_variable_lists() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .without_variable("group_area")
        .write_in(dir.path(), "no_area.nc");
    let file = GlmFile::open(&path).unwrap();

    let events = read_event_vars(&file).unwrap();
    assert_eq!(events, variable_names(Family::Event));
    assert_eq!(events[0], "event_id");

    let err = read_group_vars(&file).unwrap_err();
    assert!(err.is_format());
    assert!(err.to_string().contains("group_area"), "{err}");
}

#[test]
fn test_missing_variable_is_format_error() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .without_variable("group_area")
        .write_in(dir.path(), "no_area.nc");
    let file = GlmFile::open(&path).unwrap();

    let err = read_arrays(&file, Family::Group).unwrap_err();
    assert!(err.is_format(), "{err}");
    let message = err.to_string();
    assert!(message.contains("no_area.nc"), "{message}");
    assert!(message.contains("group_area"), "{message}");

    // Other families are unaffected
    assert_eq!(read_arrays(&file, Family::Event).unwrap().len(), 5);
}

#[test]
fn test_variable_on_wrong_dimension_is_format_error() {
    let dir = temp_test_dir();
    // 4 events and 4 groups, so the data still fits the other dimension
    let path = GlmFixture::from_hierarchy(&generate_hierarchy(2, 2, 1))
        .on_dimension("event_lat", "number_of_groups")
        .write_in(dir.path(), "moved.nc");
    let file = GlmFile::open(&path).unwrap();

    let err = read_arrays(&file, Family::Event).unwrap_err();
    assert!(err.is_format(), "{err}");
    assert!(err.to_string().contains("event_lat"), "{err}");
    assert!(err.to_string().contains("number_of_events"), "{err}");
}

#[test]
fn test_missing_sizing_dimension_fails_decoding() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .without_dimension("number_of_events")
        .write_in(dir.path(), "no_events.nc");
    let file = GlmFile::open(&path).unwrap();

    let err = read_structs::<EventRecord>(&file).unwrap_err();
    assert!(err.is_format(), "{err}");
}

#[test]
fn test_float_id_is_type_mismatch() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("event_id", Storage::F32)
        .write_in(dir.path(), "float_id.nc");
    let file = GlmFile::open(&path).unwrap();

    match read_arrays(&file, Family::Event).unwrap_err() {
        GlmError::TypeMismatch {
            variable,
            found,
            expected,
            ..
        } => {
            assert_eq!(variable, "event_id");
            assert_eq!(found, "float");
            assert_eq!(expected, "i64");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unsigned_64_bit_id_is_type_mismatch() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("flash_id", Storage::U64)
        .write_in(dir.path(), "u64_id.nc");
    let file = GlmFile::open(&path).unwrap();

    let err = read_arrays(&file, Family::Flash).unwrap_err();
    assert!(matches!(err, GlmError::TypeMismatch { .. }), "{err}");
}

#[test]
fn test_wide_flag_is_type_mismatch() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("group_quality_flag", Storage::I64)
        .write_in(dir.path(), "wide_flag.nc");
    let file = GlmFile::open(&path).unwrap();

    let err = read_arrays(&file, Family::Group).unwrap_err();
    assert!(err.to_string().contains("group_quality_flag"), "{err}");
    assert!(matches!(err, GlmError::TypeMismatch { .. }));
}

#[test]
fn test_64_bit_ids_keep_full_width() {
    let ids = vec![467_109_464_123_456, 467_109_464_123_457, -1, i64::MAX, 0];
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("event_id", Storage::I64)
        .values("event_id", Data::Int(ids.clone()))
        .write_in(dir.path(), "wide_ids.nc");
    let file = GlmFile::open(&path).unwrap();

    let events = glm_read_event_arrays(&file).unwrap();
    assert_eq!(events.ids("id").unwrap(), &ids[..]);
}

#[test]
fn test_packed_unsigned_values_are_unpacked() {
    let scale = 0.00203128_f32;
    let offset = -66.56_f32;
    let packed = Storage::Packed {
        scale,
        offset,
        unsigned: true,
        fill: None,
    };
    // The stored shorts overflow i16 without _Unsigned
    assert!(pack(five_events::LAT[0], scale, offset, true) < 0);

    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("event_lat", packed)
        .write_in(dir.path(), "packed.nc");
    let file = GlmFile::open(&path).unwrap();

    let events = glm_read_event_structs(&file).unwrap();
    let tolerance = f64::from(scale) / 2.0 + 1e-5;
    for (event, want) in events.iter().zip(five_events::LAT) {
        assert_approx_eq!(event.lat, want, tolerance);
    }
}

#[test]
fn test_fill_values_are_masked() {
    let scale = 0.00549324_f32;
    let offset = -180.0_f32;
    let packed = Storage::Packed {
        scale,
        offset,
        unsigned: true,
        fill: Some(-1),
    };
    // Packs to 65535, which is the fill under _Unsigned
    let fill_lon = f64::from(offset) + 65535.0 * f64::from(scale);
    let mut lon = five_events::LON.to_vec();
    lon[2] = fill_lon;

    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("event_lon", packed)
        .values("event_lon", Data::Float(lon))
        .write_in(dir.path(), "fill.nc");

    let masked = GlmFile::open(&path).unwrap();
    let columns = glm_read_event_arrays(&masked).unwrap();
    let values = columns.floats("lon").unwrap();
    assert!(values[2].is_nan());
    assert_approx_eq!(values[0], five_events::LON[0], f64::from(scale));

    let config = ReaderConfig::default().with_mask_fill_values(false);
    let raw = GlmFile::open_with(&path, &config).unwrap();
    let columns = glm_read_event_arrays(&raw).unwrap();
    assert_approx_eq!(columns.floats("lon").unwrap()[2], fill_lon, 1e-3);
}

#[test]
fn test_packed_time_offsets_count_from_minus_65536() {
    let packed = Storage::Packed {
        scale: 3.8147e-5,
        offset: -5.0,
        unsigned: true,
        fill: None,
    };
    // Stored shorts of the reference granule's first five events
    let stored = vec![53066, 53066, 53896, 56816, 56866];

    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("event_time_offset", packed)
        .values("event_time_offset", Data::Int(stored.clone()))
        .store_as("group_time_offset", packed)
        .values("group_time_offset", Data::Int(stored[1..].to_vec()))
        .write_in(dir.path(), "packed_time.nc");
    let file = GlmFile::open(&path).unwrap();

    let events = glm_read_event_structs(&file).unwrap();
    assert!(are_same(events[0].time_offset, -0.475699), "{}", events[0].time_offset);
    for (i, event) in events.iter().enumerate() {
        assert!(
            are_same(event.time_offset, five_events::TIME_OFFSET[i]),
            "event {i}: {}",
            event.time_offset
        );
    }

    let columns = glm_read_event_arrays(&file).unwrap();
    assert_eq!(
        columns.floats("time_offset").unwrap(),
        &events.iter().map(|e| e.time_offset).collect::<Vec<_>>()[..]
    );

    let groups = glm_read_group_structs(&file).unwrap();
    for (group, want) in groups.iter().zip(&five_events::TIME_OFFSET[1..]) {
        assert!(are_same(group.time_offset, *want), "group {}", group.time_offset);
    }
}

#[test]
fn test_64_bit_float_column_is_type_mismatch() {
    let dir = temp_test_dir();
    let path = GlmFixture::five_events()
        .store_as("event_energy", Storage::I64)
        .values("event_energy", Data::Int(vec![(1 << 53) + 1, 1 << 53, 0, 1, 2]))
        .write_in(dir.path(), "wide_energy.nc");
    let file = GlmFile::open(&path).unwrap();

    match read_arrays(&file, Family::Event).unwrap_err() {
        GlmError::TypeMismatch {
            variable,
            found,
            expected,
            ..
        } => {
            assert_eq!(variable, "event_energy");
            assert_eq!(found, "int64");
            assert_eq!(expected, "f64");
        }
        other => panic!("unexpected error: {other}"),
    }
}
