//! Unpacking of stored GLM variables into declared column types.
//!
//! GOES-R files follow the netCDF classic model, which has no unsigned
//! integers wider than 8 bits. From PUG-L2+ Vol. 5, 5.0.2:
//!
//! 1. Retrieve the variable data.
//! 2. Retrieve the `_Unsigned` attribute.
//! 3. If `_Unsigned` is "true", reinterpret the data as unsigned *before*
//!    applying `scale_factor` and `add_offset`. `_FillValue` and
//!    `valid_range` are governed by the same attribute.

use std::fmt;

use crate::column::Column;
use crate::schema::ColumnKind;

/// On-disk element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
    Str,
    /// Compound, opaque, enum or vlen.
    UserDefined,
}

impl StorageType {
    /// The type after applying `_Unsigned`. Only signed integers change.
    pub fn effective(self, unsigned: bool) -> StorageType {
        if !unsigned {
            return self;
        }
        match self {
            StorageType::I8 => StorageType::U8,
            StorageType::I16 => StorageType::U16,
            StorageType::I32 => StorageType::U32,
            StorageType::I64 => StorageType::U64,
            other => other,
        }
    }

    /// Width in bits for integer types.
    pub fn int_bits(self) -> Option<u32> {
        match self {
            StorageType::I8 | StorageType::U8 => Some(8),
            StorageType::I16 | StorageType::U16 => Some(16),
            StorageType::I32 | StorageType::U32 => Some(32),
            StorageType::I64 | StorageType::U64 => Some(64),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.int_bits().is_some() || matches!(self, StorageType::F32 | StorageType::F64)
    }

    /// Whether values of this (effective) type fit the declared column type
    /// without loss.
    ///
    /// 64-bit integers do not fit an f64 mantissa, so they are rejected
    /// for float columns.
    pub fn converts_to(self, kind: ColumnKind) -> bool {
        match kind {
            ColumnKind::Float => self.is_numeric() && self.int_bits() != Some(64),
            ColumnKind::Id => self.int_bits().is_some() && self != StorageType::U64,
            ColumnKind::Flag => matches!(
                self,
                StorageType::I8
                    | StorageType::U8
                    | StorageType::I16
                    | StorageType::U16
                    | StorageType::I32
            ),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageType::I8 => "byte",
            StorageType::U8 => "ubyte",
            StorageType::I16 => "short",
            StorageType::U16 => "ushort",
            StorageType::I32 => "int",
            StorageType::U32 => "uint",
            StorageType::I64 => "int64",
            StorageType::U64 => "uint64",
            StorageType::F32 => "float",
            StorageType::F64 => "double",
            StorageType::Char => "char",
            StorageType::Str => "string",
            StorageType::UserDefined => "user-defined type",
        };
        f.write_str(name)
    }
}

/// Packing attributes of one variable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Packing {
    /// `_Unsigned = "true"` was present.
    pub unsigned: bool,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
    pub fill_value: Option<f64>,
    /// Added to every stored integer after `_Unsigned` and before scaling.
    /// GLM time offsets are packed relative to -65536.
    pub raw_bias: i64,
}

/// Values as read from the file, after `_Unsigned` reinterpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValues {
    Signed(Vec<i64>),
    Unsigned(Vec<u64>),
    Float(Vec<f64>),
}

impl RawValues {
    /// Widen signed integers of `bits` width, reinterpreting them as
    /// unsigned when `unsigned` is set.
    pub fn from_signed(values: Vec<i64>, bits: u32, unsigned: bool) -> Self {
        if !unsigned {
            return RawValues::Signed(values);
        }
        RawValues::Unsigned(
            values
                .into_iter()
                .map(|v| reinterpret_unsigned(v, bits))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            RawValues::Signed(v) => v.len(),
            RawValues::Unsigned(v) => v.len(),
            RawValues::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn reinterpret_unsigned(value: i64, bits: u32) -> u64 {
    if bits >= 64 {
        value as u64
    } else {
        (value as u64) & ((1u64 << bits) - 1)
    }
}

/// Fill value in the stored integer domain of `storage`.
///
/// A negative fill on an `_Unsigned` variable is stored in the signed
/// type and must be reinterpreted like the data. A fill that is not a
/// whole number can never match an integer and is ignored.
fn integer_fill(packing: &Packing, storage: StorageType) -> Option<i64> {
    let fill = packing.fill_value?;
    let bits = storage.int_bits()?;
    if fill.fract() != 0.0 || bits >= 64 {
        return None;
    }
    let fill = fill as i64;
    if packing.unsigned && fill < 0 {
        Some(reinterpret_unsigned(fill, bits) as i64)
    } else {
        Some(fill)
    }
}

/// Convert raw values into the declared column type.
///
/// The caller has already checked [`StorageType::converts_to`] against
/// the effective type, so every integer reaching the float arm has at
/// most 32 bits and widens to f64 exactly. Fills are compared on the
/// stored value, before `raw_bias`.
pub fn decode(
    raw: RawValues,
    kind: ColumnKind,
    storage: StorageType,
    packing: &Packing,
    mask_fill: bool,
) -> Column {
    match kind {
        ColumnKind::Id => Column::Id(match raw {
            RawValues::Signed(v) => v,
            RawValues::Unsigned(v) => v.into_iter().map(|x| x as i64).collect(),
            RawValues::Float(v) => v.into_iter().map(|x| x as i64).collect(),
        }),
        ColumnKind::Flag => Column::Flag(match raw {
            RawValues::Signed(v) => v.into_iter().map(|x| x as i32).collect(),
            RawValues::Unsigned(v) => v.into_iter().map(|x| x as i32).collect(),
            RawValues::Float(v) => v.into_iter().map(|x| x as i32).collect(),
        }),
        ColumnKind::Float => {
            let scale = packing.scale_factor.unwrap_or(1.0);
            let offset = packing.add_offset.unwrap_or(0.0);
            let int_fill = if mask_fill {
                integer_fill(packing, storage)
            } else {
                None
            };
            let float_fill = if mask_fill && storage.int_bits().is_none() {
                packing.fill_value
            } else {
                None
            };

            let unpack_int = |x: i64| -> f64 {
                if int_fill == Some(x) {
                    f64::NAN
                } else {
                    (x + packing.raw_bias) as f64 * scale + offset
                }
            };
            Column::Float(match raw {
                RawValues::Signed(v) => v.into_iter().map(unpack_int).collect(),
                RawValues::Unsigned(v) => v.into_iter().map(|x| unpack_int(x as i64)).collect(),
                RawValues::Float(v) => v
                    .into_iter()
                    .map(|x| {
                        if float_fill == Some(x) {
                            f64::NAN
                        } else {
                            x * scale + offset
                        }
                    })
                    .collect(),
            })
        }
    }
}

/// Parse an `_Unsigned` attribute value.
pub fn is_unsigned_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_short_is_reinterpreted_before_scaling() {
        // -1 stored in a short with _Unsigned is 65535
        let raw = RawValues::from_signed(vec![-1, 0, 1], 16, true);
        assert_eq!(raw, RawValues::Unsigned(vec![65535, 0, 1]));

        let packing = Packing {
            unsigned: true,
            scale_factor: Some(0.5),
            add_offset: Some(-10.0),
            fill_value: None,
            raw_bias: 0,
        };
        let column = decode(raw, ColumnKind::Float, StorageType::I16, &packing, true);
        assert_eq!(column, Column::Float(vec![32757.5, -10.0, -9.5]));
    }

    #[test]
    fn test_fill_value_masks_to_nan_under_same_signedness() {
        let packing = Packing {
            unsigned: true,
            scale_factor: Some(2.0),
            add_offset: None,
            fill_value: Some(-1.0),
            raw_bias: 0,
        };
        let raw = RawValues::from_signed(vec![-1, 3], 16, true);
        let column = decode(raw, ColumnKind::Float, StorageType::I16, &packing, true);
        let values = column.as_floats().unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], 6.0);

        let raw = RawValues::from_signed(vec![-1, 3], 16, true);
        let column = decode(raw, ColumnKind::Float, StorageType::I16, &packing, false);
        assert_eq!(column, Column::Float(vec![131070.0, 6.0]));
    }

    #[test]
    fn test_float_source_is_widened_not_narrowed() {
        let value = -105.711212_f32;
        let raw = RawValues::Float(vec![f64::from(value)]);
        let column = decode(
            raw,
            ColumnKind::Float,
            StorageType::F32,
            &Packing::default(),
            true,
        );
        assert_eq!(column.as_floats().unwrap()[0], f64::from(value));
    }

    #[test]
    fn test_ids_keep_full_width() {
        let raw = RawValues::from_signed(vec![-1], 32, true);
        let column = decode(raw, ColumnKind::Id, StorageType::I32, &Packing::default(), true);
        assert_eq!(column, Column::Id(vec![4_294_967_295]));

        let raw = RawValues::Signed(vec![467_109_464_123]);
        let column = decode(raw, ColumnKind::Id, StorageType::I64, &Packing::default(), true);
        assert_eq!(column, Column::Id(vec![467_109_464_123]));
    }

    #[test]
    fn test_conversion_table() {
        assert!(StorageType::I16.effective(true).converts_to(ColumnKind::Flag));
        assert!(!StorageType::I32.effective(true).converts_to(ColumnKind::Flag));
        assert!(!StorageType::I64.converts_to(ColumnKind::Flag));
        assert!(StorageType::I64.converts_to(ColumnKind::Id));
        assert!(!StorageType::U64.converts_to(ColumnKind::Id));
        assert!(!StorageType::F32.converts_to(ColumnKind::Id));
        assert!(StorageType::U32.converts_to(ColumnKind::Float));
        assert!(!StorageType::U64.converts_to(ColumnKind::Float));
        assert!(!StorageType::I64.converts_to(ColumnKind::Float));
        assert!(!StorageType::Char.converts_to(ColumnKind::Float));
        assert!(!StorageType::Str.converts_to(ColumnKind::Id));
    }

    #[test]
    fn test_time_offset_bias_applies_to_every_stored_value() {
        // event_time_offset of the G17 reference granule, first event
        let packing = Packing {
            unsigned: true,
            scale_factor: Some(f64::from(3.8147e-5_f32)),
            add_offset: Some(-5.0),
            fill_value: None,
            raw_bias: 65536,
        };
        let raw = RawValues::from_signed(vec![53066 - 65536, 0], 16, true);
        let column = decode(raw, ColumnKind::Float, StorageType::I16, &packing, true);
        let values = column.as_floats().unwrap();
        assert!((values[0] - -0.475699).abs() < 1e-4, "{}", values[0]);
        assert!((values[1] - (65536.0 * 3.8147e-5 - 5.0)).abs() < 1e-4, "{}", values[1]);
    }

    #[test]
    fn test_fill_is_matched_on_stored_value() {
        let packing = Packing {
            unsigned: false,
            scale_factor: Some(0.5),
            add_offset: None,
            fill_value: Some(-32767.0),
            raw_bias: 1,
        };
        // -32768 plus the bias would equal the fill, but only -32767 is one
        let raw = RawValues::Signed(vec![-32767, -32768]);
        let column = decode(raw, ColumnKind::Float, StorageType::I16, &packing, true);
        let values = column.as_floats().unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], -16383.5);
    }

    #[test]
    fn test_unsigned_flag_parsing() {
        assert!(is_unsigned_flag("true"));
        assert!(is_unsigned_flag("True"));
        assert!(!is_unsigned_flag("false"));
    }
}
