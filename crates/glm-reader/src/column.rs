//! Column-major storage for decoded record families.

use serde::Serialize;

use crate::schema::{ColumnKind, Family};

/// Default tolerance for comparing decoded floating values.
pub const EPSILON: f64 = 1e-4;

/// True when `a` and `b` differ by less than [`EPSILON`].
pub fn are_same(a: f64, b: f64) -> bool {
    approx_eq(a, b, EPSILON)
}

/// True when `|a - b| < epsilon`.
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// A single decoded cell.
///
/// Equality compares floats by bit pattern, so two NaNs from the same
/// fill value are equal and `-0.0 != 0.0`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Value {
    Id(i64),
    Float(f64),
    Flag(i32),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Id(a), Value::Id(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Flag(a), Value::Flag(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Id(v) => v as f64,
            Value::Float(v) => v,
            Value::Flag(v) => f64::from(v),
        }
    }
}

/// One decoded column.
///
/// Like [`Value`], equality compares floats by bit pattern.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Column {
    Id(Vec<i64>),
    Float(Vec<f64>),
    Flag(Vec<i32>),
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Column::Id(a), Column::Id(b)) => a == b,
            (Column::Float(a), Column::Float(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Column::Flag(a), Column::Flag(b)) => a == b,
            _ => false,
        }
    }
}

impl Column {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Id(_) => ColumnKind::Id,
            Column::Float(_) => ColumnKind::Float,
            Column::Flag(_) => ColumnKind::Flag,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Id(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Flag(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at record `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Column::Id(v) => v.get(index).copied().map(Value::Id),
            Column::Float(v) => v.get(index).copied().map(Value::Float),
            Column::Flag(v) => v.get(index).copied().map(Value::Flag),
        }
    }

    pub fn as_ids(&self) -> Option<&[i64]> {
        match self {
            Column::Id(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&[i32]> {
        match self {
            Column::Flag(v) => Some(v),
            _ => None,
        }
    }

    /// New column holding only the rows listed in `rows`, in that order.
    fn select(&self, rows: &[usize]) -> Column {
        fn pick<T: Copy>(values: &[T], rows: &[usize]) -> Vec<T> {
            rows.iter().map(|&row| values[row]).collect()
        }
        match self {
            Column::Id(v) => Column::Id(pick(v, rows)),
            Column::Float(v) => Column::Float(pick(v, rows)),
            Column::Flag(v) => Column::Flag(pick(v, rows)),
        }
    }
}

/// All decoded columns of one family, in schema order.
///
/// Every column has exactly `len()` entries; index `i` in any column is
/// the i-th record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Columns {
    family: Family,
    len: usize,
    columns: Vec<(&'static str, Column)>,
}

impl Columns {
    /// Build a column set, checking that every column has `len` entries.
    ///
    /// Returns the offending column name on a length mismatch.
    pub fn new(
        family: Family,
        len: usize,
        columns: Vec<(&'static str, Column)>,
    ) -> Result<Self, &'static str> {
        if let Some((name, _)) = columns.iter().find(|(_, column)| column.len() != len) {
            return Err(*name);
        }
        Ok(Self {
            family,
            len,
            columns,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Column by logical name.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, column)| column)
    }

    /// Cell at (`name`, `index`).
    pub fn value(&self, name: &str, index: usize) -> Option<Value> {
        self.get(name)?.get(index)
    }

    /// Column names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Column)> {
        self.columns.iter().map(|(name, column)| (*name, column))
    }

    pub fn ids(&self, name: &str) -> Option<&[i64]> {
        self.get(name)?.as_ids()
    }

    pub fn floats(&self, name: &str) -> Option<&[f64]> {
        self.get(name)?.as_floats()
    }

    pub fn flags(&self, name: &str) -> Option<&[i32]> {
        self.get(name)?.as_flags()
    }

    /// Keep only `rows` (indices into this set, ascending), applied to
    /// every column alike.
    pub fn select(&self, rows: &[usize]) -> Columns {
        Columns {
            family: self.family,
            len: rows.len(),
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (*name, column.select(rows)))
                .collect(),
        }
    }
}
