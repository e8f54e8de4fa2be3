//! Record decoder: materializes a record family from an open file.
//!
//! Struct-major reads are built from the array-major columns, so both
//! layouts always carry bit-identical values.

use tracing::debug;

use crate::column::Columns;
use crate::error::{GlmError, GlmResult};
use crate::reader::GlmFile;
use crate::records::Record;
use crate::schema::Family;

/// Decode every column of `family`, in schema order.
///
/// Each column has exactly as many values as the family's dimension.
pub fn read_arrays(file: &GlmFile, family: Family) -> GlmResult<Columns> {
    let len = file.dimensions()?.count(family);

    let columns = family
        .columns()
        .iter()
        .map(|spec| Ok((spec.name, file.read_column(family, spec, len)?)))
        .collect::<GlmResult<Vec<_>>>()?;

    let columns = Columns::new(family, len, columns).map_err(|name| {
        GlmError::format(
            file.path(),
            format!("{} column '{}'", family, name),
            format!("{} values", len),
        )
    })?;

    debug!(
        path = %file.path().display(),
        family = %family,
        records = len,
        "Decoded columns"
    );
    Ok(columns)
}

/// Decode `R`'s family as one struct per record.
pub fn read_structs<R: Record>(file: &GlmFile) -> GlmResult<Vec<R>> {
    let columns = read_arrays(file, R::FAMILY)?;
    R::from_columns(file.path(), &columns)
}
