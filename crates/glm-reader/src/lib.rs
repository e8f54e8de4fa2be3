//! Reader for GOES-R GLM L2 Lightning Cluster-Filter Algorithm (LCFA)
//! NetCDF files.
//!
//! A GLM file holds three nested record families: flashes contain groups,
//! groups contain events. This crate decodes each family either
//! struct-major (one record per row) or column-major (one vector per
//! variable) and resolves the parent links between them.
//!
//! # Layers
//!
//! - [`GlmFile`] opens the container and exposes dimensions and scalars.
//! - [`decoder`] turns a family's variables into [`Columns`] or records,
//!   unpacking `scale_factor`/`add_offset`/`_Unsigned` as described in the
//!   GOES-R PUG.
//! - [`linkage`] maps child parent ids to parent positions under a
//!   [`DanglingPolicy`].
//! - [`GlmReader`] and the `glm_read_*` functions read whole files into an
//!   immutable [`QueryResult`].
//!
//! # Example
//!
//! ```no_run
//! use glm_reader::{Family, GlmReader, ReaderConfig};
//!
//! let reader = GlmReader::new(ReaderConfig::default());
//! let result = reader.read_file("OR_GLM-L2-LCFA.nc", &[Family::Event, Family::Group])?;
//! println!("{} events", result.dimensions.events());
//! # Ok::<(), glm_reader::GlmError>(())
//! ```

pub mod column;
pub mod config;
pub mod decoder;
pub mod error;
pub mod linkage;
pub mod native;
pub mod packing;
pub mod query;
pub mod reader;
pub mod records;
pub mod scalars;
pub mod schema;

pub use column::{approx_eq, are_same, Column, Columns, Value, EPSILON};
pub use config::ReaderConfig;
pub use error::{GlmError, GlmResult};
pub use linkage::{DanglingPolicy, LinkSummary, Linked, LinkedColumns, ParentIndex};
pub use native::silence_hdf5_errors;
pub use query::{
    glm_read_dims, glm_read_event_arrays, glm_read_event_structs, glm_read_file,
    glm_read_file_arrays, glm_read_flash_arrays, glm_read_flash_structs, glm_read_group_arrays,
    glm_read_group_structs, read_event_vars, read_flash_vars, read_group_vars, read_scalars,
    ColumnTables, GlmReader, LinkReport, QueryResult, RecordTables,
};
pub use reader::{DimensionTable, GlmFile};
pub use records::{ChildRecord, EventRecord, FlashRecord, GroupRecord, Record};
pub use scalars::{j2000_to_utc, ScalarSet, ScalarValue};
pub use schema::{variable_names, ColumnKind, Family};
