//! Query facade: whole-file reads returning immutable snapshots.
//!
//! Every call opens its own handle and closes it before returning, on
//! success and on failure alike. Nothing is cached between calls.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::column::Columns;
use crate::config::ReaderConfig;
use crate::decoder::{read_arrays, read_structs};
use crate::error::{GlmError, GlmResult};
use crate::linkage::{
    resolve_columns, resolve_parents, LinkSummary, Linked, LinkedColumns,
};
use crate::native::silence_hdf5_errors;
use crate::reader::{DimensionTable, GlmFile};
use crate::records::{EventRecord, FlashRecord, GroupRecord};
use crate::scalars::ScalarSet;
use crate::schema::{variable_names, Family};

/// Struct-major family tables. A family that was not requested is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordTables {
    pub events: Option<Vec<Linked<EventRecord>>>,
    pub groups: Option<Vec<Linked<GroupRecord>>>,
    pub flashes: Option<Vec<FlashRecord>>,
}

/// Column-major family tables. A family that was not requested is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnTables {
    pub events: Option<LinkedColumns>,
    pub groups: Option<LinkedColumns>,
    pub flashes: Option<Columns>,
}

/// Linkage outcomes of one read, children first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkReport {
    links: Vec<LinkSummary>,
}

impl LinkReport {
    /// Summary for the link from `child` to its parent, if it was resolved.
    pub fn for_child(&self, child: Family) -> Option<&LinkSummary> {
        self.links.iter().find(|link| link.child == child)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkSummary> {
        self.links.iter()
    }

    /// Total orphans across all resolved links.
    pub fn orphans(&self) -> usize {
        self.links.iter().map(|link| link.orphans).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn push(&mut self, summary: LinkSummary) {
        self.links.push(summary);
        self.links.sort_by_key(|link| link.child);
    }
}

/// Everything one read produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<T> {
    pub path: PathBuf,
    pub dimensions: DimensionTable,
    pub scalars: ScalarSet,
    pub tables: T,
    pub links: LinkReport,
}

/// Entry point for reading GLM files with a fixed configuration.
#[derive(Debug, Clone)]
pub struct GlmReader {
    config: ReaderConfig,
}

impl Default for GlmReader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

impl GlmReader {
    pub fn new(config: ReaderConfig) -> Self {
        silence_hdf5_errors();
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Open a file with this reader's configuration.
    pub fn open(&self, path: impl AsRef<Path>) -> GlmResult<GlmFile> {
        GlmFile::open_with(path, &self.config)
    }

    /// Open `path`, run `f`, and close the handle whatever `f` returns.
    fn with_file<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&GlmFile) -> GlmResult<T>,
    ) -> GlmResult<T> {
        let mut file = self.open(path)?;
        let result = f(&file);
        file.close();
        result
    }

    /// Read the requested families struct-major. An empty request reads
    /// all three.
    pub fn read_file(
        &self,
        path: impl AsRef<Path>,
        families: &[Family],
    ) -> GlmResult<QueryResult<RecordTables>> {
        let path = path.as_ref();
        let wanted = requested(families);
        let start = Instant::now();
        let policy = self.config.dangling_policy;

        let result = self.with_file(path, |file| {
            let dimensions = file.dimensions()?.clone();
            let scalars = file.scalars()?.clone();
            let mut links = LinkReport::default();

            let flashes = if wanted.contains(&Family::Flash) {
                Some(read_structs::<FlashRecord>(file)?)
            } else {
                None
            };

            let groups = if wanted.contains(&Family::Group) {
                let groups = read_structs::<GroupRecord>(file)?;
                Some(match &flashes {
                    Some(flashes) => {
                        let (linked, summary) = resolve_parents(path, groups, flashes, policy)?;
                        links.push(summary);
                        linked
                    }
                    None => Linked::unresolved(groups),
                })
            } else {
                None
            };

            let events = if wanted.contains(&Family::Event) {
                let events = read_structs::<EventRecord>(file)?;
                Some(match &groups {
                    Some(groups) => {
                        let parents: Vec<GroupRecord> =
                            groups.iter().map(|linked| linked.record).collect();
                        let (linked, summary) = resolve_parents(path, events, &parents, policy)?;
                        links.push(summary);
                        linked
                    }
                    None => Linked::unresolved(events),
                })
            } else {
                None
            };

            Ok(QueryResult {
                path: path.to_path_buf(),
                dimensions,
                scalars,
                tables: RecordTables {
                    events,
                    groups,
                    flashes,
                },
                links,
            })
        })?;

        info!(
            path = %path.display(),
            events = result.tables.events.as_ref().map_or(0, Vec::len),
            groups = result.tables.groups.as_ref().map_or(0, Vec::len),
            flashes = result.tables.flashes.as_ref().map_or(0, Vec::len),
            orphans = result.links.orphans(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Read GLM file"
        );
        Ok(result)
    }

    /// Read the requested families column-major. An empty request reads
    /// all three.
    pub fn read_file_arrays(
        &self,
        path: impl AsRef<Path>,
        families: &[Family],
    ) -> GlmResult<QueryResult<ColumnTables>> {
        let path = path.as_ref();
        let wanted = requested(families);
        let start = Instant::now();
        let policy = self.config.dangling_policy;

        let result = self.with_file(path, |file| {
            let dimensions = file.dimensions()?.clone();
            let scalars = file.scalars()?.clone();
            let mut links = LinkReport::default();

            let flashes = if wanted.contains(&Family::Flash) {
                Some(read_arrays(file, Family::Flash)?)
            } else {
                None
            };

            let groups = if wanted.contains(&Family::Group) {
                let groups = read_arrays(file, Family::Group)?;
                Some(match &flashes {
                    Some(flashes) => {
                        let (linked, summary) = resolve_columns(path, groups, flashes, policy)?;
                        links.push(summary);
                        linked
                    }
                    None => LinkedColumns::unresolved(groups),
                })
            } else {
                None
            };

            let events = if wanted.contains(&Family::Event) {
                let events = read_arrays(file, Family::Event)?;
                Some(match &groups {
                    Some(groups) => {
                        let (linked, summary) =
                            resolve_columns(path, events, &groups.columns, policy)?;
                        links.push(summary);
                        linked
                    }
                    None => LinkedColumns::unresolved(events),
                })
            } else {
                None
            };

            Ok(QueryResult {
                path: path.to_path_buf(),
                dimensions,
                scalars,
                tables: ColumnTables {
                    events,
                    groups,
                    flashes,
                },
                links,
            })
        })?;

        info!(
            path = %path.display(),
            events = result.tables.events.as_ref().map_or(0, |t| t.columns.len()),
            groups = result.tables.groups.as_ref().map_or(0, |t| t.columns.len()),
            flashes = result.tables.flashes.as_ref().map_or(0, Columns::len),
            orphans = result.links.orphans(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Read GLM file arrays"
        );
        Ok(result)
    }
}

/// Deduplicated request; empty means every family.
fn requested(families: &[Family]) -> Vec<Family> {
    if families.is_empty() {
        return Family::ALL.to_vec();
    }
    let mut wanted = families.to_vec();
    wanted.sort();
    wanted.dedup();
    wanted
}

// =============================================================================
// Free functions over an open handle
// =============================================================================

/// Dimension table of an open file.
pub fn glm_read_dims(file: &GlmFile) -> GlmResult<DimensionTable> {
    file.dimensions().cloned()
}

/// Scalar set of an open file.
pub fn read_scalars(file: &GlmFile) -> GlmResult<ScalarSet> {
    file.scalars().cloned()
}

fn read_vars(file: &GlmFile, family: Family) -> GlmResult<Vec<&'static str>> {
    let names = variable_names(family);
    for name in &names {
        if !file.has_variable(name)? {
            return Err(GlmError::format(
                file.path(),
                format!("{} variables", family),
                format!("variable '{}'", name),
            ));
        }
    }
    Ok(names)
}

/// Ordered event variable names, checked present in `file`.
pub fn read_event_vars(file: &GlmFile) -> GlmResult<Vec<&'static str>> {
    read_vars(file, Family::Event)
}

/// Ordered group variable names, checked present in `file`.
pub fn read_group_vars(file: &GlmFile) -> GlmResult<Vec<&'static str>> {
    read_vars(file, Family::Group)
}

/// Ordered flash variable names, checked present in `file`.
pub fn read_flash_vars(file: &GlmFile) -> GlmResult<Vec<&'static str>> {
    read_vars(file, Family::Flash)
}

pub fn glm_read_event_structs(file: &GlmFile) -> GlmResult<Vec<EventRecord>> {
    read_structs(file)
}

pub fn glm_read_group_structs(file: &GlmFile) -> GlmResult<Vec<GroupRecord>> {
    read_structs(file)
}

pub fn glm_read_flash_structs(file: &GlmFile) -> GlmResult<Vec<FlashRecord>> {
    read_structs(file)
}

pub fn glm_read_event_arrays(file: &GlmFile) -> GlmResult<Columns> {
    read_arrays(file, Family::Event)
}

pub fn glm_read_group_arrays(file: &GlmFile) -> GlmResult<Columns> {
    read_arrays(file, Family::Group)
}

pub fn glm_read_flash_arrays(file: &GlmFile) -> GlmResult<Columns> {
    read_arrays(file, Family::Flash)
}

/// Struct-major read of `path` with the default configuration.
pub fn glm_read_file(
    path: impl AsRef<Path>,
    families: &[Family],
) -> GlmResult<QueryResult<RecordTables>> {
    GlmReader::default().read_file(path, families)
}

/// Column-major read of `path` with the default configuration.
pub fn glm_read_file_arrays(
    path: impl AsRef<Path>,
    families: &[Family],
) -> GlmResult<QueryResult<ColumnTables>> {
    GlmReader::default().read_file_arrays(path, families)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_defaults_to_all_and_dedups() {
        assert_eq!(requested(&[]), Family::ALL.to_vec());
        assert_eq!(
            requested(&[Family::Flash, Family::Event, Family::Flash]),
            vec![Family::Event, Family::Flash]
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = glm_read_file("/nonexistent/glm.nc", &[]).unwrap_err();
        assert!(matches!(err, GlmError::NotFound { .. }));
    }
}
