//! Parent/child linkage between record families.
//!
//! Events point at groups through `parent_group_id`, groups at flashes
//! through `parent_flash_id`. Both reference the parent's `id` value, not
//! its position, so an index from id to record position is built once per
//! parent family and every child is resolved against it in O(1).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::column::Columns;
use crate::error::{GlmError, GlmResult};
use crate::records::{ChildRecord, Record};
use crate::schema::Family;

/// What to do with a child whose parent id matches no parent record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    /// Fail the whole read with a linkage error.
    #[default]
    Fail,
    /// Remove the orphaned child and report how many were removed.
    Drop,
    /// Keep the child with no parent.
    NullParent,
}

impl DanglingPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DanglingPolicy::Fail => "fail",
            DanglingPolicy::Drop => "drop",
            DanglingPolicy::NullParent => "null",
        }
    }
}

impl fmt::Display for DanglingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DanglingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" | "error" => Ok(DanglingPolicy::Fail),
            "drop" => Ok(DanglingPolicy::Drop),
            "null" | "keep" => Ok(DanglingPolicy::NullParent),
            other => Err(format!(
                "unknown dangling policy '{}' (expected fail, drop or null)",
                other
            )),
        }
    }
}

/// Map from parent id to parent record position.
#[derive(Debug, Clone)]
pub struct ParentIndex {
    family: Family,
    positions: HashMap<i64, usize>,
}

impl ParentIndex {
    /// Index the `ids` of a parent family in one pass.
    ///
    /// A repeated id is a `DuplicateId` error: a child pointing at it
    /// would not resolve to exactly one parent.
    pub fn build(path: &Path, family: Family, ids: &[i64]) -> GlmResult<Self> {
        let mut positions = HashMap::with_capacity(ids.len());
        for (index, &id) in ids.iter().enumerate() {
            if let Some(first) = positions.insert(id, index) {
                return Err(GlmError::DuplicateId {
                    path: path.to_path_buf(),
                    family,
                    index,
                    id,
                    first,
                });
            }
        }
        Ok(Self { family, positions })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Position of the parent record with this id.
    pub fn position(&self, id: i64) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Outcome of resolving one child family against its parent index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Positions of the children that survive, ascending.
    pub kept: Vec<usize>,
    /// Parent position for each kept child, aligned with `kept`.
    pub parents: Vec<Option<usize>>,
    /// Children whose parent id did not resolve.
    pub orphans: usize,
}

/// Resolve every child's parent id against `index`.
pub fn link_ids(
    path: &Path,
    child: Family,
    parent_ids: &[i64],
    index: &ParentIndex,
    policy: DanglingPolicy,
) -> GlmResult<Resolution> {
    let mut kept = Vec::with_capacity(parent_ids.len());
    let mut parents = Vec::with_capacity(parent_ids.len());
    let mut orphans = 0;

    for (position, &parent_id) in parent_ids.iter().enumerate() {
        match index.position(parent_id) {
            Some(parent) => {
                kept.push(position);
                parents.push(Some(parent));
            }
            None => {
                orphans += 1;
                match policy {
                    DanglingPolicy::Fail => {
                        return Err(GlmError::Linkage {
                            path: path.to_path_buf(),
                            child,
                            parent: index.family(),
                            index: position,
                            parent_id,
                            reason: format!("no {} record has this id", index.family()),
                        });
                    }
                    DanglingPolicy::Drop => {}
                    DanglingPolicy::NullParent => {
                        kept.push(position);
                        parents.push(None);
                    }
                }
            }
        }
    }

    if orphans > 0 {
        warn!(
            child = %child,
            parent = %index.family(),
            orphans = orphans,
            policy = %policy,
            "Unresolved parent references"
        );
    }

    Ok(Resolution {
        kept,
        parents,
        orphans,
    })
}

/// Summary of one child→parent resolution, kept in query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub child: Family,
    pub parent: Family,
    pub policy: DanglingPolicy,
    /// Children whose parent id did not resolve.
    pub orphans: usize,
    /// Orphans removed from the result (non-zero only under `Drop`).
    pub dropped: usize,
}

impl LinkSummary {
    fn new(child: Family, parent: Family, policy: DanglingPolicy, orphans: usize) -> Self {
        Self {
            child,
            parent,
            policy,
            orphans,
            dropped: if policy == DanglingPolicy::Drop {
                orphans
            } else {
                0
            },
        }
    }
}

/// A record with its validated parent position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Linked<T> {
    pub record: T,
    /// Position of the parent record in the parent table, or `None` when
    /// the parent did not resolve (or was not read).
    pub parent: Option<usize>,
}

impl<T> Linked<T> {
    /// Wrap records whose parents were not resolved.
    pub fn unresolved(records: Vec<T>) -> Vec<Linked<T>> {
        records
            .into_iter()
            .map(|record| Linked {
                record,
                parent: None,
            })
            .collect()
    }
}

/// Resolve struct-major children against their parent records.
pub fn resolve_parents<C>(
    path: &Path,
    children: Vec<C>,
    parents: &[C::Parent],
    policy: DanglingPolicy,
) -> GlmResult<(Vec<Linked<C>>, LinkSummary)>
where
    C: ChildRecord,
{
    let parent_family = <C::Parent as Record>::FAMILY;
    let parent_ids: Vec<i64> = parents.iter().map(Record::id).collect();
    let index = ParentIndex::build(path, parent_family, &parent_ids)?;

    let child_ids: Vec<i64> = children.iter().map(ChildRecord::parent_id).collect();
    let resolution = link_ids(path, C::FAMILY, &child_ids, &index, policy)?;

    let mut slots: Vec<Option<C>> = children.into_iter().map(Some).collect();
    let linked = resolution
        .kept
        .iter()
        .zip(&resolution.parents)
        .filter_map(|(&position, &parent)| {
            slots[position].take().map(|record| Linked { record, parent })
        })
        .collect();

    let summary = LinkSummary::new(C::FAMILY, parent_family, policy, resolution.orphans);
    Ok((linked, summary))
}

/// Column-major children with their validated parent positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedColumns {
    pub columns: Columns,
    /// Parent position per record, aligned with `columns`.
    pub parents: Vec<Option<usize>>,
}

impl LinkedColumns {
    /// Wrap columns whose parents were not resolved.
    pub fn unresolved(columns: Columns) -> Self {
        let parents = vec![None; columns.len()];
        Self { columns, parents }
    }
}

/// Resolve column-major children against the parent family's columns.
pub fn resolve_columns(
    path: &Path,
    children: Columns,
    parents: &Columns,
    policy: DanglingPolicy,
) -> GlmResult<(LinkedColumns, LinkSummary)> {
    let child = children.family();
    let parent = parents.family();
    let expected_parent = child.parent();
    if expected_parent != Some(parent) {
        return Err(GlmError::format(
            path,
            format!("{} linkage", child),
            format!(
                "parent family {}",
                expected_parent.map_or("none", Family::as_str)
            ),
        ));
    }

    let parent_ids = parents
        .ids("id")
        .ok_or_else(|| GlmError::format(path, format!("{} columns", parent), "an id column"))?;
    let index = ParentIndex::build(path, parent, parent_ids)?;

    let key = child.parent_column().unwrap_or("id");
    let child_ids = children
        .ids(key)
        .ok_or_else(|| GlmError::format(path, format!("{} columns", child), format!("a {} column", key)))?;
    let resolution = link_ids(path, child, child_ids, &index, policy)?;

    let columns = if resolution.kept.len() == children.len() {
        children
    } else {
        children.select(&resolution.kept)
    };

    let summary = LinkSummary::new(child, parent, policy, resolution.orphans);
    Ok((
        LinkedColumns {
            columns,
            parents: resolution.parents,
        },
        summary,
    ))
}
