//! What the builder had to repair.
//!
//! The builder never fails; it demotes comments to roots and drops duplicate
//! ids. The report lets callers flag those cases out-of-band.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::node::ThreadNode;
use crate::record::CommentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemotionReason {
    /// A parent reference was present but could not be normalized.
    UnrecoverableReference,
    /// The parent id is not in the current input set.
    MissingParent,
    /// Attaching to the parent would have created a cycle.
    Cycle,
}

impl DemotionReason {
    pub fn description(self) -> &'static str {
        match self {
            DemotionReason::UnrecoverableReference => "unrecoverable parent reference",
            DemotionReason::MissingParent => "parent not found",
            DemotionReason::Cycle => "parent reference cycle",
        }
    }
}

impl fmt::Display for DemotionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A comment threaded as a root even though it declared a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Demotion {
    pub id: String,
    pub reason: DemotionReason,
    /// The parent as declared: the normalized id, or the raw text when it
    /// could not be recovered.
    pub declared_parent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub demotions: Vec<Demotion>,
    /// Ids seen more than once; only the first record was kept.
    pub duplicates: Vec<String>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.demotions.is_empty() && self.duplicates.is_empty()
    }

    pub fn count(&self, reason: DemotionReason) -> usize {
        self.demotions.iter().filter(|d| d.reason == reason).count()
    }
}

/// Ids of records that declared a parent but ended up as roots of `forest`.
///
/// For callers that only hold the input list and the output forest.
pub fn demoted_ids(records: &[CommentRecord], forest: &[ThreadNode]) -> Vec<String> {
    let roots: HashSet<&str> = forest.iter().map(|root| root.id.as_str()).collect();
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.id.as_str()))
        .filter(|record| !record.parent_ref.is_none() && roots.contains(record.id.as_str()))
        .map(|record| record.id.clone())
        .collect()
}
