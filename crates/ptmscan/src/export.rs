//! Flatten accumulated scan state into ordered rows for an external writer

use crate::corpus::Scan;
use crate::registry::{ExampleEntry, ExampleRegistry, ModificationKey};

/// Column order of the examples table. Downstream tooling depends on it.
pub const EXAMPLE_COLUMNS: [&str; 7] = [
    "residue",
    "mass_label",
    "project_name",
    "file_name",
    "external_id",
    "record_index",
    "annotation",
];

pub const COUNT_COLUMNS: [&str; 4] = ["residue", "mass_label", "occurrences", "examples"];

/// One retained example, in export order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExampleRow<'a> {
    pub key: &'a ModificationKey,
    pub entry: &'a ExampleEntry,
}

/// How often a modification key was observed, and how many examples of it
/// were retained
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyCount<'a> {
    pub key: &'a ModificationKey,
    pub occurrences: u64,
    pub examples: usize,
}

pub fn example_rows(registry: &ExampleRegistry) -> Vec<ExampleRow<'_>> {
    registry
        .export()
        .map(|(key, entry)| ExampleRow { key, entry })
        .collect()
}

/// One row per observed key, in first-seen order
pub fn key_counts(scan: &Scan) -> Vec<KeyCount<'_>> {
    scan.tally()
        .iter()
        .map(|(key, &occurrences)| KeyCount {
            key,
            occurrences,
            examples: scan.registry.get(key).map(|e| e.len()).unwrap_or(0),
        })
        .collect()
}
