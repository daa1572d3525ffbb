//! Single-pass traversal of a file corpus, accumulating example occurrences
//! and run-level counters

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use log::info;
use serde::Serialize;

use crate::annotation::AnnotationParser;
use crate::registry::{Dedup, ExampleEntry, ExampleRegistry, KeyMode, ModificationKey};

/// One row of an identification table, reduced to the fields we need
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Position of the row within its file
    pub record_index: usize,
    pub external_id: String,
    pub annotation: Option<String>,
}

/// Project and file names of an input file, derived from its path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    pub project_name: String,
    pub file_name: String,
}

impl Provenance {
    /// The project is the name of the directory containing the file, or an
    /// empty string if the path has no parent directory
    pub fn from_path(path: &Path) -> Self {
        let name = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        Provenance {
            project_name: name(path.parent()),
            file_name: name(Some(path)),
        }
    }
}

/// Informational counters; these never affect control flow
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub modified_count: u64,
    pub unmodified_count: u64,
    pub skipped_count: u64,
    pub examples_added_count: u64,
    pub distinct_keys_count: u64,
}

/// Counts for one file, reported after it has been processed
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub rows: u64,
    pub modified: u64,
    pub unmodified: u64,
    pub skipped: u64,
    pub examples_added: u64,
}

/// Static scan configuration: how to find markers and how to bucket them
#[derive(Clone, Debug)]
pub struct Scanner {
    pub parser: AnnotationParser,
    pub key_mode: KeyMode,
}

impl Scanner {
    pub fn new(parser: AnnotationParser, key_mode: KeyMode) -> Self {
        Self { parser, key_mode }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(AnnotationParser::default(), KeyMode::default())
    }
}

/// All state accumulated during a traversal
#[derive(Clone, Debug)]
pub struct Scan {
    pub registry: ExampleRegistry,
    counters: RunCounters,
    /// Every occurrence seen per key, retained as an example or not
    tally: IndexMap<ModificationKey, u64>,
    files: usize,
    /// Distinct project names, in first-seen order
    project_names: IndexSet<String>,
    current_project_name: Option<String>,
}

impl Scan {
    pub fn new(limit: usize, dedup: Dedup) -> Self {
        Self {
            registry: ExampleRegistry::new(limit, dedup),
            counters: RunCounters::default(),
            tally: IndexMap::new(),
            files: 0,
            project_names: IndexSet::new(),
            current_project_name: None,
        }
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            distinct_keys_count: self.registry.len() as u64,
            ..self.counters
        }
    }

    pub fn tally(&self) -> &IndexMap<ModificationKey, u64> {
        &self.tally
    }

    /// Number of files processed so far
    pub fn files(&self) -> usize {
        self.files
    }

    /// Number of distinct projects processed so far
    pub fn projects(&self) -> usize {
        self.project_names.len()
    }

    /// Feed a single record through the parser and into the registry
    pub fn process_record(
        &mut self,
        scanner: &Scanner,
        provenance: &Provenance,
        record: Record,
        summary: &mut FileSummary,
    ) {
        summary.rows += 1;
        let annotation = match record.annotation {
            Some(annotation) => annotation,
            None => {
                summary.skipped += 1;
                self.counters.skipped_count += 1;
                return;
            }
        };

        let mut modified = false;
        for occurrence in scanner.parser.occurrences(&annotation) {
            modified = true;
            let key = scanner.key_mode.key(&occurrence);
            *self.tally.entry(key.clone()).or_insert(0) += 1;

            let entry = ExampleEntry {
                residue: occurrence.residue,
                mass_label: occurrence.mass_label,
                project_name: provenance.project_name.clone(),
                file_name: provenance.file_name.clone(),
                external_id: record.external_id.clone(),
                record_index: record.record_index,
                annotation: annotation.clone(),
            };
            if self.registry.register(key, entry) {
                summary.examples_added += 1;
                self.counters.examples_added_count += 1;
            }
        }

        if modified {
            summary.modified += 1;
            self.counters.modified_count += 1;
        } else {
            summary.unmodified += 1;
            self.counters.unmodified_count += 1;
        }
    }

    /// Process every record of one file, in table order
    pub fn process_file<I>(&mut self, scanner: &Scanner, path: &Path, records: I) -> FileSummary
    where
        I: IntoIterator<Item = Record>,
    {
        let provenance = Provenance::from_path(path);
        if self.current_project_name.as_deref() != Some(provenance.project_name.as_str()) {
            info!("processing project {}", provenance.project_name);
            self.current_project_name = Some(provenance.project_name.clone());
            self.project_names.insert(provenance.project_name.clone());
        }

        let mut summary = FileSummary::default();
        for record in records {
            self.process_record(scanner, &provenance, record, &mut summary);
        }
        self.files += 1;

        info!(
            "- {}/{}: {} rows, {} modified, {} unmodified, {} skipped, {} new examples",
            provenance.project_name,
            provenance.file_name,
            summary.rows,
            summary.modified,
            summary.unmodified,
            summary.skipped,
            summary.examples_added
        );
        summary
    }
}

/// Walk `paths` in order, loading each file's records with `load` and
/// accumulating them into a fresh [`Scan`]. The first loader error aborts the
/// traversal.
pub fn scan_corpus<P, F, E>(
    paths: &[P],
    scanner: &Scanner,
    limit: usize,
    dedup: Dedup,
    mut load: F,
) -> Result<Scan, E>
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> Result<Vec<Record>, E>,
{
    let mut scan = Scan::new(limit, dedup);
    for path in paths {
        let path = path.as_ref();
        let records = load(path)?;
        log::trace!("{}: loaded {} records", path.display(), records.len());
        scan.process_file(scanner, path, records);
    }
    Ok(scan)
}
