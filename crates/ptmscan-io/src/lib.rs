use std::path::{Path, PathBuf};

use ptmscan_core::Record;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

pub mod delimited;
pub mod ipc;
pub mod parquet;

/// Table formats recognized during discovery
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv { gzip: bool },
    Tsv { gzip: bool },
    Parquet,
    /// Arrow IPC file format, also written as `.feather` or `.arrow`
    Ipc,
}

impl FileFormat {
    /// Detect the format from the file name, ignoring case. Returns `None` for
    /// anything we don't know how to load.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let (stem, gzip) = match name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None => (name.as_str(), false),
        };
        match Path::new(stem).extension()?.to_str()? {
            "csv" => Some(FileFormat::Csv { gzip }),
            "tsv" => Some(FileFormat::Tsv { gzip }),
            "parquet" if !gzip => Some(FileFormat::Parquet),
            "ipc" | "arrow" | "feather" if !gzip => Some(FileFormat::Ipc),
            _ => None,
        }
    }
}

/// Names of the columns the scan requires in every table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    pub annotation: String,
    pub external_id: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            annotation: "modified_peptide".into(),
            external_id: "index".into(),
        }
    }
}

/// Collect the table files under `root`, which may be a directory (searched
/// recursively) or a single recognized file.
///
/// If `sort` is false, files are returned in directory traversal order,
/// which depends on the underlying file system.
pub fn discover<P: AsRef<Path>>(root: P, sort: bool) -> Result<Vec<PathBuf>, Error> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(Error::NotFound(root.into()));
    }

    if root.is_dir() {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if entry.file_type().is_file() && FileFormat::from_path(entry.path()).is_some() {
                paths.push(entry.into_path());
            }
        }
        if paths.is_empty() {
            return Err(Error::NoFiles(root.into()));
        }
        if sort {
            paths.sort();
        }
        log::trace!("discovered {} files under {}", paths.len(), root.display());
        Ok(paths)
    } else if root.is_file() && FileFormat::from_path(root).is_some() {
        Ok(vec![root.into()])
    } else {
        Err(Error::Validation(root.into()))
    }
}

/// Load every row of a table, in file order
pub fn read_records<P: AsRef<Path>>(path: P, columns: &Columns) -> Result<Vec<Record>, Error> {
    let path = path.as_ref();
    match FileFormat::from_path(path) {
        Some(FileFormat::Csv { gzip }) => delimited::read_records(path, b',', gzip, columns),
        Some(FileFormat::Tsv { gzip }) => delimited::read_records(path, b'\t', gzip, columns),
        Some(FileFormat::Parquet) => parquet::read_records(path, columns),
        Some(FileFormat::Ipc) => ipc::read_records(path, columns),
        None => Err(Error::Validation(path.into())),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("location `{}` not found", .0.display())]
    NotFound(PathBuf),
    #[error(
        "location `{}` is neither a directory nor a CSV, TSV, parquet or Arrow IPC file",
        .0.display()
    )]
    Validation(PathBuf),
    #[error("no CSV, TSV, parquet or Arrow IPC files found under `{}`", .0.display())]
    NoFiles(PathBuf),
    #[error("`{}`: missing required column `{}`", .path.display(), .column)]
    MissingColumn { path: PathBuf, column: String },
    #[error("`{}` row {}: column `{}` does not hold text", .path.display(), .row, .column)]
    UnexpectedType {
        path: PathBuf,
        row: usize,
        column: String,
    },
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
    #[error("directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),
}
