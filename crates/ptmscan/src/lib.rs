pub mod annotation;
pub mod corpus;
pub mod export;
pub mod registry;

pub use annotation::{AnnotationParser, InvalidAlphabet, Occurrence, ResidueAlphabet};
pub use corpus::{scan_corpus, FileSummary, Provenance, Record, RunCounters, Scan, Scanner};
pub use registry::{Dedup, ExampleEntry, ExampleRegistry, KeyMode, ModificationKey};
