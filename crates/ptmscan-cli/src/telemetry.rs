//! Summary of a completed run

use log::info;
use ptmscan_core::{RunCounters, Scan};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Telemetry {
    // Which version of ptmscan?
    version: String,
    // How many files were processed?
    files: usize,
    // How many distinct projects were processed?
    projects: usize,
    // How long did the scan take?
    runtime_secs: u64,
    // Modification occurrences seen, retained or not
    occurrences: u64,

    #[serde(flatten)]
    counters: RunCounters,
}

impl Telemetry {
    pub fn new(settings: &crate::input::Settings, scan: &Scan, runtime_secs: u64) -> Telemetry {
        Telemetry {
            version: settings.version.clone(),
            files: scan.files(),
            projects: scan.projects(),
            runtime_secs,
            occurrences: scan.tally().values().sum(),
            counters: scan.counters(),
        }
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn report(&self) {
        info!(
            "scanned {} files from {} projects in {}s",
            self.files, self.projects, self.runtime_secs
        );
        info!("- unmodified records:   {:8}", self.counters.unmodified_count);
        info!("- modified records:     {:8}", self.counters.modified_count);
        info!("- skipped records:      {:8}", self.counters.skipped_count);
        info!("- distinct modifications: {:6}", self.counters.distinct_keys_count);
        info!("- examples retained:    {:8}", self.counters.examples_added_count);
    }
}
