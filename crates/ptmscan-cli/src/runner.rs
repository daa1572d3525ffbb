use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use log::info;
use ptmscan_core::{scan_corpus, AnnotationParser, Scanner};
use serde::Serialize;

use crate::input::Settings;
use crate::telemetry::Telemetry;

pub struct Runner {
    pub parameters: Settings,
    scanner: Scanner,
    start: Instant,
}

#[derive(Serialize)]
struct Results<'a> {
    settings: &'a Settings,
    summary: &'a Telemetry,
}

impl Runner {
    pub fn new(mut parameters: Settings) -> anyhow::Result<Self> {
        let start = Instant::now();

        let paths = ptmscan_io::discover(&parameters.input, parameters.sort_files)
            .with_context(|| format!("Failed to collect input files from `{}`", parameters.input))?;
        info!("found {} files under {}", paths.len(), parameters.input);
        parameters.input_paths = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let parser = AnnotationParser::new(parameters.residues.clone())
            .with_context(|| format!("Invalid residue alphabet `{}`", parameters.residues))?;

        Ok(Self {
            scanner: Scanner::new(parser, parameters.key),
            parameters,
            start,
        })
    }

    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        let mut path = self.parameters.output_directory.clone();
        path.push(file_name.as_ref());
        path
    }

    pub fn run(mut self) -> anyhow::Result<Telemetry> {
        let columns = &self.parameters.columns;
        let scan = scan_corpus(
            &self.parameters.input_paths,
            &self.scanner,
            self.parameters.examples_limit,
            self.parameters.dedup,
            |path| {
                ptmscan_io::read_records(path, columns)
                    .with_context(|| format!("Failed to read `{}`", path.display()))
            },
        )?;

        let examples = self.write_examples(&scan.registry)?;
        self.parameters.output_paths.push(examples);
        let counts = self.write_counts(&scan)?;
        self.parameters.output_paths.push(counts);

        let path = self.make_path("results.json");
        self.parameters
            .output_paths
            .push(path.to_string_lossy().into_owned());

        let run_time = (Instant::now() - self.start).as_secs();
        let telemetry = Telemetry::new(&self.parameters, &scan, run_time);

        let results = Results {
            settings: &self.parameters,
            summary: &telemetry,
        };
        println!("{}", serde_json::to_string_pretty(&results)?);

        let bytes = serde_json::to_vec_pretty(&results)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;

        info!("finished in {}s", run_time);
        Ok(telemetry)
    }
}
