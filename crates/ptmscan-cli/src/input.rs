use std::path::PathBuf;

use anyhow::{anyhow, ensure, Context};
use clap::{value_parser, Arg, ArgMatches, Command, ValueHint};
use ptmscan_core::{Dedup, KeyMode, ResidueAlphabet};
use ptmscan_io::Columns;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, Debug)]
/// Actual scan parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub input: String,
    pub examples_limit: usize,
    pub residues: ResidueAlphabet,
    pub key: KeyMode,
    pub dedup: Dedup,
    pub columns: Columns,
    pub sort_files: bool,
    pub input_paths: Vec<String>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Default, Debug)]
/// Input scan parameters deserialized from JSON file
pub struct Input {
    input: Option<String>,
    output_directory: Option<String>,
    examples_limit: Option<usize>,
    residues: Option<ResidueAlphabet>,
    key: Option<KeyMode>,
    dedup: Option<Dedup>,
    columns: Option<ColumnOptions>,
    sort_files: Option<bool>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct ColumnOptions {
    annotation: Option<String>,
    external_id: Option<String>,
}

impl From<ColumnOptions> for Columns {
    fn from(value: ColumnOptions) -> Columns {
        let default = Columns::default();
        Columns {
            annotation: value.annotation.unwrap_or(default.annotation),
            external_id: value.external_id.unwrap_or(default.external_id),
        }
    }
}

pub fn command() -> Command {
    Command::new("ptmscan")
        .version(clap::crate_version!())
        .about("Collect example occurrences of every modification found in identification tables")
        .arg(
            Arg::new("input")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Directory to search recursively for CSV, TSV, parquet and Arrow IPC tables, or a \
                     single table. Overrides the input listed in the configuration file.",
                )
                .value_hint(ValueHint::AnyPath),
        )
        .arg(
            Arg::new("parameters")
                .short('p')
                .long("parameters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where results will be written. Overrides the directory \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("limit")
                .short('n')
                .long("limit")
                .value_parser(value_parser!(usize))
                .help("Maximum number of examples to keep per modification (default = 5)")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("residues")
                .long("residues")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Residues that may carry a modification: `all`, `n-linked`, `o-linked`, \
                     `glycosylation` or a list of residue letters (default = all)",
                ),
        )
        .arg(
            Arg::new("key")
                .long("key")
                .value_parser(["residue_mass", "mass"])
                .help("Bucket examples by residue and mass, or by mass only"),
        )
        .arg(
            Arg::new("dedup")
                .long("dedup")
                .value_parser(["annotation", "entry"])
                .help(
                    "Skip examples whose annotation was already stored for the same \
                     modification, or only exact duplicate rows",
                ),
        )
        .arg(
            Arg::new("annotation_column")
                .long("annotation-column")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Column holding the modified peptide (default = modified_peptide)"),
        )
        .arg(
            Arg::new("id_column")
                .long("id-column")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Column holding the spectrum identifier (default = index)"),
        )
        .arg(
            Arg::new("no-sort")
                .long("no-sort")
                .action(clap::ArgAction::SetTrue)
                .help("Process files in directory traversal order instead of sorted by path"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let mut input = match matches.get_one::<String>("parameters") {
            Some(path) => Input::load(path)
                .with_context(|| format!("Failed to read parameters from `{path}`"))?,
            None => Input::default(),
        };

        // Handle JSON configuration overrides
        if let Some(path) = matches.get_one::<String>("input") {
            log::trace!("overriding `input` parameter.");
            input.input = Some(path.into());
        }
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(limit) = matches.get_one::<usize>("limit").copied() {
            input.examples_limit = Some(limit);
        }
        if let Some(residues) = matches.get_one::<String>("residues") {
            let residues = residues
                .parse::<ResidueAlphabet>()
                .with_context(|| format!("Invalid `--residues` value `{residues}`"))?;
            input.residues = Some(residues);
        }
        if let Some(key) = matches.get_one::<String>("key") {
            input.key = Some(key.parse().map_err(|e: String| anyhow!(e))?);
        }
        if let Some(dedup) = matches.get_one::<String>("dedup") {
            input.dedup = Some(dedup.parse().map_err(|e: String| anyhow!(e))?);
        }
        if let Some(column) = matches.get_one::<String>("annotation_column") {
            input
                .columns
                .get_or_insert_with(Default::default)
                .annotation = Some(column.into());
        }
        if let Some(column) = matches.get_one::<String>("id_column") {
            input
                .columns
                .get_or_insert_with(Default::default)
                .external_id = Some(column.into());
        }
        if matches.get_flag("no-sort") {
            input.sort_files = Some(false);
        }

        ensure!(
            input.input.is_some(),
            "`input` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&contents).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let input = self
            .input
            .ok_or_else(|| anyhow!("`input` must be set. For more information try '--help'"))?;

        let examples_limit = self.examples_limit.unwrap_or(5);
        if examples_limit == 0 {
            log::warn!("`examples_limit` is 0, no examples will be retained");
        } else if examples_limit > 1000 {
            log::warn!(
                "`examples_limit` is higher than expected; memory use grows with the number of \
                 distinct modifications times this limit"
            );
        }

        let columns: Columns = self.columns.map(Into::into).unwrap_or_default();
        ensure!(
            columns.annotation != columns.external_id,
            "`columns.annotation` and `columns.external_id` must name different columns"
        );

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Settings {
            version: clap::crate_version!().into(),
            input,
            examples_limit,
            residues: self.residues.unwrap_or_default(),
            key: self.key.unwrap_or_default(),
            dedup: self.dedup.unwrap_or_default(),
            columns,
            sort_files: self.sort_files.unwrap_or(true),
            input_paths: Vec::new(),
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
