use crate::report::DEFAULT_OUTPUT;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryFormat::Text => write!(f, "text"),
            SummaryFormat::Json => write!(f, "json"),
        }
    }
}

/// Where per-employee distribution records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupSource {
    Database {
        path: PathBuf,
        query: Option<String>,
    },
    File(PathBuf),
}

impl LookupSource {
    pub fn path(&self) -> &Path {
        match self {
            LookupSource::Database { path, .. } => path,
            LookupSource::File(path) => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimecardConfig {
    pub source: PathBuf,
    pub timecard: String,
    pub output: PathBuf,
    pub lookup: LookupSource,
    pub summary: SummaryFormat,
}

impl TimecardConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            source: cli_source,
            timecard: cli_timecard,
            output: cli_output,
            database: cli_database,
            distribution_query: cli_distribution_query,
            distribution_file: cli_distribution_file,
            summary: cli_summary,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            source: file_source,
            timecard: file_timecard,
            output: file_output,
            database: file_database,
            distribution_query: file_distribution_query,
            distribution_file: file_distribution_file,
            summary: file_summary,
        } = file_config;

        let source = cli_source
            .or(file_source)
            .context("a source spreadsheet is required (--source or TIMECARD_SOURCE)")?;

        let timecard = cli_timecard
            .or(file_timecard)
            .context("a timecard label is required (--timecard or TIMECARD_LABEL)")?;
        anyhow::ensure!(!timecard.trim().is_empty(), "timecard label must not be blank");

        let output = cli_output
            .or(file_output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

        let database = cli_database.or(file_database);
        let distribution_file = cli_distribution_file.or(file_distribution_file);
        let lookup = match (database, distribution_file) {
            (Some(path), None) => LookupSource::Database {
                path,
                query: cli_distribution_query
                    .or(file_distribution_query)
                    .filter(|query| !query.trim().is_empty()),
            },
            (None, Some(path)) => LookupSource::File(path),
            (Some(_), Some(_)) => anyhow::bail!(
                "configure either a distribution database or a distribution file, not both"
            ),
            (None, None) => anyhow::bail!(
                "a distribution source is required (--database or --distribution-file)"
            ),
        };

        let summary = cli_summary.or(file_summary).unwrap_or_default();

        Ok(Self {
            source,
            timecard,
            output,
            lookup,
            summary,
        })
    }

    /// Checks inputs before any work starts.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.source.exists(),
            "source spreadsheet {:?} does not exist",
            self.source
        );
        anyhow::ensure!(
            self.source.is_file(),
            "source spreadsheet {:?} is not a file",
            self.source
        );
        anyhow::ensure!(
            !self.timecard.trim().is_empty(),
            "timecard label must not be blank"
        );

        let output_is_xlsx = self
            .output
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false);
        anyhow::ensure!(
            output_is_xlsx,
            "output {:?} must have an .xlsx extension",
            self.output
        );

        let lookup_path = self.lookup.path();
        anyhow::ensure!(
            lookup_path.is_file(),
            "distribution source {:?} does not exist or is not a file",
            lookup_path
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "timecard-generator",
    about = "Extract payroll timecards from a timesheet spreadsheet",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMECARD_SOURCE",
        value_name = "FILE",
        help = "Timesheet spreadsheet to read (first worksheet)"
    )]
    pub source: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMECARD_LABEL",
        value_name = "LABEL",
        help = "Timecard label written to every header row"
    )]
    pub timecard: Option<String>,

    #[arg(
        long,
        env = "TIMECARD_OUTPUT",
        value_name = "FILE",
        help = "Generated workbook path (default GENERATED-TIMECARDS.xlsx)"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMECARD_DATABASE",
        value_name = "FILE",
        help = "SQLite database holding employee distribution codes"
    )]
    pub database: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMECARD_DISTRIBUTION_QUERY",
        value_name = "SQL",
        help = "Query selecting six distribution columns for employee ?1"
    )]
    pub distribution_query: Option<String>,

    #[arg(
        long,
        env = "TIMECARD_DISTRIBUTION_FILE",
        value_name = "FILE",
        help = "YAML or JSON table of employee distribution codes"
    )]
    pub distribution_file: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMECARD_SUMMARY",
        value_enum,
        value_name = "FORMAT",
        help = "Run summary format (text or json)"
    )]
    pub summary: Option<SummaryFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    source: Option<PathBuf>,
    timecard: Option<String>,
    output: Option<PathBuf>,
    database: Option<PathBuf>,
    distribution_query: Option<String>,
    distribution_file: Option<PathBuf>,
    summary: Option<SummaryFormat>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
