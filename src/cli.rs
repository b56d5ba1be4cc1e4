use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::aggregate::Dimension;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize retail transaction CSVs into a canonical table",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect which source column plays each semantic role
    Detect(DetectArgs),
    /// Write the normalized canonical table as CSV
    Normalize(NormalizeArgs),
    /// Preview the first few canonical rows in a formatted table
    Preview(PreviewArgs),
    /// Show headline KPIs and optional value counts
    Overview(OverviewArgs),
    /// Summarize sales grouped by one or more dimensions
    Summary(SummaryArgs),
    /// Write the default role vocabulary as YAML
    Vocabulary(VocabularyArgs),
}

/// Input location and column detection settings shared by every data command.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file overriding the candidate terms of one or more roles
    #[arg(long)]
    pub vocabulary: Option<PathBuf>,
    /// Force a role onto a column with `role=column`; `role=` leaves it unmapped
    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub map: Vec<String>,
}

#[derive(Debug, Args)]
pub struct NormalizeOptions {
    /// Seed for synthesized ages (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,
    /// Timestamp used for inputs without a date column (defaults to now)
    #[arg(long)]
    pub now: Option<String>,
    /// Limit number of source rows to normalize
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Keep only rows whose canonical City equals this value
    #[arg(long)]
    pub city: Option<String>,
    /// Keep only rows whose canonical Store_format equals this value
    #[arg(long = "store-format")]
    pub store_format: Option<String>,
    /// Earliest date to keep (inclusive)
    #[arg(long)]
    pub from: Option<String>,
    /// Latest date to keep (inclusive)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum MappingFormat {
    #[default]
    Table,
    Yaml,
    Json,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// How to print the detected mapping
    #[arg(long, default_value = "table")]
    pub format: MappingFormat,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub normalize: NormalizeOptions,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub normalize: NormalizeOptions,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub normalize: NormalizeOptions,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Dimensions to list value counts for
    #[arg(long = "counts", value_delimiter = ',')]
    pub counts: Vec<Dimension>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub normalize: NormalizeOptions,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Dimensions to group by, e.g. `city,store-format`
    #[arg(long = "by", value_delimiter = ',', required = true)]
    pub by: Vec<Dimension>,
    /// Keep only the N groups with the highest sales (0 keeps all)
    #[arg(long, default_value_t = 0)]
    pub top: usize,
    /// Write the summary as CSV instead of printing a table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct VocabularyArgs {
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn summary_dimensions_split_on_commas() {
        let cli = Cli::try_parse_from([
            "retail-normalizer",
            "summary",
            "-i",
            "sales.csv",
            "--by",
            "city,store-format",
            "--top",
            "3",
        ])
        .expect("parse");
        let Commands::Summary(args) = cli.command else {
            panic!("expected summary command");
        };
        assert_eq!(args.by, vec![Dimension::City, Dimension::StoreFormat]);
        assert_eq!(args.top, 3);
    }

    #[test]
    fn map_overrides_repeat() {
        let cli = Cli::try_parse_from([
            "retail-normalizer",
            "detect",
            "-i",
            "sales.csv",
            "--map",
            "city=Town",
            "--map",
            "age=",
            "--format",
            "json",
        ])
        .expect("parse");
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect command");
        };
        assert_eq!(args.source.map, vec!["city=Town", "age="]);
        assert_eq!(args.format, MappingFormat::Json);
    }
}
