pub mod aggregate;
pub mod canonical;
pub mod cli;
pub mod data;
pub mod detect;
pub mod error;
pub mod export;
pub mod io_utils;
pub mod normalize;
pub mod preview;
pub mod raw;
pub mod session;
pub mod summary;
pub mod table;
pub mod vocabulary;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    aggregate::Filters,
    cli::{Cli, Commands, FilterArgs, MappingFormat, NormalizeOptions, SourceArgs},
    detect::parse_overrides,
    raw::RawTable,
    session::{Session, SessionConfig},
    vocabulary::{SemanticRole, Vocabulary},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("retail_normalizer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => handle_detect(&args),
        Commands::Normalize(args) => export::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Overview(args) => summary::execute_overview(&args),
        Commands::Summary(args) => summary::execute(&args),
        Commands::Vocabulary(args) => handle_vocabulary(&args),
    }
}

fn handle_detect(args: &cli::DetectArgs) -> Result<()> {
    let source = &args.source;
    let delimiter = io_utils::resolve_input_delimiter(&source.input, source.delimiter);
    info!(
        "Detecting roles in '{}' with delimiter '{}'",
        source.input.display(),
        printable_delimiter(delimiter)
    );
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    let raw = RawTable::load(&source.input, delimiter, encoding)
        .with_context(|| format!("Loading {:?}", source.input))?;
    let config = detection_config(source)?;
    let mapping = session::resolve_mapping(&raw, &config)?;

    match args.format {
        MappingFormat::Table => {
            let headers = ["Role", "Field", "Column"].map(String::from).to_vec();
            let rows = SemanticRole::ALL
                .iter()
                .map(|role| {
                    vec![
                        role.key().to_string(),
                        role.canonical_field().to_string(),
                        mapping.column(*role).unwrap_or_default().to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            table::print_table(&headers, &rows);
        }
        MappingFormat::Yaml => {
            let rendered =
                serde_yaml::to_string(&mapping).context("Serializing mapping to YAML")?;
            print!("{rendered}");
        }
        MappingFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(&mapping).context("Serializing mapping to JSON")?;
            println!("{rendered}");
        }
    }
    info!(
        "Mapped {} of {} role(s) across {} column(s)",
        mapping.iter().count(),
        SemanticRole::ALL.len(),
        raw.headers().len()
    );
    Ok(())
}

fn handle_vocabulary(args: &cli::VocabularyArgs) -> Result<()> {
    let vocabulary = Vocabulary::default();
    match &args.output {
        Some(path) => {
            vocabulary
                .save(path)
                .with_context(|| format!("Writing vocabulary to {path:?}"))?;
            info!("Default vocabulary written to {path:?}");
        }
        None => print!("{}", vocabulary.to_yaml_string()?),
    }
    Ok(())
}

fn detection_config(source: &SourceArgs) -> Result<SessionConfig> {
    let vocabulary = match &source.vocabulary {
        Some(path) => {
            debug!("Loading vocabulary from {path:?}");
            Vocabulary::load(path)?
        }
        None => Vocabulary::default(),
    };
    Ok(SessionConfig {
        vocabulary,
        overrides: parse_overrides(&source.map)?,
        ..SessionConfig::default()
    })
}

pub(crate) fn session_config(
    source: &SourceArgs,
    options: &NormalizeOptions,
) -> Result<SessionConfig> {
    let now = match options.now.as_deref() {
        Some(value) => Some(
            data::parse_timestamp(value)
                .ok_or_else(|| anyhow!("Unrecognized --now timestamp '{value}'"))?,
        ),
        None => None,
    };
    Ok(SessionConfig {
        seed: options.seed,
        now,
        limit: options.limit,
        ..detection_config(source)?
    })
}

/// Loads, detects and normalizes the input named by `source`.
pub(crate) fn open_session(source: &SourceArgs, options: &NormalizeOptions) -> Result<Session> {
    let delimiter = io_utils::resolve_input_delimiter(&source.input, source.delimiter);
    info!(
        "Normalizing '{}' with delimiter '{}'",
        source.input.display(),
        printable_delimiter(delimiter)
    );
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    let config = session_config(source, options)?;
    Session::open(&source.input, delimiter, encoding, &config)
}

pub(crate) fn build_filters(args: &FilterArgs) -> Result<Filters> {
    let parse_bound = |flag: &str, value: Option<&str>| match value {
        Some(raw) => data::parse_naive_date(raw.trim())
            .map(Some)
            .ok_or_else(|| anyhow!("Unrecognized {flag} date '{raw}'")),
        None => Ok(None),
    };
    let filters = Filters {
        city: args.city.clone(),
        store_format: args.store_format.clone(),
        date_from: parse_bound("--from", args.from.as_deref())?,
        date_to: parse_bound("--to", args.to.as_deref())?,
    };
    if !filters.is_empty() {
        debug!("Filters: {filters:?}");
    }
    Ok(filters)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
