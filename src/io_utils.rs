//! I/O helpers for reading raw CSV sources and writing CSV output.
//!
//! - **Delimiter resolution**: `.tsv` inputs default to tab, everything else to
//!   comma, unless a delimiter is passed explicitly.
//! - **Encoding**: inputs are decoded through `encoding_rs`, defaulting to
//!   UTF-8. Output is always UTF-8.
//! - **stdin/stdout**: the `-` path reads from stdin; a missing output path
//!   writes to stdout.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::error::{LoadError, LoadResult};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Builds a CSV reader that tolerates short rows; width checks happen when the
/// raw table is assembled so they can be reported with a row number.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> LoadResult<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Box::new(BufReader::new(file))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(sink))
}

/// Decodes every field of a record, stripping a UTF-8 byte order mark from
/// the first field when present.
pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Option<Vec<String>> {
    record
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let (text, _, had_errors) = encoding.decode(field);
            if had_errors {
                return None;
            }
            let text = if idx == 0 {
                text.trim_start_matches('\u{feff}').to_string()
            } else {
                text.into_owned()
            };
            Some(text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn delimiter_follows_extension_unless_overridden() {
        assert_eq!(resolve_input_delimiter(&PathBuf::from("sales.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(&PathBuf::from("sales.TSV"), None), b'\t');
        assert_eq!(resolve_input_delimiter(&PathBuf::from("sales.csv"), None), b',');
        assert_eq!(
            resolve_input_delimiter(&PathBuf::from("sales.tsv"), Some(b';')),
            b';'
        );
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("latin1")).unwrap().name(),
            "windows-1252"
        );
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn decode_record_strips_byte_order_mark() {
        let record = csv::ByteRecord::from(vec!["\u{feff}Txn_ID", "City"]);
        let decoded = decode_record(&record, UTF_8).expect("decode");
        assert_eq!(decoded, vec!["Txn_ID".to_string(), "City".to_string()]);
    }
}
