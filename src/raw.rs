//! Raw tables as read from a CSV source.
//!
//! Cells are kept as untyped text; empty fields and the usual NA tokens are
//! stored as missing. Header names are made unique so every column can be
//! addressed by name.

use std::{collections::HashSet, io::Read, path::Path};

use encoding_rs::Encoding;
use log::debug;

use crate::{
    data::is_missing_token,
    error::{LoadError, LoadResult},
    io_utils,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Builds a table from already-split rows. Short rows are padded with
    /// missing cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> LoadResult<Self> {
        let numbered = rows.into_iter().enumerate().map(|(idx, row)| (idx + 2, row));
        Self::from_numbered_rows(headers, numbered)
    }

    /// Rows carry the 1-based source line they started on, used in width errors.
    fn from_numbered_rows<I>(headers: Vec<String>, rows: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = (usize, Vec<Option<String>>)>,
    {
        if headers.is_empty() {
            return Err(LoadError::Empty);
        }
        let headers = dedupe_headers(headers);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|(line, mut row)| {
                if row.len() > width {
                    return Err(LoadError::RowWidth {
                        row: line,
                        expected: width,
                        found: row.len(),
                    });
                }
                row.resize(width, None);
                Ok(row)
            })
            .collect::<LoadResult<Vec<_>>>()?;
        Ok(RawTable { headers, rows })
    }

    /// Convenience constructor for in-memory text rows; cells go through the
    /// same missing-token rules as CSV input.
    pub fn from_text_rows<H, R, C>(headers: H, rows: R) -> LoadResult<Self>
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let headers = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| to_cell(cell.as_ref())).collect())
            .collect();
        RawTable::new(headers, rows)
    }

    pub fn read<R>(reader: R, delimiter: u8, encoding: &'static Encoding) -> LoadResult<Self>
    where
        R: Read,
    {
        let mut reader = io_utils::open_csv_reader(reader, delimiter);
        Self::from_csv(&mut reader, encoding)
    }

    pub fn load(path: &Path, delimiter: u8, encoding: &'static Encoding) -> LoadResult<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let table = Self::from_csv(&mut reader, encoding)?;
        debug!(
            "Loaded {} row(s) x {} column(s) from {:?}",
            table.row_count(),
            table.headers.len(),
            path
        );
        Ok(table)
    }

    fn from_csv<R>(reader: &mut csv::Reader<R>, encoding: &'static Encoding) -> LoadResult<Self>
    where
        R: Read,
    {
        let header_record = reader.byte_headers()?.clone();
        let headers = io_utils::decode_record(&header_record, encoding).ok_or(
            LoadError::Decode {
                row: 1,
                encoding: encoding.name(),
            },
        )?;
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(LoadError::Empty);
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record?;
            // Quoted fields may span lines, so the record index alone is not the line.
            let line = record
                .position()
                .and_then(|pos| usize::try_from(pos.line()).ok())
                .unwrap_or(idx + 2);
            let decoded = io_utils::decode_record(&record, encoding).ok_or(LoadError::Decode {
                row: line,
                encoding: encoding.name(),
            })?;
            rows.push((line, decoded.iter().map(|cell| to_cell(cell)).collect()));
        }
        RawTable::from_numbered_rows(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }

    /// Keeps only the first `limit` rows.
    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }
}

fn to_cell(value: &str) -> Option<String> {
    if is_missing_token(value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Names blank headers `Unnamed: <idx>` and suffixes repeats with `.1`, `.2`.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                header
            };
            let mut candidate = base.clone();
            let mut suffix = 1usize;
            while seen.contains(&candidate) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}
