//! CSV Data Loader Module
//! Decodes legacy-encoded CSV files and reads them into named-field rows using Polars.

use encoding_rs::Encoding;
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),
    #[error("File is not valid {0} text")]
    Decode(&'static str),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// One CSV record: column name -> cell text. Null cells are empty strings.
pub type RawRow = HashMap<String, String>;

/// Rows of a loaded file plus its header, in file order.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Handles CSV file loading with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file stored in the given text encoding.
    pub fn load(file_path: &Path, encoding: &str) -> Result<RawTable, LoaderError> {
        let bytes = std::fs::read(file_path).map_err(|source| LoaderError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;

        let text = Self::decode(&bytes, encoding)?;
        let table = Self::parse_csv(text)?;

        info!(
            path = %file_path.display(),
            encoding,
            rows = table.len(),
            "Loaded CSV"
        );
        debug!(columns = ?table.columns, "CSV header");
        if table.is_empty() {
            warn!(path = %file_path.display(), "CSV has a header but no data rows");
        }
        Ok(table)
    }

    /// Decode raw bytes to UTF-8. A byte order mark overrides the label.
    pub fn decode(bytes: &[u8], encoding: &str) -> Result<String, LoaderError> {
        let encoding = Encoding::for_label(encoding.trim().as_bytes())
            .ok_or_else(|| LoaderError::UnknownEncoding(encoding.to_string()))?;

        let (text, used, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(LoaderError::Decode(used.name()));
        }
        Ok(text.into_owned())
    }

    /// Parse CSV text with a header row. Every column is read as text so
    /// numeric coercion happens later, once, in the normalizer.
    pub fn parse_csv(text: String) -> Result<RawTable, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()?;

        let mut columns = Vec::with_capacity(df.width());
        let mut cells = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let as_text = column.cast(&DataType::String)?;
            columns.push(column.name().to_string());
            cells.push(as_text.str()?.clone());
        }

        let rows = (0..df.height())
            .map(|i| {
                columns
                    .iter()
                    .zip(&cells)
                    .map(|(name, ca)| (name.clone(), ca.get(i).unwrap_or_default().to_string()))
                    .collect()
            })
            .collect();

        Ok(RawTable { columns, rows })
    }
}
