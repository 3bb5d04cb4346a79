//! Data Processor Module
//! Normalizes raw rows into district metrics, aggregates them per district and
//! inner-joins two aggregated tables.

use crate::data::RawRow;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

const DISTRICT: &str = "district";
const VALUE: &str = "value";
const CCTV_VALUE: &str = "cctv_value";
const LIGHT_VALUE: &str = "light_value";

/// A required column is missing or a cell does not hold a usable value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("row {row}: missing column '{field}'")]
    MissingField { row: usize, field: String },
    #[error("row {row}: '{value}' in column '{field}' is not a number")]
    InvalidNumber {
        row: usize,
        field: String,
        value: String,
    },
    #[error("row {row}: empty district name in column '{field}'")]
    EmptyDistrict { row: usize, field: String },
}

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not a finite number")]
pub struct ParseNumberError;

/// Parse a cell as a finite number. Surrounding whitespace is ignored.
pub fn parse_number(text: &str) -> Result<f64, ParseNumberError> {
    let value: f64 = text.trim().parse().map_err(|_| ParseNumberError)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseNumberError)
    }
}

/// A single (district, value) observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub district: String,
    pub value: f64,
}

impl MetricRecord {
    pub fn new(district: impl Into<String>, value: f64) -> Self {
        Self {
            district: district.into(),
            value,
        }
    }
}

/// Per-district sums, one record per distinct district, ordered by district.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedTable {
    records: Vec<MetricRecord>,
}

impl AggregatedTable {
    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn to_records(&self) -> Vec<MetricRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn districts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.district.as_str()).collect()
    }

    /// Sum over all districts.
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.value).sum()
    }

    fn to_frame(&self, value_name: &str) -> PolarsResult<DataFrame> {
        records_to_frame(&self.records, value_name)
    }
}

/// A district present in both aggregated tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub district: String,
    pub cctv_value: f64,
    pub light_value: f64,
}

fn records_to_frame(records: &[MetricRecord], value_name: &str) -> PolarsResult<DataFrame> {
    let districts: Vec<&str> = records.iter().map(|r| r.district.as_str()).collect();
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();

    DataFrame::new(vec![
        Column::new(DISTRICT.into(), districts),
        Column::new(value_name.into(), values),
    ])
}

fn float_column(df: &DataFrame, name: &str) -> PolarsResult<Float64Chunked> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.clone())
}

/// Handles normalization, aggregation and joining of district metrics.
pub struct DataProcessor;

impl DataProcessor {
    /// Select the district and value fields from every row.
    ///
    /// District names are trimmed; values are parsed once here. The whole
    /// call fails on the first malformed row, no partial output is returned.
    pub fn normalize(
        rows: &[RawRow],
        district_field: &str,
        value_field: &str,
    ) -> Result<Vec<MetricRecord>, SchemaError> {
        let mut records = Vec::with_capacity(rows.len());

        for (row, raw) in rows.iter().enumerate() {
            let district = raw.get(district_field).ok_or_else(|| SchemaError::MissingField {
                row,
                field: district_field.to_string(),
            })?;
            let cell = raw.get(value_field).ok_or_else(|| SchemaError::MissingField {
                row,
                field: value_field.to_string(),
            })?;

            let district = district.trim();
            if district.is_empty() {
                return Err(SchemaError::EmptyDistrict {
                    row,
                    field: district_field.to_string(),
                });
            }

            let value = parse_number(cell).map_err(|_| SchemaError::InvalidNumber {
                row,
                field: value_field.to_string(),
                value: cell.clone(),
            })?;
            if value < 0.0 {
                warn!(row, district, value, field = value_field, "Negative count");
            }

            records.push(MetricRecord::new(district, value));
        }

        Ok(records)
    }

    /// Sum values per district, ordered by district (ordinal string order).
    pub fn aggregate(records: &[MetricRecord]) -> Result<AggregatedTable, ProcessorError> {
        let grouped = records_to_frame(records, VALUE)?
            .lazy()
            .group_by([col(DISTRICT)])
            .agg([col(VALUE).sum()])
            .sort([DISTRICT], SortMultipleOptions::default())
            .collect()?;

        let districts = grouped.column(DISTRICT)?.str()?;
        let values = float_column(&grouped, VALUE)?;

        let aggregated: Vec<MetricRecord> = districts
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(district, value)| Some(MetricRecord::new(district?, value?)))
            .collect();

        debug!(input = records.len(), districts = grouped.height(), "Aggregated districts");
        Ok(AggregatedTable {
            records: aggregated,
        })
    }

    /// Inner join on district name, ordered by district.
    ///
    /// Districts present on only one side are dropped.
    pub fn join(
        cctv: &AggregatedTable,
        lights: &AggregatedTable,
    ) -> Result<Vec<JoinedRecord>, ProcessorError> {
        let joined = cctv
            .to_frame(CCTV_VALUE)?
            .lazy()
            .join(
                lights.to_frame(LIGHT_VALUE)?.lazy(),
                [col(DISTRICT)],
                [col(DISTRICT)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort([DISTRICT], SortMultipleOptions::default())
            .collect()?;

        let districts = joined.column(DISTRICT)?.str()?;
        let cctv_values = float_column(&joined, CCTV_VALUE)?;
        let light_values = float_column(&joined, LIGHT_VALUE)?;

        let records: Vec<JoinedRecord> = districts
            .into_iter()
            .zip(cctv_values.into_iter())
            .zip(light_values.into_iter())
            .filter_map(|((district, cctv_value), light_value)| {
                Some(JoinedRecord {
                    district: district?.to_string(),
                    cctv_value: cctv_value?,
                    light_value: light_value?,
                })
            })
            .collect();

        debug!(
            cctv = cctv.len(),
            lights = lights.len(),
            joined = records.len(),
            "Joined districts"
        );
        Ok(records)
    }
}
