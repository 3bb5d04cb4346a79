//! Data module - CSV loading, normalization, aggregation and joining

mod loader;
mod processor;

pub use loader::{DataLoader, LoaderError, RawRow, RawTable};
pub use processor::{
    parse_number, AggregatedTable, DataProcessor, JoinedRecord, MetricRecord, ParseNumberError,
    ProcessorError, SchemaError,
};
