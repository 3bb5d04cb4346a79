//! Charts module - Chart specs and rendering

mod builder;
mod renderer;
mod spec;

pub use builder::{ChartBuilder, ChartError};
pub use renderer::{ChartSink, JsonSpecWriter, MemorySink, PngRenderer, RenderError, SinkSet};
pub use spec::{
    AxisSpec, ChartKind, ChartSpec, DualAxisLabels, LegendSpec, MarginSpec, Rgb, SeriesRole,
    SeriesSpec, TextPosition,
};
