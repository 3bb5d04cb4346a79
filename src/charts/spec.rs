//! Declarative chart description handed to a rendering host.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Single metric, bars on one axis.
    Bar,
    /// Bars on the primary axis, line with markers on an independent secondary axis.
    DualAxis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesRole {
    PrimaryBar,
    SecondaryLine,
}

/// Where a bar's value text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const PLOTLY_BLUE: Rgb = Rgb(99, 110, 250);
    pub const STEEL_BLUE: Rgb = Rgb(70, 130, 180);
    pub const ORANGE: Rgb = Rgb(255, 165, 0);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSpec {
    pub name: String,
    /// Aligned with `ChartSpec::categories`.
    pub values: Vec<f64>,
    pub role: SeriesRole,
    pub color: Rgb,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_position: Option<TextPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub title: String,
}

impl AxisSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Legend anchor in paper coordinates (0..1, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegendSpec {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarginSpec {
    pub top: u32,
    pub bottom: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    /// Pixel height; the host chooses the width.
    pub height: u32,
    pub categories: Vec<String>,
    pub category_axis: AxisSpec,
    /// Category tick label angle in degrees (negative tilts counter-clockwise).
    pub tick_angle: i32,
    pub primary_axis: AxisSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_axis: Option<AxisSpec>,
    pub series: Vec<SeriesSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<MarginSpec>,
}

impl ChartSpec {
    /// First series drawn in the given role.
    pub fn series_with_role(&self, role: SeriesRole) -> Option<&SeriesSpec> {
        self.series.iter().find(|s| s.role == role)
    }
}

/// Names and axis titles of the dual-axis comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualAxisLabels {
    pub category_axis: String,
    pub primary_series: String,
    pub primary_axis: String,
    pub secondary_series: String,
    pub secondary_axis: String,
}

impl Default for DualAxisLabels {
    fn default() -> Self {
        Self {
            category_axis: "동이름".to_string(),
            primary_series: "CCTV 설치대수".to_string(),
            primary_axis: "설치대수 (CCTV)".to_string(),
            secondary_series: "가로등 총등수".to_string(),
            secondary_axis: "총등수 (가로등)".to_string(),
        }
    }
}
