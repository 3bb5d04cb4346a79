//! Chart Renderers
//! Rendering hosts for chart specs: PNG images via plotters and JSON documents.
//!
//! Layout of a PNG chart:
//! 1. Caption: chart title centered on top
//! 2. Plot area: category axis at the bottom, primary value axis on the left
//! 3. Dual-axis charts add an independently scaled value axis on the right
//!    and a legend box in the corner nearest its `LegendSpec` anchor

use crate::charts::spec::{ChartKind, ChartSpec, LegendSpec, Rgb, SeriesRole, SeriesSpec};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

const TICK_FONT_SIZE: u32 = 13;
const DESC_FONT_SIZE: u32 = 15;
const CAPTION_FONT_SIZE: u32 = 22;
const BAR_TEXT_FONT_SIZE: u32 = 12;
const VALUE_LABEL_AREA: u32 = 70;
/// Fraction of the value span left free above the largest value.
const HEADROOM: f64 = 0.15;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Chart '{0}' has no {1:?} series")]
    MissingSeries(String, SeriesRole),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Draw(err.to_string())
    }
}

/// A display host. Receives a finished spec and shows or stores it.
pub trait ChartSink {
    fn render(&mut self, name: &str, spec: &ChartSpec) -> Result<(), RenderError>;
}

/// Fans every spec out to several sinks. Every sink sees every spec; the
/// first failure is reported after all have run.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn ChartSink + Send>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ChartSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl ChartSink for SinkSet {
    fn render(&mut self, name: &str, spec: &ChartSpec) -> Result<(), RenderError> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(err) = sink.render(name, spec) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Keeps every spec it receives, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub charts: Vec<(String, ChartSpec)>,
}

impl MemorySink {
    pub fn get(&self, name: &str) -> Option<&ChartSpec> {
        self.charts
            .iter()
            .find(|(chart_name, _)| chart_name == name)
            .map(|(_, spec)| spec)
    }
}

impl ChartSink for MemorySink {
    fn render(&mut self, name: &str, spec: &ChartSpec) -> Result<(), RenderError> {
        self.charts.push((name.to_string(), spec.clone()));
        Ok(())
    }
}

/// Writes each spec as `<output_dir>/<name>.json`.
pub struct JsonSpecWriter {
    output_dir: PathBuf,
}

impl JsonSpecWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ChartSink for JsonSpecWriter {
    fn render(&mut self, name: &str, spec: &ChartSpec) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.json", name));
        std::fs::write(&path, serde_json::to_string_pretty(spec)?)?;
        info!(path = %path.display(), "Wrote chart spec");
        Ok(())
    }
}

/// Draws specs with plotters and writes `<output_dir>/<name>.png`.
pub struct PngRenderer {
    output_dir: PathBuf,
    width: u32,
    font_family: String,
}

impl PngRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, width: u32, font_family: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            width,
            font_family: font_family.to_string(),
        }
    }

    /// Draw a spec into an in-memory RGB image of `width x spec.height`.
    pub fn render_to_image(&self, spec: &ChartSpec) -> Result<RgbImage, RenderError> {
        let (width, height) = (self.width, spec.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)?;
            match spec.kind {
                ChartKind::Bar => self.draw_bar_chart(&root, spec)?,
                ChartKind::DualAxis => self.draw_dual_axis_chart(&root, spec)?,
            }
            root.present()?;
        }

        RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| RenderError::Draw("pixel buffer size mismatch".to_string()))
    }

    fn draw_bar_chart<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        spec: &ChartSpec,
    ) -> Result<(), RenderError> {
        let bars = required_series(spec, SeriesRole::PrimaryBar)?;
        let font = self.font_family.as_str();
        let n = spec.categories.len();

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, (font, CAPTION_FONT_SIZE))
            .margin(15)
            .x_label_area_size(self.category_label_area(spec))
            .y_label_area_size(VALUE_LABEL_AREA)
            .build_cartesian_2d(category_range(n).into_segmented(), value_range(&bars.values))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_name(&spec.categories, x))
            .x_label_style(self.tick_style(spec))
            .y_label_formatter(&|v| format_value(*v))
            .x_desc(spec.category_axis.title.as_str())
            .y_desc(spec.primary_axis.title.as_str())
            .axis_desc_style((font, DESC_FONT_SIZE))
            .draw()?;

        chart.draw_series(bar_elements(bars, n))?;

        if bars.text_position.is_some() {
            let style = TextStyle::from((font, BAR_TEXT_FONT_SIZE).into_font())
                .pos(Pos::new(HPos::Center, VPos::Bottom));
            chart.draw_series(bars.values.iter().enumerate().map(|(i, v)| {
                Text::new(format_value(*v), (SegmentValue::CenterOf(i), *v), style.clone())
            }))?;
        }

        Ok(())
    }

    fn draw_dual_axis_chart<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        spec: &ChartSpec,
    ) -> Result<(), RenderError> {
        let bars = required_series(spec, SeriesRole::PrimaryBar)?;
        let line = required_series(spec, SeriesRole::SecondaryLine)?;
        let font = self.font_family.as_str();
        let n = spec.categories.len();
        let (margin_top, margin_bottom) = spec.margin.map_or((15, 15), |m| (m.top, m.bottom));

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, (font, CAPTION_FONT_SIZE))
            .margin(15)
            .margin_top(margin_top)
            .margin_bottom(margin_bottom)
            .x_label_area_size(self.category_label_area(spec))
            .y_label_area_size(VALUE_LABEL_AREA)
            .right_y_label_area_size(VALUE_LABEL_AREA)
            .build_cartesian_2d(category_range(n).into_segmented(), value_range(&bars.values))?
            .set_secondary_coord(category_range(n).into_segmented(), value_range(&line.values));

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_name(&spec.categories, x))
            .x_label_style(self.tick_style(spec))
            .y_label_formatter(&|v| format_value(*v))
            .x_desc(spec.category_axis.title.as_str())
            .y_desc(spec.primary_axis.title.as_str())
            .axis_desc_style((font, DESC_FONT_SIZE))
            .draw()?;

        let secondary_title = spec
            .secondary_axis
            .as_ref()
            .map(|axis| axis.title.as_str())
            .unwrap_or_default();
        chart
            .configure_secondary_axes()
            .y_label_formatter(&|v| format_value(*v))
            .y_desc(secondary_title)
            .axis_desc_style((font, DESC_FONT_SIZE))
            .draw()?;

        let bar_color = rgb(bars.color);
        chart
            .draw_series(bar_elements(bars, n))?
            .label(bars.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], bar_color.filled()));

        let line_color = rgb(line.color);
        let line_style = line_color.stroke_width(line.line_width.unwrap_or(1));
        let points = line
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (SegmentValue::CenterOf(i), *v));
        chart
            .draw_secondary_series(
                LineSeries::new(points, line_style).point_size(line.marker_size.unwrap_or(0)),
            )?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_style));

        chart
            .configure_series_labels()
            .position(legend_position(spec.legend))
            .label_font((font, TICK_FONT_SIZE))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }

    /// Plotters only turns text by quarter turns, so any tilt is drawn vertically.
    fn tick_style(&self, spec: &ChartSpec) -> TextStyle<'_> {
        let style = TextStyle::from((self.font_family.as_str(), TICK_FONT_SIZE).into_font());
        if spec.tick_angle == 0 {
            style
        } else {
            style.transform(FontTransform::Rotate270)
        }
    }

    /// Room below the plot for category names, longer when they are vertical.
    fn category_label_area(&self, spec: &ChartSpec) -> u32 {
        if spec.tick_angle == 0 {
            return 50;
        }
        let longest = spec
            .categories
            .iter()
            .map(|c| c.chars().count())
            .max()
            .unwrap_or(0) as u32;
        (longest * TICK_FONT_SIZE + 40).min(200)
    }
}

impl ChartSink for PngRenderer {
    fn render(&mut self, name: &str, spec: &ChartSpec) -> Result<(), RenderError> {
        let image = self.render_to_image(spec)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.png", name));
        image.save(&path)?;
        info!(path = %path.display(), categories = spec.categories.len(), "Rendered chart");
        Ok(())
    }
}

fn required_series(spec: &ChartSpec, role: SeriesRole) -> Result<&SeriesSpec, RenderError> {
    spec.series_with_role(role)
        .ok_or_else(|| RenderError::MissingSeries(spec.title.clone(), role))
}

/// Integer ranges are inclusive, so `n` categories span `0..n-1`.
fn category_range(n: usize) -> Range<usize> {
    0..n.saturating_sub(1)
}

/// Axis range always containing zero, so bars grow from the baseline in
/// either direction.
fn value_range(values: &[f64]) -> Range<f64> {
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let span = max - min;
    if span > 0.0 {
        let headroom = span * HEADROOM;
        let lower = if min < 0.0 { min - headroom } else { 0.0 };
        let upper = if max > 0.0 { max + headroom } else { 0.0 };
        lower..upper
    } else {
        0.0..1.0
    }
}

fn bar_elements(
    series: &SeriesSpec,
    n: usize,
) -> impl Iterator<Item = Rectangle<(SegmentValue<usize>, f64)>> + '_ {
    let style = rgb(series.color).filled();
    series.values.iter().enumerate().map(move |(i, v)| {
        let right = if i + 1 < n {
            SegmentValue::Exact(i + 1)
        } else {
            SegmentValue::Last
        };
        let mut bar = Rectangle::new([(SegmentValue::Exact(i), 0.0), (right, *v)], style);
        bar.set_margin(0, 0, 6, 6);
        bar
    })
}

fn category_name(categories: &[String], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(i) => categories.get(*i).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn legend_position(legend: Option<LegendSpec>) -> SeriesLabelPosition {
    let Some(LegendSpec { x, y }) = legend else {
        return SeriesLabelPosition::UpperRight;
    };
    match (x < 0.5, y >= 0.5) {
        (true, true) => SeriesLabelPosition::UpperLeft,
        (false, true) => SeriesLabelPosition::UpperRight,
        (true, false) => SeriesLabelPosition::LowerLeft,
        (false, false) => SeriesLabelPosition::LowerRight,
    }
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

/// Whole numbers without decimals, everything else with two.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartBuilder, DualAxisLabels};
    use crate::data::{DataProcessor, JoinedRecord, MetricRecord};

    fn bar_spec() -> ChartSpec {
        let table = DataProcessor::aggregate(&[
            MetricRecord::new("중앙동", 8.0),
            MetricRecord::new("평거동", 2.0),
        ])
        .unwrap();
        ChartBuilder::bar_chart(&table, "읍면동", "설치 대수", "CCTV").unwrap()
    }

    #[test]
    fn format_value_drops_integer_decimals() {
        assert_eq!(format_value(8.0), "8");
        assert_eq!(format_value(1200.0), "1200");
        assert_eq!(format_value(2.5), "2.50");
    }

    #[test]
    fn value_range_leaves_headroom() {
        let range = value_range(&[10.0, 40.0]);
        assert_eq!(range.start, 0.0);
        assert!(range.end > 40.0);
        assert_eq!(value_range(&[0.0]), 0.0..1.0);
    }

    #[test]
    fn value_range_reaches_below_zero_for_negative_values() {
        let range = value_range(&[-20.0, 40.0]);
        assert!(range.start < -20.0);
        assert!(range.end > 40.0);

        let all_negative = value_range(&[-5.0, -1.0]);
        assert!(all_negative.start < -5.0);
        assert_eq!(all_negative.end, 0.0);
    }

    #[test]
    fn category_range_spans_every_category() {
        assert_eq!(category_range(5), 0..4);
        assert_eq!(category_range(1), 0..0);
    }

    #[test]
    fn category_name_only_labels_segment_centers() {
        let categories = vec!["가좌동".to_string(), "하대동".to_string()];
        assert_eq!(category_name(&categories, &SegmentValue::CenterOf(1)), "하대동");
        assert_eq!(category_name(&categories, &SegmentValue::Exact(1)), "");
        assert_eq!(category_name(&categories, &SegmentValue::CenterOf(7)), "");
    }

    #[test]
    fn legend_anchor_maps_to_corner() {
        assert!(matches!(
            legend_position(Some(LegendSpec { x: 0.01, y: 0.99 })),
            SeriesLabelPosition::UpperLeft
        ));
        assert!(matches!(
            legend_position(Some(LegendSpec { x: 0.9, y: 0.1 })),
            SeriesLabelPosition::LowerRight
        ));
        assert!(matches!(legend_position(None), SeriesLabelPosition::UpperRight));
    }

    #[test]
    fn memory_sink_keeps_specs_by_name() {
        let mut sink = MemorySink::default();
        sink.render("cctv", &bar_spec()).unwrap();

        assert_eq!(sink.charts.len(), 1);
        assert_eq!(sink.get("cctv").map(|s| s.title.as_str()), Some("CCTV"));
        assert!(sink.get("other").is_none());
    }

    #[test]
    fn json_writer_writes_one_file_per_chart() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonSpecWriter::new(dir.path().join("specs"));
        writer.render("cctv_by_district", &bar_spec()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("specs/cctv_by_district.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["kind"], "bar");
        assert_eq!(json["categories"][0], "중앙동");
        assert_eq!(json["series"][0]["text_position"], "outside");
    }

    #[test]
    fn sink_set_forwards_to_every_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = SinkSet::new()
            .with(JsonSpecWriter::new(dir.path().join("a")))
            .with(JsonSpecWriter::new(dir.path().join("b")));
        sinks.render("chart", &bar_spec()).unwrap();

        assert!(dir.path().join("a/chart.json").exists());
        assert!(dir.path().join("b/chart.json").exists());
    }

    #[test]
    fn dual_axis_spec_without_line_is_rejected() {
        let mut spec = ChartBuilder::dual_axis_chart(
            &[JoinedRecord {
                district: "중앙동".to_string(),
                cctv_value: 8.0,
                light_value: 100.0,
            }],
            &DualAxisLabels::default(),
            "비교",
        )
        .unwrap();
        spec.series.retain(|s| s.role == SeriesRole::PrimaryBar);

        let err = required_series(&spec, SeriesRole::SecondaryLine).unwrap_err();
        assert!(matches!(err, RenderError::MissingSeries(_, SeriesRole::SecondaryLine)));
    }

    fn dual_spec(districts: &[&str]) -> ChartSpec {
        let joined: Vec<JoinedRecord> = districts
            .iter()
            .enumerate()
            .map(|(i, district)| JoinedRecord {
                district: district.to_string(),
                cctv_value: (i + 1) as f64 * 3.0,
                light_value: (i + 1) as f64 * 250.0,
            })
            .collect();
        ChartBuilder::dual_axis_chart(&joined, &DualAxisLabels::default(), "비교").unwrap()
    }

    const MANY: [&str; 7] = ["가좌동", "문산읍", "상대동", "신안동", "중앙동", "칠암동", "평거동"];

    #[test]
    fn renders_single_category_bar_chart() {
        let table = DataProcessor::aggregate(&[MetricRecord::new("중앙동", 8.0)]).unwrap();
        let spec = ChartBuilder::bar_chart(&table, "읍면동", "설치 대수", "CCTV").unwrap();
        let renderer = PngRenderer::new("unused", 800, "sans-serif");

        let image = renderer.render_to_image(&spec).unwrap();
        assert_eq!(image.dimensions(), (800, spec.height));
    }

    #[test]
    fn renders_many_category_bar_chart() {
        let records: Vec<MetricRecord> = MANY
            .iter()
            .enumerate()
            .map(|(i, d)| MetricRecord::new(*d, i as f64 + 1.0))
            .collect();
        let table = DataProcessor::aggregate(&records).unwrap();
        let spec = ChartBuilder::bar_chart(&table, "읍면동", "설치 대수", "CCTV").unwrap();
        let renderer = PngRenderer::new("unused", 1000, "sans-serif");

        let image = renderer.render_to_image(&spec).unwrap();
        assert_eq!(image.dimensions(), (1000, 500));
        assert!(image.pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[test]
    fn renders_dual_axis_chart_with_one_and_many_categories() {
        let renderer = PngRenderer::new("unused", 800, "sans-serif");

        for districts in [&MANY[..1], &MANY[..]] {
            let spec = dual_spec(districts);
            let image = renderer.render_to_image(&spec).unwrap();
            assert_eq!(image.dimensions(), (800, spec.height));
        }
    }

    #[test]
    fn secondary_axis_scale_is_independent_of_bars() {
        let spec = dual_spec(&MANY);
        let bars = spec.series_with_role(SeriesRole::PrimaryBar).unwrap();
        let line = spec.series_with_role(SeriesRole::SecondaryLine).unwrap();

        let primary = value_range(&bars.values);
        let secondary = value_range(&line.values);
        assert!(primary.end < 30.0);
        assert!(secondary.end > 1750.0);
    }

    #[test]
    fn renders_negative_values_without_error() {
        let table = DataProcessor::aggregate(&[
            MetricRecord::new("중앙동", -4.0),
            MetricRecord::new("평거동", 6.0),
        ])
        .unwrap();
        let spec = ChartBuilder::bar_chart(&table, "읍면동", "설치 대수", "CCTV").unwrap();

        let image = PngRenderer::new("unused", 600, "sans-serif")
            .render_to_image(&spec)
            .unwrap();
        assert_eq!(image.dimensions(), (600, 500));
    }

    #[test]
    fn png_sink_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = PngRenderer::new(dir.path().join("png"), 800, "sans-serif");
        let spec = dual_spec(&MANY[..3]);

        renderer.render("cctv_vs_street_lights", &spec).unwrap();

        let path = dir.path().join("png/cctv_vs_street_lights.png");
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (800, 600));
    }

    /// Always fails, to check fan-out behaviour.
    struct BrokenSink;

    impl ChartSink for BrokenSink {
        fn render(&mut self, _name: &str, _spec: &ChartSpec) -> Result<(), RenderError> {
            Err(RenderError::Draw("no font".to_string()))
        }
    }

    #[test]
    fn sink_set_keeps_going_after_a_failing_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = SinkSet::new()
            .with(BrokenSink)
            .with(JsonSpecWriter::new(dir.path()));

        let err = sinks.render("chart", &bar_spec()).unwrap_err();

        assert!(matches!(err, RenderError::Draw(_)));
        assert!(dir.path().join("chart.json").exists());
    }
}
