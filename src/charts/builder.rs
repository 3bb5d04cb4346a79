//! Chart Builder Module
//! Maps aggregated and joined district tables to declarative chart specs.

use crate::charts::spec::{
    AxisSpec, ChartKind, ChartSpec, DualAxisLabels, LegendSpec, MarginSpec, Rgb, SeriesRole,
    SeriesSpec, TextPosition,
};
use crate::data::{AggregatedTable, JoinedRecord};
use thiserror::Error;

pub const BAR_CHART_HEIGHT: u32 = 500;
pub const DUAL_AXIS_CHART_HEIGHT: u32 = 600;
pub const TICK_ANGLE: i32 = -45;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error("Cannot build chart '{0}': no records")]
    EmptyInput(String),
}

/// Builds chart specs. Performs no aggregation or filtering.
pub struct ChartBuilder;

impl ChartBuilder {
    /// One bar per district, value text above each bar.
    pub fn bar_chart(
        table: &AggregatedTable,
        category_label: &str,
        value_label: &str,
        title: &str,
    ) -> Result<ChartSpec, ChartError> {
        if table.is_empty() {
            return Err(ChartError::EmptyInput(title.to_string()));
        }

        let (categories, values): (Vec<String>, Vec<f64>) = table
            .records()
            .iter()
            .map(|r| (r.district.clone(), r.value))
            .unzip();

        Ok(ChartSpec {
            kind: ChartKind::Bar,
            title: title.to_string(),
            height: BAR_CHART_HEIGHT,
            categories,
            category_axis: AxisSpec::new(category_label),
            tick_angle: TICK_ANGLE,
            primary_axis: AxisSpec::new(value_label),
            secondary_axis: None,
            series: vec![SeriesSpec {
                name: value_label.to_string(),
                values,
                role: SeriesRole::PrimaryBar,
                color: Rgb::PLOTLY_BLUE,
                text_position: Some(TextPosition::Outside),
                line_width: None,
                marker_size: None,
            }],
            legend: None,
            margin: None,
        })
    }

    /// CCTV counts as bars on the primary axis, street light totals as a
    /// line with markers on an independently scaled secondary axis.
    pub fn dual_axis_chart(
        joined: &[JoinedRecord],
        labels: &DualAxisLabels,
        title: &str,
    ) -> Result<ChartSpec, ChartError> {
        if joined.is_empty() {
            return Err(ChartError::EmptyInput(title.to_string()));
        }

        let categories = joined.iter().map(|r| r.district.clone()).collect();
        let cctv_values = joined.iter().map(|r| r.cctv_value).collect();
        let light_values = joined.iter().map(|r| r.light_value).collect();

        Ok(ChartSpec {
            kind: ChartKind::DualAxis,
            title: title.to_string(),
            height: DUAL_AXIS_CHART_HEIGHT,
            categories,
            category_axis: AxisSpec::new(labels.category_axis.as_str()),
            tick_angle: TICK_ANGLE,
            primary_axis: AxisSpec::new(labels.primary_axis.as_str()),
            secondary_axis: Some(AxisSpec::new(labels.secondary_axis.as_str())),
            series: vec![
                SeriesSpec {
                    name: labels.primary_series.clone(),
                    values: cctv_values,
                    role: SeriesRole::PrimaryBar,
                    color: Rgb::STEEL_BLUE,
                    text_position: None,
                    line_width: None,
                    marker_size: None,
                },
                SeriesSpec {
                    name: labels.secondary_series.clone(),
                    values: light_values,
                    role: SeriesRole::SecondaryLine,
                    color: Rgb::ORANGE,
                    text_position: None,
                    line_width: Some(2),
                    marker_size: Some(6),
                },
            ],
            legend: Some(LegendSpec { x: 0.01, y: 0.99 }),
            margin: Some(MarginSpec { top: 50, bottom: 50 }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProcessor, MetricRecord};

    fn table(data: &[(&str, f64)]) -> AggregatedTable {
        let records: Vec<MetricRecord> = data
            .iter()
            .map(|(district, value)| MetricRecord::new(*district, *value))
            .collect();
        DataProcessor::aggregate(&records).unwrap()
    }

    fn joined(data: &[(&str, f64, f64)]) -> Vec<JoinedRecord> {
        data.iter()
            .map(|(district, cctv_value, light_value)| JoinedRecord {
                district: district.to_string(),
                cctv_value: *cctv_value,
                light_value: *light_value,
            })
            .collect()
    }

    #[test]
    fn bar_chart_follows_table_order() {
        let spec = ChartBuilder::bar_chart(
            &table(&[("평거동", 2.0), ("중앙동", 8.0)]),
            "읍면동",
            "설치 대수",
            "CCTV",
        )
        .unwrap();

        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.categories, vec!["중앙동", "평거동"]);
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].values, vec![8.0, 2.0]);
        assert_eq!(spec.series[0].role, SeriesRole::PrimaryBar);
    }

    #[test]
    fn bar_chart_carries_display_hints() {
        let spec =
            ChartBuilder::bar_chart(&table(&[("중앙동", 8.0)]), "읍면동", "설치 대수", "CCTV")
                .unwrap();

        assert_eq!(spec.title, "CCTV");
        assert_eq!(spec.category_axis.title, "읍면동");
        assert_eq!(spec.primary_axis.title, "설치 대수");
        assert_eq!(spec.tick_angle, -45);
        assert_eq!(spec.height, 500);
        assert_eq!(spec.series[0].text_position, Some(TextPosition::Outside));
        assert!(spec.secondary_axis.is_none());
    }

    #[test]
    fn bar_chart_rejects_empty_table() {
        let err = ChartBuilder::bar_chart(&AggregatedTable::default(), "a", "b", "Empty")
            .unwrap_err();
        assert_eq!(err, ChartError::EmptyInput("Empty".to_string()));
    }

    #[test]
    fn dual_axis_chart_splits_metrics_across_axes() {
        let spec = ChartBuilder::dual_axis_chart(
            &joined(&[("중앙동", 8.0, 100.0), ("칠암동", 3.0, 420.0)]),
            &DualAxisLabels::default(),
            "비교",
        )
        .unwrap();

        assert_eq!(spec.kind, ChartKind::DualAxis);
        assert_eq!(spec.categories, vec!["중앙동", "칠암동"]);

        let bars = spec.series_with_role(SeriesRole::PrimaryBar).unwrap();
        assert_eq!(bars.name, "CCTV 설치대수");
        assert_eq!(bars.values, vec![8.0, 3.0]);
        assert_eq!(bars.color, Rgb::STEEL_BLUE);

        let line = spec.series_with_role(SeriesRole::SecondaryLine).unwrap();
        assert_eq!(line.name, "가로등 총등수");
        assert_eq!(line.values, vec![100.0, 420.0]);
        assert_eq!(line.marker_size, Some(6));
        assert_eq!(line.line_width, Some(2));
    }

    #[test]
    fn dual_axis_chart_labels_both_axes() {
        let spec = ChartBuilder::dual_axis_chart(
            &joined(&[("중앙동", 8.0, 100.0)]),
            &DualAxisLabels::default(),
            "비교",
        )
        .unwrap();

        assert_eq!(spec.primary_axis.title, "설치대수 (CCTV)");
        assert_eq!(
            spec.secondary_axis.as_ref().map(|a| a.title.as_str()),
            Some("총등수 (가로등)")
        );
        assert_ne!(
            spec.primary_axis.title,
            spec.secondary_axis.as_ref().unwrap().title
        );
        assert_eq!(spec.legend, Some(LegendSpec { x: 0.01, y: 0.99 }));
        assert_eq!(spec.height, 600);
    }

    #[test]
    fn dual_axis_chart_rejects_empty_join() {
        let cctv = table(&[("평거동", 2.0)]);
        let lights = table(&[("신안동", 50.0)]);
        let joined = DataProcessor::join(&cctv, &lights).unwrap();

        let err = ChartBuilder::dual_axis_chart(&joined, &DualAxisLabels::default(), "비교")
            .unwrap_err();
        assert!(matches!(err, ChartError::EmptyInput(_)));
    }

    #[test]
    fn spec_serializes_roles_in_snake_case() {
        let spec = ChartBuilder::dual_axis_chart(
            &joined(&[("중앙동", 8.0, 100.0)]),
            &DualAxisLabels::default(),
            "비교",
        )
        .unwrap();

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"], "dual_axis");
        assert_eq!(json["series"][1]["role"], "secondary_line");
        assert!(json["series"][0].get("marker_size").is_none());
    }
}
