//! Pipeline Module
//! One run: load and aggregate both datasets, join them and hand three chart
//! specs to a sink. Nothing is kept between runs.

use crate::charts::{ChartBuilder, ChartError, ChartSink, ChartSpec, RenderError};
use crate::config::{DatasetConfig, PipelineConfig};
use crate::data::{
    AggregatedTable, DataLoader, DataProcessor, LoaderError, ProcessorError, SchemaError,
};
use thiserror::Error;
use tracing::{info, warn};

pub const CCTV_CHART: &str = "cctv_by_district";
pub const STREET_CHART: &str = "street_lights_by_district";
pub const COMPARISON_CHART: &str = "cctv_vs_street_lights";

/// Failure while turning one input file into an aggregated table.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{dataset} dataset: {source}")]
    Dataset {
        dataset: &'static str,
        #[source]
        source: DatasetError,
    },
    #[error("{0} dataset unavailable")]
    MissingInput(&'static str),
    #[error("join failed: {0}")]
    Join(#[source] ProcessorError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug)]
pub struct SkippedChart {
    pub name: &'static str,
    pub error: PipelineError,
}

/// Outcome of one run, per chart.
#[derive(Debug, Default)]
pub struct RunReport {
    pub rendered: Vec<&'static str>,
    pub skipped: Vec<SkippedChart>,
}

impl RunReport {
    /// True when all three charts reached the sink.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.rendered.len() == 3
    }

    pub fn skipped_error(&self, name: &str) -> Option<&PipelineError> {
        self.skipped
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.error)
    }

    fn skip(&mut self, name: &'static str, error: PipelineError) {
        warn!(chart = name, %error, "Skipping chart");
        self.skipped.push(SkippedChart { name, error });
    }

    fn publish(
        &mut self,
        sink: &mut dyn ChartSink,
        name: &'static str,
        spec: Result<ChartSpec, PipelineError>,
    ) {
        let result = spec.and_then(|spec| sink.render(name, &spec).map_err(PipelineError::from));
        match result {
            Ok(()) => self.rendered.push(name),
            Err(error) => self.skip(name, error),
        }
    }
}

/// Loader -> Normalizer -> Aggregator for one input file.
pub fn prepare_dataset(dataset: &DatasetConfig) -> Result<AggregatedTable, DatasetError> {
    let table = DataLoader::load(&dataset.path, &dataset.encoding)?;
    let records =
        DataProcessor::normalize(&table.rows, &dataset.district_field, &dataset.value_field)?;
    let aggregated = DataProcessor::aggregate(&records)?;

    info!(
        path = %dataset.path.display(),
        rows = records.len(),
        districts = aggregated.len(),
        total = aggregated.total(),
        "Aggregated dataset"
    );
    Ok(aggregated)
}

/// Render the single-metric bar chart of a prepared dataset. The table is
/// handed back for the comparison chart.
fn publish_dataset(
    report: &mut RunReport,
    sink: &mut dyn ChartSink,
    name: &'static str,
    dataset: &'static str,
    config: &DatasetConfig,
    prepared: Result<AggregatedTable, DatasetError>,
) -> Option<AggregatedTable> {
    match prepared {
        Ok(table) => {
            let spec = ChartBuilder::bar_chart(
                &table,
                &config.district_field,
                &config.value_label,
                &config.title,
            );
            report.publish(sink, name, spec.map_err(Into::into));
            Some(table)
        }
        Err(source) => {
            report.skip(name, PipelineError::Dataset { dataset, source });
            None
        }
    }
}

/// Run the whole pipeline once. Each chart is built and rendered on its own,
/// so one failure does not prevent the others.
pub fn run(config: &PipelineConfig, sink: &mut dyn ChartSink) -> RunReport {
    let (cctv, street) = rayon::join(
        || prepare_dataset(&config.cctv),
        || prepare_dataset(&config.street),
    );
    let mut report = RunReport::default();

    let cctv = publish_dataset(&mut report, sink, CCTV_CHART, "cctv", &config.cctv, cctv);
    let street = publish_dataset(&mut report, sink, STREET_CHART, "street", &config.street, street);

    let comparison = match (&cctv, &street) {
        (Some(cctv), Some(street)) => DataProcessor::join(cctv, street)
            .map_err(PipelineError::Join)
            .and_then(|joined| {
                info!(districts = joined.len(), "Joined datasets");
                Ok(ChartBuilder::dual_axis_chart(
                    &joined,
                    &config.comparison_labels,
                    &config.comparison_title,
                )?)
            }),
        (None, _) => Err(PipelineError::MissingInput("cctv")),
        (_, None) => Err(PipelineError::MissingInput("street")),
    };
    report.publish(sink, COMPARISON_CHART, comparison);

    report
}
