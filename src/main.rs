//! District Compare - CCTV & Street Light Comparison Charts
//!
//! Renders per-district CCTV and street light charts plus a dual-axis comparison.

use anyhow::{bail, Context, Result};
use district_compare::charts::{JsonSpecWriter, PngRenderer, SinkSet};
use district_compare::config::PipelineConfig;
use district_compare::pipeline;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "district_compare.json";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = PipelineConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let mut sink = SinkSet::new()
        .with(JsonSpecWriter::new(&config.output_dir))
        .with(PngRenderer::new(
            &config.output_dir,
            config.chart_width,
            &config.font_family,
        ));

    let report = pipeline::run(&config, &mut sink);
    info!(rendered = ?report.rendered, "Run finished");

    if !report.is_complete() {
        bail!(
            "{} chart(s) not rendered: {}",
            report.skipped.len(),
            report
                .skipped
                .iter()
                .map(|s| format!("{} ({})", s.name, s.error))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}
