//! District Compare - CCTV & Street Light Comparison Charts
//!
//! Loads two district-keyed CSV datasets, aggregates each per district, joins
//! them and builds declarative chart descriptions for a rendering host.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
