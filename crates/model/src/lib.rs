//! # culexmap model
//!
//! The urban heat island and mosquito habitat model wired as a task graph
//! over the culexmap raster operators.
//!
//! - **iuhd**: urban heat island intensity from wall area, building and
//!   vegetation fractions on a zone grid
//! - **oviposition**: rooftops, land use and land cover into the
//!   oviposition composite and its hotspot heatmap
//! - **adult**: the adult habitat suitability composite
//! - **graph**: the stage executor
//! - **services**: the collaborator interface supplying source layers

pub mod adult;
pub mod config;
pub mod error;
pub mod formulas;
pub mod graph;
pub mod iuhd;
pub mod model;
pub mod output;
pub mod oviposition;
pub mod services;
mod stages;
pub mod tables;

pub use config::ModelConfig;
pub use error::{Error, Result};
pub use graph::{Inputs, Stage, StageTiming, TaskGraph};
pub use model::{Model, ModelOutputs};
pub use output::{write_outputs, Manifest};
pub use services::{FileServices, GeoServices, Morphometry, SourceLayer, VectorLayer};
