//! Error types for model runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Raster(#[from] culexmap_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Cannot write manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Stage '{stage}' needs '{input}', which nothing produces")]
    MissingInput { stage: String, input: String },

    #[error("'{0}' is produced more than once")]
    DuplicateOutput(String),

    #[error("Task graph has a cycle through: {}", .0.join(", "))]
    GraphCycle(Vec<String>),

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
