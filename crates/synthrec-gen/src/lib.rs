pub mod config;
pub mod heart;
pub mod id;
pub mod rewrite;

use thiserror::Error;

pub use config::{GeneratorConfig, NoiseColumn};
pub use heart::{generate_records, heart_disease_sampler, record_layout, HeartNoise};
pub use id::generate_id;
pub use rewrite::{add_column_noise, append_spurious_features, expand_dummy_vars};

#[derive(Debug, Error)]
pub enum GenError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Synth(#[from] synthrec::SynthError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("record {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}
