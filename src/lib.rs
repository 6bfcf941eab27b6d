//! synthrec - class-conditioned synthetic records
//!
//! A small probabilistic engine that synthesizes labelled records by
//! ancestral sampling (class first, then every feature conditioned only on
//! the class), perturbs them with controlled noise, and characterizes numeric
//! sequences with binned histograms and running/sliding-window moments.

pub mod distribution;
pub mod histogram;
pub mod noise;
pub mod rng;
pub mod sampler;
pub mod stats;

use thiserror::Error;

// Re-export main types
pub use distribution::{Categorical, FeatureDistribution, Gaussian, NonParametric, UniformRange, Value};
pub use histogram::Histogram;
pub use noise::NoiseInjector;
pub use sampler::{AncestralSampler, FeatureModel, Record, Samples};
pub use stats::{basic_stat, MeanStd, RunningStat, SlidingWindowStat};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthError {
    #[error("value {value} is outside histogram range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("cumulative distribution has not been derived")]
    NotReady,
    #[error("at least {required} samples are needed, got {got}")]
    InsufficientData { required: usize, got: usize },
    #[error("no distribution configured for class {class:?} and feature {feature}")]
    MissingDistribution { class: String, feature: usize },
    #[error("categorical domain is empty")]
    InvalidDomain,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("histogram has zero total count")]
    EmptyHistogram,
}

pub type Result<T, E = SynthError> = std::result::Result<T, E>;
