//! Deterministic soil and crop-health analysis of field photographs.
//!
//! Images are reduced to colour and texture statistics, scored against
//! reference soil and disease tables, and perturbed by noise seeded from the
//! upload bytes, so identical uploads always produce identical results. An
//! optional ONNX classifier (feature `onnx`) takes over crop analysis when
//! configured, and a gRPC front end is available behind feature `grpc`.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod crop;
pub mod error;
pub mod features;
pub mod fixtures;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod profiles;
pub mod seed;
pub mod soil;
pub mod utils;

#[cfg(feature = "grpc")]
pub mod converter;
#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "grpc")]
pub mod service;

pub use crate::analyzer::{AnalysisRequest, AnalysisResponse, Analyzer, HealthStatus};
pub use crate::cli::Args;
pub use crate::config::{ModelConfig, ServiceConfig};
pub use crate::crop::{CropResult, analyze_crop_health};
pub use crate::error::{Error, Result};
pub use crate::features::ImageFeatures;
pub use crate::mapping::load_class_mapping;
pub use crate::model::{DiseaseClassifier, Prediction};
pub use crate::preprocess::{PreprocessConfig, Processor};
pub use crate::profiles::ReferenceTables;
pub use crate::seed::deterministic_seed;
pub use crate::soil::{SoilResult, classify_soil};

#[cfg(feature = "grpc")]
pub use crate::service::AgriVisionService;
