//! Trained crop-disease classifier seam.
//!
//! The heuristic scorer does not need a model. When one is configured and
//! loads, crop analysis asks it first and maps its top class into the same
//! result shape.

use std::collections::HashMap;

use image::DynamicImage;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::postprocess::{argmax_and_max, to_probabilities, top_k};

/// Top class of one classifier run plus the full distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
    /// Probability per label, most likely first.
    pub probabilities: Vec<(String, f32)>,
}

impl Prediction {
    /// Build a prediction from raw model output (logits or probabilities).
    /// Indices without a label are reported as `Class {i}`.
    ///
    /// Empty outputs and outputs with NaN or infinite scores are rejected so
    /// the caller can fall back to the heuristic path.
    pub fn from_output(output: &Array1<f32>, labels: &HashMap<usize, String>) -> Result<Self> {
        if output.is_empty() {
            return Err(Error::Model("model returned an empty output".into()));
        }
        if output.iter().any(|v| !v.is_finite()) {
            return Err(Error::Model("model output contains non-finite scores".into()));
        }

        let probs = to_probabilities(output);
        let (class_index, confidence) = argmax_and_max(&probs);
        let label_of = |i: usize| {
            labels
                .get(&i)
                .cloned()
                .unwrap_or_else(|| format!("Class {}", i))
        };
        Ok(Self {
            class_index,
            label: label_of(class_index),
            confidence: confidence.clamp(0.0, 1.0),
            probabilities: top_k(&probs, probs.len())
                .into_iter()
                .map(|(i, p)| (label_of(i), p))
                .collect(),
        })
    }
}

/// A classifier mapping an image to a distribution over a fixed label set.
pub trait DiseaseClassifier: Send + Sync {
    /// Reported as `model_info.model`.
    fn name(&self) -> &str;

    fn predict(&self, image: &DynamicImage) -> Result<Prediction>;
}

/// Load the configured classifier, or `None` when there is none to use.
///
/// Failures are logged and swallowed; callers fall back to the heuristic path.
pub fn load_disease_classifier(config: &ModelConfig) -> Option<Box<dyn DiseaseClassifier>> {
    let Some(model_path) = config.model_path.as_ref() else {
        tracing::info!("No disease model configured, using heuristic crop analysis");
        return None;
    };
    match onnx::load(config) {
        Ok(classifier) => {
            tracing::info!(model = %model_path.display(), "Loaded disease model");
            Some(classifier)
        }
        Err(e) => {
            tracing::warn!(
                model = %model_path.display(),
                error = %e,
                "Could not load disease model, using heuristic fallback"
            );
            None
        }
    }
}

#[cfg(feature = "onnx")]
pub mod onnx {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use image::DynamicImage;
    use ndarray::{Array1, Ix2};
    use ort::execution_providers::{
        CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
    };
    use ort::session::Session;
    use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

    use super::{DiseaseClassifier, Prediction};
    use crate::config::ModelConfig;
    use crate::error::{Error, Result};
    use crate::mapping::load_class_mapping;
    use crate::preprocess::Processor;

    pub struct OnnxModel {
        provider: [ExecutionProviderDispatch; 1],
    }

    impl OnnxModel {
        pub fn new(cuda: bool) -> Self {
            let provider = if cuda {
                [CUDAExecutionProvider::default().build().error_on_failure()]
            } else {
                [CPUExecutionProvider::default().build()]
            };
            Self { provider }
        }

        pub fn load_model(&self, model_path: &std::path::Path) -> Result<Session> {
            let session = SessionBuilder::new()
                .and_then(|b| b.with_execution_providers(self.provider.clone()))
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.commit_from_file(model_path))
                .map_err(|e| Error::Model(e.to_string()))?;
            Ok(session)
        }
    }

    /// ONNX-exported classifier. The session is behind a mutex so the
    /// classifier can be shared across request threads.
    pub struct OnnxClassifier {
        name: String,
        session: Mutex<Session>,
        processor: Processor,
        labels: HashMap<usize, String>,
    }

    impl OnnxClassifier {
        pub fn new(
            name: String,
            session: Session,
            processor: Processor,
            labels: HashMap<usize, String>,
        ) -> Self {
            Self {
                name,
                session: Mutex::new(session),
                processor,
                labels,
            }
        }
    }

    impl DiseaseClassifier for OnnxClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
            let xs = self.processor.preprocess(image)?;
            let session = self
                .session
                .lock()
                .map_err(|_| Error::Model("session lock poisoned".into()))?;
            let inputs = ort::inputs![xs.view()]
                .map_err(|e| Error::Model(format!("ORT input error: {}", e)))?;
            let outputs = session
                .run(inputs)
                .map_err(|e| Error::Model(format!("Model run error: {}", e)))?;
            let scores = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Model(format!("Output extraction error: {}", e)))?;
            let scores = scores
                .into_dimensionality::<Ix2>()
                .map_err(|e| Error::Model(format!("Unexpected output shape: {}", e)))?;
            let row: Array1<f32> = scores.row(0).to_owned();
            Prediction::from_output(&row, &self.labels)
        }
    }

    pub fn load(config: &ModelConfig) -> Result<Box<dyn DiseaseClassifier>> {
        let model_path = config
            .model_path
            .as_ref()
            .ok_or_else(|| Error::Model("no model path configured".into()))?;
        let labels_path = config
            .labels_path
            .as_ref()
            .ok_or_else(|| Error::Labels("a label map is required with a model".into()))?;
        let labels = load_class_mapping(labels_path)?;
        let session = OnnxModel::new(config.cuda).load_model(model_path)?;
        Ok(Box::new(OnnxClassifier::new(
            config.name.clone(),
            session,
            Processor::new(config.preprocess.clone()),
            labels,
        )))
    }
}

#[cfg(not(feature = "onnx"))]
pub mod onnx {
    use super::DiseaseClassifier;
    use crate::config::ModelConfig;
    use crate::error::{Error, Result};

    pub fn load(_config: &ModelConfig) -> Result<Box<dyn DiseaseClassifier>> {
        Err(Error::Model("built without the `onnx` feature".into()))
    }
}
