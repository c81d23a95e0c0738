//! Request boundary around the scorers: validation, decoding, seeding,
//! timing and the response envelope.

use std::time::Instant;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_UPLOAD_BYTES, ServiceConfig};
use crate::crop::{CropResult, analyze_crop_health, crop_result_from_prediction};
use crate::error::{Error, Result};
use crate::features::ImageFeatures;
use crate::model::{DiseaseClassifier, load_disease_classifier};
use crate::profiles::ReferenceTables;
use crate::seed::{deterministic_seed, round_to};
use crate::soil::{SoilResult, classify_soil};

pub const SERVICE_NAME: &str = "ml-inference";

/// One uploaded image plus the optional form fields that accompany it.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub content_type: Option<String>,
    pub crop_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AnalysisRequest {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_crop_name(mut self, crop_name: impl Into<String>) -> Self {
        self.crop_name = Some(crop_name.into());
        self
    }

    pub fn with_location(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    fn location(&self) -> Option<Location> {
        self.latitude.map(|latitude| Location {
            latitude,
            longitude: self.longitude,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    SoilClassification,
    CropHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse<T> {
    pub status: String,
    pub analysis_type: AnalysisType,
    pub processing_time_ms: f64,
    pub image_dimensions: ImageDimensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_name: Option<String>,
    pub location: Option<Location>,
    pub result: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsStatus {
    pub soil: String,
    pub disease: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub capabilities: Vec<String>,
    pub models: ModelsStatus,
}

/// Shared, read-only analysis state: reference tables, the optional trained
/// classifier and the upload ceiling.
pub struct Analyzer {
    tables: ReferenceTables,
    classifier: Option<Box<dyn DiseaseClassifier>>,
    max_upload_bytes: usize,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("soils", &self.tables.soils.len())
            .field("diseases", &self.tables.diseases.len())
            .field("classifier", &self.classifier.as_ref().map(|c| c.name()))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            tables: ReferenceTables::builtin(),
            classifier: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Analyzer {
    /// Rejects tables that fail `ReferenceTables::validate`, so the scorers
    /// always have a non-empty soil table to work with.
    pub fn new(
        tables: ReferenceTables,
        classifier: Option<Box<dyn DiseaseClassifier>>,
        max_upload_bytes: usize,
    ) -> Result<Self> {
        tables.validate()?;
        Ok(Self {
            tables,
            classifier,
            max_upload_bytes,
        })
    }

    /// Build from configuration. A model that fails to load is logged and
    /// left out; bad reference tables are fatal.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let tables = config.load_tables()?;
        let classifier = load_disease_classifier(&config.model);
        Self::new(tables, classifier, config.max_upload_bytes)
    }

    pub fn has_model(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Reject uploads that are empty, not declared as images, or too large.
    pub fn validate(&self, request: &AnalysisRequest) -> Result<()> {
        if let Some(content_type) = request.content_type.as_deref() {
            if !content_type.starts_with("image/") {
                return Err(Error::UnsupportedMediaType(content_type.to_string()));
            }
        }
        if request.image.is_empty() {
            return Err(Error::EmptyPayload);
        }
        if request.image.len() > self.max_upload_bytes {
            return Err(Error::PayloadTooLarge {
                size: request.image.len(),
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    fn decode(&self, request: &AnalysisRequest) -> Result<(DynamicImage, ImageFeatures)> {
        self.validate(request)?;
        let image = image::load_from_memory(&request.image)?;
        let features = ImageFeatures::from_image(&image);
        Ok((image, features))
    }

    #[tracing::instrument(skip_all, fields(bytes = request.image.len()))]
    pub fn analyze_soil(&self, request: &AnalysisRequest) -> Result<AnalysisResponse<SoilResult>> {
        let start = Instant::now();
        let (_, features) = self.decode(request)?;
        let seed = deterministic_seed(&request.image);
        let result = classify_soil(&features, seed, &self.tables.soils);

        tracing::info!(
            soil_type = %result.soil_type,
            confidence = result.confidence,
            "Soil analysis complete"
        );
        Ok(AnalysisResponse {
            status: "success".to_string(),
            analysis_type: AnalysisType::SoilClassification,
            processing_time_ms: elapsed_ms(start),
            image_dimensions: ImageDimensions {
                width: features.width,
                height: features.height,
            },
            crop_name: None,
            location: request.location(),
            result,
        })
    }

    #[tracing::instrument(skip_all, fields(bytes = request.image.len(), crop = ?request.crop_name))]
    pub fn analyze_crop(&self, request: &AnalysisRequest) -> Result<AnalysisResponse<CropResult>> {
        let start = Instant::now();
        let (image, features) = self.decode(request)?;

        let model_result = self.classifier.as_ref().and_then(|classifier| {
            match classifier.predict(&image) {
                Ok(prediction) => {
                    tracing::debug!(
                        label = %prediction.label,
                        confidence = prediction.confidence,
                        "Model prediction"
                    );
                    Some(crop_result_from_prediction(&features, &prediction, classifier.name()))
                }
                Err(e) => {
                    tracing::warn!(
                        model = classifier.name(),
                        error = %e,
                        "Disease model failed, using heuristic fallback"
                    );
                    None
                }
            }
        });
        let result = model_result.unwrap_or_else(|| {
            let seed = deterministic_seed(&request.image);
            analyze_crop_health(&features, seed, &self.tables.diseases)
        });

        tracing::info!(
            health_score = result.health_score,
            diseases = result.disease_count,
            model = %result.model_info.model,
            "Crop analysis complete"
        );
        Ok(AnalysisResponse {
            status: "success".to_string(),
            analysis_type: AnalysisType::CropHealth,
            processing_time_ms: elapsed_ms(start),
            image_dimensions: ImageDimensions {
                width: features.width,
                height: features.height,
            },
            crop_name: request.crop_name.clone(),
            location: request.location(),
            result,
        })
    }

    pub fn health(&self) -> HealthStatus {
        let disease = match &self.classifier {
            Some(classifier) => format!("{} trained classifier", classifier.name()),
            None => "Heuristics fallback (color analysis)".to_string(),
        };
        HealthStatus {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities: vec![
                "soil-classification".to_string(),
                "crop-disease-detection".to_string(),
            ],
            models: ModelsStatus {
                soil: "Intelligent heuristics (color and texture analysis)".to_string(),
                disease,
            },
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    round_to(start.elapsed().as_secs_f64() * 1000.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_order() {
        let analyzer = Analyzer::new(ReferenceTables::builtin(), None, 8).unwrap();

        let wrong_type = AnalysisRequest::new(vec![]).with_content_type("text/plain");
        assert!(matches!(analyzer.validate(&wrong_type), Err(Error::UnsupportedMediaType(_))));

        let empty = AnalysisRequest::new(vec![]).with_content_type("image/png");
        assert!(matches!(analyzer.validate(&empty), Err(Error::EmptyPayload)));

        let big = AnalysisRequest::new(vec![0; 9]);
        assert!(matches!(
            analyzer.validate(&big),
            Err(Error::PayloadTooLarge { size: 9, limit: 8 })
        ));

        assert!(analyzer.validate(&AnalysisRequest::new(vec![0; 8])).is_ok());
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        let tables = ReferenceTables {
            soils: vec![],
            ..ReferenceTables::builtin()
        };
        let result = Analyzer::new(tables, None, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_tables_pass_validation() {
        assert!(Analyzer::default().tables.validate().is_ok());
    }

    #[test]
    fn test_location_requires_latitude() {
        let request = AnalysisRequest::new(vec![1]).with_location(None, Some(77.7));
        assert_eq!(request.location(), None);

        let request = AnalysisRequest::new(vec![1]).with_location(Some(20.9), None);
        assert_eq!(
            request.location(),
            Some(Location {
                latitude: 20.9,
                longitude: None
            })
        );
    }

    #[test]
    fn test_health_without_model() {
        let health = Analyzer::default().health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.models.disease, "Heuristics fallback (color analysis)");
        assert_eq!(health.capabilities.len(), 2);
    }
}
