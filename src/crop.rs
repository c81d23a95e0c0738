//! Crop health and disease analysis.
//!
//! Two paths produce the same [`CropResult`] shape: a seeded colour heuristic
//! and a mapping from a trained classifier's top prediction.

use serde::{Deserialize, Serialize};

use crate::features::{ImageAnalysis, ImageFeatures};
use crate::model::Prediction;
use crate::profiles::{DiseaseProfile, Severity};
use crate::seed::{SeededRng, round_to};

pub const HEURISTIC_MODEL_NAME: &str = "Heuristic (color analysis)";

const HEALTH_NOISE: f64 = 0.1;
const DISEASE_CONFIDENCE_NOISE: f64 = 0.08;
const HEALTH_FLOOR: f64 = 0.10;
const HEALTH_CEILING: f64 = 1.00;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedDisease {
    pub disease: String,
    pub confidence: f64,
    pub severity: Severity,
    pub affected_area_pct: f64,
    pub treatment: String,
    pub prevention: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_predictions: Option<Vec<(String, f64)>>,
}

impl ModelInfo {
    pub fn heuristic() -> Self {
        Self {
            model: HEURISTIC_MODEL_NAME.to_string(),
            predicted_class: None,
            confidence: None,
            note: Some(
                "Trained model not available - using image color-based estimation".to_string(),
            ),
            all_predictions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropResult {
    pub health_score: f64,
    pub assessment: String,
    pub growth_stage: String,
    pub detected_diseases: Vec<DetectedDisease>,
    pub disease_count: usize,
    pub recommendations: Vec<String>,
    pub image_analysis: ImageAnalysis,
    pub model_info: ModelInfo,
}

/// Heuristic crop health analysis.
///
/// Draws: health noise first, then a confidence and an affected-area draw for
/// each triggered disease in table order.
pub fn analyze_crop_health(
    features: &ImageFeatures,
    seed: u32,
    diseases: &[DiseaseProfile],
) -> CropResult {
    let mut rng = SeededRng::new(seed);

    let health = base_health(features) + rng.noise(HEALTH_NOISE);
    let health_score = round_to(health.clamp(HEALTH_FLOOR, HEALTH_CEILING), 2);

    let detected_diseases: Vec<DetectedDisease> = diseases
        .iter()
        .filter(|profile| profile.is_triggered(features))
        .map(|profile| {
            let confidence = (profile.base_confidence + rng.noise(DISEASE_CONFIDENCE_NOISE))
                .clamp(0.0, 1.0);
            let (lo, hi) = profile.affected_area_pct;
            let affected_area_pct = round_to(rng.uniform(lo, hi), 0).clamp(0.0, 100.0);
            DetectedDisease {
                disease: profile.name.clone(),
                confidence: round_to(confidence, 3),
                severity: profile.severity,
                affected_area_pct,
                treatment: profile.treatment.clone(),
                prevention: profile.prevention.clone(),
            }
        })
        .collect();

    tracing::debug!(health_score, diseases = detected_diseases.len(), "Crop health scored");

    let recommendations = heuristic_recommendations(features, health_score, &detected_diseases);
    CropResult {
        health_score,
        assessment: assessment(health_score, &detected_diseases),
        growth_stage: growth_stage(features).to_string(),
        disease_count: detected_diseases.len(),
        detected_diseases,
        recommendations,
        image_analysis: features.summary(),
        model_info: ModelInfo::heuristic(),
    }
}

/// Map a trained classifier's prediction into a crop result.
pub fn crop_result_from_prediction(
    features: &ImageFeatures,
    prediction: &Prediction,
    model_name: &str,
) -> CropResult {
    // Classifiers outside this crate may report anything; keep the result shape bounded.
    let confidence = match prediction.confidence as f64 {
        c if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    };
    let label = prediction.label.to_lowercase();
    let is_diseased = label.contains("diseased");

    let health = if is_diseased { 1.0 - confidence } else { confidence };
    let health_score = round_to(health.clamp(HEALTH_FLOOR, HEALTH_CEILING), 2);

    let mut detected_diseases = Vec::new();
    if is_diseased {
        let (disease, treatment) = if label.contains("leaf") {
            ("Leaf Disease (Blight/Spot)", "Apply Copper Oxychloride or Mancozeb fungicide spray")
        } else if label.contains("plant") {
            (
                "Plant Disease (Bacterial/Fungal)",
                "Remove severely infected plants, apply systemic fungicide",
            )
        } else {
            (
                "Crop Disease Detected",
                "Apply recommended fungicide (Mancozeb 75% WP 2g/L) or contact local agricultural officer",
            )
        };
        detected_diseases.push(DetectedDisease {
            disease: disease.to_string(),
            confidence: round_to(confidence, 3),
            severity: if confidence > 0.8 { Severity::High } else { Severity::Moderate },
            affected_area_pct: round_to(confidence * 50.0, 0),
            treatment: treatment.to_string(),
            prevention:
                "Use disease-resistant varieties, ensure proper spacing, remove infected plant material"
                    .to_string(),
        });
    }

    let recommendations: Vec<String> = if is_diseased {
        vec![
            format!("Disease detected: {}", prediction.label),
            "Apply appropriate fungicide or pesticide treatment".to_string(),
            "Remove and destroy infected plant material".to_string(),
            "Improve air circulation between plants".to_string(),
            "Contact local Krishi Vigyan Kendra (KVK) for expert guidance".to_string(),
        ]
    } else {
        vec![
            "Crop health looks good - continue current practices".to_string(),
            "Monitor regularly for any disease symptoms".to_string(),
            "Apply preventive sprays during favorable disease conditions".to_string(),
            "Maintain proper nutrition and irrigation".to_string(),
        ]
    };

    CropResult {
        health_score,
        assessment: assessment(health_score, &detected_diseases),
        growth_stage: growth_stage(features).to_string(),
        disease_count: detected_diseases.len(),
        detected_diseases,
        recommendations,
        image_analysis: features.summary(),
        model_info: ModelInfo {
            model: model_name.to_string(),
            predicted_class: Some(prediction.label.clone()),
            confidence: Some(round_to(confidence, 3)),
            note: None,
            all_predictions: Some(
                prediction
                    .probabilities
                    .iter()
                    .map(|(label, p)| (label.clone(), round_to(*p as f64, 3)))
                    .collect(),
            ),
        },
    }
}

fn base_health(f: &ImageFeatures) -> f64 {
    let dominance = f.greenness - f.redness.max(f.blueness);
    let brightness_bonus = 0.2 * (1.0 - (f.brightness - 130.0).abs() / 130.0).max(0.0);
    let saturation_bonus = 0.15 * f.saturation;
    0.5 + 0.5 * dominance + brightness_bonus + saturation_bonus
}

fn assessment(health_score: f64, diseases: &[DetectedDisease]) -> String {
    if diseases.is_empty() {
        if health_score >= 0.7 {
            "Crop appears healthy with good vigor".to_string()
        } else {
            "Crop shows moderate health, monitor for disease progression".to_string()
        }
    } else if diseases.iter().any(|d| d.severity == Severity::High) {
        format!(
            "URGENT: {} disease(s) detected including high-severity infection. Immediate treatment recommended.",
            diseases.len()
        )
    } else {
        "Disease symptoms detected. Treatment recommended to prevent spread.".to_string()
    }
}

fn growth_stage(f: &ImageFeatures) -> &'static str {
    if f.greenness > 1.2 && f.brightness < 150.0 {
        "Vegetative growth"
    } else if f.saturation > 0.4 && f.brightness >= 150.0 {
        "Flowering stage"
    } else if f.greenness < 0.95 && f.texture_variance > 15.0 {
        "Maturity / Harvest stage"
    } else {
        "Seedling / Early growth"
    }
}

fn heuristic_recommendations(
    f: &ImageFeatures,
    health_score: f64,
    diseases: &[DetectedDisease],
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if health_score < 0.5 {
        recommendations.push("Get a soil test done to check for nutrient deficiencies".to_string());
    }
    if !diseases.is_empty() {
        recommendations.push("Isolate affected plants to prevent spread".to_string());
        if diseases.iter().any(|d| d.severity == Severity::High) {
            recommendations.push(
                "Contact local Krishi Vigyan Kendra (KVK) for expert guidance".to_string(),
            );
            recommendations.push(
                "Consider a crop insurance claim under PMFBY if damage is extensive".to_string(),
            );
        }
    }
    if f.greenness < 0.95 {
        recommendations.push(
            "Apply foliar nitrogen spray (2% urea) to improve leaf color".to_string(),
        );
    }
    if f.brightness > 190.0 {
        recommendations.push(
            "Increase irrigation frequency; crop may be under heat or water stress".to_string(),
        );
    }
    if recommendations.is_empty() {
        recommendations.push("Crop health looks good - continue current practices".to_string());
        recommendations.push("Monitor regularly for any disease symptoms".to_string());
        recommendations.push("Maintain proper nutrition and irrigation schedule".to_string());
    }
    recommendations
}
