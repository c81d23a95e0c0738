//! Domain results to gRPC messages, and requests back.

use crate::analyzer::{AnalysisRequest, AnalysisResponse, HealthStatus, ImageDimensions, Location};
use crate::crop::{CropResult, DetectedDisease, ModelInfo};
use crate::features::ImageAnalysis;
use crate::grpc::{
    AnalyzeRequest, ClassProbability as ProtoClassProbability, CropReply,
    CropResult as ProtoCropResult, DetectedDisease as ProtoDetectedDisease, HealthReply,
    ImageAnalysis as ProtoImageAnalysis, ImageDimensions as ProtoImageDimensions,
    Location as ProtoLocation, ModelInfo as ProtoModelInfo, Nutrients as ProtoNutrients,
    SoilReply, SoilResult as ProtoSoilResult,
};
use crate::soil::SoilResult;

impl From<AnalyzeRequest> for AnalysisRequest {
    fn from(req: AnalyzeRequest) -> Self {
        AnalysisRequest {
            image: req.image_data,
            content_type: req.content_type,
            crop_name: req.crop_name,
            latitude: req.latitude,
            longitude: req.longitude,
        }
    }
}

fn convert_image_analysis(internal: &ImageAnalysis) -> ProtoImageAnalysis {
    ProtoImageAnalysis {
        brightness: internal.brightness,
        redness_index: internal.redness_index,
        greenness_index: internal.greenness_index,
        texture_variance: internal.texture_variance,
        saturation: internal.saturation,
    }
}

fn convert_dimensions(internal: &ImageDimensions) -> ProtoImageDimensions {
    ProtoImageDimensions {
        width: internal.width,
        height: internal.height,
    }
}

fn convert_location(internal: &Location) -> ProtoLocation {
    ProtoLocation {
        latitude: internal.latitude,
        longitude: internal.longitude,
    }
}

pub fn convert_soil_result(internal: &SoilResult) -> ProtoSoilResult {
    ProtoSoilResult {
        soil_type: internal.soil_type.clone(),
        soil_description: internal.soil_description.clone(),
        confidence: internal.confidence,
        texture: internal.texture.as_str().to_string(),
        estimated_ph: internal.estimated_ph,
        organic_carbon_pct: internal.organic_carbon_pct,
        drainage: internal.drainage.as_str().to_string(),
        nutrients: Some(ProtoNutrients {
            nitrogen_kg_ha: internal.nutrients.nitrogen_kg_ha,
            phosphorus_kg_ha: internal.nutrients.phosphorus_kg_ha,
            potassium_kg_ha: internal.nutrients.potassium_kg_ha,
        }),
        suitable_crops: internal.suitable_crops.clone(),
        common_regions: internal.common_regions.clone(),
        recommendations: internal.recommendations.clone(),
        image_analysis: Some(convert_image_analysis(&internal.image_analysis)),
    }
}

fn convert_disease(internal: &DetectedDisease) -> ProtoDetectedDisease {
    ProtoDetectedDisease {
        disease: internal.disease.clone(),
        confidence: internal.confidence,
        severity: internal.severity.as_str().to_string(),
        affected_area_pct: internal.affected_area_pct,
        treatment: internal.treatment.clone(),
        prevention: internal.prevention.clone(),
    }
}

fn convert_model_info(internal: &ModelInfo) -> ProtoModelInfo {
    let all_predictions = internal
        .all_predictions
        .iter()
        .flatten()
        .map(|(label, probability)| ProtoClassProbability {
            label: label.clone(),
            probability: *probability,
        })
        .collect();
    ProtoModelInfo {
        model: internal.model.clone(),
        predicted_class: internal.predicted_class.clone(),
        confidence: internal.confidence,
        note: internal.note.clone(),
        all_predictions,
    }
}

pub fn convert_crop_result(internal: &CropResult) -> ProtoCropResult {
    ProtoCropResult {
        health_score: internal.health_score,
        assessment: internal.assessment.clone(),
        growth_stage: internal.growth_stage.clone(),
        detected_diseases: internal.detected_diseases.iter().map(convert_disease).collect(),
        disease_count: internal.disease_count as u32,
        recommendations: internal.recommendations.clone(),
        image_analysis: Some(convert_image_analysis(&internal.image_analysis)),
        model_info: Some(convert_model_info(&internal.model_info)),
    }
}

impl From<AnalysisResponse<SoilResult>> for SoilReply {
    fn from(response: AnalysisResponse<SoilResult>) -> Self {
        SoilReply {
            status: response.status,
            processing_time_ms: response.processing_time_ms,
            image_dimensions: Some(convert_dimensions(&response.image_dimensions)),
            location: response.location.as_ref().map(convert_location),
            result: Some(convert_soil_result(&response.result)),
        }
    }
}

impl From<AnalysisResponse<CropResult>> for CropReply {
    fn from(response: AnalysisResponse<CropResult>) -> Self {
        CropReply {
            status: response.status,
            processing_time_ms: response.processing_time_ms,
            image_dimensions: Some(convert_dimensions(&response.image_dimensions)),
            location: response.location.as_ref().map(convert_location),
            crop_name: response.crop_name,
            result: Some(convert_crop_result(&response.result)),
        }
    }
}

impl From<HealthStatus> for HealthReply {
    fn from(health: HealthStatus) -> Self {
        HealthReply {
            status: health.status,
            service: health.service,
            version: health.version,
            capabilities: health.capabilities,
            soil_model: health.models.soil,
            disease_model: health.models.disease,
        }
    }
}
