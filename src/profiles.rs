//! Reference tables consulted by the heuristic scorers.
//!
//! Built once at start-up (either the built-in tables or a JSON override) and
//! passed by reference into every analysis.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::ImageFeatures;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drainage {
    Poor,
    Moderate,
    Good,
    Excessive,
}

impl Drainage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Drainage::Poor => "poor",
            Drainage::Moderate => "moderate",
            Drainage::Good => "good",
            Drainage::Excessive => "excessive",
        }
    }
}

impl fmt::Display for Drainage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring weights for one soil type.
///
/// The score is a linear combination of brightness, saturation, redness and
/// texture terms; unused terms stay at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilSignature {
    /// Weight on `1 - brightness/255`
    pub darkness: f64,
    /// Weight on `brightness/255`
    pub lightness: f64,
    /// Brightness the profile expects; 0 disables the anchor term
    pub brightness_anchor: f64,
    /// Weight on `1 - |brightness - anchor| / anchor`
    pub anchor_weight: f64,
    /// Weight on `redness - 1`
    pub red_excess: f64,
    /// Weight on `saturation`
    pub saturation: f64,
    /// Weight on `1 - saturation`
    pub desaturation: f64,
    /// Weight on `min(texture_variance / 60, 1)`
    pub roughness: f64,
}

impl SoilSignature {
    pub fn score(&self, f: &ImageFeatures) -> f64 {
        let b = f.brightness / 255.0;
        let mut score = self.darkness * (1.0 - b) + self.lightness * b;
        if self.brightness_anchor > 0.0 {
            let proximity =
                1.0 - (f.brightness - self.brightness_anchor).abs() / self.brightness_anchor;
            score += self.anchor_weight * proximity;
        }
        score += self.red_excess * (f.redness - 1.0);
        score += self.saturation * f.saturation + self.desaturation * (1.0 - f.saturation);
        score += self.roughness * (f.texture_variance / 60.0).min(1.0);
        score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    #[serde(rename = "type")]
    pub soil_type: String,
    pub description: String,
    pub suitable_crops: Vec<String>,
    pub ph_range: (f64, f64),
    pub organic_carbon_pct: (f64, f64),
    pub drainage: Drainage,
    pub regions: Vec<String>,
    pub signature: SoilSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature a trigger condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Brightness,
    Redness,
    Greenness,
    Blueness,
    Saturation,
    TextureVariance,
}

impl Metric {
    pub fn read(&self, f: &ImageFeatures) -> f64 {
        match self {
            Metric::Brightness => f.brightness,
            Metric::Redness => f.redness,
            Metric::Greenness => f.greenness,
            Metric::Blueness => f.blueness,
            Metric::Saturation => f.saturation,
            Metric::TextureVariance => f.texture_variance,
        }
    }
}

/// Strict threshold test on one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Condition {
    Above { metric: Metric, value: f64 },
    Below { metric: Metric, value: f64 },
}

impl Condition {
    pub fn holds(&self, f: &ImageFeatures) -> bool {
        match *self {
            Condition::Above { metric, value } => metric.read(f) > value,
            Condition::Below { metric, value } => metric.read(f) < value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub treatment: String,
    pub prevention: String,
    /// Human-readable summary of `conditions`.
    pub trigger: String,
    /// All must hold for the disease to be reported.
    pub conditions: Vec<Condition>,
    pub base_confidence: f64,
    pub affected_area_pct: (f64, f64),
}

impl DiseaseProfile {
    pub fn is_triggered(&self, f: &ImageFeatures) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.holds(f))
    }
}

/// Soil and disease tables used by the scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub soils: Vec<SoilProfile>,
    pub diseases: Vec<DiseaseProfile>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceTables {
    pub fn builtin() -> Self {
        Self {
            soils: builtin_soils(),
            diseases: builtin_diseases(),
        }
    }

    /// Load tables from a JSON file and validate them.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let tables: Self = serde_json::from_str(&contents)?;
        tables.validate()?;
        tracing::info!(
            path = %path.display(),
            soils = tables.soils.len(),
            diseases = tables.diseases.len(),
            "Loaded reference tables"
        );
        Ok(tables)
    }

    pub fn validate(&self) -> Result<()> {
        if self.soils.is_empty() {
            return Err(Error::Config("soil table is empty".into()));
        }
        for soil in &self.soils {
            let (lo, hi) = soil.ph_range;
            let (oc_lo, oc_hi) = soil.organic_carbon_pct;
            if lo > hi || oc_lo > oc_hi {
                return Err(Error::Config(format!("{}: range bounds are inverted", soil.soil_type)));
            }
            if soil.signature.brightness_anchor < 0.0 {
                return Err(Error::Config(format!(
                    "{}: negative brightness anchor",
                    soil.soil_type
                )));
            }
        }
        for disease in &self.diseases {
            let (lo, hi) = disease.affected_area_pct;
            if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo > hi {
                return Err(Error::Config(format!(
                    "{}: affected area must lie in [0, 100]",
                    disease.name
                )));
            }
            if !(0.0..=1.0).contains(&disease.base_confidence) {
                return Err(Error::Config(format!(
                    "{}: base confidence must lie in [0, 1]",
                    disease.name
                )));
            }
            if disease.conditions.is_empty() {
                return Err(Error::Config(format!("{}: no trigger conditions", disease.name)));
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_soils() -> Vec<SoilProfile> {
    vec![
        SoilProfile {
            soil_type: "Black Cotton Soil (Vertisol)".into(),
            description: "Deep black soil rich in clay, excellent moisture retention".into(),
            suitable_crops: strings(&[
                "Cotton",
                "Soybean",
                "Sorghum",
                "Wheat",
                "Chickpea",
                "Sunflower",
            ]),
            ph_range: (7.5, 8.5),
            organic_carbon_pct: (0.4, 0.8),
            drainage: Drainage::Poor,
            regions: strings(&["Vidarbha", "Marathwada", "Madhya Pradesh", "Gujarat"]),
            signature: SoilSignature {
                darkness: 2.0,
                desaturation: 1.0,
                ..Default::default()
            },
        },
        SoilProfile {
            soil_type: "Red Soil (Alfisol)".into(),
            description: "Iron-rich reddish soil with moderate fertility".into(),
            suitable_crops: strings(&[
                "Groundnut",
                "Millets",
                "Pulses",
                "Tobacco",
                "Potato",
                "Rice",
            ]),
            ph_range: (5.5, 7.0),
            organic_carbon_pct: (0.3, 0.6),
            drainage: Drainage::Moderate,
            regions: strings(&["Tamil Nadu", "Karnataka", "Andhra Pradesh", "Odisha"]),
            signature: SoilSignature {
                red_excess: 3.0,
                brightness_anchor: 120.0,
                anchor_weight: 1.0,
                ..Default::default()
            },
        },
        SoilProfile {
            soil_type: "Alluvial Soil".into(),
            description: "Fertile, well-drained soil deposited by rivers".into(),
            suitable_crops: strings(&["Rice", "Wheat", "Sugarcane", "Maize", "Vegetables", "Jute"]),
            ph_range: (6.0, 7.5),
            organic_carbon_pct: (0.5, 1.0),
            drainage: Drainage::Good,
            regions: strings(&["Punjab", "Uttar Pradesh", "Bihar", "West Bengal"]),
            signature: SoilSignature {
                brightness_anchor: 140.0,
                anchor_weight: 1.5,
                desaturation: 0.5,
                ..Default::default()
            },
        },
        SoilProfile {
            soil_type: "Sandy Loam".into(),
            description: "Well-draining soil suitable for many crops".into(),
            suitable_crops: strings(&["Bajra", "Jowar", "Guar", "Mustard", "Cumin", "Groundnut"]),
            ph_range: (6.5, 8.0),
            organic_carbon_pct: (0.2, 0.4),
            drainage: Drainage::Excessive,
            regions: strings(&["Rajasthan", "Haryana", "Gujarat (Kutch)"]),
            signature: SoilSignature {
                lightness: 2.0,
                desaturation: 0.5,
                ..Default::default()
            },
        },
        SoilProfile {
            soil_type: "Laterite Soil".into(),
            description: "Leached, iron and aluminium rich soil of high-rainfall uplands".into(),
            suitable_crops: strings(&["Cashew", "Tea", "Coffee", "Rubber", "Coconut", "Tapioca"]),
            ph_range: (4.5, 6.0),
            organic_carbon_pct: (0.2, 0.5),
            drainage: Drainage::Good,
            regions: strings(&["Kerala", "Konkan", "Goa", "Western Ghats", "Odisha uplands"]),
            signature: SoilSignature {
                red_excess: 2.0,
                roughness: 1.2,
                brightness_anchor: 90.0,
                anchor_weight: 0.8,
                ..Default::default()
            },
        },
    ]
}

fn builtin_diseases() -> Vec<DiseaseProfile> {
    use Condition::{Above, Below};
    use Metric::*;

    vec![
        DiseaseProfile {
            name: "Leaf Blight".into(),
            description: "Brown to yellow lesions spreading across the leaf blade".into(),
            severity: Severity::High,
            treatment: "Apply Mancozeb 75% WP (2g/L) or Copper Oxychloride (3g/L) spray".into(),
            prevention:
                "Use disease-resistant varieties, ensure proper spacing, avoid overhead irrigation"
                    .into(),
            trigger: "brown/yellow dominant, low green".into(),
            conditions: vec![
                Above { metric: Redness, value: 1.2 },
                Below { metric: Greenness, value: 0.95 },
                Below { metric: Brightness, value: 160.0 },
            ],
            base_confidence: 0.72,
            affected_area_pct: (15.0, 45.0),
        },
        DiseaseProfile {
            name: "Powdery Mildew".into(),
            description: "White powdery fungal growth on leaf surfaces".into(),
            severity: Severity::Moderate,
            treatment: "Spray wettable sulphur (2g/L) or Hexaconazole 5% EC (1ml/L)".into(),
            prevention:
                "Improve air circulation, avoid excess nitrogen, remove infected leaves early".into(),
            trigger: "very bright, washed-out colour".into(),
            conditions: vec![
                Above { metric: Brightness, value: 170.0 },
                Below { metric: Saturation, value: 0.15 },
            ],
            base_confidence: 0.68,
            affected_area_pct: (10.0, 35.0),
        },
        DiseaseProfile {
            name: "Rust".into(),
            description: "Orange to reddish-brown pustules on leaves and stems".into(),
            severity: Severity::Moderate,
            treatment: "Apply Propiconazole 25% EC (1ml/L) at first appearance of pustules".into(),
            prevention: "Grow resistant varieties, destroy volunteer plants and crop residue"
                .into(),
            trigger: "saturated reddish tones with speckled texture".into(),
            conditions: vec![
                Above { metric: Redness, value: 1.1 },
                Above { metric: Saturation, value: 0.35 },
                Above { metric: Brightness, value: 80.0 },
                Below { metric: Brightness, value: 170.0 },
                Above { metric: TextureVariance, value: 20.0 },
            ],
            base_confidence: 0.65,
            affected_area_pct: (8.0, 30.0),
        },
        DiseaseProfile {
            name: "Bacterial Wilt".into(),
            description: "Sudden wilting and darkening of foliage from vascular infection".into(),
            severity: Severity::High,
            treatment: "Remove wilted plants, drench soil with Copper Oxychloride (3g/L)".into(),
            prevention: "Practise crop rotation, use certified seed, improve field drainage".into(),
            trigger: "dark, dull, low green".into(),
            conditions: vec![
                Below { metric: Greenness, value: 1.0 },
                Below { metric: Brightness, value: 90.0 },
                Below { metric: Saturation, value: 0.3 },
            ],
            base_confidence: 0.60,
            affected_area_pct: (20.0, 50.0),
        },
        DiseaseProfile {
            name: "Aphid Infestation".into(),
            description: "Colonies of sap-sucking insects causing curling and stippling".into(),
            severity: Severity::Low,
            treatment: "Spray neem oil (5ml/L) or Imidacloprid 17.8% SL (0.3ml/L)".into(),
            prevention:
                "Encourage natural predators, use yellow sticky traps, avoid excess nitrogen".into(),
            trigger: "green canopy with heavy speckling".into(),
            conditions: vec![
                Above { metric: Greenness, value: 1.1 },
                Above { metric: Saturation, value: 0.2 },
                Above { metric: TextureVariance, value: 45.0 },
            ],
            base_confidence: 0.55,
            affected_area_pct: (5.0, 25.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_are_valid() {
        let tables = ReferenceTables::builtin();
        assert!(tables.validate().is_ok());
        assert_eq!(tables.soils.len(), 5);
        assert_eq!(tables.diseases.len(), 5);

        let names: Vec<&str> = tables.diseases.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            ["Leaf Blight", "Powdery Mildew", "Rust", "Bacterial Wilt", "Aphid Infestation"]
        );
    }

    #[test]
    fn test_conditions_are_strict() {
        let f = ImageFeatures::solid([100, 100, 100]);
        let at = Condition::Above { metric: Metric::Brightness, value: 100.0 };
        let below = Condition::Below { metric: Metric::Brightness, value: 100.0 };
        assert!(!at.holds(&f));
        assert!(!below.holds(&f));
    }

    #[test]
    fn test_signature_anchor_peaks_at_anchor() {
        let sig = SoilSignature {
            brightness_anchor: 120.0,
            anchor_weight: 1.0,
            ..Default::default()
        };
        let at_anchor = sig.score(&ImageFeatures::solid([120, 120, 120]));
        let off_anchor = sig.score(&ImageFeatures::solid([200, 200, 200]));
        assert!(at_anchor > off_anchor);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.json");
        let tables = ReferenceTables::builtin();
        std::fs::write(&path, serde_json::to_string_pretty(&tables).unwrap()).unwrap();

        let loaded = ReferenceTables::from_json_file(&path).unwrap();
        assert_eq!(loaded, tables);
    }

    #[test]
    fn test_empty_soil_table_is_rejected() {
        let tables = ReferenceTables {
            soils: vec![],
            diseases: builtin_diseases(),
        };
        assert!(matches!(tables.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_condition_json_shape() {
        let json = r#"{ "op": "above", "metric": "texture_variance", "value": 45.0 }"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(cond, Condition::Above { metric: Metric::TextureVariance, value: 45.0 });
    }
}
