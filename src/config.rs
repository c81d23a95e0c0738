//! Runtime configuration, resolved once at start-up.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::preprocess::PreprocessConfig;
use crate::profiles::ReferenceTables;

/// Uploads above this size are rejected before decoding.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_ADDR: &str = "0.0.0.0:8100";
pub const DEFAULT_MODEL_NAME: &str = "MobileNetV2";

/// Trained disease classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reported as `model_info.model` on the model path
    pub name: String,
    /// ONNX file; `None` means heuristic-only
    pub model_path: Option<PathBuf>,
    /// `.json` (`{label: index}`) or one label per line
    pub labels_path: Option<PathBuf>,
    pub cuda: bool,
    pub preprocess: PreprocessConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            model_path: None,
            labels_path: None,
            cuda: false,
            preprocess: PreprocessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    /// JSON override for the built-in soil and disease tables
    pub tables_path: Option<PathBuf>,
    pub model: ModelConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tables_path: None,
            model: ModelConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load_tables(&self) -> Result<ReferenceTables> {
        match &self.tables_path {
            Some(path) => ReferenceTables::from_json_file(path),
            None => Ok(ReferenceTables::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert!(config.model.model_path.is_none());
        assert_eq!(config.model.preprocess.width, 224);
    }

    #[test]
    fn test_builtin_tables_without_override() {
        let tables = ServiceConfig::default().load_tables().unwrap();
        assert_eq!(tables, ReferenceTables::builtin());
    }

    #[test]
    fn test_missing_tables_file_is_an_error() {
        let config = ServiceConfig {
            tables_path: Some("no/such/tables.json".into()),
            ..Default::default()
        };
        assert!(config.load_tables().is_err());
    }
}
