use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[cfg(feature = "grpc")]
use crate::config::DEFAULT_ADDR;
use crate::config::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL_NAME, ModelConfig, ServiceConfig};
use crate::preprocess::PreprocessConfig;

#[derive(Parser, Clone, Debug)]
#[command(
    author,
    version,
    about = "Soil and crop health analysis from field photos",
    long_about = None
)]
pub struct Args {
    /// Debug-level logs for this crate (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Classify the soil in one image
    Soil(ImageArgs),
    /// Assess crop health in one image
    Crop(CropArgs),
    /// Analyze every image in a directory
    Batch(BatchArgs),
    /// Write solid-colour reference images
    Fixtures(FixturesArgs),
    /// Run the gRPC server
    #[cfg(feature = "grpc")]
    Serve(ServeArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisKind {
    Soil,
    Crop,
}

/// How the disease model expects its input tensor.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputNormalization {
    /// Pixels scaled to [0, 1], channels last (Keras export)
    Unit,
    /// ImageNet mean/std, channels first (PyTorch export)
    Imagenet,
}

/// Settings shared by every command that runs an analysis.
#[derive(ClapArgs, Clone, Debug)]
pub struct ServiceArgs {
    /// ONNX disease model; heuristic analysis is used without one
    #[arg(long, env = "AGRI_VISION_MODEL")]
    pub model: Option<PathBuf>,

    /// Label map for the model (.json or one label per line)
    #[arg(long, env = "AGRI_VISION_LABELS")]
    pub labels: Option<PathBuf>,

    #[arg(long, default_value_t = String::from(DEFAULT_MODEL_NAME))]
    pub model_name: String,

    /// Run the model on CUDA
    #[arg(long)]
    pub cuda: bool,

    #[arg(long, value_enum, default_value_t = InputNormalization::Unit)]
    pub normalization: InputNormalization,

    /// Square model input size in pixels
    #[arg(long, default_value_t = 224)]
    pub input_size: usize,

    /// JSON file replacing the built-in soil and disease tables
    #[arg(long, env = "AGRI_VISION_TABLES")]
    pub tables: Option<PathBuf>,

    #[arg(long, env = "AGRI_VISION_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServiceArgs {
    fn preprocess(&self) -> PreprocessConfig {
        let size = self.input_size;
        match self.normalization {
            InputNormalization::Unit => PreprocessConfig {
                height: size,
                width: size,
                ..Default::default()
            },
            InputNormalization::Imagenet => PreprocessConfig::imagenet(size),
        }
    }

    pub fn to_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_upload_bytes: self.max_upload_bytes,
            tables_path: self.tables.clone(),
            model: ModelConfig {
                name: self.model_name.clone(),
                model_path: self.model.clone(),
                labels_path: self.labels.clone(),
                cuda: self.cuda,
                preprocess: self.preprocess(),
            },
            ..Default::default()
        }
    }
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ImageArgs {
    /// image path
    #[arg(long, required = true)]
    pub source: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct CropArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    #[arg(long)]
    pub crop_name: Option<String>,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct BatchArgs {
    /// Directory of .jpg/.jpeg/.png images
    #[arg(long, required = true)]
    pub dir: PathBuf,

    #[arg(long, value_enum, default_value_t = AnalysisKind::Soil)]
    pub kind: AnalysisKind,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct FixturesArgs {
    #[arg(long, default_value = "fixtures")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 200)]
    pub size: u32,
}

#[cfg(feature = "grpc")]
#[derive(ClapArgs, Clone, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "AGRI_VISION_ADDR", default_value_t = String::from(DEFAULT_ADDR))]
    pub addr: String,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[cfg(feature = "grpc")]
impl ServeArgs {
    pub fn to_config(&self) -> ServiceConfig {
        ServiceConfig {
            addr: self.addr.clone(),
            ..self.service.to_config()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crop_command() {
        let args = Args::try_parse_from([
            "agri-vision",
            "crop",
            "--source",
            "leaf.png",
            "--crop-name",
            "cotton",
            "--latitude",
            "-12.5",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        let Command::Crop(crop) = args.command else {
            panic!("expected crop command");
        };
        assert_eq!(crop.crop_name.as_deref(), Some("cotton"));
        assert_eq!(crop.image.latitude, Some(-12.5));
        assert_eq!(crop.image.longitude, None);
    }

    #[test]
    fn test_service_args_to_config() {
        let args = Args::try_parse_from([
            "agri-vision",
            "batch",
            "--dir",
            "images",
            "--kind",
            "crop",
            "--max-upload-bytes",
            "1024",
        ])
        .unwrap();
        let Command::Batch(batch) = args.command else {
            panic!("expected batch command");
        };
        assert_eq!(batch.kind, AnalysisKind::Crop);
        let config = batch.service.to_config();
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.model.name, DEFAULT_MODEL_NAME);
        assert_eq!(config.model.preprocess, PreprocessConfig::default());
    }

    #[test]
    fn test_imagenet_normalization_selects_channels_first() {
        let args = Args::try_parse_from([
            "agri-vision",
            "soil",
            "--source",
            "field.jpg",
            "--normalization",
            "imagenet",
            "--input-size",
            "256",
        ])
        .unwrap();
        let Command::Soil(soil) = args.command else {
            panic!("expected soil command");
        };
        let preprocess = soil.service.to_config().model.preprocess;
        assert_eq!(preprocess, PreprocessConfig::imagenet(256));
        assert_eq!(preprocess.layout, crate::preprocess::TensorLayout::Nchw);
    }

    #[test]
    fn test_source_is_required() {
        assert!(Args::try_parse_from(["agri-vision", "soil"]).is_err());
    }
}
