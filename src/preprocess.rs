use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Memory layout of the model input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, as exported from Keras
    Nhwc,
    /// `[1, 3, H, W]`, as exported from PyTorch
    Nchw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub height: usize,
    pub width: usize,
    pub layout: TensorLayout,
}

impl Default for PreprocessConfig {
    /// MobileNetV2 as trained for the cotton disease model: 224x224, pixels
    /// scaled to [0, 1], no mean/std shift.
    fn default() -> Self {
        Self {
            mean: [0.0, 0.0, 0.0],
            std: [1.0, 1.0, 1.0],
            height: 224,
            width: 224,
            layout: TensorLayout::Nhwc,
        }
    }
}

impl PreprocessConfig {
    /// ImageNet statistics in channel-first layout.
    pub fn imagenet(size: usize) -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            height: size,
            width: size,
            layout: TensorLayout::Nchw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    /// Create a new instance of the Processor struct
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Resize with Lanczos3 to the model input size and normalize into a
    /// single-image batch tensor.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        let (width, height) = (self.config.width, self.config.height);
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::Preprocess("image has zero size".into()));
        }

        let src = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut dst = Image::new(width as u32, height as u32, PixelType::U8x3);
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
        let mut resizer = Resizer::new();
        resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| Error::Preprocess(format!("resize failed: {}", e)))?;

        let shape = match self.config.layout {
            TensorLayout::Nhwc => (1, height, width, 3),
            TensorLayout::Nchw => (1, 3, height, width),
        };
        let mut tensor = Array4::<f32>::zeros(shape);

        // Populate the array with normalized pixel values
        for (i, rgb) in dst.buffer().chunks_exact(3).enumerate() {
            let y = i / width;
            let x = i % width;
            for c in 0..3 {
                let v = (rgb[c] as f32 / 255.0 - self.config.mean[c]) / self.config.std[c];
                match self.config.layout {
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = v,
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = v,
                }
            }
        }
        Ok(tensor)
    }
}
