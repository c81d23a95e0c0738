use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Colour and texture summary of one image.
///
/// Everything past the channel statistics is derived from them, so two images
/// with the same means and standard deviations always score identically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFeatures {
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    pub std_r: f64,
    pub std_g: f64,
    pub std_b: f64,
    pub brightness: f64,
    pub redness: f64,
    pub greenness: f64,
    pub blueness: f64,
    /// Mean of the channel standard deviations, a proxy for surface roughness.
    pub texture_variance: f64,
    pub saturation: f64,
    pub width: u32,
    pub height: u32,
}

impl ImageFeatures {
    /// Extract features from a decoded image in a single pass over its pixels.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let n = (width as f64) * (height as f64);

        let mut sum = [0f64; 3];
        let mut sum_sq = [0f64; 3];
        for pixel in rgb.pixels() {
            for c in 0..3 {
                let v = pixel[c] as f64;
                sum[c] += v;
                sum_sq[c] += v * v;
            }
        }

        let mut mean = [0f64; 3];
        let mut std = [0f64; 3];
        if n > 0.0 {
            for c in 0..3 {
                mean[c] = sum[c] / n;
                // Population variance; clamp away tiny negatives from rounding.
                let var = (sum_sq[c] - sum[c] * sum[c] / n) / n;
                std[c] = var.max(0.0).sqrt();
            }
        }

        let mut features = Self::from_channel_stats(mean, std);
        features.width = width;
        features.height = height;
        features
    }

    /// Build features from per-channel means and standard deviations (RGB order).
    pub fn from_channel_stats(mean: [f64; 3], std: [f64; 3]) -> Self {
        let [mean_r, mean_g, mean_b] = mean;
        let [std_r, std_g, std_b] = std;

        let brightness = (mean_r + mean_g + mean_b) / 3.0;
        let denom = brightness.max(1.0);
        let max_channel = mean_r.max(mean_g).max(mean_b);
        let min_channel = mean_r.min(mean_g).min(mean_b);

        Self {
            mean_r,
            mean_g,
            mean_b,
            std_r,
            std_g,
            std_b,
            brightness,
            redness: mean_r / denom,
            greenness: mean_g / denom,
            blueness: mean_b / denom,
            texture_variance: (std_r + std_g + std_b) / 3.0,
            saturation: (max_channel - min_channel) / max_channel.max(1.0),
            width: 0,
            height: 0,
        }
    }

    /// Features of a flat image of one colour.
    pub fn solid(rgb: [u8; 3]) -> Self {
        Self::from_channel_stats(
            [rgb[0] as f64, rgb[1] as f64, rgb[2] as f64],
            [0.0; 3],
        )
    }

    /// The subset of features echoed back to callers.
    pub fn summary(&self) -> ImageAnalysis {
        ImageAnalysis {
            brightness: self.brightness,
            redness_index: self.redness,
            greenness_index: self.greenness,
            texture_variance: self.texture_variance,
            saturation: self.saturation,
        }
    }
}

/// Image statistics included in every analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub brightness: f64,
    pub redness_index: f64,
    pub greenness_index: f64,
    pub texture_variance: f64,
    pub saturation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_solid_image_statistics() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([180, 80, 60])));
        let f = ImageFeatures::from_image(&img);

        assert_relative_eq!(f.mean_r, 180.0);
        assert_relative_eq!(f.mean_g, 80.0);
        assert_relative_eq!(f.mean_b, 60.0);
        assert_relative_eq!(f.texture_variance, 0.0);
        assert_relative_eq!(f.brightness, 320.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(f.saturation, 120.0 / 180.0, epsilon = 1e-9);
        assert_eq!((f.width, f.height), (8, 4));
    }

    #[test]
    fn test_population_stddev() {
        // Half black, half white: mean 127.5, population stddev 127.5.
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let f = ImageFeatures::from_image(&DynamicImage::ImageRgb8(img));

        assert_relative_eq!(f.mean_r, 127.5);
        assert_relative_eq!(f.std_r, 127.5, epsilon = 1e-9);
        assert_relative_eq!(f.texture_variance, 127.5, epsilon = 1e-9);
        assert_relative_eq!(f.saturation, 0.0);
    }

    #[test]
    fn test_black_image_does_not_divide_by_zero() {
        let f = ImageFeatures::solid([0, 0, 0]);
        assert_relative_eq!(f.brightness, 0.0);
        assert_relative_eq!(f.redness, 0.0);
        assert_relative_eq!(f.saturation, 0.0);
    }

    #[test]
    fn test_empty_image_is_all_zero() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let f = ImageFeatures::from_image(&img);
        assert_relative_eq!(f.brightness, 0.0);
        assert_relative_eq!(f.texture_variance, 0.0);
    }

    #[test]
    fn test_hue_indices_are_relative_to_brightness() {
        let f = ImageFeatures::solid([50, 160, 50]);
        assert_relative_eq!(f.greenness, 160.0 / 86.666_666_666, epsilon = 1e-6);
        assert!(f.greenness > f.redness);
        assert_relative_eq!(f.redness, f.blueness);
    }
}
