//! Image preprocessing for the classification model
//!
//! Handles resizing, normalization, and tensor conversion for
//! ImageNet-style classifiers.

use image::DynamicImage;
use ndarray::Array4;

/// Preprocessing configuration
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Model input width and height (square, typically 224)
    pub input_size: u32,
    /// Mean values for normalization [R, G, B]
    pub mean: [f32; 3],
    /// Std values for normalization [R, G, B]
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            // ImageNet statistics; applied after scaling pixels to 0-1
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

/// Convert a decoded image into an NCHW float tensor (batch size 1).
///
/// The image is resized to the model's square input size (aspect ratio is
/// not preserved, matching the usual ImageNet eval pipeline for small
/// inputs), scaled to 0-1, and normalized per channel.
pub fn image_to_tensor(image: &DynamicImage, config: &PreprocessConfig) -> Array4<f32> {
    let size = config.input_size;
    let resized = image
        .resize_exact(size, size, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - config.mean[c]) / config.std[c];
        }
    }

    tensor
}

/// Softmax over raw logits, yielding scores in [0, 1] that sum to 1.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_tensor_shape_matches_input_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
        let tensor = image_to_tensor(&image, &PreprocessConfig::default());
        assert_eq!(tensor.dim(), (1, 3, 224, 224));
    }

    #[test]
    fn test_black_image_normalizes_to_negative_mean_over_std() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let config = PreprocessConfig::default();
        let tensor = image_to_tensor(&image, &config);

        let expected = (0.0 - config.mean[0]) / config.std[0];
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let scores = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores[2] > scores[1] && scores[1] > scores[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let scores = softmax(&[1000.0, 1000.0]);
        assert!((scores[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_softmax_empty_input() {
        assert!(softmax(&[]).is_empty());
    }
}
