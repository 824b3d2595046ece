//! Stand-in classifiers and synthetic fundus photos for tests across the
//! workspace.

use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, Rgb, RgbImage};
use ndarray::Array4;

use crate::error::ScreeningError;
use crate::services::classifier::{encode_jpeg, FundusClassifier};

/// Always returns the same output.
pub struct FixedClassifier {
    output: f32,
}

impl FixedClassifier {
    pub fn new(output: f32) -> Self {
        Self { output }
    }
}

impl FundusClassifier for FixedClassifier {
    fn infer(&self, _input: &Array4<f32>) -> Result<f32, ScreeningError> {
        Ok(self.output)
    }
}

/// Mean intensity of the preprocessed tensor. Deterministic and input
/// dependent, which makes it a useful proxy for a real model.
pub struct BrightnessClassifier;

impl FundusClassifier for BrightnessClassifier {
    fn infer(&self, input: &Array4<f32>) -> Result<f32, ScreeningError> {
        input
            .mean()
            .ok_or_else(|| ScreeningError::Inference("empty input".to_string()))
    }
}

/// Fails every forward pass.
pub struct FailingClassifier;

impl FundusClassifier for FailingClassifier {
    fn infer(&self, _input: &Array4<f32>) -> Result<f32, ScreeningError> {
        Err(ScreeningError::Inference("model crashed".to_string()))
    }
}

fn synthetic_fundus(seed: u8) -> RgbImage {
    RgbImage::from_fn(64, 48, |x, y| {
        let r = (x as u8).wrapping_mul(3).wrapping_add(seed);
        let g = (y as u8).wrapping_mul(5).wrapping_add(seed / 2);
        Rgb([r, g, 40])
    })
}

pub fn sample_photo_jpeg(seed: u8) -> Vec<u8> {
    encode_jpeg(&DynamicImage::ImageRgb8(synthetic_fundus(seed)))
        .expect("synthetic image should encode")
}

pub fn sample_photo_png(seed: u8) -> Vec<u8> {
    let image = synthetic_fundus(seed);
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .expect("synthetic image should encode");
    buf
}
