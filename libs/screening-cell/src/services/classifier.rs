use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use ndarray::Array4;
use tracing::{debug, info, instrument};

use shared_config::AppConfig;

use crate::error::ScreeningError;

/// Side length, in pixels, of the square input the model was trained on.
pub const INPUT_SIZE: u32 = 150;

const JPEG_QUALITY: u8 = 90;

/// Binary fundus-photo classifier.
///
/// Implementors only provide the raw forward pass; preprocessing and output
/// validation live in [`predict`](FundusClassifier::predict) so every backend
/// sees identical input.
pub trait FundusClassifier: Send + Sync {
    /// Forward pass over a `[1, 150, 150, 3]` tensor of values in `[0, 1]`.
    fn infer(&self, input: &Array4<f32>) -> Result<f32, ScreeningError>;

    fn predict(&self, image: &DynamicImage) -> Result<f32, ScreeningError> {
        let input = preprocess(image);
        let output = self.infer(&input)?;
        if !output.is_finite() {
            return Err(ScreeningError::Inference(format!(
                "Model produced a non-finite output: {}",
                output
            )));
        }
        Ok(output.clamp(0.0, 1.0))
    }
}

/// Reads the model's probability out of a raw output tensor. The model has
/// a single sigmoid unit, so the output must hold exactly one value
/// (`[1, 1]` or any other all-ones shape).
pub fn single_output(shape: &[i64], data: &[f32]) -> Result<f32, ScreeningError> {
    if shape.iter().any(|&dim| dim != 1) || data.len() != 1 {
        return Err(ScreeningError::Inference(format!(
            "Unexpected output shape: {:?}, expected [1, 1]",
            shape
        )));
    }
    Ok(data[0])
}

/// Resize to 150x150 (aspect ratio is not preserved), scale channels to
/// `[0, 1]` and add a leading batch dimension.
pub fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let size = INPUT_SIZE as usize;
    let resized = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, y as usize, x as usize, channel]] = f32::from(pixel[channel]) / 255.0;
        }
    }
    tensor
}

/// Decodes an uploaded photo. Only PNG and JPEG are accepted, matching what
/// the clinic's capture devices produce.
pub fn decode_photo(bytes: &[u8]) -> Result<DynamicImage, ScreeningError> {
    if bytes.is_empty() {
        return Err(ScreeningError::InvalidImage("empty upload".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| ScreeningError::UnsupportedFormat(e.to_string()))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(ScreeningError::UnsupportedFormat(format!("{:?}", format)));
    }

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ScreeningError::InvalidImage(e.to_string()))
}

/// Re-encodes a photo as JPEG, the format all stored photos use.
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, ScreeningError> {
    let rgb = image.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| ScreeningError::Encoding(e.to_string()))?;
    Ok(buf.into_inner())
}

/// A decoded, classified and re-encoded upload, ready to be stored.
#[derive(Debug, Clone)]
pub struct ClassifiedPhoto {
    pub jpeg: Vec<u8>,
    pub prediction: f32,
}

/// Decode, classify and re-encode an upload on the blocking pool.
#[instrument(skip(classifier, bytes), fields(size = bytes.len()))]
pub async fn classify_photo(
    classifier: Arc<dyn FundusClassifier>,
    bytes: Vec<u8>,
) -> Result<ClassifiedPhoto, ScreeningError> {
    tokio::task::spawn_blocking(move || {
        let image = decode_photo(&bytes)?;
        let prediction = classifier.predict(&image)?;
        let jpeg = encode_jpeg(&image)?;
        debug!("Classified photo {}x{}: {}", image.width(), image.height(), prediction);
        Ok(ClassifiedPhoto { jpeg, prediction })
    })
    .await
    .map_err(|e| ScreeningError::Inference(format!("Classification task failed: {}", e)))?
}

/// Loads the configured model. Called once at startup; any error here is
/// fatal for the service.
pub fn load_classifier(config: &AppConfig) -> Result<Arc<dyn FundusClassifier>, ScreeningError> {
    info!("Loading glaucoma model from {}", config.model_path.display());
    load_backend(config)
}

#[cfg(feature = "onnx")]
fn load_backend(config: &AppConfig) -> Result<Arc<dyn FundusClassifier>, ScreeningError> {
    let classifier = super::onnx::OnnxClassifier::load(&config.model_path)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn load_backend(_config: &AppConfig) -> Result<Arc<dyn FundusClassifier>, ScreeningError> {
    Err(ScreeningError::BackendUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_photo_jpeg, sample_photo_png, BrightnessClassifier, FixedClassifier};
    use assert_matches::assert_matches;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_preprocess_shape_and_range() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([255, 0, 51])));
        let tensor = preprocess(&image);

        assert_eq!(tensor.shape(), &[1, 150, 150, 3]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((tensor[[0, 10, 10, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 10, 10, 1]].abs() < 1e-6);
        assert!((tensor[[0, 10, 10, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_drops_alpha() {
        let image = DynamicImage::new_rgba8(20, 20);
        assert_eq!(preprocess(&image).shape(), &[1, 150, 150, 3]);
    }

    #[test]
    fn test_predict_is_deterministic_and_bounded() {
        let classifier = BrightnessClassifier;
        let image = decode_photo(&sample_photo_jpeg(7)).unwrap();

        let first = classifier.predict(&image).unwrap();
        let second = classifier.predict(&image).unwrap();
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));
    }

    #[test]
    fn test_single_output_requires_one_value() {
        assert_eq!(single_output(&[1, 1], &[0.73]).unwrap(), 0.73);
        assert_eq!(single_output(&[1], &[0.2]).unwrap(), 0.2);
        assert!(matches!(
            single_output(&[1, 2], &[0.3, 0.7]),
            Err(ScreeningError::Inference(m)) if m.contains("[1, 2]")
        ));
        assert!(matches!(single_output(&[1, 0], &[]), Err(ScreeningError::Inference(_))));
    }

    #[test]
    fn test_predict_clamps_and_rejects_nan() {
        let image = DynamicImage::new_rgb8(4, 4);
        assert_eq!(FixedClassifier::new(1.7).predict(&image).unwrap(), 1.0);
        assert_eq!(FixedClassifier::new(-0.3).predict(&image).unwrap(), 0.0);
        assert_matches!(
            FixedClassifier::new(f32::NAN).predict(&image),
            Err(ScreeningError::Inference(_))
        );
    }

    #[test]
    fn test_decode_accepts_png_and_jpeg() {
        assert!(decode_photo(&sample_photo_png(3)).is_ok());
        assert!(decode_photo(&sample_photo_jpeg(3)).is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_matches!(decode_photo(&[]), Err(ScreeningError::InvalidImage(_)));
        assert_matches!(
            decode_photo(b"definitely not an image"),
            Err(ScreeningError::UnsupportedFormat(_))
        );
        // JPEG magic followed by junk
        assert_matches!(
            decode_photo(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x01, 0x02]),
            Err(ScreeningError::InvalidImage(_))
        );
    }

    #[test]
    fn test_encode_jpeg_round_trips_dimensions() {
        let image = decode_photo(&sample_photo_png(1)).unwrap();
        let jpeg = encode_jpeg(&image).unwrap();
        let decoded = decode_photo(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (image.width(), image.height()));
    }

    #[tokio::test]
    async fn test_classify_photo_returns_jpeg_and_prediction() {
        let classifier: Arc<dyn FundusClassifier> = Arc::new(FixedClassifier::new(0.8));
        let classified = classify_photo(classifier, sample_photo_png(2)).await.unwrap();

        assert_eq!(classified.prediction, 0.8);
        assert_eq!(image::guess_format(&classified.jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_load_without_backend_is_fatal() {
        let config = AppConfig::default();
        assert!(matches!(
            load_classifier(&config),
            Err(ScreeningError::BackendUnavailable)
        ));
    }
}
