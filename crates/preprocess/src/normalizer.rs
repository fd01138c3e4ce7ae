use crate::{InputTensor, NormalizeError, NormalizerConfig};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::{
    DynamicImage, GrayImage, ImageError, ImageFormat, ImageReader, RgbImage,
    codecs::jpeg::JpegEncoder,
};
use std::io::Cursor;

/// Turns uploaded image bytes into the fixed-shape grayscale tensor the
/// classifier expects.
///
/// Steps, in order: decode (alpha flattened onto black), stretch to the
/// configured size ignoring aspect ratio, reduce to luma, optionally pass
/// through a lossy JPEG encode/decode, then pack one integer per pixel.
///
/// Holds no per-call state, so a single instance can be shared across
/// threads.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &[u8]) -> Result<InputTensor, NormalizeError> {
        let _s = span!("normalize");

        tracing::trace!(upload_bytes = raw.len(), "Normalizing upload");

        let (width, height) = self.config.input_size;

        let rgb = Self::decode(raw)?;
        let resized = Self::stretch_resize(&rgb, width, height)?;
        let gray = DynamicImage::ImageRgb8(resized).into_luma8();

        let frame = match self.config.jpeg_quality {
            Some(quality) => Self::jpeg_roundtrip(&gray, quality)?,
            None => gray.into_raw(),
        };

        Ok(InputTensor::from_frame(&frame, width, height)?)
    }

    fn decode(raw: &[u8]) -> Result<RgbImage, NormalizeError> {
        let _s = span!("decode");

        let image = ImageReader::new(Cursor::new(raw))
            .with_guessed_format()
            .map_err(|e| NormalizeError::Decode(ImageError::IoError(e)))?
            .decode()
            .map_err(NormalizeError::Decode)?;

        tracing::trace!(
            width = image.width(),
            height = image.height(),
            color = ?image.color(),
            "Decoded upload"
        );

        Ok(flatten_alpha(image))
    }

    fn stretch_resize(src: &RgbImage, width: u32, height: u32) -> Result<RgbImage, NormalizeError> {
        let _s = span!("stretch_resize");

        let (src_width, src_height) = src.dimensions();
        let resize_error = |reason: String| NormalizeError::Resize {
            width: src_width,
            height: src_height,
            reason,
        };

        if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
            return Err(resize_error(format!(
                "zero-sized dimension (target {}x{})",
                width, height
            )));
        }

        let src_view = ImageRef::new(src_width, src_height, src.as_raw(), PixelType::U8x3)
            .map_err(|e| resize_error(e.to_string()))?;

        let mut resized = Image::new(width, height, PixelType::U8x3);

        // No crop box: the whole source maps onto the whole destination.
        Resizer::new()
            .resize(
                &src_view,
                &mut resized,
                &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
            )
            .map_err(|e| resize_error(e.to_string()))?;

        RgbImage::from_raw(width, height, resized.buffer().to_vec())
            .ok_or_else(|| resize_error("resized buffer has unexpected length".to_string()))
    }

    fn jpeg_roundtrip(gray: &GrayImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
        let _s = span!("jpeg_roundtrip");

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, quality)
            .encode_image(gray)
            .map_err(NormalizeError::Encode)?;

        let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
            .map_err(NormalizeError::Decode)?;

        tracing::trace!(
            encoded_bytes = encoded.len(),
            quality,
            color = ?decoded.color(),
            "Re-encoded frame"
        );

        Ok(match decoded {
            DynamicImage::ImageLuma8(frame) => frame.into_raw(),
            other => first_channel(&other.into_rgba8(), 4),
        })
    }
}

/// Composites any alpha channel onto black and drops it.
fn flatten_alpha(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Keeps the first sample of every interleaved pixel.
fn first_channel(samples: &[u8], channels: usize) -> Vec<u8> {
    samples.chunks_exact(channels).map(|px| px[0]).collect()
}
