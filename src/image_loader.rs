//! Decoding of gallery images into small RGB previews.
//!
//! JPEGs go through zune-jpeg (or turbojpeg with DCT scaling when the
//! `fast-jpeg` feature is on); everything else through the `image` crate.

use crate::error::{Result, SwipeboxError};
use image::{DynamicImage, RgbImage};
use std::time::Instant;
use tracing::{debug, warn};

/// A decoded image, downscaled so its longest edge fits the cache limit.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Dimensions of the source image before downscaling.
    pub width: u32,
    pub height: u32,
    pub preview: RgbImage,
}

impl DecodedImage {
    fn from_dynamic(img: DynamicImage, original: (u32, u32), max_dimension: u32) -> Self {
        let preview = if img.width() > max_dimension || img.height() > max_dimension {
            img.thumbnail(max_dimension, max_dimension).to_rgb8()
        } else {
            img.to_rgb8()
        };
        Self {
            width: original.0,
            height: original.1,
            preview,
        }
    }
}

/// Denominator of the JPEG DCT scale (1, 2, 4 or 8) to decode an image whose
/// longest edge is `original_max` for a target of `target`.
pub fn jpeg_scale_denominator(original_max: usize, target: usize) -> usize {
    // Integer math; the x10 thresholds are 7.5x, 3.7x and 1.9x the target
    if original_max * 10 >= target * 75 {
        8
    } else if original_max * 10 >= target * 37 {
        4
    } else if original_max * 10 >= target * 19 {
        2
    } else {
        1
    }
}

fn is_jpeg_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

fn decode_error(path: &str, reason: impl ToString) -> SwipeboxError {
    SwipeboxError::Decode {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

pub struct ImageLoader;

impl ImageLoader {
    /// Decodes `path` and downsizes it to at most `max_dimension` pixels on
    /// its longest edge.
    pub fn load_for_display(path: &str, max_dimension: u32) -> Result<DecodedImage> {
        if path.contains("://") {
            return Err(decode_error(path, "remote sources are not supported"));
        }
        let load_start = Instant::now();
        let max_dimension = max_dimension.max(1);

        let result = if is_jpeg_path(path) {
            #[cfg(feature = "fast-jpeg")]
            {
                Self::load_jpeg_turbojpeg(path, max_dimension).or_else(|e| {
                    warn!(error = %e, "turbojpeg failed, falling back to zune-jpeg");
                    Self::load_jpeg_zune(path, max_dimension)
                })
            }
            #[cfg(not(feature = "fast-jpeg"))]
            {
                Self::load_jpeg_zune(path, max_dimension)
            }
        } else {
            Self::load_with_image_crate(path, max_dimension)
        };

        match &result {
            Ok(img) => debug!(
                path,
                width = img.width,
                height = img.height,
                elapsed = ?load_start.elapsed(),
                "decoded image"
            ),
            Err(e) => warn!(path, error = %e, "failed to decode image"),
        }
        result
    }

    #[cfg(feature = "fast-jpeg")]
    fn load_jpeg_turbojpeg(path: &str, max_dimension: u32) -> Result<DecodedImage> {
        use turbojpeg::{Decompressor, Image, PixelFormat, ScalingFactor};

        let buffer = std::fs::read(path)?;
        let mut decompressor = Decompressor::new().map_err(|e| decode_error(path, e))?;
        let header = decompressor
            .read_header(&buffer)
            .map_err(|e| decode_error(path, e))?;

        let original = (header.width as u32, header.height as u32);
        let scaling_factor =
            match jpeg_scale_denominator(header.width.max(header.height), max_dimension as usize) {
                8 => ScalingFactor::ONE_EIGHTH,
                4 => ScalingFactor::ONE_QUARTER,
                2 => ScalingFactor::ONE_HALF,
                _ => ScalingFactor::ONE,
            };
        decompressor
            .set_scaling_factor(scaling_factor)
            .map_err(|e| decode_error(path, format!("{:?}", e)))?;

        let scaled = header.scaled(scaling_factor);
        let mut pixels = vec![0u8; scaled.width * scaled.height * 3];
        let output = Image {
            pixels: pixels.as_mut_slice(),
            width: scaled.width,
            pitch: scaled.width * 3,
            height: scaled.height,
            format: PixelFormat::RGB,
        };
        decompressor
            .decompress(&buffer, output)
            .map_err(|e| decode_error(path, format!("{:?}", e)))?;

        let rgb = RgbImage::from_raw(scaled.width as u32, scaled.height as u32, pixels)
            .ok_or_else(|| decode_error(path, "turbojpeg buffer size mismatch"))?;
        Ok(DecodedImage::from_dynamic(
            DynamicImage::ImageRgb8(rgb),
            original,
            max_dimension,
        ))
    }

    fn load_jpeg_zune(path: &str, max_dimension: u32) -> Result<DecodedImage> {
        use zune_jpeg::JpegDecoder;
        use zune_jpeg::zune_core::colorspace::ColorSpace;
        use zune_jpeg::zune_core::options::DecoderOptions;

        let buffer = std::fs::read(path)?;
        let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(std::io::Cursor::new(&buffer), options);

        let pixels = decoder
            .decode()
            .map_err(|e| decode_error(path, format!("{:?}", e)))?;
        let info = decoder
            .info()
            .ok_or_else(|| decode_error(path, "missing JPEG header info"))?;
        let (width, height) = (info.width as u32, info.height as u32);

        let rgb = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| decode_error(path, "zune-jpeg buffer size mismatch"))?;
        Ok(DecodedImage::from_dynamic(
            DynamicImage::ImageRgb8(rgb),
            (width, height),
            max_dimension,
        ))
    }

    fn load_with_image_crate(path: &str, max_dimension: u32) -> Result<DecodedImage> {
        let img = image::open(path).map_err(|e| decode_error(path, e))?;
        let original = (img.width(), img.height());
        Ok(DecodedImage::from_dynamic(img, original, max_dimension))
    }
}
