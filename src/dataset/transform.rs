//! Tile Preprocessing Pipeline
//!
//! Builds the deterministic transform sequence applied to every tile:
//! a per-satellite center crop, a fixed resize, a train-only random
//! horizontal flip, and per-channel normalization with the pretrained
//! backbone's input statistics.

use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::PovertyError;
use crate::TILE_SIZE;

/// Per-channel mean of the pretrained backbone's input distribution
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel std of the pretrained backbone's input distribution
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Training phase selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Train,
    Val,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Train => write!(f, "train"),
            Phase::Val => write!(f, "val"),
        }
    }
}

/// Satellite imagery source
///
/// The source decides the center-crop preset: Sentinel-1 tiles carry a
/// wider usable footprint than the higher-resolution Landsat-8 tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SatType {
    /// Sentinel-1 radar imagery
    S1,
    /// Landsat-8 optical imagery
    L8,
}

impl SatType {
    /// Side length of the center crop for this imagery source
    pub fn crop_size(&self) -> u32 {
        match self {
            SatType::S1 => 300,
            SatType::L8 => 100,
        }
    }
}

impl FromStr for SatType {
    type Err = PovertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s1" => Ok(SatType::S1),
            "l8" => Ok(SatType::L8),
            other => Err(PovertyError::Config(format!(
                "unknown satellite type '{other}' (expected 's1' or 'l8')"
            ))),
        }
    }
}

impl fmt::Display for SatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatType::S1 => write!(f, "s1"),
            SatType::L8 => write!(f, "l8"),
        }
    }
}

/// Deterministic tile transform sequence.
///
/// Order is fixed: center crop, resize, optional horizontal flip (train
/// phase only), CHW float conversion with per-channel normalization.
#[derive(Debug, Clone, Copy)]
pub struct TransformPipeline {
    crop_size: u32,
    resize: u32,
    flip: bool,
}

impl TransformPipeline {
    /// Build the pipeline for an imagery source and phase
    pub fn new(sat_type: SatType, phase: Phase) -> Self {
        Self {
            crop_size: sat_type.crop_size(),
            resize: TILE_SIZE as u32,
            flip: phase == Phase::Train,
        }
    }

    /// Side length of the output image
    pub fn output_size(&self) -> usize {
        self.resize as usize
    }

    /// Apply the pipeline, producing a normalized CHW float buffer of
    /// length `3 * output_size^2`.
    pub fn apply(&self, img: &DynamicImage) -> Vec<f32> {
        let img = center_crop(img, self.crop_size);
        let img = img.resize_exact(self.resize, self.resize, FilterType::Triangle);

        let img = if self.flip && rand::thread_rng().gen_bool(0.5) {
            img.fliph()
        } else {
            img
        };

        let rgb = img.to_rgb8();
        let size = self.resize as usize;
        let mut data = vec![0.0f32; 3 * size * size];

        for y in 0..size {
            for x in 0..size {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                for c in 0..3 {
                    let v = pixel[c] as f32 / 255.0;
                    data[c * size * size + y * size + x] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                }
            }
        }

        data
    }
}

/// Crop the centered `size`×`size` window, clamped to the image bounds
/// for tiles smaller than the preset.
fn center_crop(img: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let crop_w = size.min(width);
    let crop_h = size.min(height);
    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;
    img.crop_imm(x, y, crop_w, crop_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn solid_image(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([value; 3])))
    }

    #[test]
    fn test_sat_type_parsing() {
        assert_eq!("s1".parse::<SatType>().unwrap(), SatType::S1);
        assert_eq!("L8".parse::<SatType>().unwrap(), SatType::L8);

        let err = "modis".parse::<SatType>().unwrap_err();
        assert!(err.to_string().contains("modis"));
    }

    #[test]
    fn test_crop_presets() {
        assert_eq!(SatType::S1.crop_size(), 300);
        assert_eq!(SatType::L8.crop_size(), 100);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Train.to_string(), "train");
        assert_eq!(Phase::Val.to_string(), "val");
    }

    #[test]
    fn test_center_crop_window() {
        let img = solid_image(300, 300, 10);
        let cropped = center_crop(&img, 100);
        assert_eq!(cropped.dimensions(), (100, 100));
    }

    #[test]
    fn test_center_crop_clamps_small_tiles() {
        let img = solid_image(64, 64, 10);
        let cropped = center_crop(&img, 300);
        assert_eq!(cropped.dimensions(), (64, 64));
    }

    #[test]
    fn test_pipeline_output_shape_and_normalization() {
        let pipeline = TransformPipeline::new(SatType::L8, Phase::Val);
        let img = solid_image(120, 120, 255);

        let data = pipeline.apply(&img);
        assert_eq!(data.len(), 3 * TILE_SIZE * TILE_SIZE);

        // A saturated white tile maps each channel to (1 - mean) / std.
        for c in 0..3 {
            let expected = (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            let got = data[c * TILE_SIZE * TILE_SIZE];
            assert!((got - expected).abs() < 1e-5, "channel {c}: {got} vs {expected}");
        }
    }

    #[test]
    fn test_val_pipeline_is_deterministic() {
        let pipeline = TransformPipeline::new(SatType::S1, Phase::Val);
        let img = solid_image(310, 310, 37);

        assert_eq!(pipeline.apply(&img), pipeline.apply(&img));
    }
}
