//! Tile Items and Batching
//!
//! Implements Burn's `Batcher` for stacking preprocessed tiles into
//! training batches. Items arrive already normalized from the transform
//! pipeline; batching only assembles tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::TILE_SIZE;

/// A single preprocessed tile ready for Burn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileItem {
    /// Normalized image data as flattened CHW float array [3 * H * W]
    pub image: Vec<f32>,
    /// Scalar consumption label
    pub label: f32,
    /// Tile path (for debugging/logging)
    pub path: String,
}

impl TileItem {
    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: f32, path: String) -> Self {
        Self { image, label, path }
    }
}

/// A batch of tiles for training or validation
#[derive(Clone, Debug)]
pub struct TileBatch<B: Backend> {
    /// Batch of images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Batch of scalar labels with shape [batch_size]
    pub targets: Tensor<B, 1>,
}

/// Batcher for creating tile batches
#[derive(Clone, Debug)]
pub struct TileBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> TileBatcher<B> {
    /// Create a new batcher for the given device
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            image_size: TILE_SIZE,
        }
    }

    /// Create a batcher with custom image size
    pub fn with_image_size(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }
}

impl<B: Backend> Batcher<TileItem, TileBatch<B>> for TileBatcher<B> {
    fn batch(&self, items: Vec<TileItem>) -> TileBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            &self.device,
        );

        let targets_data: Vec<f32> = items.iter().map(|item| item.label).collect();
        let targets = Tensor::<B, 1>::from_floats(
            TensorData::new(targets_data, [batch_size]),
            &self.device,
        );

        TileBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn item(label: f32, size: usize) -> TileItem {
        TileItem::from_data(vec![label; 3 * size * size], label, format!("t{label}.png"))
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = TileBatcher::<TestBackend>::with_image_size(device, 8);

        let batch = batcher.batch(vec![item(0.0, 8), item(1.0, 8), item(2.0, 8)]);

        assert_eq!(batch.images.dims(), [3, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [3]);
    }

    #[test]
    fn test_batch_preserves_item_order() {
        let device = Default::default();
        let batcher = TileBatcher::<TestBackend>::with_image_size(device, 4);

        let batch = batcher.batch(vec![item(3.0, 4), item(1.0, 4), item(2.0, 4)]);
        let targets: Vec<f32> = batch.targets.into_data().to_vec().unwrap();

        assert_eq!(targets, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_singleton_batch() {
        let device = Default::default();
        let batcher = TileBatcher::<TestBackend>::with_image_size(device, 4);

        let batch = batcher.batch(vec![item(5.0, 4)]);
        assert_eq!(batch.images.dims(), [1, 3, 4, 4]);
    }
}
