//! CNN Regression Model for Poverty Mapping
//!
//! A convolutional encoder topped with a single-output linear head that
//! regresses a scalar consumption proxy from a satellite tile. The head is
//! the only part trained when fine-tuning is disabled.

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor},
};

use crate::utils::error::PovertyError;

/// Configuration for the poverty regression model
#[derive(Config, Debug)]
pub struct PovertyRegressorConfig {
    /// Input image size (assumes square tiles)
    #[config(default = "224")]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = "32")]
    pub base_filters: usize,
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Convolutional feature encoder.
///
/// Four blocks with doubling filter counts followed by global average
/// pooling, producing a `[batch, base_filters * 8]` feature vector.
#[derive(Module, Debug)]
pub struct TileEncoder<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
}

impl<B: Backend> TileEncoder<B> {
    /// Create a new encoder from configuration
    pub fn new(config: &PovertyRegressorConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        let conv1 = ConvBlock::new(config.in_channels, base, device);
        let conv2 = ConvBlock::new(base, base * 2, device);
        let conv3 = ConvBlock::new(base * 2, base * 4, device);
        let conv4 = ConvBlock::new(base * 4, base * 8, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        Self {
            conv1,
            conv2,
            conv3,
            conv4,
            global_pool,
        }
    }

    /// Extract features: [B, C, H, W] -> [B, base_filters * 8]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        let x = self.global_pool.forward(x);

        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

/// The replaced final layer: a single linear unit mapping features to a
/// scalar prediction.
#[derive(Module, Debug)]
pub struct RegressionHead<B: Backend> {
    pub fc: Linear<B>,
}

impl<B: Backend> RegressionHead<B> {
    /// Create a new head for the given feature width
    pub fn new(in_features: usize, device: &B::Device) -> Self {
        Self {
            fc: LinearConfig::new(in_features, 1).init(device),
        }
    }

    /// Forward pass: [B, features] -> [B, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.fc.forward(x)
    }
}

/// Poverty regression network: encoder plus scalar head.
#[derive(Module, Debug)]
pub struct PovertyRegressor<B: Backend> {
    pub encoder: TileEncoder<B>,
    pub head: RegressionHead<B>,
}

impl<B: Backend> PovertyRegressor<B> {
    /// Create a new model from configuration
    pub fn new(config: &PovertyRegressorConfig, device: &B::Device) -> Self {
        let encoder = TileEncoder::new(config, device);
        let head = RegressionHead::new(config.base_filters * 8, device);

        Self { encoder, head }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Predictions tensor of shape [batch_size]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 1> {
        let features = self.encoder.forward(x);
        let out = self.head.forward(features);

        let [batch_size, _] = out.dims();
        out.reshape([batch_size])
    }

    /// Replace this model's parameters with a snapshot saved by a prior
    /// run, so training starts from exactly those weights.
    pub fn load_weights<P: AsRef<Path>>(
        self,
        path: P,
        device: &B::Device,
    ) -> crate::utils::error::Result<Self> {
        let path = path.as_ref();
        self.load_file(path, &CompactRecorder::new(), device)
            .map_err(|e| {
                PovertyError::Model(format!(
                    "failed to load weights from {}: {e}",
                    path.display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::module::Module;
    use tempfile::TempDir;

    type TestBackend = NdArray;

    fn small_config() -> PovertyRegressorConfig {
        PovertyRegressorConfig::new()
            .with_input_size(32)
            .with_base_filters(4)
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let model = PovertyRegressor::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2]);
    }

    #[test]
    fn test_encoder_feature_width() {
        let device = Default::default();
        let encoder = TileEncoder::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        let features = encoder.forward(input);

        assert_eq!(features.dims(), [1, 32]);
    }

    #[test]
    fn test_load_weights_matches_saved_snapshot() {
        let device = Default::default();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot");

        let saved = PovertyRegressor::<TestBackend>::new(&small_config(), &device);
        saved
            .clone()
            .save_file(&path, &CompactRecorder::new())
            .unwrap();

        let fresh = PovertyRegressor::<TestBackend>::new(&small_config(), &device);
        let loaded = fresh.load_weights(&path, &device).unwrap();

        let saved_w: Vec<f32> = saved.head.fc.weight.val().into_data().to_vec().unwrap();
        let loaded_w: Vec<f32> = loaded.head.fc.weight.val().into_data().to_vec().unwrap();
        assert_eq!(saved_w, loaded_w);

        let saved_c: Vec<f32> = saved
            .encoder
            .conv1
            .conv
            .weight
            .val()
            .into_data()
            .to_vec()
            .unwrap();
        let loaded_c: Vec<f32> = loaded
            .encoder
            .conv1
            .conv
            .weight
            .val()
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(saved_c, loaded_c);
    }

    #[test]
    fn test_missing_snapshot_is_a_model_error() {
        let device = Default::default();
        let model = PovertyRegressor::<TestBackend>::new(&small_config(), &device);

        let err = model
            .load_weights("/nonexistent/snapshot", &device)
            .unwrap_err();
        assert!(matches!(err, crate::utils::error::PovertyError::Model(_)));
    }
}
