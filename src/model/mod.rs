//! Regression model built with Burn

pub mod regressor;

pub use regressor::{
    ConvBlock, PovertyRegressor, PovertyRegressorConfig, RegressionHead, TileEncoder,
};
