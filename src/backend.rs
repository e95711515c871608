//! Backend selection
//!
//! Training runs on the NdArray CPU backend by default; the `wgpu` feature
//! switches to the WebGPU backend. The device value is threaded explicitly
//! through dataset batchers and the trainer rather than read from global
//! state, so backend choice never alters control flow.

use burn::backend::Autodiff;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(all(feature = "ndarray", not(feature = "wgpu")))]
pub type DefaultBackend = burn::backend::NdArray;

#[cfg(not(any(feature = "ndarray", feature = "wgpu")))]
compile_error!("Either the `ndarray` or `wgpu` feature must be enabled.");

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device for the selected backend
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "WGPU (GPU)"
    }
    #[cfg(all(feature = "ndarray", not(feature = "wgpu")))]
    {
        "NdArray (CPU)"
    }
}
