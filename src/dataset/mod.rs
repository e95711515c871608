//! Dataset module for survey tile handling
//!
//! This module provides functionality for:
//! - Loading per-country survey manifests with scalar consumption labels
//! - Per-satellite-type image preprocessing
//! - Batching tiles into Burn tensors for the training loop

pub mod loader;
pub mod survey;
pub mod tile;
pub mod transform;

// Re-export main types for convenience
pub use loader::BatchLoader;
pub use survey::{Country, SurveyTileConfig, SurveyTileDataset};
pub use tile::{TileBatch, TileBatcher, TileItem};
pub use transform::{Phase, SatType, TransformPipeline};
