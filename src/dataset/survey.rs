//! Survey Tile Dataset
//!
//! Manifest-driven dataset mapping survey cluster identifiers to satellite
//! tile paths and scalar consumption labels. Implements Burn's `Dataset`
//! trait with lazy, on-demand image loading.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use burn::data::dataset::Dataset;
use image::ImageReader;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::tile::TileItem;
use crate::dataset::transform::{SatType, TransformPipeline};
use crate::utils::error::{PovertyError, Result};

/// Survey country
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Bangladesh,
    India,
}

impl FromStr for Country {
    type Err = PovertyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bangladesh" => Ok(Country::Bangladesh),
            "india" => Ok(Country::India),
            other => Err(PovertyError::NotImplemented(format!(
                "country '{other}' (only bangladesh and india are supported)"
            ))),
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Country::Bangladesh => write!(f, "bangladesh"),
            Country::India => write!(f, "india"),
        }
    }
}

/// Configuration for a survey tile dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyTileConfig {
    /// Path to the manifest CSV with `id` and label columns
    pub manifest: PathBuf,
    /// Directory holding the satellite tiles
    pub imagery_root: PathBuf,
    /// Name of the manifest column holding the scalar label
    pub label_column: String,
    /// Survey country
    pub country: Country,
    /// Satellite imagery source
    pub sat_type: SatType,
    /// Imagery acquisition year
    pub year: u16,
    /// Fraction of manifest rows to keep (1.0 keeps everything)
    pub frac: f64,
    /// Seed for the row subsample drawn when `frac < 1.0`
    pub seed: u64,
}

/// One manifest row: a cluster identifier and its scalar label
#[derive(Debug, Clone)]
struct SurveyRow {
    id: String,
    label: f32,
}

/// Per-country satellite tile dataset with lazy image loading.
#[derive(Debug, Clone)]
pub struct SurveyTileDataset {
    rows: Vec<SurveyRow>,
    config: SurveyTileConfig,
    transform: TransformPipeline,
}

impl SurveyTileDataset {
    /// Load the manifest and build the dataset.
    ///
    /// Fails if the manifest is unreadable, lacks the `id` or label
    /// column, or holds an unparsable label. No image is touched here;
    /// tiles load lazily on indexed access.
    pub fn new(config: SurveyTileConfig, transform: TransformPipeline) -> Result<Self> {
        let mut reader = csv::Reader::from_path(&config.manifest).map_err(|e| {
            PovertyError::Dataset(format!(
                "failed to open manifest {}: {e}",
                config.manifest.display()
            ))
        })?;

        let headers = reader.headers()?.clone();
        let id_idx = column_index(&headers, "id", &config.manifest)?;
        let label_idx = column_index(&headers, &config.label_column, &config.manifest)?;

        let mut rows = Vec::new();
        for (row_no, record) in reader.records().enumerate() {
            let record = record?;
            let id = record
                .get(id_idx)
                .unwrap_or_default()
                .trim()
                .to_string();
            let raw_label = record.get(label_idx).unwrap_or_default().trim();
            let label: f32 = raw_label.parse().map_err(|_| {
                PovertyError::Dataset(format!(
                    "row {} of {}: label '{}' is not a number",
                    row_no + 1,
                    config.manifest.display(),
                    raw_label
                ))
            })?;
            rows.push(SurveyRow { id, label });
        }

        let rows = subsample(rows, config.frac, config.seed);

        Ok(Self {
            rows,
            config,
            transform,
        })
    }

    /// Filesystem path of the tile backing a manifest row
    pub fn tile_path(&self, id: &str) -> PathBuf {
        self.config.imagery_root.join(format!(
            "{}_{}_{}_{}.png",
            self.config.sat_type, self.config.country, self.config.year, id
        ))
    }

    /// Load and preprocess the tile at `index`.
    pub fn load_item(&self, index: usize) -> Result<TileItem> {
        let row = self.rows.get(index).ok_or_else(|| {
            PovertyError::Dataset(format!(
                "index {index} out of bounds for dataset of {} rows",
                self.rows.len()
            ))
        })?;

        let path = self.tile_path(&row.id);
        let img = ImageReader::open(&path)
            .map_err(|e| PovertyError::Image(format!("{}: {e}", path.display())))?
            .decode()
            .map_err(|e| PovertyError::Image(format!("{}: {e}", path.display())))?;

        let image = self.transform.apply(&img);

        Ok(TileItem {
            image,
            label: row.label,
            path: path.to_string_lossy().to_string(),
        })
    }
}

impl Dataset<TileItem> for SurveyTileDataset {
    fn get(&self, index: usize) -> Option<TileItem> {
        match self.load_item(index) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("failed to load sample {index}: {e}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, manifest: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| {
            PovertyError::Dataset(format!(
                "manifest {} is missing a '{}' column",
                manifest.display(),
                name
            ))
        })
}

/// Keep a seeded random subset of `frac * rows.len()` rows, preserving
/// manifest order within the subset.
fn subsample(rows: Vec<SurveyRow>, frac: f64, seed: u64) -> Vec<SurveyRow> {
    if frac >= 1.0 {
        return rows;
    }

    let keep = ((rows.len() as f64) * frac).round() as usize;
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(keep);
    indices.sort_unstable();

    let mut wanted = indices.into_iter().peekable();
    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            if wanted.peek() == Some(&i) {
                wanted.next();
                Some(row)
            } else {
                None
            }
        })
        .collect()
}
