//! Batch Loader
//!
//! Wraps a dataset into a lazy, finite, restartable per-epoch sequence of
//! mini-batches. Training epochs draw a fresh shuffled order from a seeded
//! RNG; validation epochs always walk the dataset in natural order. Batch
//! composition and order are the observable contract here.

use burn::data::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::tile::TileItem;
use crate::dataset::transform::Phase;
use crate::utils::error::{PovertyError, Result};

/// Per-phase mini-batch loader.
pub struct BatchLoader<D> {
    dataset: D,
    batch_size: usize,
    phase: Phase,
    rng: Option<ChaCha8Rng>,
}

impl<D: Dataset<TileItem>> BatchLoader<D> {
    /// Create a training loader that reshuffles every epoch.
    ///
    /// The RNG is seeded once; successive `epoch()` calls advance it, so a
    /// fixed seed reproduces the whole sequence of epoch orderings.
    pub fn train(dataset: D, batch_size: usize, seed: u64) -> Self {
        Self {
            dataset,
            batch_size,
            phase: Phase::Train,
            rng: Some(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Create a validation loader that preserves dataset order.
    pub fn val(dataset: D, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size,
            phase: Phase::Val,
            rng: None,
        }
    }

    /// Phase this loader serves
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of samples in the underlying dataset
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Number of batches per epoch (the last one may be smaller)
    pub fn num_batches(&self) -> usize {
        let len = self.dataset.len();
        if self.batch_size == 0 {
            return 0;
        }
        (len + self.batch_size - 1) / self.batch_size
    }

    /// Start a new epoch over the dataset.
    pub fn epoch(&mut self) -> EpochBatches<'_, D> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            indices.shuffle(rng);
        }

        EpochBatches {
            dataset: &self.dataset,
            batch_size: self.batch_size,
            indices,
            cursor: 0,
        }
    }
}

/// Lazy iterator over one epoch's batches.
///
/// An unloadable sample aborts the epoch: the error is yielded once and
/// iteration ends.
pub struct EpochBatches<'a, D> {
    dataset: &'a D,
    batch_size: usize,
    indices: Vec<usize>,
    cursor: usize,
}

impl<D: Dataset<TileItem>> Iterator for EpochBatches<'_, D> {
    type Item = Result<Vec<TileItem>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.indices.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.indices.len());
        let mut items = Vec::with_capacity(end - self.cursor);

        for &index in &self.indices[self.cursor..end] {
            match self.dataset.get(index) {
                Some(item) => items.push(item),
                None => {
                    self.cursor = self.indices.len();
                    return Some(Err(PovertyError::Dataset(format!(
                        "failed to load sample at index {index}"
                    ))));
                }
            }
        }

        self.cursor = end;
        Some(Ok(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::InMemDataset;

    fn items(n: usize) -> Vec<TileItem> {
        (0..n)
            .map(|i| TileItem::from_data(vec![i as f32; 12], i as f32, format!("t{i}.png")))
            .collect()
    }

    fn epoch_labels<D: Dataset<TileItem>>(loader: &mut BatchLoader<D>) -> Vec<f32> {
        loader
            .epoch()
            .flat_map(|batch| batch.unwrap())
            .map(|item| item.label)
            .collect()
    }

    #[test]
    fn test_val_order_is_natural_every_epoch() {
        let mut loader = BatchLoader::val(InMemDataset::new(items(7)), 3);

        let expected: Vec<f32> = (0..7).map(|i| i as f32).collect();
        assert_eq!(epoch_labels(&mut loader), expected);
        assert_eq!(epoch_labels(&mut loader), expected);
    }

    #[test]
    fn test_train_order_is_seed_deterministic() {
        let mut a = BatchLoader::train(InMemDataset::new(items(20)), 4, 7);
        let mut b = BatchLoader::train(InMemDataset::new(items(20)), 4, 7);

        for _ in 0..3 {
            assert_eq!(epoch_labels(&mut a), epoch_labels(&mut b));
        }
    }

    #[test]
    fn test_train_order_changes_between_epochs() {
        let mut loader = BatchLoader::train(InMemDataset::new(items(20)), 4, 7);

        let first = epoch_labels(&mut loader);
        let second = epoch_labels(&mut loader);

        assert_ne!(first, second);

        // Both epochs still cover every sample exactly once
        let mut sorted = first.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted, (0..20).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_last_batch_may_be_smaller() {
        let mut loader = BatchLoader::val(InMemDataset::new(items(5)), 2);

        let sizes: Vec<usize> = loader.epoch().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(loader.num_batches(), 3);
    }

    #[test]
    fn test_unloadable_sample_aborts_the_epoch() {
        struct Broken;

        impl Dataset<TileItem> for Broken {
            fn get(&self, index: usize) -> Option<TileItem> {
                if index == 2 {
                    None
                } else {
                    Some(TileItem::from_data(vec![0.0; 12], 0.0, String::new()))
                }
            }

            fn len(&self) -> usize {
                4
            }
        }

        let mut loader = BatchLoader::val(Broken, 2);
        let results: Vec<_> = loader.epoch().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
