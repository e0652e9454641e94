//! DataLoader for batching and iterating over training images
//!
//! Provides efficient batching for GAN training with support for:
//! - Random shuffling each epoch
//! - Drop last incomplete batch
//! - Iteration over batches

use rand::seq::SliceRandom;
use tch::Tensor;

/// DataLoader for iterating over batched images
pub struct DataLoader {
    /// Full dataset of shape (num_images, 28, 28, 1)
    data: Tensor,
    /// Batch size
    batch_size: usize,
    /// Whether to shuffle data each epoch
    shuffle: bool,
    /// Whether to drop the last incomplete batch
    drop_last: bool,
    /// Current indices for iteration
    indices: Vec<i64>,
    /// Current position in iteration
    current_idx: usize,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `data` - Tensor of shape (num_images, height, width, channels)
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    pub fn new(data: Tensor, batch_size: usize, shuffle: bool, drop_last: bool) -> Self {
        let num_samples = data.size()[0];
        let indices: Vec<i64> = (0..num_samples).collect();

        let mut loader = Self {
            data,
            batch_size,
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.num_samples();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            num_samples.div_ceil(self.batch_size)
        }
    }

    /// Get total number of images
    pub fn num_samples(&self) -> usize {
        self.data.size()[0] as usize
    }

    /// Shuffle indices for a new epoch
    fn shuffle_indices(&mut self) {
        let mut rng = rand::thread_rng();
        self.indices.shuffle(&mut rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get next batch
    ///
    /// Returns None when the epoch is complete. Batches are views assembled
    /// by index selection; the backing data is never mutated.
    pub fn next_batch(&mut self) -> Option<Tensor> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);
        let actual_batch_size = end - start;

        // Skip incomplete batch if drop_last
        if self.drop_last && actual_batch_size < self.batch_size {
            return None;
        }

        let index = Tensor::from_slice(&self.indices[start..end]);
        let batch = self.data.index_select(0, &index);

        self.current_idx = end;
        Some(batch)
    }

    /// Iterate over all batches for one epoch
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Tensor;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    fn dummy_images(n: i64) -> Tensor {
        Tensor::zeros([n, 28, 28, 1], (Kind::Float, Device::Cpu))
    }

    #[test]
    fn test_dataloader_basic() {
        let mut loader = DataLoader::new(dummy_images(10), 3, false, false);

        assert_eq!(loader.num_batches(), 4); // ceil(10/3) = 4
        assert_eq!(loader.num_samples(), 10);

        let mut batch_count = 0;
        while let Some(batch) = loader.next_batch() {
            batch_count += 1;
            if batch_count < 4 {
                assert_eq!(batch.size()[0], 3);
            } else {
                assert_eq!(batch.size()[0], 1); // Last batch has 1 sample
            }
        }
        assert_eq!(batch_count, 4);
    }

    #[test]
    fn test_dataloader_drop_last() {
        let mut loader = DataLoader::new(dummy_images(10), 3, false, true);

        assert_eq!(loader.num_batches(), 3); // floor(10/3) = 3

        let mut batch_count = 0;
        while let Some(batch) = loader.next_batch() {
            batch_count += 1;
            assert_eq!(batch.size(), vec![3, 28, 28, 1]);
        }
        assert_eq!(batch_count, 3);
    }

    #[test]
    fn test_dataloader_iter() {
        let mut loader = DataLoader::new(dummy_images(10), 5, false, true);

        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_dataloader_repeatedly_iterable() {
        let mut loader = DataLoader::new(dummy_images(8), 4, true, true);

        for _ in 0..3 {
            assert_eq!(loader.iter().count(), 2);
        }
    }

    #[test]
    fn test_dataloader_empty_yields_no_batches() {
        let mut loader = DataLoader::new(dummy_images(0), 4, false, true);
        assert_eq!(loader.num_batches(), 0);
        assert!(loader.next_batch().is_none());
    }
}
