use std::marker::PhantomData;

use rand::seq::SliceRandom;

use crate::data::Dataset;
use crate::error::{Result, TensorError};
use crate::tensor::{functional, with_rng, Numeric, RcTensor};

/// Batches samples from a dataset, optionally in a freshly shuffled order each pass.
pub struct DataLoader<T, D>
where
    T: Numeric,
    D: Dataset<T>,
{
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    _marker: PhantomData<T>,
}

impl<T, D> DataLoader<T, D>
where
    T: Numeric,
    D: Dataset<T>,
{
    pub fn new(dataset: D, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(TensorError::InvalidArgument(
                "batch_size must be positive".into(),
            ));
        }
        Ok(DataLoader {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            _marker: PhantomData,
        })
    }

    /// Draws a new order from the seeded generator on every `iter()`.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Skips the final batch when it would be shorter than `batch_size`.
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Number of batches per pass.
    pub fn len(&self) -> usize {
        let samples = self.dataset.len();
        if self.drop_last {
            samples / self.batch_size
        } else {
            samples.div_ceil(self.batch_size)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> DataLoaderIter<'_, T, D> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            with_rng(|rng| indices.shuffle(rng));
        }
        DataLoaderIter {
            loader: self,
            indices,
            position: 0,
        }
    }
}

impl<'a, T, D> IntoIterator for &'a DataLoader<T, D>
where
    T: Numeric,
    D: Dataset<T>,
{
    type Item = Result<(RcTensor<T>, RcTensor<T>)>;
    type IntoIter = DataLoaderIter<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a `DataLoader`. Each item is a batch of stacked samples.
pub struct DataLoaderIter<'a, T, D>
where
    T: Numeric,
    D: Dataset<T>,
{
    loader: &'a DataLoader<T, D>,
    indices: Vec<usize>,
    position: usize,
}

impl<T, D> DataLoaderIter<'_, T, D>
where
    T: Numeric,
    D: Dataset<T>,
{
    fn collate(&self, batch_indices: &[usize]) -> Result<(RcTensor<T>, RcTensor<T>)> {
        let (inputs, targets): (Vec<_>, Vec<_>) = batch_indices
            .iter()
            .map(|&i| self.loader.dataset.get(i))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();
        Ok((functional::stack(&inputs, 0)?, functional::stack(&targets, 0)?))
    }
}

impl<T, D> Iterator for DataLoaderIter<'_, T, D>
where
    T: Numeric,
    D: Dataset<T>,
{
    type Item = Result<(RcTensor<T>, RcTensor<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.indices.len().saturating_sub(self.position);
        if remaining == 0 || (self.loader.drop_last && remaining < self.loader.batch_size) {
            return None;
        }
        let take = remaining.min(self.loader.batch_size);
        let start = self.position;
        self.position += take;
        Some(self.collate(&self.indices[start..start + take]))
    }
}
