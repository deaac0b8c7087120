// src/utils/batching.rs

//! Lazy mini-batch iteration over in-memory tensors or indexable datasets.

use crate::core::{BatchConfig, Labels, Result, ShapError};
use ndarray::{stack, Array1, ArrayD, ArrayViewD, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// A dataset addressed one sample at a time.
pub trait IndexedDataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sample at `index` and its label, if the dataset is labeled.
    fn get(&self, index: usize) -> Result<(ArrayD<f64>, Option<f64>)>;
}

/// Where batches are drawn from.
#[derive(Clone, Copy)]
pub enum DataSource<'a> {
    /// Samples stacked along the leading axis, with optional aligned labels.
    Tensors {
        data: &'a ArrayD<f64>,
        labels: Option<&'a Labels>,
    },
    Dataset(&'a dyn IndexedDataset),
}

impl<'a> DataSource<'a> {
    pub fn tensors(data: &'a ArrayD<f64>, labels: Option<&'a Labels>) -> Self {
        DataSource::Tensors { data, labels }
    }

    pub fn dataset(dataset: &'a dyn IndexedDataset) -> Self {
        DataSource::Dataset(dataset)
    }

    pub fn len(&self) -> usize {
        match self {
            DataSource::Tensors { data, .. } => {
                if data.ndim() == 0 {
                    0
                } else {
                    data.len_of(Axis(0))
                }
            }
            DataSource::Dataset(dataset) => dataset.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One mini-batch; leading axis of `features` is the batch.
#[derive(Debug, Clone)]
pub struct Batch {
    pub features: ArrayD<f64>,
    pub labels: Option<Labels>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.features.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns a data source into a finite sequence of batches.
#[derive(Debug, Clone)]
pub struct BatchMaterializer {
    config: BatchConfig,
}

impl BatchMaterializer {
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(BatchMaterializer { config })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Starts one pass over `source`: every sample exactly once, the last batch
    /// possibly short. Each call draws a fresh order.
    pub fn materialize<'a>(&self, source: DataSource<'a>) -> Result<Batches<'a>> {
        if let DataSource::Tensors { data, labels: Some(labels) } = source {
            if data.ndim() == 0 {
                return Err(ShapError::DataShape(
                    "tensor data needs a leading sample axis".to_string(),
                ));
            }
            if labels.len() != data.len_of(Axis(0)) {
                return Err(ShapError::DataShape(format!(
                    "{} labels for {} samples",
                    labels.len(),
                    data.len_of(Axis(0))
                )));
            }
        }

        let mut order: Vec<usize> = (0..source.len()).collect();
        if self.config.shuffle {
            let mut rng = match self.config.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            order.shuffle(&mut rng);
        }

        debug!(
            samples = order.len(),
            batch_size = self.config.batch_size,
            "materializing batches"
        );

        Ok(Batches {
            source,
            order,
            batch_size: self.config.batch_size,
            cursor: 0,
            batch_index: 0,
        })
    }
}

/// Lazy iterator of `(batch_index, batch)` over one pass of a data source.
pub struct Batches<'a> {
    source: DataSource<'a>,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
    batch_index: usize,
}

impl<'a> Batches<'a> {
    /// Number of batches this pass yields in total.
    pub fn num_batches(&self) -> usize {
        batches_for(self.order.len(), self.batch_size)
    }

    fn build(&self, indices: &[usize]) -> Result<Batch> {
        match self.source {
            DataSource::Tensors { data, labels } => Ok(Batch {
                features: data.select(Axis(0), indices),
                labels: labels.map(|l| l.select(Axis(0), indices)),
            }),
            DataSource::Dataset(dataset) => {
                let mut samples = Vec::with_capacity(indices.len());
                let mut labels = Vec::with_capacity(indices.len());
                for &index in indices {
                    let (sample, label) = dataset.get(index)?;
                    samples.push(sample);
                    labels.push(label);
                }
                let views: Vec<ArrayViewD<f64>> = samples.iter().map(|s| s.view()).collect();
                let features = stack(Axis(0), &views).map_err(|e| {
                    ShapError::DataShape(format!("samples in one batch differ in shape: {}", e))
                })?;
                // A batch is labeled only when every sample is.
                let labels = labels
                    .into_iter()
                    .collect::<Option<Vec<f64>>>()
                    .map(Array1::from_vec);
                Ok(Batch { features, labels })
            }
        }
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Result<(usize, Batch)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.build(&self.order[self.cursor..end]);
        self.cursor = end;

        let index = self.batch_index;
        self.batch_index += 1;
        Some(batch.map(|b| (index, b)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = batches_for(self.order.len() - self.cursor, self.batch_size);
        (remaining, Some(remaining))
    }
}

// ceil(samples / batch_size) without overflowing for huge batch sizes
fn batches_for(samples: usize, batch_size: usize) -> usize {
    samples / batch_size + usize::from(samples % batch_size != 0)
}
