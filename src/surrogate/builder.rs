// src/surrogate/builder.rs
use crate::core::{BatchConfig, Dataset, Labels, Result, ShapError};
use crate::utils::{generate_feature_names, BatchMaterializer, DataSource};
use ndarray::{concatenate, Axis};
use tracing::{debug, info};

/// Flat, in-memory training set for a classical classifier.
#[derive(Debug, Clone)]
pub struct SurrogateDataset {
    /// One flattened sample per row.
    pub x: Dataset,
    /// Labels aligned with `x`, when the source is labeled.
    pub y: Option<Labels>,
    /// One name per column of `x`.
    pub feature_names: Vec<String>,
    /// Shape of a single sample before flattening.
    pub sample_shape: Vec<usize>,
}

impl SurrogateDataset {
    pub fn num_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn labels(&self) -> Result<&Labels> {
        self.y.as_ref().ok_or_else(|| {
            ShapError::InvalidInput("surrogate dataset was built without labels".to_string())
        })
    }
}

/// Drains a data source once and flattens it into `(X, y)`.
#[derive(Debug, Clone)]
pub struct SurrogateDatasetBuilder {
    materializer: BatchMaterializer,
}

impl SurrogateDatasetBuilder {
    pub fn new(config: BatchConfig) -> Result<Self> {
        Ok(SurrogateDatasetBuilder {
            materializer: BatchMaterializer::new(config)?,
        })
    }

    /// Rows follow batch emission order. Fails with `EmptyInput` when the
    /// source yields no batch.
    pub fn build(&self, source: DataSource<'_>) -> Result<SurrogateDataset> {
        let mut x_parts: Vec<Dataset> = Vec::new();
        let mut y_parts: Vec<Labels> = Vec::new();
        let mut unlabeled = false;
        let mut sample_shape: Option<Vec<usize>> = None;

        for item in self.materializer.materialize(source)? {
            let (batch_idx, batch) = item?;
            let n = batch.len();
            let shape = batch.features.shape()[1..].to_vec();
            let expected = sample_shape.get_or_insert_with(|| shape.clone());
            if *expected != shape {
                return Err(ShapError::DataShape(format!(
                    "batch {} has sample shape {:?}, expected {:?}",
                    batch_idx, shape, expected
                )));
            }

            let width = batch.features.len() / n.max(1);
            let flat = batch
                .features
                .as_standard_layout()
                .into_owned()
                .into_shape((n, width))?;
            x_parts.push(flat);

            match batch.labels {
                Some(labels) => y_parts.push(labels),
                None => unlabeled = true,
            }
            debug!(batch_idx, rows = n, "flattened batch");
        }

        let sample_shape = sample_shape
            .ok_or_else(|| ShapError::EmptyInput("data source yielded no batches".to_string()))?;

        let x_views: Vec<_> = x_parts.iter().map(|p| p.view()).collect();
        let x = concatenate(Axis(0), &x_views)?;
        let y = if unlabeled {
            None
        } else {
            let y_views: Vec<_> = y_parts.iter().map(|p| p.view()).collect();
            Some(concatenate(Axis(0), &y_views)?)
        };

        let feature_names = generate_feature_names(&sample_shape);
        info!(
            rows = x.nrows(),
            features = x.ncols(),
            labeled = y.is_some(),
            "built surrogate dataset"
        );

        Ok(SurrogateDataset {
            x,
            y,
            feature_names,
            sample_shape,
        })
    }
}
