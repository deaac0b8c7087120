// src/traits.rs

//! Seams between the explainer and the models it talks to.

use crate::core::{Dataset, Device, Labels, Result};
use ndarray::{Array2, ArrayD};

/// A black-box model the kernel explainer can query.
pub trait PredictModel {
    /// Predicts one row of outputs per instance, shape (num_instances, num_outputs).
    fn predict(&self, instances: &Dataset) -> Result<Array2<f64>>;

    /// Width of the input rows the model accepts.
    fn num_features(&self) -> usize;
}

impl<M: PredictModel + ?Sized> PredictModel for &M {
    fn predict(&self, instances: &Dataset) -> Result<Array2<f64>> {
        (**self).predict(instances)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }
}

/// A trained GAN generator.
///
/// The generator runs on whatever device it currently sits on; callers move it
/// with [`Generator::to_device`].
pub trait Generator {
    /// Maps a batch of latent vectors (num_samples, latent_dim) to samples whose
    /// leading axis is the batch.
    fn forward(&self, latent: &Dataset) -> Result<ArrayD<f64>>;

    fn latent_dim(&self) -> usize;

    fn device(&self) -> Device;

    fn to_device(&mut self, device: Device);
}

/// A classical classifier fitted on flattened samples.
pub trait Classifier {
    fn fit(&mut self, x: &Dataset, y: &Labels) -> Result<()>;

    /// Class probabilities, shape (num_samples, num_classes).
    fn predict_proba(&self, x: &Dataset) -> Result<Array2<f64>>;
}
