// src/pipeline.rs

//! Generator and surrogate classifier composed into one prediction function.

use crate::core::{Dataset, Device, Labels, Result, ShapError};
use crate::traits::{Classifier, Generator, PredictModel};
use ndarray::{Array2, ArrayD, Axis};
use std::cell::{RefCell, RefMut};
use std::ops::Deref;
use tracing::{debug, info};

/// Maps latent vectors to class probabilities: generate, flatten, classify.
///
/// Borrows the generator and classifier from the caller for the length of an
/// explanation session. Generation always runs in host memory; the generator
/// is moved there for each call and moved back before the call returns, also
/// when generation or classification fails. The pipeline is not `Sync`, so only
/// one caller can hold the generator at a time.
pub struct ComposedPipeline<'a, G: Generator, C: Classifier> {
    generator: RefCell<&'a mut G>,
    classifier: &'a mut C,
}

impl<'a, G: Generator, C: Classifier> ComposedPipeline<'a, G, C> {
    pub fn new(generator: &'a mut G, classifier: &'a mut C) -> Self {
        debug!(device = %generator.device(), "composing generator with classifier");
        ComposedPipeline {
            generator: RefCell::new(generator),
            classifier,
        }
    }

    /// Device the generator currently sits on between calls.
    pub fn generator_device(&self) -> Device {
        self.generator.borrow().device()
    }

    pub fn latent_dim(&self) -> usize {
        self.generator.borrow().latent_dim()
    }

    pub fn classifier(&self) -> &C {
        self.classifier
    }

    pub fn fit_classifier(&mut self, x: &Dataset, y: &Labels) -> Result<()> {
        info!(rows = x.nrows(), features = x.ncols(), "fitting surrogate classifier");
        self.classifier.fit(x, y)
    }

    /// Runs the generator on host memory and returns the flattened samples.
    pub fn generate_flat(&self, latent: &Dataset) -> Result<Dataset> {
        let generator = HostPlacement::acquire(&self.generator)?;
        flatten_samples(generator.forward(latent)?)
    }

    pub fn predict_proba(&self, latent: &Dataset) -> Result<Array2<f64>> {
        let samples = self.generate_flat(latent)?;
        self.classifier.predict_proba(&samples)
    }
}

impl<'a, G: Generator, C: Classifier> PredictModel for ComposedPipeline<'a, G, C> {
    fn predict(&self, instances: &Dataset) -> Result<Array2<f64>> {
        self.predict_proba(instances)
    }

    fn num_features(&self) -> usize {
        self.latent_dim()
    }
}

/// Scoped host placement of the generator; restores the original device on drop.
struct HostPlacement<'g, 'a, G: Generator> {
    generator: RefMut<'g, &'a mut G>,
    original: Device,
}

impl<'g, 'a, G: Generator> HostPlacement<'g, 'a, G> {
    fn acquire(cell: &'g RefCell<&'a mut G>) -> Result<Self> {
        let mut generator = cell.try_borrow_mut().map_err(|_| {
            ShapError::Precondition("generator is already in use by another call".to_string())
        })?;
        let original = generator.device();
        if original != Device::Cpu {
            generator.to_device(Device::Cpu);
        }
        Ok(HostPlacement { generator, original })
    }
}

impl<'g, 'a, G: Generator> Deref for HostPlacement<'g, 'a, G> {
    type Target = G;

    fn deref(&self) -> &G {
        &self.generator
    }
}

impl<'g, 'a, G: Generator> Drop for HostPlacement<'g, 'a, G> {
    fn drop(&mut self) {
        if self.generator.device() != self.original {
            self.generator.to_device(self.original);
        }
    }
}

/// Reshapes a batch of samples (leading axis = batch) to one row per sample.
pub fn flatten_samples(samples: ArrayD<f64>) -> Result<Dataset> {
    if samples.ndim() == 0 {
        return Err(ShapError::DataShape(
            "generator output has no batch axis".to_string(),
        ));
    }
    let n = samples.len_of(Axis(0));
    let width = samples.shape()[1..].iter().product::<usize>();
    Ok(samples
        .as_standard_layout()
        .into_owned()
        .into_shape((n, width))?)
}
