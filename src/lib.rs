// src/lib.rs

//! `shapgan_rs` explains a trained GAN generator through a surrogate classifier
//! with kernel SHAP (SHapley Additive exPlanations).
//!
//! The generator and classifier are composed into one black-box function from
//! latent vectors to class probabilities; kernel SHAP then attributes each
//! probability to the latent dimensions. Results are written as a JSON
//! probability table plus optional summary and waterfall plots.

pub mod algorithms;
pub mod core;
pub mod explain;
pub mod pipeline;
pub mod plot;
pub mod surrogate;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{KernelExplainer, KernelShapConfig, KernelShapSamples};
pub use crate::core::{
    BatchConfig, Dataset, Device, Explanation, FeatureFrame, Instance, Labels, PlotFeature,
    Result, ShapError, ShapGenConfig, ShapValues,
};
pub use crate::explain::{ExplainReport, ShapGen};
pub use crate::pipeline::ComposedPipeline;
pub use crate::surrogate::{GaussianNb, SurrogateDataset, SurrogateDatasetBuilder};
pub use crate::traits::{Classifier, Generator, PredictModel};
pub use crate::utils::{generate_feature_names, DataSource, GaussianNoise, IndexedDataset};
