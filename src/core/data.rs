// src/core/data.rs
use crate::core::{Result, ShapError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::fmt;

/// Represents a single data instance (a row of features).
/// We use `f64` for flexibility with various model outputs and calculations.
pub type Instance = Array1<f64>;

/// Represents a dataset (multiple instances, e.g., background data or latent batches).
pub type Dataset = Array2<f64>;

/// Class labels aligned row-for-row with a [`Dataset`].
pub type Labels = Array1<f64>;

/// Sample rows labeled with one name per column.
///
/// Building a frame is where a feature name list that does not match the
/// sample width is caught.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    data: Dataset,
    feature_names: Vec<String>,
}

impl FeatureFrame {
    pub fn new(data: Dataset, feature_names: Vec<String>) -> Result<Self> {
        if feature_names.len() != data.ncols() {
            return Err(ShapError::DataShape(format!(
                "{} feature names given for {} columns",
                feature_names.len(),
                data.ncols()
            )));
        }
        Ok(FeatureFrame { data, feature_names })
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }
}

/// Represents the output of a SHAP explanation for a single instance
/// of a model with one or more outputs.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// SHAP values, shape (num_outputs, num_features).
    pub shap_values: Array2<f64>,
    /// The base values E[f(x)], one per output.
    pub expected_value: Array1<f64>,
    /// The actual prediction for the instance being explained, one per output.
    pub actual_prediction: Array1<f64>,
    /// Optional: The instance that was explained.
    pub instance: Option<Instance>,
}

impl Explanation {
    pub fn num_outputs(&self) -> usize {
        self.shap_values.nrows()
    }

    /// SHAP values for one model output.
    pub fn output(&self, output: usize) -> ArrayView1<'_, f64> {
        self.shap_values.row(output)
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explanation:")?;
        for (k, values) in self.shap_values.axis_iter(Axis(0)).enumerate() {
            writeln!(f, "  Output {}:", k)?;
            writeln!(f, "    Expected Value (Base): {:.4}", self.expected_value[k])?;
            writeln!(f, "    Actual Prediction:     {:.4}", self.actual_prediction[k])?;
            for (i, val) in values.iter().enumerate() {
                writeln!(f, "    Feature {}: {:.4}", i, val)?;
            }
        }
        if let Some(inst) = &self.instance {
            writeln!(f, "  Instance Values (first 10):")?;
            for (i, val) in inst.iter().take(10).enumerate() {
                writeln!(f, "    Feature {}: {:.4}", i, val)?;
            }
            if inst.len() > 10 {
                writeln!(f, "    ...")?;
            }
        }
        Ok(())
    }
}

/// Attribution values for a batch of explained samples.
///
/// One (num_samples, num_features) array per model output. Rendered into
/// artifacts right after being computed and then dropped.
#[derive(Debug, Clone)]
pub struct ShapValues {
    pub per_output: Vec<Array2<f64>>,
    pub expected_value: Array1<f64>,
}

impl ShapValues {
    pub fn num_outputs(&self) -> usize {
        self.per_output.len()
    }

    pub fn output(&self, output: usize) -> ArrayView2<'_, f64> {
        self.per_output[output].view()
    }
}
