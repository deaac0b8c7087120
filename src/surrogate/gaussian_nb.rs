// src/surrogate/gaussian_nb.rs
use crate::core::{Dataset, Labels, Result, ShapError};
use crate::traits::Classifier;
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

/// Gaussian Naive Bayes classifier used as the surrogate for generated samples.
///
/// Classes are the distinct label values in ascending order; column `j` of
/// [`Classifier::predict_proba`] is the probability of `classes()[j]`.
#[derive(Debug, Clone)]
pub struct GaussianNb {
    /// Added to every variance, relative to the largest feature variance.
    var_smoothing: f64,
    fitted: Option<FittedNb>,
}

#[derive(Debug, Clone)]
struct FittedNb {
    classes: Vec<f64>,
    log_priors: Array1<f64>,
    /// (num_classes, num_features)
    means: Array2<f64>,
    variances: Array2<f64>,
}

impl Default for GaussianNb {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNb {
    pub fn new() -> Self {
        GaussianNb {
            var_smoothing: 1e-9,
            fitted: None,
        }
    }

    pub fn with_var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn classes(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    pub fn num_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.means.ncols())
    }

    /// Most probable class label per row.
    pub fn predict(&self, x: &Dataset) -> Result<Labels> {
        let probabilities = self.predict_proba(x)?;
        let classes = self.classes().unwrap_or_default();
        Ok(probabilities
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |acc, (j, &p)| if p > acc.1 { (j, p) } else { acc })
                    .0;
                classes[best]
            })
            .collect())
    }

    fn fitted(&self) -> Result<&FittedNb> {
        self.fitted
            .as_ref()
            .ok_or_else(|| ShapError::InvalidInput("classifier is not fitted".to_string()))
    }
}

impl Classifier for GaussianNb {
    fn fit(&mut self, x: &Dataset, y: &Labels) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(ShapError::EmptyInput("cannot fit with empty data".to_string()));
        }
        if y.len() != n_samples {
            return Err(ShapError::DataShape(format!(
                "{} labels for {} samples",
                y.len(),
                n_samples
            )));
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        if classes.len() < 2 {
            return Err(ShapError::InvalidInput(format!(
                "need at least 2 classes, got {}",
                classes.len()
            )));
        }

        let epsilon = self.var_smoothing * x.var_axis(Axis(0), 0.0).fold(0.0_f64, |acc, &v| acc.max(v));
        // Guard against an all-constant matrix.
        let epsilon = if epsilon > 0.0 { epsilon } else { self.var_smoothing };

        let n_classes = classes.len();
        let mut log_priors = Array1::zeros(n_classes);
        let mut means = Array2::zeros((n_classes, n_features));
        let mut variances = Array2::zeros((n_classes, n_features));

        for (class_idx, &label) in classes.iter().enumerate() {
            let members: Vec<usize> = y
                .iter()
                .enumerate()
                .filter_map(|(i, &l)| if l == label { Some(i) } else { None })
                .collect();
            let class_rows = x.select(Axis(0), &members);

            log_priors[class_idx] = (members.len() as f64 / n_samples as f64).ln();
            if let Some(mean) = class_rows.mean_axis(Axis(0)) {
                means.row_mut(class_idx).assign(&mean);
            }
            let var = class_rows.var_axis(Axis(0), 0.0) + epsilon;
            variances.row_mut(class_idx).assign(&var);
        }

        debug!(n_samples, n_features, n_classes, "fitted gaussian naive bayes");
        self.fitted = Some(FittedNb {
            classes,
            log_priors,
            means,
            variances,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &Dataset) -> Result<Array2<f64>> {
        let fitted = self.fitted()?;
        let n_features = fitted.means.ncols();
        if x.ncols() != n_features {
            return Err(ShapError::DataShape(format!(
                "classifier expects {} features, got {}",
                n_features,
                x.ncols()
            )));
        }

        let n_classes = fitted.classes.len();
        let log_norm = fitted
            .variances
            .mapv(|v| (2.0 * std::f64::consts::PI * v).ln())
            .sum_axis(Axis(1))
            * -0.5;

        let mut probabilities = Array2::zeros((x.nrows(), n_classes));
        for (mut out, sample) in probabilities.rows_mut().into_iter().zip(x.rows()) {
            for class_idx in 0..n_classes {
                let means = fitted.means.row(class_idx);
                let variances = fitted.variances.row(class_idx);
                let mahalanobis: f64 = sample
                    .iter()
                    .zip(means.iter().zip(variances.iter()))
                    .map(|(&v, (&mu, &var))| (v - mu) * (v - mu) / var)
                    .sum();
                out[class_idx] = fitted.log_priors[class_idx] + log_norm[class_idx] - 0.5 * mahalanobis;
            }

            // log-sum-exp normalization
            let max = out.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
            out.mapv_inplace(|v| (v - max).exp());
            let total = out.sum();
            out.mapv_inplace(|v| v / total);
        }
        Ok(probabilities)
    }
}
