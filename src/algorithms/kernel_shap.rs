// src/algorithms/kernel_shap.rs

use crate::core::{Dataset, Explanation, FeatureFrame, Instance, Result, ShapError, ShapValues};
use crate::traits::PredictModel;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::distributions::WeightedIndex;
use rand::seq::index::sample as sample_indices;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::cell::RefCell;
use tracing::debug;

/// Above this many features the full coalition set is never enumerated.
const MAX_ENUMERATED_FEATURES: usize = 30;

/// Configuration for the KernelSHAP explainer.
#[derive(Debug, Clone)]
pub struct KernelShapConfig {
    pub n_samples: KernelShapSamples,
    /// Gaussian noise added to background values when only one background row exists.
    pub noise_std_dev: f64,
    /// Seed for coalition sampling; entropy when absent.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShapSamples {
    /// 2 * num_features + 2048 coalitions.
    Auto,
    Fixed(usize),
}

impl Default for KernelShapConfig {
    fn default() -> Self {
        KernelShapConfig {
            n_samples: KernelShapSamples::Auto,
            noise_std_dev: 0.0,
            seed: None,
        }
    }
}

impl KernelShapConfig {
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = KernelShapSamples::Fixed(n_samples);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

/// Model-agnostic SHAP estimator for models with one or more outputs.
#[derive(Debug)]
pub struct KernelExplainer<M: PredictModel> {
    model: M,
    background_data: Dataset,
    expected_value: Array1<f64>,
    num_features: usize,
    config: KernelShapConfig,
    rng: RefCell<ChaCha8Rng>,
}

impl<M: PredictModel> KernelExplainer<M> {
    pub fn new(model: M, background_data: Dataset, config: Option<KernelShapConfig>) -> Result<Self> {
        let num_features = model.num_features();

        if background_data.nrows() == 0 {
            return Err(ShapError::InvalidInput(
                "Background data cannot be empty.".to_string(),
            ));
        }

        if background_data.ncols() != num_features {
            return Err(ShapError::DataShape(format!(
                "Background data has {} features, but model expects {}.",
                background_data.ncols(),
                num_features
            )));
        }

        let resolved_config = config.unwrap_or_default();
        if resolved_config.n_samples == KernelShapSamples::Fixed(0) {
            return Err(ShapError::InvalidInput(
                "n_samples must be a positive number of coalitions.".to_string(),
            ));
        }
        if !(resolved_config.noise_std_dev >= 0.0) {
            return Err(ShapError::InvalidInput(format!(
                "noise_std_dev must be non-negative, got {}.",
                resolved_config.noise_std_dev
            )));
        }

        let background_predictions = model.predict(&background_data)?;
        if background_predictions.nrows() != background_data.nrows() {
            return Err(ShapError::ModelPrediction(format!(
                "Model returned {} rows for {} background samples.",
                background_predictions.nrows(),
                background_data.nrows()
            )));
        }
        let expected_value = background_predictions.mean_axis(Axis(0)).ok_or_else(|| {
            ShapError::Internal("Failed to calculate mean of background predictions.".to_string())
        })?;

        let rng = match resolved_config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        debug!(
            num_features,
            num_outputs = expected_value.len(),
            background_rows = background_data.nrows(),
            "kernel explainer ready"
        );

        Ok(KernelExplainer {
            model,
            background_data,
            expected_value,
            num_features,
            config: resolved_config,
            rng: RefCell::new(rng),
        })
    }

    /// Mean model output over the background data, one entry per output.
    pub fn expected_value(&self) -> &Array1<f64> {
        &self.expected_value
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_outputs(&self) -> usize {
        self.expected_value.len()
    }

    pub fn background_data(&self) -> &Dataset {
        &self.background_data
    }

    pub fn config(&self) -> &KernelShapConfig {
        &self.config
    }

    /// Explains every row of `samples`.
    pub fn shap_values(&self, samples: &FeatureFrame) -> Result<ShapValues> {
        if samples.ncols() != self.num_features {
            return Err(ShapError::DataShape(format!(
                "Samples have {} features, but explainer expects {}.",
                samples.ncols(),
                self.num_features
            )));
        }

        let n = samples.nrows();
        let mut per_output = vec![Array2::zeros((n, self.num_features)); self.num_outputs()];
        for i in 0..n {
            let explanation = self.explain_instance(&samples.row(i).to_owned())?;
            for (k, values) in per_output.iter_mut().enumerate() {
                values.row_mut(i).assign(&explanation.output(k));
            }
        }

        Ok(ShapValues {
            per_output,
            expected_value: self.expected_value.clone(),
        })
    }

    pub fn explain_instance(&self, instance: &Instance) -> Result<Explanation> {
        if instance.len() != self.num_features {
            return Err(ShapError::DataShape(format!(
                "Instance to explain has {} features, but explainer expects {}.",
                instance.len(),
                self.num_features
            )));
        }

        let num_outputs = self.num_outputs();
        let prediction = self
            .model
            .predict(&instance.view().insert_axis(Axis(0)).to_owned())?;
        if prediction.nrows() != 1 {
            return Err(ShapError::ModelPrediction(format!(
                "Model returned {} rows for a single instance.",
                prediction.nrows()
            )));
        }
        let full_prediction = prediction.row(0).to_owned();
        if full_prediction.len() != num_outputs {
            return Err(ShapError::ModelPrediction(format!(
                "Model returned {} outputs for the instance, {} for the background.",
                full_prediction.len(),
                num_outputs
            )));
        }
        let delta = &full_prediction - &self.expected_value;

        let m = self.num_features;
        let mut shap_values = Array2::zeros((num_outputs, m));
        if m == 1 {
            // A single feature carries the whole difference.
            shap_values.column_mut(0).assign(&delta);
        } else if m > 1 {
            let budget = match self.config.n_samples {
                KernelShapSamples::Auto => 2 * m + 2048,
                KernelShapSamples::Fixed(n) => n,
            };
            let (coalitions, weights) = self.generate_coalitions(budget)?;
            let averaged_outputs = self.evaluate_coalitions(instance, coalitions.view())?;

            for k in 0..num_outputs {
                let phi = self.solve_constrained(
                    coalitions.view(),
                    averaged_outputs.column(k),
                    weights.view(),
                    self.expected_value[k],
                    delta[k],
                )?;
                shap_values.row_mut(k).assign(&phi);
            }
        }

        Ok(Explanation {
            shap_values,
            expected_value: self.expected_value.clone(),
            actual_prediction: full_prediction,
            instance: Some(instance.to_owned()),
        })
    }

    /// Produces coalition masks (excluding the empty and the full coalition) with
    /// their regression weights.
    ///
    /// When the budget covers every proper coalition they are enumerated with the
    /// exact Shapley kernel weights. Otherwise coalition sizes are drawn in
    /// proportion to the kernel mass of each size, every draw is paired with its
    /// complement, and all rows get equal weight.
    fn generate_coalitions(&self, budget: usize) -> Result<(Dataset, Array1<f64>)> {
        let m = self.num_features;

        if m <= MAX_ENUMERATED_FEATURES {
            let proper = (1_usize << m) - 2;
            if budget >= proper {
                let mut coalitions = Dataset::zeros((proper, m));
                let mut weights = Array1::zeros(proper);
                for (row, mask) in (1..=proper).enumerate() {
                    let mut size = 0;
                    for j in 0..m {
                        if (mask >> j) & 1 == 1 {
                            coalitions[[row, j]] = 1.0;
                            size += 1;
                        }
                    }
                    weights[row] = Self::kernel_weight(size, m);
                }
                debug!(coalitions = proper, "enumerated all coalitions");
                return Ok((coalitions, weights));
            }
        }

        let size_mass: Vec<f64> = (1..m)
            .map(|k| (m - 1) as f64 / (k * (m - k)) as f64)
            .collect();
        let size_dist = WeightedIndex::new(&size_mass)
            .map_err(|e| ShapError::Internal(format!("Invalid coalition size weights: {}", e)))?;

        let mut rng = self.rng.borrow_mut();
        let mut coalitions = Dataset::zeros((budget, m));
        let mut row = 0;
        while row < budget {
            let size = size_dist.sample(&mut *rng) + 1;
            for idx in sample_indices(&mut *rng, m, size).iter() {
                coalitions[[row, idx]] = 1.0;
            }
            row += 1;
            if row < budget {
                let complement = coalitions.row(row - 1).mapv(|z| 1.0 - z);
                coalitions.row_mut(row).assign(&complement);
                row += 1;
            }
        }
        debug!(coalitions = budget, "sampled coalitions");

        Ok((coalitions, Array1::from_elem(budget, 1.0 / budget as f64)))
    }

    /// Shapley kernel weight of one specific coalition:
    /// pi(z') = (M-1) / (C(M, |z'|) * |z'| * (M-|z'|)).
    fn kernel_weight(coalition_size: usize, num_features: usize) -> f64 {
        let denominator = Self::n_choose_k(num_features, coalition_size)
            * coalition_size as f64
            * (num_features - coalition_size) as f64;
        (num_features - 1) as f64 / denominator
    }

    /// Helper for combinations C(n, k) = n! / (k! * (n-k)!)
    fn n_choose_k(n: usize, k: usize) -> f64 {
        if k > n {
            return 0.0;
        }
        if k == 0 || k == n {
            return 1.0;
        }
        // Exploit symmetry C(n, k) = C(n, n-k) to keep k small for precision/performance
        let eff_k = if k > n / 2 { n - k } else { k };

        let mut res = 1.0;
        for i in 0..eff_k {
            res *= (n - i) as f64;
            res /= (i + 1) as f64;
        }
        res
    }

    /// Averages model outputs over the background for each coalition.
    ///
    /// Features inside the coalition take the instance's values, the others take
    /// the background row's values. Returns shape (num_coalitions, num_outputs).
    fn evaluate_coalitions(&self, instance: &Instance, coalitions: ArrayView2<f64>) -> Result<Array2<f64>> {
        let n_background = self.background_data.nrows();
        let n_coalitions = coalitions.nrows();
        let add_noise = n_background == 1 && self.config.noise_std_dev > 0.0;

        let mut perturbed = Dataset::zeros((n_coalitions * n_background, self.num_features));
        let mut rng = self.rng.borrow_mut();
        for (c_idx, coalition) in coalitions.rows().into_iter().enumerate() {
            for (bg_idx, background_sample) in self.background_data.rows().into_iter().enumerate() {
                let mut row = perturbed.row_mut(c_idx * n_background + bg_idx);
                for feat_idx in 0..self.num_features {
                    row[feat_idx] = if coalition[feat_idx] == 1.0 {
                        instance[feat_idx]
                    } else if add_noise {
                        let noise: f64 = StandardNormal.sample(&mut *rng);
                        background_sample[feat_idx] + noise * self.config.noise_std_dev
                    } else {
                        background_sample[feat_idx]
                    };
                }
            }
        }
        drop(rng);

        let outputs = self.model.predict(&perturbed)?;
        let num_outputs = self.num_outputs();
        if outputs.nrows() != perturbed.nrows() || outputs.ncols() != num_outputs {
            return Err(ShapError::ModelPrediction(format!(
                "Model returned shape {:?} for {} perturbed rows and {} outputs.",
                outputs.shape(),
                perturbed.nrows(),
                num_outputs
            )));
        }

        outputs
            .as_standard_layout()
            .into_owned()
            .into_shape((n_coalitions, n_background, num_outputs))?
            .mean_axis(Axis(1))
            .ok_or_else(|| ShapError::Internal("No background rows to average over.".to_string()))
    }

    /// Weighted least squares with the efficiency constraint sum(phi) = f(x) - E[f]
    /// eliminated by expressing the last feature through the others.
    fn solve_constrained(
        &self,
        coalitions: ArrayView2<f64>,
        averaged_outputs: ArrayView1<f64>,
        weights: ArrayView1<f64>,
        base_value: f64,
        delta: f64,
    ) -> Result<Array1<f64>> {
        let m = coalitions.ncols();
        let last = m - 1;
        let z_last = coalitions.column(last);

        let target = averaged_outputs.mapv(|v| v - base_value) - &z_last.mapv(|z| z * delta);
        let design = &coalitions.slice(s![.., ..last]) - &z_last.insert_axis(Axis(1));

        let coeffs = solve_weighted_least_squares(design.view(), target.view(), weights)?;

        let mut phi = Array1::zeros(m);
        phi.slice_mut(s![..last]).assign(&coeffs);
        phi[last] = delta - coeffs.sum();
        Ok(phi)
    }
}

fn solve_weighted_least_squares(
    features: ArrayView2<f64>,
    target: ArrayView1<f64>,
    weights: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    if features.nrows() != target.len() || target.len() != weights.len() {
        return Err(ShapError::Internal(format!(
            "WLS inputs disagree: {} rows, {} targets, {} weights.",
            features.nrows(),
            target.len(),
            weights.len()
        )));
    }
    if features.ncols() == 0 {
        return Ok(Array1::zeros(0));
    }

    let sqrt_w = weights.mapv(|w| if w > 0.0 { w.sqrt() } else { 0.0 });
    let x_w = &features * &sqrt_w.view().insert_axis(Axis(1));
    let y_w = &target * &sqrt_w;

    least_squares(x_w, y_w)
}

#[cfg(feature = "linalg")]
fn least_squares(x_w: Array2<f64>, y_w: Array1<f64>) -> Result<Array1<f64>> {
    // Using SVD based least squares for more robustness
    use ndarray_linalg::LeastSquaresSvd;
    let results = x_w
        .least_squares(&y_w)
        .map_err(|e| ShapError::Internal(format!("WLS solver SVD failed: {}", e)))?;
    Ok(results.solution)
}

#[cfg(not(feature = "linalg"))]
fn least_squares(x_w: Array2<f64>, y_w: Array1<f64>) -> Result<Array1<f64>> {
    let mut normal = x_w.t().dot(&x_w);
    let rhs = x_w.t().dot(&y_w);

    // Tiny ridge keeps features no coalition separated from solvable (they get ~0).
    let scale = normal.diag().iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    let ridge = 1e-10 * (1.0 + scale);
    for i in 0..normal.nrows() {
        normal[[i, i]] += ridge;
    }

    solve_linear_system(normal, rhs)
}

/// Gaussian elimination with partial pivoting.
#[cfg(not(feature = "linalg"))]
fn solve_linear_system(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[[row, col]].abs() > a[[pivot, col]].abs() {
                pivot = row;
            }
        }
        if !(a[[pivot, col]].abs() > f64::MIN_POSITIVE) {
            return Err(ShapError::Internal(format!(
                "WLS normal equations are singular at column {}.",
                col
            )));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[[row, k]] * solution[k];
        }
        solution[row] = acc / a[[row, row]];
    }
    Ok(solution)
}
