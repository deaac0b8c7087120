// src/explain/mod.rs

//! Explanation sessions over a generator and its surrogate classifier.

pub mod artifacts;

use crate::algorithms::{KernelExplainer, KernelShapConfig};
use crate::core::{
    BatchConfig, Dataset, FeatureFrame, Labels, PlotFeature, Result, ShapError, ShapGenConfig,
};
use crate::pipeline::ComposedPipeline;
use crate::plot::{render_summary_plot, render_waterfall_plot};
use crate::surrogate::{SurrogateDataset, SurrogateDatasetBuilder};
use crate::traits::{Classifier, Generator};
use crate::utils::DataSource;
use artifacts::{
    create_fresh_dir, summary_plot_path, waterfall_class_dir, waterfall_plot_path,
    write_test_probs, SHAP_DIR, TEST_PROBS_FILE, WATERFALL_DIR,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything one `explain` call wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainReport {
    pub shap_dir: PathBuf,
    pub test_probs: PathBuf,
    pub summary_plots: Vec<PathBuf>,
    /// Indexed `[class][sample]`.
    pub waterfall_plots: Vec<Vec<PathBuf>>,
    pub num_classes: usize,
    pub num_samples: usize,
}

impl ExplainReport {
    /// Number of files written: the JSON table plus every PNG.
    pub fn artifact_count(&self) -> usize {
        1 + self.summary_plots.len() + self.waterfall_plots.iter().map(Vec::len).sum::<usize>()
    }
}

/// Explanation session borrowing a trained generator and a surrogate classifier.
///
/// Typical flow: build the surrogate training set with
/// [`generate_data_for_ml`](ShapGen::generate_data_for_ml), fit the classifier
/// with [`fit_ml`](ShapGen::fit_ml), then call [`explain`](ShapGen::explain)
/// with latent vectors to attribute.
pub struct ShapGen<'a, G: Generator, C: Classifier> {
    pipeline: ComposedPipeline<'a, G, C>,
    feature_names: Option<Vec<String>>,
}

impl<'a, G: Generator, C: Classifier> ShapGen<'a, G, C> {
    pub fn new(generator: &'a mut G, classifier: &'a mut C) -> Self {
        ShapGen {
            pipeline: ComposedPipeline::new(generator, classifier),
            feature_names: None,
        }
    }

    pub fn pipeline(&self) -> &ComposedPipeline<'a, G, C> {
        &self.pipeline
    }

    /// Names of the flattened sample columns, once a surrogate dataset was built.
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Flattens `source` into a classifier training set and remembers its
    /// feature names.
    pub fn generate_data_for_ml(
        &mut self,
        source: DataSource<'_>,
        batching: BatchConfig,
    ) -> Result<SurrogateDataset> {
        let dataset = SurrogateDatasetBuilder::new(batching)?.build(source)?;
        self.feature_names = Some(dataset.feature_names.clone());
        Ok(dataset)
    }

    pub fn fit_ml(&mut self, x: &Dataset, y: &Labels) -> Result<()> {
        self.pipeline.fit_classifier(x, y)
    }

    /// Attributes the classifier's probabilities for `test_samples` to the
    /// latent dimensions and writes the artifacts under `result_root/shap/`.
    ///
    /// `noise_sampler(n)` must return `n` latent vectors; they form the
    /// background distribution. `feature_names` label the latent columns and
    /// are checked against them only once the JSON table has been written.
    /// Fails with `Precondition` before any work if `shap/` already exists, and
    /// with `EmptyInput` before any work if `test_samples` has no rows.
    pub fn explain<N>(
        &self,
        config: &ShapGenConfig,
        mut noise_sampler: N,
        test_samples: &Dataset,
        feature_names: &[String],
        result_root: &Path,
    ) -> Result<ExplainReport>
    where
        N: FnMut(usize) -> Dataset,
    {
        config.validate()?;
        if test_samples.nrows() == 0 {
            return Err(ShapError::EmptyInput("no test samples to explain".to_string()));
        }

        let shap_dir = result_root.join(SHAP_DIR);
        create_fresh_dir(&shap_dir)?;
        info!(dir = %shap_dir.display(), "starting explanation run");

        let background = noise_sampler(config.background_samples_to_gen);
        debug!(rows = background.nrows(), "drew background samples");

        let kernel_config = KernelShapConfig::default()
            .with_n_samples(config.shap_nsamples)
            .with_seed(config.seed);
        let explainer = KernelExplainer::new(&self.pipeline, background, Some(kernel_config))?;

        let probabilities = self.pipeline.predict_proba(test_samples)?;
        let test_probs = shap_dir.join(TEST_PROBS_FILE);
        write_test_probs(&test_probs, probabilities.view())?;
        info!(
            samples = probabilities.nrows(),
            classes = probabilities.ncols(),
            "wrote test probabilities"
        );

        let frame = FeatureFrame::new(test_samples.clone(), feature_names.to_vec())?;
        let shap_values = explainer.shap_values(&frame)?;
        let num_classes = shap_values.num_outputs();
        let num_samples = frame.nrows();
        info!(num_classes, num_samples, "computed SHAP values");

        let mut summary_plots = Vec::new();
        if config.wants(PlotFeature::Summary) {
            for class in 0..num_classes {
                let path = summary_plot_path(&shap_dir, class);
                render_summary_plot(
                    shap_values.output(class),
                    frame.data().view(),
                    frame.feature_names(),
                    config.summary_max_display,
                    &path,
                )?;
                summary_plots.push(path);
            }
            info!(plots = summary_plots.len(), "rendered summary plots");
        }

        let mut waterfall_plots = Vec::new();
        if config.wants(PlotFeature::Waterfall) {
            create_fresh_dir(&shap_dir.join(WATERFALL_DIR))?;
            for class in 0..num_classes {
                let class_dir = waterfall_class_dir(&shap_dir, class);
                create_fresh_dir(&class_dir)?;
                let values = shap_values.output(class);
                let base_value = shap_values.expected_value[class];
                let mut paths = Vec::with_capacity(num_samples);
                for sample in 0..num_samples {
                    let path = waterfall_plot_path(&class_dir, sample);
                    render_waterfall_plot(
                        values.row(sample),
                        base_value,
                        frame.row(sample),
                        frame.feature_names(),
                        config.waterfall_max_display,
                        config.waterfall_size,
                        &path,
                    )?;
                    paths.push(path);
                }
                waterfall_plots.push(paths);
            }
            info!(classes = num_classes, samples = num_samples, "rendered waterfall plots");
        }

        let report = ExplainReport {
            shap_dir,
            test_probs,
            summary_plots,
            waterfall_plots,
            num_classes,
            num_samples,
        };
        info!(artifacts = report.artifact_count(), "explanation run finished");
        Ok(report)
    }
}
