// tests/explain_run.rs
mod common;

use approx::assert_abs_diff_eq;
use common::{count_png, fitted_session, latent_names, real_images, LinearGenerator, LATENT_DIM};
use shapgan_rs::explain::artifacts::ProbabilityTable;
use shapgan_rs::{
    Dataset, Device, GaussianNb, GaussianNoise, Generator, PlotFeature, ShapError, ShapGenConfig,
};
use std::fs;

fn test_latents() -> Dataset {
    common::labeled_latents(2, 99).0.slice_move(ndarray::s![..3, ..])
}

#[test]
fn end_to_end_summary_run() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = LinearGenerator::on(Device::Cpu);
    let (images, labels) = real_images(&generator, 20, 1);
    let mut classifier = GaussianNb::new();
    let session = fitted_session(&mut generator, &mut classifier, &images, &labels);

    let config = ShapGenConfig::from_json_str(
        r#"{"background_samples_to_gen": 50, "shap_nsamples": 100, "features": ["summary"], "seed": 5}"#,
    )
    .unwrap();
    let mut noise = GaussianNoise::new(LATENT_DIM, Some(2));
    let report = session
        .explain(&config, |n| noise.sample(n), &test_latents(), &latent_names(), root.path())
        .unwrap();

    let shap_dir = root.path().join("shap");
    let json = fs::read_to_string(shap_dir.join("shap_test_probs.json")).unwrap();
    let table: ProbabilityTable = serde_json::from_str(&json).unwrap();
    assert_eq!(
        table.keys().collect::<Vec<_>>(),
        vec!["sample_0", "sample_1", "sample_2"]
    );
    for classes in table.values() {
        assert_eq!(classes.keys().collect::<Vec<_>>(), vec!["class_0", "class_1"]);
        assert_abs_diff_eq!(classes.values().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    assert!(shap_dir.join("class_0_summary.png").is_file());
    assert!(shap_dir.join("class_1_summary.png").is_file());
    assert_eq!(count_png(&shap_dir), 2);
    assert!(!shap_dir.join("waterfall").exists());
    assert_eq!(report.artifact_count(), 3);
}

#[test]
fn all_features_give_deterministic_artifact_count() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = LinearGenerator::on(Device::Cpu);
    let (images, labels) = real_images(&generator, 10, 3);
    let mut classifier = GaussianNb::new();
    let session = fitted_session(&mut generator, &mut classifier, &images, &labels);

    let config = ShapGenConfig::new(10, 40)
        .with_features([PlotFeature::Summary, PlotFeature::Waterfall])
        .with_seed(8);
    let mut noise = GaussianNoise::new(LATENT_DIM, Some(4));
    let report = session
        .explain(&config, |n| noise.sample(n), &test_latents(), &latent_names(), root.path())
        .unwrap();

    let (classes, samples) = (2, 3);
    let shap_dir = root.path().join("shap");
    assert_eq!(count_png(&shap_dir), classes + classes * samples);
    assert_eq!(report.artifact_count(), 1 + classes + classes * samples);
    for class in 0..classes {
        let class_dir = shap_dir.join("waterfall").join(format!("class_{}", class));
        for sample in 0..samples {
            let path = class_dir.join(format!("{}_waterfall_plot.png", sample));
            assert_eq!(image::image_dimensions(&path).unwrap(), (1800, 1000));
        }
    }
}

#[test]
fn no_features_writes_only_the_table() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = LinearGenerator::on(Device::Cpu);
    let (images, labels) = real_images(&generator, 10, 5);
    let mut classifier = GaussianNb::new();
    let session = fitted_session(&mut generator, &mut classifier, &images, &labels);

    let mut noise = GaussianNoise::new(LATENT_DIM, Some(6));
    session
        .explain(
            &ShapGenConfig::new(8, 30).with_seed(1),
            |n| noise.sample(n),
            &test_latents(),
            &latent_names(),
            root.path(),
        )
        .unwrap();

    let entries: Vec<_> = fs::read_dir(root.path().join("shap"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec!["shap_test_probs.json"]);
}

#[test]
fn existing_shap_dir_is_refused_without_writes() {
    let root = tempfile::tempdir().unwrap();
    let shap_dir = root.path().join("shap");
    fs::create_dir(&shap_dir).unwrap();

    let mut generator = LinearGenerator::on(Device::Cpu);
    let (images, labels) = real_images(&generator, 10, 7);
    let mut classifier = GaussianNb::new();
    let session = fitted_session(&mut generator, &mut classifier, &images, &labels);

    let mut sampled = 0;
    let err = session
        .explain(
            &ShapGenConfig::new(8, 30).with_features([PlotFeature::Summary]),
            |n| {
                sampled += n;
                Dataset::zeros((n, LATENT_DIM))
            },
            &test_latents(),
            &latent_names(),
            root.path(),
        )
        .unwrap_err();

    assert!(matches!(err, ShapError::Precondition(_)));
    assert_eq!(sampled, 0);
    assert_eq!(fs::read_dir(&shap_dir).unwrap().count(), 0);
}

#[test]
fn mismatched_feature_names_fail_after_table_is_written() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = LinearGenerator::on(Device::Cpu);
    let (images, labels) = real_images(&generator, 10, 9);
    let mut classifier = GaussianNb::new();
    let session = fitted_session(&mut generator, &mut classifier, &images, &labels);

    let mut noise = GaussianNoise::new(LATENT_DIM, Some(1));
    let names: Vec<String> = latent_names().into_iter().take(3).collect();
    let err = session
        .explain(
            &ShapGenConfig::new(8, 30).with_features([PlotFeature::Summary]),
            |n| noise.sample(n),
            &test_latents(),
            &names,
            root.path(),
        )
        .unwrap_err();

    assert!(matches!(err, ShapError::DataShape(_)));
    assert!(root.path().join("shap/shap_test_probs.json").is_file());
    assert_eq!(count_png(&root.path().join("shap")), 0);
}

#[test]
fn zero_sampling_budget_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = LinearGenerator::on(Device::Cpu);
    let (images, labels) = real_images(&generator, 10, 11);
    let mut classifier = GaussianNb::new();
    let session = fitted_session(&mut generator, &mut classifier, &images, &labels);

    let mut noise = GaussianNoise::new(LATENT_DIM, Some(1));
    let err = session
        .explain(
            &ShapGenConfig::new(8, 0),
            |n| noise.sample(n),
            &test_latents(),
            &latent_names(),
            root.path(),
        )
        .unwrap_err();
    assert!(matches!(err, ShapError::InvalidInput(_)));
}

#[test]
fn generator_returns_to_its_device_after_explaining() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = LinearGenerator::on(Device::Cuda(0));
    let (images, labels) = real_images(&generator, 10, 13);
    let mut classifier = GaussianNb::new();
    {
        let session = fitted_session(&mut generator, &mut classifier, &images, &labels);
        let mut noise = GaussianNoise::new(LATENT_DIM, Some(3));
        session
            .explain(
                &ShapGenConfig::new(6, 20).with_seed(2),
                |n| noise.sample(n),
                &test_latents(),
                &latent_names(),
                root.path(),
            )
            .unwrap();
        assert_eq!(session.pipeline().generator_device(), Device::Cuda(0));
    }

    assert_eq!(generator.device(), Device::Cuda(0));
    let devices = generator.forward_devices.borrow();
    // the first forward produced the real images directly on the device
    assert!(devices[1..].iter().all(|d| d.is_host()));
    assert!(devices.len() > 1);
}

#[test]
fn seeded_runs_give_identical_tables() {
    let mut tables = Vec::new();
    for _ in 0..2 {
        let root = tempfile::tempdir().unwrap();
        let mut generator = LinearGenerator::on(Device::Cpu);
        let (images, labels) = real_images(&generator, 10, 15);
        let mut classifier = GaussianNb::new();
        let session = fitted_session(&mut generator, &mut classifier, &images, &labels);
        let mut noise = GaussianNoise::new(LATENT_DIM, Some(21));
        session
            .explain(
                &ShapGenConfig::new(6, 20).with_seed(2),
                |n| noise.sample(n),
                &test_latents(),
                &latent_names(),
                root.path(),
            )
            .unwrap();
        tables.push(fs::read_to_string(root.path().join("shap/shap_test_probs.json")).unwrap());
    }
    assert_eq!(tables[0], tables[1]);
}
