// tests/common/mod.rs
#![allow(dead_code)]

use ndarray::{Array, Array1, Array2, ArrayD, IxDyn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shapgan_rs::{
    BatchConfig, DataSource, Dataset, Device, GaussianNb, Generator, Labels, Result, ShapGen,
};
use std::cell::RefCell;
use std::path::Path;

pub const LATENT_DIM: usize = 4;
pub const IMAGE_SHAPE: [usize; 3] = [1, 2, 3];

/// Fixed linear map from a 4-d latent to a 1x2x3 image, squashed with tanh.
pub struct LinearGenerator {
    weights: Array2<f64>,
    device: Device,
    pub forward_devices: RefCell<Vec<Device>>,
}

impl LinearGenerator {
    pub fn on(device: Device) -> Self {
        let pixels: usize = IMAGE_SHAPE.iter().product();
        let weights = Array2::from_shape_fn((LATENT_DIM, pixels), |(i, j)| {
            ((i * pixels + j) as f64 * 0.37).sin()
        });
        LinearGenerator {
            weights,
            device,
            forward_devices: RefCell::new(Vec::new()),
        }
    }
}

impl Generator for LinearGenerator {
    fn forward(&self, latent: &Dataset) -> Result<ArrayD<f64>> {
        self.forward_devices.borrow_mut().push(self.device);
        let flat = latent.dot(&self.weights).mapv(f64::tanh);
        let mut shape = vec![latent.nrows()];
        shape.extend_from_slice(&IMAGE_SHAPE);
        Ok(flat.into_shape(IxDyn(&shape))?)
    }

    fn latent_dim(&self) -> usize {
        LATENT_DIM
    }

    fn device(&self) -> Device {
        self.device
    }

    fn to_device(&mut self, device: Device) {
        self.device = device;
    }
}

/// Two classes of latent vectors, centered at -1 (label 0) and +1 (label 1).
pub fn labeled_latents(per_class: usize, seed: u64) -> (Dataset, Labels) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = 2 * per_class;
    let labels = Array1::from_shape_fn(n, |i| (i % 2) as f64);
    let latents = Array::from_shape_fn((n, LATENT_DIM), |(i, _)| {
        let center = if i % 2 == 0 { -1.0 } else { 1.0 };
        center + rng.gen_range(-0.5..0.5)
    });
    (latents, labels)
}

/// Images of `labeled_latents`, the "real" data the surrogate is trained on.
pub fn real_images(generator: &LinearGenerator, per_class: usize, seed: u64) -> (ArrayD<f64>, Labels) {
    let (latents, labels) = labeled_latents(per_class, seed);
    let images = generator
        .forward(&latents)
        .expect("linear generator forward");
    (images, labels)
}

/// Session whose Gaussian naive Bayes surrogate is already fitted.
pub fn fitted_session<'a>(
    generator: &'a mut LinearGenerator,
    classifier: &'a mut GaussianNb,
    images: &ArrayD<f64>,
    labels: &Labels,
) -> ShapGen<'a, LinearGenerator, GaussianNb> {
    let mut session = ShapGen::new(generator, classifier);
    let data = session
        .generate_data_for_ml(
            DataSource::tensors(images, Some(labels)),
            BatchConfig::new(8).with_seed(17),
        )
        .expect("surrogate dataset");
    let y = data.labels().expect("labeled source").clone();
    session.fit_ml(&data.x, &y).expect("surrogate fit");
    session
}

pub fn latent_names() -> Vec<String> {
    shapgan_rs::generate_feature_names(&[LATENT_DIM])
}

pub fn count_png(dir: &Path) -> usize {
    let mut count = 0;
    for entry in std::fs::read_dir(dir).expect("readable dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            count += count_png(&path);
        } else if path.extension().map_or(false, |ext| ext == "png") {
            count += 1;
        }
    }
    count
}
