// src/utils/noise.rs
use crate::core::Dataset;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Draws latent vectors from a standard normal distribution.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    latent_dim: usize,
    rng: ChaCha8Rng,
}

impl GaussianNoise {
    pub fn new(latent_dim: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        GaussianNoise { latent_dim, rng }
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// `count` latent vectors, shape (count, latent_dim).
    pub fn sample(&mut self, count: usize) -> Dataset {
        let rng = &mut self.rng;
        Dataset::from_shape_simple_fn((count, self.latent_dim), || StandardNormal.sample(&mut *rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_have_requested_shape() {
        let mut noise = GaussianNoise::new(20, Some(3));
        assert_eq!(noise.sample(75).dim(), (75, 20));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let a = GaussianNoise::new(4, Some(11)).sample(5);
        let b = GaussianNoise::new(4, Some(11)).sample(5);
        assert_eq!(a, b);
    }

    #[test]
    fn draws_look_standard_normal() {
        let draws = GaussianNoise::new(1, Some(5)).sample(20_000);
        let mean = draws.mean().unwrap();
        let var = draws.mapv(|v| (v - mean).powi(2)).mean().unwrap();
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }
}
