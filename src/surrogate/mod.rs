pub mod builder;
pub mod gaussian_nb;

pub use builder::{SurrogateDataset, SurrogateDatasetBuilder};
pub use gaussian_nb::GaussianNb;
