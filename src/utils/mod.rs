pub mod batching;
pub mod features;
pub mod noise;

pub use batching::{Batch, BatchMaterializer, Batches, DataSource, IndexedDataset};
pub use features::{generate_feature_names, FEATURE_NAME_SEPARATOR};
pub use noise::GaussianNoise;
