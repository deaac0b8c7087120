pub mod kernel_shap;

pub use kernel_shap::{KernelExplainer, KernelShapConfig, KernelShapSamples};
