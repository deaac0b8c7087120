pub mod config;
pub mod data;
pub mod device;
pub mod errors;

pub use config::*;
pub use data::*; // Re-export common data types
pub use device::*;
pub use errors::*;
