//! Task manifests and prediction files: line-oriented JSON records.

pub mod error;
pub mod load;
pub mod predictions;

pub use error::*;
pub use load::*;
pub use predictions::*;
