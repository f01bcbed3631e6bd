pub mod redox;
pub mod rustc;
pub mod types;

pub use redox::*;
pub use rustc::*;
pub use types::*;
