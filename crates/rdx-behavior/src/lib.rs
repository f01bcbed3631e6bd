//! Family-keyed synthesis of small executable behavior checks.

pub mod probe;
pub mod registry;
pub mod symbol;

pub use probe::*;
pub use registry::*;
pub use symbol::*;
