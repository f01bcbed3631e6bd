pub mod model;
pub mod text;
pub mod types;

pub use model::*;
pub use text::*;
pub use types::*;
