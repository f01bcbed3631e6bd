pub mod model;
pub mod render;
pub mod store;

pub use model::*;
pub use render::*;
pub use store::*;
