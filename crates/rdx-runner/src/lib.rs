pub mod config;
pub mod doctor;
pub mod pipeline;
pub mod pool;
pub mod run;

pub use config::*;
pub use doctor::*;
pub use pipeline::*;
pub use pool::*;
pub use run::*;
