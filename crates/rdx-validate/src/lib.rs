pub mod aggregate;
pub mod classify;
pub mod gates;
pub mod hygiene;
pub mod summary;

pub use aggregate::*;
pub use classify::*;
pub use gates::*;
pub use hygiene::*;
pub use summary::*;
