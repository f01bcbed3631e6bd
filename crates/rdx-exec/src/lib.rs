//! Run one external command against a payload in a throwaway directory.

pub mod invoke;
pub mod scratch;

pub use invoke::*;
pub use scratch::*;
