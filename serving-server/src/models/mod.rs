//! Data models

pub mod passenger;
pub mod prediction;

pub use passenger::*;
pub use prediction::*;
