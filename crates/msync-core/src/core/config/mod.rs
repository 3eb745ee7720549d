//! Configuration assembled from the process environment.

pub mod settings;

pub use settings::*;
