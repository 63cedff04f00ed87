//! Utility data structures shared across the engine

pub mod cache;

pub use cache::*;
