//! Implementations of placement strategies.

pub mod best_fit;
pub mod first_fit;
pub mod optimal;
