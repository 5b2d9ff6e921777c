//! Implementations of machine controller policies.

pub mod conservative;
pub mod dummy;
pub mod proportional;
