//! Foundational data structures, error types, and voxel buffers.

pub mod error;
pub mod models;
pub mod volume;
