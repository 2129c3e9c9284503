//! Command-line smoothing of FITS data cubes
//!
//! Glues the `smoothing` kernels to `fits-io`: read a cube, smooth it and
//! write the result with its header carried over.

pub mod args;
pub mod pipeline;
