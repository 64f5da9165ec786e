//! Sampling lines for mean intercept length measurements.

pub mod line_grid;
pub mod line_plane;
pub mod random;
pub mod stratified;
