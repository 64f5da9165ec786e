//! Analytic geometry for trabecular bone morphometry.
//!
//! - [`ellipsoid::fit`] fits an ellipsoid to boundary points with normals.
//! - [`ellipsoid::intersection`] cuts an ellipsoid with a plane.
//! - [`mil`] produces stratified, randomly jittered sampling lines for
//!   mean intercept length measurements.

pub mod ellipsoid;
pub mod frame;
pub mod interval;
pub mod linalg;
pub mod mil;
pub mod primitives;

pub use ellipsoid::{
    config::FitConfig,
    fit::{pair_quadric, seed_quadric, EllipsoidFitter},
    intersection::{complete_basis, intersect, intersect_axis_aligned, Ellipse},
    Ellipsoid,
};
pub use interval::{DiscreteInterval, Interval};
pub use mil::{
    line_grid::LineGrid,
    line_plane::{LinePlane, Orientation},
    random::{RandomSource, SharedRandom},
};
pub use primitives::{line::Line, plane::Plane, vertex::VertexWithNormal};
