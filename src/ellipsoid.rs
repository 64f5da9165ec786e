use std::f64::consts::PI;

use anyhow::{ensure, Context};
use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::frame::Frame;

pub mod config;
pub mod fit;
pub mod intersection;

const ORTHONORMAL_TOLERANCE: f64 = 1e-9;

/// Posed ellipsoid.
///
/// Columns of `orientation` are the unit principal axes, `radii[i]` is the
/// semi-axis length along column `i`. Radii are ascending and the axes form a
/// right-handed basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    centroid: Vector3<f64>,
    orientation: Matrix3<f64>,
    radii: Vector3<f64>,
}

impl Ellipsoid {
    /// Builds an ellipsoid from any orthonormal set of axes and positive radii.
    /// Axes are reordered by ascending radius and the last one is flipped if
    /// needed to keep the basis right-handed.
    pub fn new(
        centroid: Vector3<f64>,
        orientation: Matrix3<f64>,
        radii: Vector3<f64>,
    ) -> anyhow::Result<Self> {
        ensure!(
            centroid.iter().chain(orientation.iter()).all(|v| v.is_finite()),
            "ellipsoid pose is not finite"
        );
        ensure!(
            radii.iter().all(|r| r.is_finite() && *r > 0.0),
            "ellipsoid radii {radii:?} must be positive"
        );
        let gram = orientation.transpose() * orientation;
        ensure!(
            (gram - Matrix3::identity()).amax() < ORTHONORMAL_TOLERANCE,
            "ellipsoid axes are not orthonormal"
        );

        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| radii[i].total_cmp(&radii[j]));

        let mut orientation = Matrix3::from_columns(&[
            orientation.column(order[0]).into_owned(),
            orientation.column(order[1]).into_owned(),
            orientation.column(order[2]).into_owned(),
        ]);
        if orientation.determinant() < 0.0 {
            let flipped = -orientation.column(2);
            orientation.set_column(2, &flipped);
        }

        Ok(Self {
            centroid,
            orientation,
            radii: Vector3::new(radii[order[0]], radii[order[1]], radii[order[2]]),
        })
    }

    /// Axis-aligned ellipsoid.
    pub fn axis_aligned(centroid: Vector3<f64>, radii: Vector3<f64>) -> anyhow::Result<Self> {
        Self::new(centroid, Matrix3::identity(), radii).context("axis aligned ellipsoid")
    }

    pub fn centroid(&self) -> Vector3<f64> {
        self.centroid
    }

    pub fn orientation(&self) -> Matrix3<f64> {
        self.orientation
    }

    /// Semi-axis lengths, shortest first.
    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }

    /// Principal axes scaled by their semi-axis length.
    pub fn semi_axes(&self) -> [Vector3<f64>; 3] {
        [0, 1, 2].map(|i| self.orientation.column(i) * self.radii[i])
    }

    pub fn frame(&self) -> Frame {
        Frame::new()
            .with_center(self.centroid)
            .with_rotation(Rotation3::from_matrix_unchecked(self.orientation))
    }

    /// Form matrix `M` of the ellipsoid `(x - c)ᵀ M (x - c) = 1`.
    pub fn quadric(&self) -> Matrix3<f64> {
        let diagonal = Matrix3::from_diagonal(&self.radii.map(|r| 1.0 / (r * r)));
        self.orientation * diagonal * self.orientation.transpose()
    }

    /// Zero on the surface, negative inside, positive outside.
    pub fn value_at(&self, point: &Vector3<f64>) -> f64 {
        let local = self.frame().point_to_local(point);
        local.component_div(&self.radii).norm_squared() - 1.0
    }

    pub fn contains_on_surface(&self, point: &Vector3<f64>, eps: f64) -> bool {
        self.value_at(point).abs() <= eps
    }

    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radii.product()
    }
}
