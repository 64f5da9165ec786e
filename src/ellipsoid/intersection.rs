use nalgebra::{Matrix3, Unit, Vector3};

use super::Ellipsoid;
use crate::{linalg, primitives::plane::Plane};

/// Radicands this close below zero are treated as a tangent contact.
const TANGENT_TOLERANCE: f64 = 1e-12;

/// Planar ellipse in 3D: centre and two orthogonal semi-axis vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub centre: Vector3<f64>,
    pub axes: [Vector3<f64>; 2],
}

impl Ellipse {
    pub fn lengths(&self) -> (f64, f64) {
        (self.axes[0].norm(), self.axes[1].norm())
    }

    /// Point on the ellipse at parameter `angle`.
    pub fn point_at(&self, angle: f64) -> Vector3<f64> {
        self.centre + self.axes[0] * angle.cos() + self.axes[1] * angle.sin()
    }
}

fn form(radii: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::from_diagonal(&radii.map(|r| 1.0 / (r * r)))
}

/// Completes `n` to an orthonormal right-handed basis `(r, s, n)` whose first
/// two vectors are also conjugate with respect to the ellipsoid with semi-axes
/// `radii`: `r_x s_x / a² + r_y s_y / b² + r_z s_z / c² = 0`.
pub fn complete_basis(
    radii: &Vector3<f64>,
    n: &Unit<Vector3<f64>>,
) -> (Vector3<f64>, Vector3<f64>) {
    let d = form(radii);
    let (u, v) = linalg::orthonormal_complement(n);

    let m00 = u.dot(&(d * u));
    let m11 = v.dot(&(d * v));
    let m01 = u.dot(&(d * v));
    let angle = 0.5 * (2.0 * m01).atan2(m00 - m11);
    let (sin, cos) = angle.sin_cos();

    (u * cos + v * sin, v * cos - u * sin)
}

/// Intersection of the plane with the origin-centred ellipsoid whose
/// semi-axes `radii` run along x, y and z.
///
/// `None` when the plane misses the ellipsoid. A tangent plane gives an
/// ellipse with zero-length axes.
pub fn intersect_axis_aligned(radii: &Vector3<f64>, plane: &Plane) -> Option<Ellipse> {
    if !radii.iter().all(|r| r.is_finite() && *r > 0.0) {
        tracing::debug!(?radii, "intersection with invalid semi-axes");
        return None;
    }
    let d = form(radii);
    let n = plane.unit_normal();

    // closest point to the centre in the metric of the ellipsoid
    let d_inv_n = n.component_mul(&radii.component_mul(radii));
    let centre = d_inv_n * (plane.d() / n.dot(&d_inv_n));

    let mut level = 1.0 - centre.dot(&(d * centre));
    if level < 0.0 {
        if level < -TANGENT_TOLERANCE {
            tracing::trace!(?plane, "plane misses ellipsoid");
            return None;
        }
        level = 0.0;
    }

    let (r, s) = complete_basis(radii, n);
    let along = |axis: Vector3<f64>| axis * (level / axis.dot(&(d * axis))).sqrt();

    Some(Ellipse {
        centre,
        axes: [along(r), along(s)],
    })
}

/// Intersection of a posed ellipsoid with a plane, in world coordinates.
pub fn intersect(ellipsoid: &Ellipsoid, plane: &Plane) -> Option<Ellipse> {
    let frame = ellipsoid.frame();
    let local = intersect_axis_aligned(&ellipsoid.radii(), &frame.plane_to_local(plane))?;

    Some(Ellipse {
        centre: frame.point_to_world(&local.centre),
        axes: local.axes.map(|a| frame.direction_to_world(&a)),
    })
}
