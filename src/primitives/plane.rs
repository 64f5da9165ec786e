use std::fmt;

use anyhow::anyhow;
use nalgebra::{Unit, Vector3};

use crate::linalg;

/// Oriented plane `normal · x = d`.
#[derive(Clone, Copy, PartialEq)]
pub struct Plane {
    point: Vector3<f64>,
    normal: Unit<Vector3<f64>>,
    d: f64,
}

impl fmt::Debug for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}x {:.4}y {:.4}z {:.4}",
            self.normal.x, self.normal.y, self.normal.z, self.d
        )
    }
}

impl Plane {
    /// Plane through `point`; `normal` is normalized here and must not be zero.
    pub fn new(point: Vector3<f64>, normal: Vector3<f64>) -> anyhow::Result<Self> {
        if !point.iter().all(|c| c.is_finite()) {
            return Err(anyhow!("plane point {point:?} is not finite"));
        }
        let normal = linalg::unit(&normal)
            .map_err(|err| anyhow!("plane normal {normal:?} is unusable: {err}"))?;
        Ok(Self::new_from_normal_and_point(normal, point))
    }

    pub fn new_from_normal_and_point(normal: Unit<Vector3<f64>>, point: Vector3<f64>) -> Self {
        let d = normal.dot(&point);
        Self { point, normal, d }
    }

    pub fn point_on_plane(&self) -> Vector3<f64> {
        self.normal.into_inner() * self.d
    }

    pub fn signed_distance(&self, v: &Vector3<f64>) -> f64 {
        self.normal.dot(v) - self.d
    }

    pub fn contains(&self, v: &Vector3<f64>, eps: f64) -> bool {
        self.signed_distance(v).abs() <= eps
    }

    pub fn point(&self) -> Vector3<f64> {
        self.point
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal.into_inner()
    }

    pub fn unit_normal(&self) -> &Unit<Vector3<f64>> {
        &self.normal
    }

    pub fn d(&self) -> f64 {
        self.d
    }
}
