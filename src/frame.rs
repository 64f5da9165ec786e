use nalgebra::{Rotation3, Unit, Vector3};

use crate::primitives::plane::Plane;

/// A local coordinate frame: origin `center` and axes given by the columns of
/// `rotation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub center: Vector3<f64>,
    pub rotation: Rotation3<f64>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            center: Vector3::zeros(),
            rotation: Rotation3::identity(),
        }
    }

    pub fn with_center(mut self, center: Vector3<f64>) -> Self {
        self.center = center;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation3<f64>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn x(&self) -> Vector3<f64> {
        self.rotation * Vector3::x()
    }

    pub fn y(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }

    pub fn z(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    pub fn point_to_local(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&(v - self.center))
    }

    pub fn point_to_world(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.center + self.rotation * v
    }

    pub fn direction_to_local(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(v)
    }

    pub fn direction_to_world(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * v
    }

    /// The same plane expressed in this frame's coordinates.
    pub fn plane_to_local(&self, plane: &Plane) -> Plane {
        let normal = Unit::new_unchecked(self.direction_to_local(plane.unit_normal()));
        Plane::new_from_normal_and_point(normal, self.point_to_local(&plane.point()))
    }
}
