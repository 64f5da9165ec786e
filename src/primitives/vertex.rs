use nalgebra::Vector3;

/// A boundary point together with the surface normal observed there.
///
/// Only the line of the normal matters to the fit, inward and outward
/// normals describe the same tangent plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexWithNormal {
    pub vertex: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl VertexWithNormal {
    pub fn new(vertex: Vector3<f64>, normal: Vector3<f64>) -> Self {
        Self { vertex, normal }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.vertex.iter().chain(self.normal.iter()).all(|c| c.is_finite())
    }
}

impl From<(Vector3<f64>, Vector3<f64>)> for VertexWithNormal {
    fn from((vertex, normal): (Vector3<f64>, Vector3<f64>)) -> Self {
        Self::new(vertex, normal)
    }
}
