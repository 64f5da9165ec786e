use core::fmt;

use nalgebra::Vector3;

/// A sampling line: origin and unit direction.
#[derive(Clone, Copy, PartialEq)]
pub struct Line {
    pub origin: Vector3<f64>,
    pub dir: Vector3<f64>,
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} {:.4} {:.4} -> {:.4} {:.4} {:.4}",
            self.origin.x, self.origin.y, self.origin.z, self.dir.x, self.dir.y, self.dir.z
        )
    }
}

impl Line {
    pub fn new(origin: Vector3<f64>, dir: Vector3<f64>) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vector3<f64> {
        self.origin + self.dir * t
    }
}
