use core::fmt;

use anyhow::ensure;
use itertools::iproduct;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use super::{
    random::{RandomSource, SharedRandom},
    stratified::Strata,
};
use crate::{
    interval::{self, Interval},
    primitives::line::Line,
};

/// Base orientation of a line plane, named by the axes the plane spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Lines along +z.
    XY,
    /// Lines along +y.
    XZ,
    /// Lines along +x.
    YZ,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [Orientation::XY, Orientation::XZ, Orientation::YZ];

    /// Rotation taking the xy-plane onto this plane, an exact axis permutation.
    pub fn basis(self) -> Rotation3<f64> {
        #[rustfmt::skip]
        let m = match self {
            Orientation::XY => Matrix3::identity(),
            Orientation::XZ => Matrix3::new(
                1.0, 0.0, 0.0,
                0.0, 0.0, 1.0,
                0.0, -1.0, 0.0,
            ),
            Orientation::YZ => Matrix3::new(
                0.0, 0.0, 1.0,
                1.0, 0.0, 0.0,
                0.0, 1.0, 0.0,
            ),
        };
        Rotation3::from_matrix_unchecked(m)
    }

    pub fn normal(self) -> Vector3<f64> {
        self.basis() * Vector3::z()
    }

    /// Cycles XY, XZ, YZ.
    pub fn next(self) -> Self {
        match self {
            Orientation::XY => Orientation::XZ,
            Orientation::XZ => Orientation::YZ,
            Orientation::YZ => Orientation::XY,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Orientation::XY => 0,
            Orientation::XZ => 1,
            Orientation::YZ => 2,
        }
    }
}

/// Square plane emitting parallel sampling lines from randomly jittered
/// origins.
///
/// An origin at plane parameters `(t, u)` is
/// `rotation · basis · ((t·size, u·size, 0) + translation) + centroid`.
#[derive(Clone)]
pub struct LinePlane {
    size: f64,
    translation: Vector3<f64>,
    centroid: Vector3<f64>,
    orientation: Orientation,
    rotation: UnitQuaternion<f64>,
    flipped: bool,
    random: SharedRandom,
}

impl fmt::Debug for LinePlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinePlane")
            .field("orientation", &self.orientation)
            .field("size", &self.size)
            .field("flipped", &self.flipped)
            .finish()
    }
}

impl LinePlane {
    /// Unit plane through the origin.
    pub fn new(orientation: Orientation) -> Self {
        Self {
            size: 1.0,
            translation: Vector3::zeros(),
            centroid: Vector3::zeros(),
            orientation,
            rotation: UnitQuaternion::identity(),
            flipped: false,
            random: SharedRandom::from_entropy(),
        }
    }

    pub fn with_scale(orientation: Orientation, scale: f64) -> anyhow::Result<Self> {
        ensure!(scale.is_finite(), "plane scale {scale} is not finite");
        Ok(Self {
            size: scale,
            ..Self::new(orientation)
        })
    }

    /// XY plane through the centroid of the interval, wide enough to send
    /// lines through all of it whatever the rotation.
    pub fn from_interval(interval: &impl Interval) -> anyhow::Result<Self> {
        interval::validate(interval)?;
        let size = interval::plane_size(interval);
        Ok(Self {
            size,
            translation: Vector3::new(-0.5 * size, -0.5 * size, 0.0),
            centroid: interval::centroid(interval),
            ..Self::new(Orientation::XY)
        })
    }

    /// Plane on a face of the cube of side `size` around `centroid`.
    pub(crate) fn cube_face(
        orientation: Orientation,
        size: f64,
        centroid: Vector3<f64>,
        random: SharedRandom,
    ) -> Self {
        Self {
            size,
            translation: Vector3::new(-0.5 * size, -0.5 * size, -0.5 * size),
            centroid,
            orientation,
            rotation: UnitQuaternion::identity(),
            flipped: false,
            random,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn centroid(&self) -> Vector3<f64> {
        self.centroid
    }

    /// Direction of every line leaving the plane.
    pub fn direction(&self) -> Vector3<f64> {
        let sign = if self.flipped { -1.0 } else { 1.0 };
        self.rotation * (self.orientation.basis() * Vector3::new(0.0, 0.0, sign))
    }

    fn origin(&self, t: f64, u: f64) -> Vector3<f64> {
        let local = Vector3::new(t * self.size, u * self.size, 0.0) + self.translation;
        self.rotation * (self.orientation.basis() * local) + self.centroid
    }

    /// One line from a uniformly random point of the plane.
    pub fn line(&self) -> Line {
        let (t, u) = self.random.draw_pair();
        Line::new(self.origin(t, u), self.direction())
    }

    /// `bins²` origins, one in each cell of a `bins × bins` grid over the
    /// plane. All cells share one random offset.
    pub fn origins(&self, bins: usize) -> anyhow::Result<Vec<Vector3<f64>>> {
        ensure!(bins > 0, "number of bins must be positive");
        let (u_jitter, t_jitter) = self.random.draw_pair();
        let step = 1.0 / bins as f64;

        let origins = iproduct!(
            Strata::new(bins, u_jitter * step),
            Strata::new(bins, t_jitter * step)
        )
        .map(|(u, t)| self.origin(t, u))
        .collect();
        Ok(origins)
    }

    /// Lines through [`origins`](Self::origins).
    pub fn lines(&self, bins: usize) -> anyhow::Result<Vec<Line>> {
        let direction = self.direction();
        Ok(self
            .origins(bins)?
            .into_iter()
            .map(|origin| Line::new(origin, direction))
            .collect())
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f64>) -> anyhow::Result<()> {
        validate_rotation(&rotation)?;
        self.rotation = rotation;
        Ok(())
    }

    pub fn random(&self) -> &SharedRandom {
        &self.random
    }

    pub fn set_random_generator(&mut self, source: impl RandomSource + Send + 'static) {
        self.random = SharedRandom::new(source);
    }

    /// Draws from `random`, together with every other holder of the handle.
    pub fn set_shared_random(&mut self, random: SharedRandom) {
        self.random = random;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.random = SharedRandom::seeded(seed);
    }

    /// Mirrors the plane through the centroid and reverses the lines.
    pub fn flip(&mut self) {
        self.translation.z = -self.translation.z;
        self.flipped = !self.flipped;
        tracing::trace!(orientation = ?self.orientation, flipped = self.flipped, "plane flipped");
    }
}

pub(crate) fn validate_rotation(rotation: &UnitQuaternion<f64>) -> anyhow::Result<()> {
    ensure!(
        rotation.coords.iter().all(|c| c.is_finite()),
        "rotation {rotation:?} is not finite"
    );
    Ok(())
}
