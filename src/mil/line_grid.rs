use nalgebra::UnitQuaternion;

use super::{
    line_plane::{validate_rotation, LinePlane, Orientation},
    random::{RandomSource, SharedRandom},
};
use crate::{
    interval::{self, Interval},
    primitives::line::Line,
};

/// Three orthogonal line planes around a volume, taking turns to emit lines.
///
/// The planes lie on faces of the cube whose side is the diagonal of the
/// volume, so lines from every plane cross all of it under any rotation.
/// Lines come from the XY, XZ and YZ planes in turn, endlessly.
#[derive(Debug, Clone)]
pub struct LineGrid {
    planes: [LinePlane; 3],
    cursor: Orientation,
    random: SharedRandom,
}

impl LineGrid {
    pub fn new(interval: &impl Interval) -> anyhow::Result<Self> {
        interval::validate(interval)?;
        let size = interval::plane_size(interval);
        let centroid = interval::centroid(interval);
        let random = SharedRandom::from_entropy();
        let planes = Orientation::ALL
            .map(|orientation| LinePlane::cube_face(orientation, size, centroid, random.clone()));

        tracing::debug!(size, ?centroid, "line grid created");
        Ok(Self {
            planes,
            cursor: Orientation::XY,
            random,
        })
    }

    /// Plane that emits the next line.
    pub fn current(&self) -> Orientation {
        self.cursor
    }

    pub fn plane(&self, orientation: Orientation) -> &LinePlane {
        &self.planes[orientation.index()]
    }

    pub fn next_line(&mut self) -> Line {
        let line = self.plane(self.cursor).line();
        self.cursor = self.cursor.next();
        line
    }

    /// A stratified batch of `bins²` lines from the current plane.
    pub fn next_lines(&mut self, bins: usize) -> anyhow::Result<Vec<Line>> {
        let lines = self.plane(self.cursor).lines(bins)?;
        self.cursor = self.cursor.next();
        Ok(lines)
    }

    /// Moves every plane to the opposite face and reverses its lines.
    pub fn flip_planes(&mut self) {
        self.planes.iter_mut().for_each(LinePlane::flip);
    }

    /// Rotates all planes about the centroid. Nothing changes on error.
    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f64>) -> anyhow::Result<()> {
        validate_rotation(&rotation)?;
        for plane in &mut self.planes {
            plane.set_rotation(rotation)?;
        }
        Ok(())
    }

    pub fn set_random_generator(&mut self, source: impl RandomSource + Send + 'static) {
        self.share(SharedRandom::new(source));
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.share(SharedRandom::seeded(seed));
    }

    fn share(&mut self, random: SharedRandom) {
        for plane in &mut self.planes {
            plane.set_shared_random(random.clone());
        }
        self.random = random;
    }

    /// Generator every plane draws from.
    pub fn random(&self) -> &SharedRandom {
        &self.random
    }
}

impl Iterator for LineGrid {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_line())
    }
}
