use anyhow::{bail, ensure, Context};
use nalgebra::Vector3;

/// Inclusive integer bounds of an n-dimensional volume.
pub trait Interval {
    fn num_dimensions(&self) -> usize;

    fn min(&self, d: usize) -> i64;

    fn max(&self, d: usize) -> i64;

    /// Number of elements along `d`.
    fn dimension(&self, d: usize) -> u64 {
        (self.max(d) - self.min(d) + 1).max(0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteInterval {
    min: Vec<i64>,
    max: Vec<i64>,
}

impl DiscreteInterval {
    /// Interval starting at zero with the given number of elements per axis.
    ///
    /// Fails for a dimension beyond `i64::MAX`.
    pub fn from_dimensions(dimensions: &[u64]) -> anyhow::Result<Self> {
        let max = dimensions
            .iter()
            .map(|&d| {
                i64::try_from(d)
                    .map(|d| d - 1)
                    .with_context(|| format!("dimension {d} does not fit in i64"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            min: vec![0; dimensions.len()],
            max,
        })
    }

    pub fn new(min: Vec<i64>, max: Vec<i64>) -> anyhow::Result<Self> {
        ensure!(
            min.len() == max.len(),
            "interval bounds have {} and {} dimensions",
            min.len(),
            max.len()
        );
        Ok(Self { min, max })
    }
}

impl Interval for DiscreteInterval {
    fn num_dimensions(&self) -> usize {
        self.min.len()
    }

    fn min(&self, d: usize) -> i64 {
        self.min[d]
    }

    fn max(&self, d: usize) -> i64 {
        self.max[d]
    }
}

/// Checks that the interval can host sampling planes: at least three
/// dimensions and none of the first three empty.
pub(crate) fn validate(interval: &impl Interval) -> anyhow::Result<()> {
    let n = interval.num_dimensions();
    if n < 3 {
        bail!("interval has {n} dimensions, at least 3 are needed");
    }
    for d in 0..3 {
        ensure!(interval.dimension(d) > 0, "interval dimension {d} is empty");
    }
    Ok(())
}

/// Extents of the first three axes.
pub(crate) fn extents(interval: &impl Interval) -> Vector3<f64> {
    Vector3::from_fn(|d, _| interval.dimension(d) as f64)
}

/// Geometric centre of the first three axes.
pub(crate) fn centroid(interval: &impl Interval) -> Vector3<f64> {
    Vector3::from_fn(|d, _| interval.min(d) as f64) + extents(interval) / 2.0
}

/// Side of a plane large enough to cover the volume from any direction.
pub(crate) fn plane_size(interval: &impl Interval) -> f64 {
    extents(interval).norm()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::*;

    #[test]
    fn dimensions_are_inclusive() {
        let interval = DiscreteInterval::new(vec![-2, 0, 5], vec![2, 9, 5]).unwrap();

        assert_eq!(interval.dimension(0), 5);
        assert_eq!(interval.dimension(1), 10);
        assert_eq!(interval.dimension(2), 1);
    }

    #[test]
    fn centroid_and_size_of_cube() {
        let interval = DiscreteInterval::from_dimensions(&[10, 10, 10]).unwrap();

        assert!(validate(&interval).is_ok());
        assert_relative_eq!(centroid(&interval), Vector3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(plane_size(&interval), 300f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn two_dimensional_interval_is_rejected() {
        let interval = DiscreteInterval::from_dimensions(&[5, 5]).unwrap();

        assert!(validate(&interval).is_err());
    }

    #[test]
    fn empty_dimension_is_rejected() {
        let interval = DiscreteInterval::from_dimensions(&[5, 0, 5]).unwrap();

        assert!(validate(&interval).is_err());
    }

    #[test]
    fn oversized_dimension_is_rejected() {
        assert!(DiscreteInterval::from_dimensions(&[u64::MAX, 1, 1]).is_err());

        let largest = DiscreteInterval::from_dimensions(&[i64::MAX as u64, 1, 1]).unwrap();
        assert_eq!(largest.max(0), i64::MAX - 1);
        assert_eq!(largest.dimension(0), i64::MAX as u64);
    }

    #[test]
    fn mismatched_bounds_are_rejected() {
        assert!(DiscreteInterval::new(vec![0, 0, 0], vec![1, 1]).is_err());
    }

    #[test]
    fn extra_dimensions_are_ignored() {
        let interval = DiscreteInterval::from_dimensions(&[4, 6, 8, 3]).unwrap();

        assert!(validate(&interval).is_ok());
        assert_relative_eq!(extents(&interval), Vector3::new(4.0, 6.0, 8.0));
    }
}
