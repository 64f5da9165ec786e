/// Positions `i / bins + offset` for `i` in `0..bins`.
#[derive(Debug, Clone)]
pub struct Strata {
    bins: usize,
    current: usize,
    offset: f64,
}

impl Strata {
    pub fn new(bins: usize, offset: f64) -> Self {
        Self {
            bins,
            current: 0,
            offset,
        }
    }

    pub fn step(&self) -> f64 {
        1.0 / self.bins as f64
    }
}

impl Iterator for Strata {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.bins {
            return None;
        }
        let position = self.current as f64 * self.step() + self.offset;
        self.current += 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.bins.saturating_sub(self.current);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Strata {}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::Strata;

    #[test]
    fn four_strata() {
        let positions = Strata::new(4, 0.1).collect::<Vec<_>>();

        assert_eq!(positions.len(), 4);
        for (p, expected) in positions.iter().zip([0.1, 0.35, 0.6, 0.85]) {
            assert_relative_eq!(*p, expected, epsilon = 1e-15);
        }
    }

    #[test]
    fn no_bins_no_positions() {
        assert_eq!(Strata::new(0, 0.5).count(), 0);
    }
}
