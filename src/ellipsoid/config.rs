/// Tuning of [`EllipsoidFitter`](super::fit::EllipsoidFitter).
///
/// Weights and tolerances refer to the normalized frame where the nominal
/// radius is 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    pub(crate) tangent_weight: f64,
    pub(crate) pair_weight: f64,
    pub(crate) consistency_tolerance: f64,
    pub(crate) normal_tolerance: f64,
    pub(crate) axis_floor: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            tangent_weight: 1.0,
            pair_weight: 1.0,
            consistency_tolerance: 1e-9,
            normal_tolerance: 1e-6,
            axis_floor: 1e-12,
        }
    }
}

impl FitConfig {
    /// Weight of the normal alignment penalty when four samples admit no
    /// exactly tangent ellipsoid.
    pub fn tangent_weight(mut self, weight: f64) -> Self {
        self.tangent_weight = weight;
        self
    }

    /// Weight of the pairwise polar consistency penalty in the same case.
    pub fn pair_weight(mut self, weight: f64) -> Self {
        self.pair_weight = weight;
        self
    }

    /// Relative singular value below which the on-surface and tangency rows
    /// count as satisfied.
    pub fn consistency_tolerance(mut self, tolerance: f64) -> Self {
        self.consistency_tolerance = tolerance;
        self
    }

    /// Largest angle, in radians, between a sample normal and the fitted
    /// gradient.
    pub fn normal_tolerance(mut self, tolerance: f64) -> Self {
        self.normal_tolerance = tolerance;
        self
    }

    /// Smallest accepted semi-axis relative to the nominal radius.
    pub fn axis_floor(mut self, floor: f64) -> Self {
        self.axis_floor = floor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::FitConfig;

    #[test]
    fn setters_override_defaults() {
        let config = FitConfig::default()
            .pair_weight(0.0)
            .normal_tolerance(1e-3)
            .axis_floor(1e-6);

        assert_eq!(config.pair_weight, 0.0);
        assert_eq!(config.normal_tolerance, 1e-3);
        assert_eq!(config.axis_floor, 1e-6);
        assert_eq!(config.tangent_weight, FitConfig::default().tangent_weight);
    }
}
