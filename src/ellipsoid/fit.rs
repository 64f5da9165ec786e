//! Ellipsoid fit from oriented boundary samples.
//!
//! The quadric `f(x) = xᵀAx + 2bᵀx + d` is packed into ten coefficients
//! `[a00, a11, a22, a01, a02, a12, b0, b1, b2, d]`. Every sample contributes
//! one on-surface row `f(p) = 0` and three tangency rows
//! `(I − nnᵀ)(Ap + b) = 0`. Quadrics in the null space of those rows pass
//! through the samples with gradients along the normals. Among them the fit
//! picks the one closest to a seed sphere. Four samples that admit no such
//! ellipsoid fall back to exact on-surface rows with tangency as a penalty.

use core::fmt;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector, Matrix3, Matrix4, SMatrix, SVector, Vector3, Vector4};
use rayon::prelude::*;

use super::{config::FitConfig, Ellipsoid};
use crate::{linalg, primitives::vertex::VertexWithNormal};

const COEFFICIENTS: usize = 10;

type Coefficients = SVector<f64, COEFFICIENTS>;
type Normal = SMatrix<f64, COEFFICIENTS, COEFFICIENTS>;
type Rows3 = SMatrix<f64, 3, COEFFICIENTS>;

/// Frobenius norm of the packed quadric counts off-diagonal entries twice.
const FROBENIUS_WEIGHTS: [f64; COEFFICIENTS] = [1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 1.0];

const MIN_SAMPLES: usize = 4;

/// Sphere centred at `centre` with `radius`, as a 4x4 quadric matrix.
pub fn seed_quadric(centre: &Vector3<f64>, radius: f64) -> Matrix4<f64> {
    let mut q = Matrix4::identity();
    q.fixed_view_mut::<3, 1>(0, 3).copy_from(&-centre);
    q.fixed_view_mut::<1, 3>(3, 0).copy_from(&-centre.transpose());
    q[(3, 3)] = centre.norm_squared() - radius * radius;
    q
}

/// Degenerate quadric made of the tangent planes at `p` and `q`.
///
/// With `P = (n, −n·x)` per sample it is `−½ (P_p P_qᵀ + P_q P_pᵀ)`. It
/// vanishes on both planes, and `Q₂ X_p = −½ (P_q·X_p) P_p`: each sample is
/// sent to its own tangent plane, scaled by its offset from the other one.
pub fn pair_quadric(p: &VertexWithNormal, q: &VertexWithNormal) -> Matrix4<f64> {
    let (pp, pq) = (tangent_plane(p), tangent_plane(q));
    (pp * pq.transpose() + pq * pp.transpose()) * -0.5
}

fn tangent_plane(s: &VertexWithNormal) -> Vector4<f64> {
    s.normal.push(-s.normal.dot(&s.vertex))
}

fn pack(q: &Matrix4<f64>) -> Coefficients {
    Coefficients::from([
        q[(0, 0)],
        q[(1, 1)],
        q[(2, 2)],
        q[(0, 1)],
        q[(0, 2)],
        q[(1, 2)],
        q[(0, 3)],
        q[(1, 3)],
        q[(2, 3)],
        q[(3, 3)],
    ])
}

fn unpack(theta: &Coefficients) -> Matrix4<f64> {
    #[rustfmt::skip]
    let q = Matrix4::new(
        theta[0], theta[3], theta[4], theta[6],
        theta[3], theta[1], theta[5], theta[7],
        theta[4], theta[5], theta[2], theta[8],
        theta[6], theta[7], theta[8], theta[9],
    );
    q
}

/// Row `r` with `r · θ = f(p)`.
fn value_row(p: &Vector3<f64>) -> Coefficients {
    let (x, y, z) = (p.x, p.y, p.z);
    Coefficients::from([
        x * x,
        y * y,
        z * z,
        2.0 * x * y,
        2.0 * x * z,
        2.0 * y * z,
        2.0 * x,
        2.0 * y,
        2.0 * z,
        1.0,
    ])
}

/// Rows `G` with `G θ = A p + b`.
fn gradient_rows(p: &Vector3<f64>) -> Rows3 {
    let (x, y, z) = (p.x, p.y, p.z);
    #[rustfmt::skip]
    let g = Rows3::from_row_slice(&[
        x, 0.0, 0.0, y, z, 0.0, 1.0, 0.0, 0.0, 0.0,
        0.0, y, 0.0, x, 0.0, z, 0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, z, 0.0, x, y, 0.0, 0.0, 1.0, 0.0,
    ]);
    g
}

/// Part of the gradient at `p` that leaves the tangent plane of `n`.
fn tangent_rows(p: &Vector3<f64>, n: &Vector3<f64>) -> Rows3 {
    (Matrix3::identity() - n * n.transpose()) * gradient_rows(p)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FitFailure {
    TooFewSamples(usize),
    NonFinite,
    ZeroNormal(usize),
    DegenerateRadius,
    Singular(linalg::LinalgError),
    RankDeficient(usize),
    Inconsistent(f64),
    NormalMismatch { sample: usize, angle: f64 },
    NotEllipsoid,
    AxisTooSmall,
}

impl fmt::Display for FitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSamples(n) => write!(f, "{n} samples, at least {MIN_SAMPLES} needed"),
            Self::NonFinite => write!(f, "non-finite sample"),
            Self::ZeroNormal(i) => write!(f, "sample {i} has no normal"),
            Self::DegenerateRadius => write!(f, "samples coincide with the initial guess"),
            Self::Singular(err) => write!(f, "{err}"),
            Self::RankDeficient(rank) => write!(f, "samples only span rank {rank}"),
            Self::Inconsistent(residual) => {
                write!(f, "no quadric fits the samples, relative residual {residual:e}")
            }
            Self::NormalMismatch { sample, angle } => {
                write!(f, "sample {sample} normal off the gradient by {angle:e} rad")
            }
            Self::NotEllipsoid => write!(f, "fitted quadric is not an ellipsoid"),
            Self::AxisTooSmall => write!(f, "fitted ellipsoid has a vanishing axis"),
        }
    }
}

impl From<linalg::LinalgError> for FitFailure {
    fn from(err: linalg::LinalgError) -> Self {
        Self::Singular(err)
    }
}

/// Samples moved to the initial guess and scaled by the nominal radius.
struct Normalized {
    points: Vec<Vector3<f64>>,
    normals: Vec<Vector3<f64>>,
    guess: Vector3<f64>,
    radius: f64,
}

impl Normalized {
    fn new(samples: &[VertexWithNormal], guess: &Vector3<f64>) -> Result<Self, FitFailure> {
        if samples.len() < MIN_SAMPLES {
            return Err(FitFailure::TooFewSamples(samples.len()));
        }
        if !samples.iter().all(VertexWithNormal::is_finite) || !guess.iter().all(|c| c.is_finite())
        {
            return Err(FitFailure::NonFinite);
        }
        let radius =
            samples.iter().map(|s| (s.vertex - guess).norm()).sum::<f64>() / samples.len() as f64;
        if !(radius > 0.0) {
            return Err(FitFailure::DegenerateRadius);
        }
        let normals = samples
            .iter()
            .enumerate()
            .map(|(i, s)| {
                linalg::unit(&s.normal)
                    .map(|n| n.into_inner())
                    .map_err(|_| FitFailure::ZeroNormal(i))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let points = samples.iter().map(|s| (s.vertex - guess) / radius).collect();

        Ok(Self {
            points,
            normals,
            guess: *guess,
            radius,
        })
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn sample(&self, k: usize) -> VertexWithNormal {
        VertexWithNormal::new(self.points[k], self.normals[k])
    }

    fn on_surface(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), COEFFICIENTS, |k, c| value_row(&self.points[k])[c])
    }

    /// On-surface and tangency rows, four per sample.
    fn constraints(&self) -> DMatrix<f64> {
        let mut rows = DMatrix::zeros(4 * self.len(), COEFFICIENTS);
        for (k, (p, n)) in self.points.iter().zip(&self.normals).enumerate() {
            rows.row_mut(4 * k).copy_from(&value_row(p).transpose());
            rows.fixed_view_mut::<3, COEFFICIENTS>(4 * k + 1, 0)
                .copy_from(&tangent_rows(p, n));
        }
        rows
    }

    /// Quadric satisfying every constraint row, closest to the seed sphere.
    fn consistent(&self, config: &FitConfig) -> Result<Coefficients, FitFailure> {
        let null = linalg::null_space(&self.constraints(), config.consistency_tolerance)?;
        let basis = &null.basis;
        if basis.ncols() == 0 {
            return Err(FitFailure::Inconsistent(null.residual));
        }

        let seed = pack(&seed_quadric(&Vector3::zeros(), 1.0));
        let weights = DMatrix::from_diagonal(&DVector::from_row_slice(&FROBENIUS_WEIGHTS));
        let gram = basis.transpose() * &weights * basis;
        let rhs = basis.transpose() * &weights * DVector::from_column_slice(seed.as_slice());
        let theta = basis * linalg::solve(&gram, &rhs)?;
        Ok(Coefficients::from_iterator(theta.iter().copied()))
    }

    /// Normal matrix of the seed, tangency and pair penalties.
    fn penalties(&self, config: &FitConfig) -> Normal {
        let mut h = Normal::from_diagonal(&Coefficients::from(FROBENIUS_WEIGHTS));

        let mut polar = Vec::with_capacity(self.len());
        for (p, n) in self.points.iter().zip(&self.normals) {
            let tangential = tangent_rows(p, n);
            h += tangential.tr_mul(&tangential) * config.tangent_weight;
            polar.push(gradient_rows(p).tr_mul(n));
        }

        for (i, j) in (0..self.len()).tuple_combinations() {
            let (si, sj) = (self.sample(i), self.sample(j));
            let q2 = pair_quadric(&si, &sj);
            // offsets of each sample from the other tangent plane
            let cji = -2.0 * si.normal.dot(&(q2 * si.vertex.push(1.0)).xyz());
            let cij = -2.0 * sj.normal.dot(&(q2 * sj.vertex.push(1.0)).xyz());
            let row = polar[i] * cij - polar[j] * cji;
            h += row * row.transpose() * config.pair_weight;
        }
        h
    }

    /// Quadric through four samples closest to the seed, normals as penalty.
    fn penalized(&self, config: &FitConfig) -> Result<Coefficients, FitFailure> {
        let n = self.len();
        let h = self.penalties(config);
        let seed = pack(&seed_quadric(&Vector3::zeros(), 1.0));
        let target = Normal::from_diagonal(&Coefficients::from(FROBENIUS_WEIGHTS)) * seed;
        let on_surface = self.on_surface();

        let size = COEFFICIENTS + n;
        let mut kkt = DMatrix::zeros(size, size);
        kkt.view_mut((0, 0), (COEFFICIENTS, COEFFICIENTS)).copy_from(&h);
        kkt.view_mut((COEFFICIENTS, 0), (n, COEFFICIENTS))
            .copy_from(&on_surface);
        kkt.view_mut((0, COEFFICIENTS), (COEFFICIENTS, n))
            .copy_from(&on_surface.transpose());
        let mut rhs = DVector::zeros(size);
        rhs.rows_mut(0, COEFFICIENTS).copy_from(&target);

        let solution = linalg::solve(&kkt, &rhs)?;
        Ok(Coefficients::from_iterator(solution.iter().take(COEFFICIENTS).copied()))
    }

    /// Centre, axes and radii of the quadric, mapped back to world units.
    fn decompose(&self, theta: &Coefficients, config: &FitConfig) -> Result<Ellipsoid, FitFailure> {
        let q = unpack(theta);
        let a: Matrix3<f64> = q.fixed_view::<3, 3>(0, 0).into_owned();
        let b: Vector3<f64> = q.fixed_view::<3, 1>(0, 3).into_owned();

        let centre = linalg::solve3(&a, &-b)?;
        let k = -(b.dot(&centre) + q[(3, 3)]);
        if !(k.abs() > 0.0) {
            return Err(FitFailure::NotEllipsoid);
        }
        let (values, vectors) = linalg::symmetric_eigen(&(a / k))?;
        if values.iter().any(|v| !(*v > 0.0)) {
            return Err(FitFailure::NotEllipsoid);
        }

        let radii = values.map(|v| self.radius / v.sqrt());
        let floor = config.axis_floor * self.radius;
        if radii.iter().any(|r| !r.is_finite() || *r < floor) {
            return Err(FitFailure::AxisTooSmall);
        }

        Ellipsoid::new(self.guess + centre * self.radius, vectors, radii)
            .map_err(|_| FitFailure::NotEllipsoid)
    }
}

/// Largest angle between a sample normal and the gradient of `ellipsoid`,
/// with the sample it occurs at. Opposite directions count as aligned.
fn normal_misfit(ellipsoid: &Ellipsoid, samples: &[VertexWithNormal]) -> (usize, f64) {
    let quadric = ellipsoid.quadric();
    samples
        .iter()
        .map(|s| {
            let gradient = quadric * (s.vertex - ellipsoid.centroid());
            gradient.cross(&s.normal).norm().atan2(gradient.dot(&s.normal).abs())
        })
        .enumerate()
        .fold((0, 0.0), |worst, (k, angle)| {
            if angle > worst.1 {
                (k, angle)
            } else {
                worst
            }
        })
}

/// Fits ellipsoids to boundary points carrying surface normals.
#[derive(Debug, Clone, Copy, Default)]
pub struct EllipsoidFitter {
    config: FitConfig,
}

impl EllipsoidFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Ellipsoid through all `samples` and tangent to their normals.
    ///
    /// `initial_guess` is a point inside the shape; it seeds the solution and
    /// fixes the scale of the problem. Samples taken from one ellipsoid give
    /// that ellipsoid back. Four samples that no ellipsoid matches exactly
    /// still get the one through all of them that best follows the normals.
    /// Further samples must agree with a common surface and its gradients.
    /// `None` when the samples do not determine an ellipsoid.
    pub fn fit(
        &self,
        samples: &[VertexWithNormal],
        initial_guess: &Vector3<f64>,
    ) -> Option<Ellipsoid> {
        match self.try_fit(samples, initial_guess) {
            Ok(ellipsoid) => {
                tracing::trace!(
                    samples = samples.len(),
                    radii = ?ellipsoid.radii(),
                    "ellipsoid fitted"
                );
                Some(ellipsoid)
            }
            Err(failure) => {
                tracing::debug!(samples = samples.len(), "no ellipsoid: {failure}");
                None
            }
        }
    }

    fn try_fit(
        &self,
        samples: &[VertexWithNormal],
        initial_guess: &Vector3<f64>,
    ) -> Result<Ellipsoid, FitFailure> {
        let normalized = Normalized::new(samples, initial_guess)?;
        let rank = linalg::rank(&normalized.on_surface());
        if rank < MIN_SAMPLES {
            return Err(FitFailure::RankDeficient(rank));
        }

        let consistent = normalized
            .consistent(&self.config)
            .and_then(|theta| normalized.decompose(&theta, &self.config))
            .and_then(|ellipsoid| {
                let (sample, angle) = normal_misfit(&ellipsoid, samples);
                if angle > self.config.normal_tolerance {
                    return Err(FitFailure::NormalMismatch { sample, angle });
                }
                Ok(ellipsoid)
            });
        match consistent {
            Err(failure) if samples.len() == MIN_SAMPLES => {
                tracing::trace!("no exact ellipsoid ({failure}), normals as penalty");
                let theta = normalized.penalized(&self.config)?;
                normalized.decompose(&theta, &self.config)
            }
            result => result,
        }
    }

    /// Fits independent requests in parallel, results in request order.
    pub fn fit_all(
        &self,
        requests: &[(Vec<VertexWithNormal>, Vector3<f64>)],
    ) -> Vec<Option<Ellipsoid>> {
        requests
            .par_iter()
            .map(|(samples, guess)| self.fit(samples, guess))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, Vector3};

    use super::*;

    fn samples(raw: &[([f64; 3], [f64; 3])]) -> Vec<VertexWithNormal> {
        raw.iter()
            .map(|(p, n)| VertexWithNormal::new(Vector3::from(*p), Vector3::from(*n)))
            .collect()
    }

    fn assert_on_surface(ellipsoid: &Ellipsoid, samples: &[VertexWithNormal], eps: f64) {
        for s in samples {
            assert_abs_diff_eq!(ellipsoid.value_at(&s.vertex), 0.0, epsilon = eps);
        }
    }

    /// Samples of the ellipsoid with `radii` turned by `rotation` about
    /// `centre`, one per direction in its own frame, with exact normals.
    fn on_ellipsoid(
        centre: Vector3<f64>,
        radii: Vector3<f64>,
        rotation: &Rotation3<f64>,
        directions: &[[f64; 3]],
    ) -> Vec<VertexWithNormal> {
        directions
            .iter()
            .map(|d| {
                let d = Vector3::from(*d);
                let local = d / d.component_div(&radii).norm();
                let normal = local.component_div(&radii.component_mul(&radii));
                VertexWithNormal::new(centre + rotation * local, rotation * normal)
            })
            .collect()
    }

    fn assert_normals_follow_gradient(ellipsoid: &Ellipsoid, samples: &[VertexWithNormal]) {
        for s in samples {
            let gradient = ellipsoid.quadric() * (s.vertex - ellipsoid.centroid());
            let sine = gradient.normalize().cross(&s.normal.normalize()).norm();
            assert_abs_diff_eq!(sine, 0.0, epsilon = 1e-9);
        }
    }

    const DIRECTIONS: [[f64; 3]; 8] = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [-1.0, -1.0, 0.0],
        [1.0, -1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [0.3, -2.0, 0.5],
        [-0.7, 0.2, -1.0],
    ];

    const SPHERE_DIRECTIONS: [[f64; 3]; 6] = [
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ];

    #[test]
    fn four_points_with_inward_normals() {
        let samples = samples(&[
            ([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([2.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
            ([0.0, 2.0, 0.0], [0.0, -1.0, 0.0]),
            ([0.0, -2.0, 0.0], [0.0, 1.0, 0.0]),
        ]);

        let ellipsoid = EllipsoidFitter::new()
            .fit(&samples, &Vector3::zeros())
            .unwrap();

        assert_on_surface(&ellipsoid, &samples, 1e-12);
        assert!(!ellipsoid.contains_on_surface(&Vector3::new(10.0, -20.0, 4.0), 1e-12));
        assert_relative_eq!(ellipsoid.radii(), Vector3::new(2.0, 2.0, 2.0), epsilon = 1e-9);
        assert_relative_eq!(ellipsoid.centroid(), Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn easy_four_points() {
        let samples = samples(&[
            ([0.0, 2.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 4.0, 0.0], [-1.0, 0.0, 0.0]),
            ([3.0, 3.0, 0.0], [0.0, -1.0, 0.0]),
            ([-3.0, 3.0, 0.0], [0.0, 1.0, 0.0]),
        ]);

        let ellipsoid = EllipsoidFitter::new()
            .fit(&samples, &Vector3::new(0.0, 3.0, 0.0))
            .unwrap();

        assert_on_surface(&ellipsoid, &samples, 1e-12);
        assert!(ellipsoid.value_at(&Vector3::new(10.0, -20.0, 4.0)) > 1.0);
    }

    #[test]
    fn difficult_four_points() {
        let samples = samples(&[
            ([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 3.0, 0.0], [-1.0, 0.0, 0.0]),
            ([-4.0, 2.0, 0.0], [0.0, -1.0, 0.0]),
            ([-1.5, 3.0, 8.0], [0.0, 0.0, -1.0]),
        ]);

        let ellipsoid = EllipsoidFitter::new()
            .fit(&samples, &Vector3::new(-1.0, 2.0, 0.0))
            .unwrap();

        assert_on_surface(&ellipsoid, &samples, 1e-12);
        assert!(ellipsoid.value_at(&Vector3::new(10.0, -20.0, 4.0)) > 1.0);
        let radii = ellipsoid.radii();
        assert!(radii.x <= radii.y && radii.y <= radii.z);
        assert_relative_eq!(ellipsoid.orientation().determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn seed_quadric_layout() {
        let q = seed_quadric(&Vector3::new(3.0, 4.0, 5.0), 7.77);

        let expected = Matrix4::new(
            1.0, 0.0, 0.0, -3.0, //
            0.0, 1.0, 0.0, -4.0, //
            0.0, 0.0, 1.0, -5.0, //
            -3.0, -4.0, -5.0, 50.0 - 7.77 * 7.77,
        );
        assert_relative_eq!(q, expected, epsilon = 1e-12);
    }

    #[test]
    fn packed_quadric_evaluates_like_matrix() {
        let q = seed_quadric(&Vector3::new(1.0, -2.0, 0.5), 3.0);
        let p = Vector3::new(0.3, 4.0, -1.0);

        let homogeneous = p.push(1.0);
        assert_relative_eq!(
            value_row(&p).dot(&pack(&q)),
            homogeneous.dot(&(q * homogeneous)),
            epsilon = 1e-12
        );
        assert_relative_eq!(unpack(&pack(&q)), q);
    }

    #[test]
    fn pair_quadric_layout() {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let p = VertexWithNormal::new(Vector3::new(4.0, 4.0, 1.0), Vector3::new(-h, -h, 0.0));
        let q = VertexWithNormal::new(Vector3::new(2.0, 2.0, 1.0), Vector3::new(h, h, 0.0));

        let q2 = pair_quadric(&p, &q);

        let expected = Matrix4::new(
            0.5, 0.5, 0.0, -3.0, //
            0.5, 0.5, 0.0, -3.0, //
            0.0, 0.0, 0.0, 0.0, //
            -3.0, -3.0, 0.0, 16.0,
        );
        assert_relative_eq!(q2, expected, epsilon = 1e-12);
        assert_relative_eq!(q2, pair_quadric(&q, &p), epsilon = 1e-12);
    }

    #[test]
    fn pair_quadric_is_tangent_at_both_samples() {
        let p = VertexWithNormal::new(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.2, 1.0, -0.4));
        let q = VertexWithNormal::new(Vector3::new(-3.0, 0.5, 2.0), Vector3::new(1.0, 0.0, 0.3));

        let q2 = pair_quadric(&p, &q);

        for s in [&p, &q] {
            let x = s.vertex.push(1.0);
            assert_abs_diff_eq!(x.dot(&(q2 * x)), 0.0, epsilon = 1e-12);
            let gradient = (q2 * x).xyz();
            assert_abs_diff_eq!(gradient.cross(&s.normal).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn six_points_on_a_sphere() {
        let centre = Vector3::new(1.0, 2.0, 3.0);
        let radii = Vector3::new(2.0, 2.0, 2.0);
        let samples = on_ellipsoid(centre, radii, &Rotation3::identity(), &SPHERE_DIRECTIONS);
        let fitter = EllipsoidFitter::new();

        for guess in [centre, Vector3::new(1.3, 1.8, 3.2)] {
            let ellipsoid = fitter.fit(&samples, &guess).unwrap();

            assert_relative_eq!(ellipsoid.centroid(), centre, epsilon = 1e-9);
            assert_relative_eq!(ellipsoid.radii(), radii, epsilon = 1e-9);
        }
    }

    #[test]
    fn extra_points_on_a_common_ellipsoid() {
        let centre = Vector3::new(0.5, -1.0, 2.0);
        let radii = Vector3::new(1.0, 2.0, 3.0);
        let samples = on_ellipsoid(centre, radii, &Rotation3::identity(), &DIRECTIONS);

        let ellipsoid = EllipsoidFitter::new()
            .fit(&samples, &Vector3::new(0.7, -0.6, 2.4))
            .unwrap();

        assert_on_surface(&ellipsoid, &samples, 1e-9);
        assert_normals_follow_gradient(&ellipsoid, &samples);
        assert_relative_eq!(ellipsoid.centroid(), centre, epsilon = 1e-9);
        assert_relative_eq!(ellipsoid.radii(), radii, epsilon = 1e-9);
    }

    #[test]
    fn rotated_ellipsoid_is_recovered() {
        let centre = Vector3::new(0.5, -1.0, 2.0);
        let radii = Vector3::new(1.0, 2.0, 3.0);
        let axis = Unit::new_normalize(Vector3::new(1.0, 2.0, 0.5));
        let rotation = Rotation3::from_axis_angle(&axis, 0.8);
        let fitter = EllipsoidFitter::new();

        for count in [4, 5, 8] {
            let samples = on_ellipsoid(centre, radii, &rotation, &DIRECTIONS[..count]);

            let ellipsoid = fitter.fit(&samples, &Vector3::new(0.7, -0.6, 2.4)).unwrap();

            assert_on_surface(&ellipsoid, &samples, 1e-9);
            assert_normals_follow_gradient(&ellipsoid, &samples);
            assert_relative_eq!(ellipsoid.centroid(), centre, epsilon = 1e-9);
            assert_relative_eq!(ellipsoid.radii(), radii, epsilon = 1e-9);
            // axes are recovered up to sign
            let axes = rotation.matrix().transpose() * ellipsoid.orientation();
            assert_relative_eq!(axes.abs(), Matrix3::identity(), epsilon = 1e-9);
        }
    }

    #[test]
    fn normals_off_the_surface_are_rejected() {
        let centre = Vector3::zeros();
        let mut samples = on_ellipsoid(
            centre,
            Vector3::new(2.0, 2.0, 2.0),
            &Rotation3::identity(),
            &SPHERE_DIRECTIONS,
        );
        let fitter = EllipsoidFitter::new();
        assert!(fitter.fit(&samples, &centre).is_some());

        for s in &mut samples {
            s.normal = Vector3::x();
        }

        assert!(fitter.fit(&samples, &centre).is_none());
    }

    #[test]
    fn one_tilted_normal_is_rejected() {
        let centre = Vector3::new(0.5, -1.0, 2.0);
        let mut samples = on_ellipsoid(
            centre,
            Vector3::new(1.0, 2.0, 3.0),
            &Rotation3::identity(),
            &DIRECTIONS[..6],
        );
        samples[4].normal += Vector3::new(0.0, 0.05, 0.0);

        assert!(EllipsoidFitter::new().fit(&samples, &centre).is_none());
    }

    #[test]
    fn too_few_samples() {
        let samples = samples(&[
            ([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([2.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
            ([0.0, 2.0, 0.0], [0.0, -1.0, 0.0]),
        ]);

        assert!(EllipsoidFitter::new().fit(&samples, &Vector3::zeros()).is_none());
    }

    #[test]
    fn colinear_samples() {
        let samples = samples(&[
            ([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([2.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([3.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ]);

        assert!(EllipsoidFitter::new()
            .fit(&samples, &Vector3::new(1.5, 1.0, 0.0))
            .is_none());
    }

    #[test]
    fn point_inside_triangle_is_no_ellipsoid() {
        let samples = samples(&[
            ([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([3.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([-3.0, 1.0, 0.0], [-1.0, 0.3, 0.0]),
            ([0.0, -3.0, 0.0], [0.0, -1.0, 0.0]),
        ]);

        assert!(EllipsoidFitter::new()
            .fit(&samples, &Vector3::new(0.0, -0.5, 0.0))
            .is_none());
    }

    #[test]
    fn zero_normal_or_nan_is_rejected() {
        let mut raw = samples(&[
            ([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([2.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
            ([0.0, 2.0, 0.0], [0.0, -1.0, 0.0]),
            ([0.0, -2.0, 0.0], [0.0, 0.0, 0.0]),
        ]);
        let fitter = EllipsoidFitter::new();

        assert!(fitter.fit(&raw, &Vector3::zeros()).is_none());

        raw[3].normal = Vector3::y();
        raw[0].vertex.x = f64::NAN;
        assert!(fitter.fit(&raw, &Vector3::zeros()).is_none());
    }

    #[test]
    fn samples_at_the_guess() {
        let raw = vec![VertexWithNormal::new(Vector3::zeros(), Vector3::x()); 4];

        assert!(EllipsoidFitter::new().fit(&raw, &Vector3::zeros()).is_none());
    }

    #[test]
    fn batch_keeps_request_order() {
        let good = samples(&[
            ([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([2.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
            ([0.0, 2.0, 0.0], [0.0, -1.0, 0.0]),
            ([0.0, -2.0, 0.0], [0.0, 1.0, 0.0]),
        ]);
        let requests = vec![
            (good.clone(), Vector3::zeros()),
            (good[..3].to_vec(), Vector3::zeros()),
            (good, Vector3::zeros()),
        ];

        let fitted = EllipsoidFitter::with_config(FitConfig::default()).fit_all(&requests);

        assert_eq!(fitted.len(), 3);
        assert!(fitted[0].is_some());
        assert!(fitted[1].is_none());
        assert_eq!(fitted[0], fitted[2]);
    }
}
