//! Small dense linear algebra on top of nalgebra.
//!
//! Every routine here is pure. Failures come back as [`LinalgError`] instead of
//! NaNs leaking into the caller.

use core::fmt;

use nalgebra::{DMatrix, DVector, Matrix3, SymmetricEigen, Unit, Vector3};

/// Relative singular value threshold below which a matrix is treated as rank
/// deficient.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

const EIGEN_MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinalgError {
    /// Matrix is singular or rank deficient, or a vector has zero length.
    Singular,
    /// Iterative decomposition did not converge.
    NotConverged,
    /// Input or output contains NaN or infinity.
    NonFinite,
    /// Operand shapes do not fit together.
    ShapeMismatch,
}

impl fmt::Display for LinalgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singular => write!(f, "singular or rank deficient system"),
            Self::NotConverged => write!(f, "decomposition did not converge"),
            Self::NonFinite => write!(f, "non-finite value"),
            Self::ShapeMismatch => write!(f, "operand shapes do not match"),
        }
    }
}

impl std::error::Error for LinalgError {}

fn all_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> bool {
    values.into_iter().all(|v| v.is_finite())
}

pub fn unit(v: &Vector3<f64>) -> Result<Unit<Vector3<f64>>, LinalgError> {
    if !all_finite(v.iter()) {
        return Err(LinalgError::NonFinite);
    }
    Unit::try_new(*v, f64::MIN_POSITIVE).ok_or(LinalgError::Singular)
}

/// Two unit vectors `u`, `v` such that `(u, v, n)` is a right-handed
/// orthonormal basis.
pub fn orthonormal_complement(n: &Unit<Vector3<f64>>) -> (Vector3<f64>, Vector3<f64>) {
    let n: &Vector3<f64> = n.as_ref();
    let abs = n.abs();
    let helper = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = helper.cross(n).normalize();
    let v = n.cross(&u);
    (u, v)
}

/// Eigen decomposition of a symmetric 3x3 matrix.
///
/// Eigenvalues are returned in ascending order, the eigenvector for
/// `values[i]` is column `i` of the returned matrix. The columns are
/// orthonormal.
pub fn symmetric_eigen(m: &Matrix3<f64>) -> Result<(Vector3<f64>, Matrix3<f64>), LinalgError> {
    if !all_finite(m.iter()) {
        return Err(LinalgError::NonFinite);
    }
    let eigen = SymmetricEigen::try_new(*m, f64::EPSILON, EIGEN_MAX_ITERATIONS)
        .ok_or(LinalgError::NotConverged)?;

    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

    let values = Vector3::new(
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    );
    let vectors = Matrix3::from_columns(&[
        eigen.eigenvectors.column(order[0]).into_owned(),
        eigen.eigenvectors.column(order[1]).into_owned(),
        eigen.eigenvectors.column(order[2]).into_owned(),
    ]);
    Ok((values, vectors))
}

/// Number of singular values above the relative [`SINGULAR_TOLERANCE`].
pub fn rank(a: &DMatrix<f64>) -> usize {
    let singular = a.singular_values();
    let max = singular.max();
    if !(max > 0.0) {
        return 0;
    }
    singular
        .iter()
        .filter(|s| **s > max * SINGULAR_TOLERANCE)
        .count()
}

fn well_conditioned(singular: impl Iterator<Item = f64>) -> bool {
    let (min, max) = singular.fold((f64::INFINITY, 0.0f64), |(min, max), s| {
        (min.min(s), max.max(s))
    });
    max > 0.0 && min > max * SINGULAR_TOLERANCE
}

/// Exact solution of the square system `a x = b`.
pub fn solve(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinalgError> {
    if !a.is_square() || a.nrows() != b.len() {
        return Err(LinalgError::ShapeMismatch);
    }
    if !all_finite(a.iter()) || !all_finite(b.iter()) {
        return Err(LinalgError::NonFinite);
    }
    if !well_conditioned(a.singular_values().iter().copied()) {
        return Err(LinalgError::Singular);
    }
    let x = a.clone().lu().solve(b).ok_or(LinalgError::Singular)?;
    if !all_finite(x.iter()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(x)
}

pub fn solve3(a: &Matrix3<f64>, b: &Vector3<f64>) -> Result<Vector3<f64>, LinalgError> {
    if !all_finite(a.iter()) || !all_finite(b.iter()) {
        return Err(LinalgError::NonFinite);
    }
    if !well_conditioned(a.singular_values().iter().copied()) {
        return Err(LinalgError::Singular);
    }
    let x = a.lu().solve(b).ok_or(LinalgError::Singular)?;
    if !all_finite(x.iter()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(x)
}

/// Minimum norm least-squares solution of `a x = b` for any shape of `a`.
///
/// Singular values below the relative tolerance are truncated, so a
/// consistent rank deficient system still solves. Only a zero matrix fails.
pub fn least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinalgError> {
    if a.nrows() != b.len() {
        return Err(LinalgError::ShapeMismatch);
    }
    if !all_finite(a.iter()) || !all_finite(b.iter()) {
        return Err(LinalgError::NonFinite);
    }
    let svd = a.clone().svd(true, true);
    let max = svd.singular_values.max();
    if !(max > 0.0) {
        return Err(LinalgError::Singular);
    }
    let x = svd
        .solve(b, max * SINGULAR_TOLERANCE)
        .map_err(|_| LinalgError::Singular)?;
    if !all_finite(x.iter()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(x)
}

/// Orthonormal basis of the approximate null space of `a`.
#[derive(Debug, Clone, PartialEq)]
pub struct NullSpace {
    /// One basis vector per column, possibly none.
    pub basis: DMatrix<f64>,
    /// Smallest singular value relative to the largest one.
    pub residual: f64,
}

/// Right singular vectors of `a` whose singular value is at most
/// `tolerance` times the largest one.
pub fn null_space(a: &DMatrix<f64>, tolerance: f64) -> Result<NullSpace, LinalgError> {
    if !all_finite(a.iter()) {
        return Err(LinalgError::NonFinite);
    }
    let n = a.ncols();
    // zero rows keep the right singular vectors complete for wide matrices
    let padded = if a.nrows() < n {
        a.clone().resize_vertically(n, 0.0)
    } else {
        a.clone()
    };
    let svd = padded.svd(false, true);
    let v_t = svd.v_t.ok_or(LinalgError::NotConverged)?;
    let values = &svd.singular_values;
    let max = values.max();
    if !(max > 0.0) {
        return Ok(NullSpace {
            basis: DMatrix::identity(n, n),
            residual: 0.0,
        });
    }

    let null = (0..values.len())
        .filter(|&i| values[i] <= max * tolerance)
        .collect::<Vec<_>>();
    let basis = DMatrix::from_fn(n, null.len(), |r, c| v_t[(null[c], r)]);
    Ok(NullSpace {
        basis,
        residual: values.min() / max,
    })
}
