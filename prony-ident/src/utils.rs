use std::f64::consts::PI;

use faer::Mat;

use crate::types::{PronyError, C64};

/// True when every entry of the matrix is finite.
pub fn all_finite(x: &Mat<f64>) -> bool {
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            if !x[(i, j)].is_finite() {
                return false;
            }
        }
    }
    true
}

/// Moore-Penrose pseudo-inverse via SVD, optionally truncated to `rank`
/// singular values.
///
/// Singular values below `max_sv * max_dim * eps` are always discarded.
/// Returns the pseudo-inverse and the rank actually used.
pub fn pinv(a: &Mat<f64>, rank: Option<usize>) -> Result<(Mat<f64>, usize), PronyError> {
    let svd = a
        .thin_svd()
        .map_err(|e| PronyError::SvdFailed(format!("{e:?}")))?;
    let u = svd.U();
    let s_col = svd.S().column_vector();
    let v = svd.V();

    let k = s_col.nrows();
    let max_sv = (0..k).map(|i| s_col[i].abs()).fold(0.0_f64, f64::max);
    let max_dim = a.nrows().max(a.ncols()) as f64;
    let tol = max_sv * max_dim * f64::EPSILON;

    let numerical_rank = (0..k).filter(|&i| s_col[i].abs() > tol).count();
    let used = match rank {
        Some(r) => r.min(numerical_rank),
        None => numerical_rank,
    };

    // pinv(A) = V S_inv U^T over the leading `used` singular triplets
    let m = a.nrows();
    let n = a.ncols();
    let mut result = Mat::<f64>::zeros(n, m);

    for idx in 0..used {
        let si_inv = 1.0 / s_col[idx];
        for j in 0..n {
            let vj = v[(j, idx)] * si_inv;
            for i in 0..m {
                result[(j, i)] += vj * u[(i, idx)];
            }
        }
    }

    Ok((result, used))
}

/// Solve a real square system Ax = b by Gaussian elimination with partial
/// pivoting.
pub fn gauss_solve(a: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>, PronyError> {
    let n = b.len();
    let scale = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .map(|(i, j)| a[(i, j)].abs())
        .fold(0.0_f64, f64::max);
    if scale == 0.0 {
        return Err(PronyError::SolveFailed("zero matrix".into()));
    }

    let mut aug: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut row: Vec<f64> = (0..n).map(|j| a[(i, j)]).collect();
            row.push(b[i]);
            row
        })
        .collect();

    for col in 0..n {
        let mut max_abs = aug[col][col].abs();
        let mut max_row = col;
        for (row, r) in aug.iter().enumerate().skip(col + 1) {
            if r[col].abs() > max_abs {
                max_abs = r[col].abs();
                max_row = row;
            }
        }
        if max_abs < 1e-13 * scale {
            return Err(PronyError::SolveFailed("singular matrix".into()));
        }
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            for j in col..=n {
                let sub = factor * aug[col][j];
                aug[row][j] -= sub;
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }

    Ok(x)
}

/// Least-squares complex amplitudes b for real data: Σ_i b_i z_i^n ≈ y[n].
///
/// The complex system is solved in its real form
/// `[Re V, −Im V; Im V, Re V] [Re b; Im b] = [y; 0]` with a pseudo-inverse,
/// so near-coincident poles degrade gracefully instead of failing.
pub fn complex_amplitudes(roots: &[C64], y: &[f64]) -> Result<Vec<C64>, PronyError> {
    let n = y.len();
    let m = roots.len();
    if m == 0 {
        return Ok(Vec::new());
    }

    let mut sys = Mat::<f64>::zeros(2 * n, 2 * m);
    for (i, z) in roots.iter().enumerate() {
        let (r, theta) = (z.norm(), z.arg());
        for k in 0..n {
            let zk = C64::from_polar(r.powi(k as i32), theta * k as f64);
            sys[(k, i)] = zk.re;
            sys[(k, m + i)] = -zk.im;
            sys[(n + k, i)] = zk.im;
            sys[(n + k, m + i)] = zk.re;
        }
    }

    let (sys_pinv, _) = pinv(&sys, None)?;
    let mut amps = Vec::with_capacity(m);
    for i in 0..m {
        let mut re = 0.0;
        let mut im = 0.0;
        for (k, &yk) in y.iter().enumerate() {
            re += sys_pinv[(i, k)] * yk;
            im += sys_pinv[(m + i, k)] * yk;
        }
        let b = C64::new(re, im);
        if !b.is_finite() {
            return Err(PronyError::SolveFailed(
                "non-finite amplitude in Vandermonde solve".into(),
            ));
        }
        amps.push(b);
    }
    Ok(amps)
}

/// Monic polynomial coefficients (highest power first) with the given roots.
pub fn poly_from_roots(roots: &[C64]) -> Vec<C64> {
    let mut coeffs = vec![C64::one()];
    for &r in roots {
        let mut next = vec![C64::zero(); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] += -(c * r);
        }
        coeffs = next;
    }
    coeffs
}

/// Wrap a phase into (−π, π].
pub fn wrap_phase(phase: f64) -> f64 {
    if phase > -PI && phase <= PI {
        return phase;
    }
    let w = phase.rem_euclid(2.0 * PI);
    if w > PI {
        w - 2.0 * PI
    } else {
        w
    }
}
