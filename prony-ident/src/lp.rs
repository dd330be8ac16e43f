//! Reference linear-prediction (Prony) mode extractor.
//!
//! # Algorithm
//! 1. Annihilate known poles with an FIR prefilter (constrained mode only)
//! 2. Stack the linear-prediction equations of every signal: shared
//!    coefficients give poles common to all outputs
//! 3. Solve for the coefficients (truncated-SVD pseudo-inverse, normal
//!    equations or rank-truncated total least squares)
//! 4. Root the characteristic polynomial through its companion matrix
//! 5. Fit complex amplitudes per signal on the unfiltered window
//! 6. Trim and rank surplus roots by energy, then refit

use std::f64::consts::PI;

use faer::Mat;

use crate::control::{Direction, LpAlgorithm, LpMethod, PredictionParams, TrimParams};
use crate::extract::{ExtractionMode, ExtractionOutcome, ExtractionRequest, ModeExtractor};
use crate::types::{KnownMode, Limits, PronyError, C64};
use crate::utils::{complex_amplitudes, gauss_solve, pinv, poly_from_roots};

/// Roots closer to the origin than this cannot be mapped to the s-plane.
const MIN_ROOT_NORM: f64 = 1e-12;

/// Default [`ModeExtractor`]: classic Prony analysis over all signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPredictionExtractor;

impl ModeExtractor for LinearPredictionExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractionOutcome {
        let mut prediction = request.prediction;
        match extract_modes(request, &mut prediction) {
            Ok(outcome) => outcome,
            Err(e) => {
                let code = e.extraction_code();
                tracing::warn!(code, error = %e, "linear-prediction extraction failed");
                ExtractionOutcome::failed(code, prediction)
            }
        }
    }
}

/// A candidate pole in both planes.
#[derive(Debug, Clone, Copy)]
struct Pole {
    z: C64,
    s: C64,
}

impl Pole {
    fn from_s(s: C64, dt: f64) -> Self {
        Self { z: (s * dt).exp(), s }
    }

    fn from_z(z: C64, dt: f64) -> Self {
        Self { z, s: z.ln() / dt }
    }
}

fn extract_modes(
    req: &ExtractionRequest<'_>,
    prediction: &mut PredictionParams,
) -> Result<ExtractionOutcome, PronyError> {
    let dt = req.sample_period;
    let known = known_poles(req.known, dt, req.limits)?;
    let n_known = known.len();

    let poles = match req.mode {
        ExtractionMode::KnownOnly => known,
        ExtractionMode::Blind | ExtractionMode::Constrained => {
            let remaining = req.total_modes.saturating_sub(n_known);
            if remaining == 0 {
                return Err(PronyError::NoModes("no modes requested".into()));
            }
            let order = prediction.lp_order.unwrap_or(remaining);
            prediction.lp_order = Some(order);

            let closure = conjugate_closure(&known, req.limits.pole_separation);
            let filtered = annihilate(&req.signals, &closure);
            let (coeffs, rank) = solve_prediction(&filtered, order, prediction)?;
            prediction.pinv_rank = Some(rank);

            let extracted = prediction_roots(&coeffs, prediction.direction, dt)?;
            tracing::debug!(order, rank, roots = extracted.len(), "prediction solved");

            let extracted = select_extracted(
                &req.signals,
                &known,
                extracted,
                remaining,
                &req.trim,
            )?;
            let mut all = known;
            all.extend(extracted);
            all
        }
    };

    if poles.is_empty() {
        return Err(PronyError::NoModes("all roots were discarded".into()));
    }

    let roots: Vec<C64> = poles.iter().map(|p| p.z).collect();
    let amps = req
        .signals
        .iter()
        .map(|y| complex_amplitudes(&roots, y))
        .collect::<Result<Vec<_>, _>>()?;

    let warnings = mode_warnings(&poles, &amps, dt, req.limits);

    let amplitudes = amps
        .iter()
        .map(|b| b.iter().map(|bi| 2.0 * bi.norm()).collect())
        .collect();
    let phases = amps
        .iter()
        .map(|b| b.iter().map(|bi| bi.arg()).collect())
        .collect();

    Ok(ExtractionOutcome {
        damping: poles.iter().map(|p| p.s.re).collect(),
        frequency: poles.iter().map(|p| p.s.im).collect(),
        amplitudes,
        phases,
        achieved: poles.len(),
        warnings,
        code: 0,
        prediction: *prediction,
    })
}

fn known_poles(known: &[KnownMode], dt: f64, limits: &Limits) -> Result<Vec<Pole>, PronyError> {
    let poles: Vec<Pole> = known
        .iter()
        .map(|k| Pole::from_s(C64::new(k.damping, k.frequency), dt))
        .collect();
    for (i, p) in poles.iter().enumerate() {
        if !p.z.is_finite() || p.z.norm() < MIN_ROOT_NORM {
            return Err(PronyError::InvalidKnownModes(format!(
                "known mode {i} is not representable at this sample period"
            )));
        }
        if poles[..i]
            .iter()
            .any(|q| (q.z - p.z).norm() < limits.pole_separation)
        {
            return Err(PronyError::InvalidKnownModes(format!(
                "known mode {i} duplicates an earlier known mode"
            )));
        }
    }
    Ok(poles)
}

/// Known z-plane roots plus any missing conjugates, so the annihilating
/// polynomial has real coefficients.
fn conjugate_closure(known: &[Pole], tol: f64) -> Vec<C64> {
    let mut roots: Vec<C64> = known.iter().map(|p| p.z).collect();
    for p in known {
        if p.z.im.abs() > tol && !roots.iter().any(|r| (*r - p.z.conj()).norm() < tol) {
            roots.push(p.z.conj());
        }
    }
    roots
}

/// Filter every signal with the polynomial whose roots are `roots`,
/// removing those modes from the data.
fn annihilate(signals: &[&[f64]], roots: &[C64]) -> Vec<Vec<f64>> {
    if roots.is_empty() {
        return signals.iter().map(|s| s.to_vec()).collect();
    }
    let f: Vec<f64> = poly_from_roots(roots).iter().map(|c| c.re).collect();
    let q = roots.len();
    signals
        .iter()
        .map(|x| {
            let n = x.len().saturating_sub(q);
            (0..n)
                .map(|k| {
                    f.iter()
                        .enumerate()
                        .map(|(m, fm)| fm * x[k + q - m])
                        .sum::<f64>()
                })
                .collect()
        })
        .collect()
}

/// Stack the prediction equations `x[n] = Σ c_k x[n−k]` of every signal.
fn prediction_system(signals: &[Vec<f64>], order: usize, direction: Direction) -> (Mat<f64>, Vec<f64>) {
    let mut rows: Vec<(Vec<f64>, f64)> = Vec::new();
    for x in signals {
        let n = x.len();
        if n <= order {
            continue;
        }
        match direction {
            Direction::Forward => {
                for t in order..n {
                    rows.push(((1..=order).map(|k| x[t - k]).collect(), x[t]));
                }
            }
            Direction::Backward => {
                // forward equations of the time-reversed signal
                for t in order..n {
                    rows.push((
                        (1..=order).map(|k| x[n - 1 - t + k]).collect(),
                        x[n - 1 - t],
                    ));
                }
            }
            Direction::ForwardBackward => {
                for t in order..n {
                    rows.push(((1..=order).map(|k| x[t - k]).collect(), x[t]));
                }
                for t in 0..n - order {
                    rows.push(((1..=order).map(|k| x[t + k]).collect(), x[t]));
                }
            }
        }
    }

    let mut h = Mat::<f64>::zeros(rows.len(), order);
    let mut b = Vec::with_capacity(rows.len());
    for (i, (row, target)) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            h[(i, j)] = v;
        }
        b.push(target);
    }
    (h, b)
}

/// Solve for the prediction coefficients; returns them with the rank used.
fn solve_prediction(
    signals: &[Vec<f64>],
    order: usize,
    params: &PredictionParams,
) -> Result<(Vec<f64>, usize), PronyError> {
    if order == 0 {
        return Err(PronyError::InsufficientData(
            "prediction order must be positive".into(),
        ));
    }
    let longest = signals.iter().map(Vec::len).max().unwrap_or(0);
    if longest <= order {
        return Err(PronyError::InsufficientData(format!(
            "order {order} needs more than {longest} samples"
        )));
    }
    let (h, b) = prediction_system(signals, order, params.direction);
    let n_rows = h.nrows();
    let needed = match params.method {
        LpMethod::LeastSquares => order,
        LpMethod::TotalLeastSquares => order + 1,
    };
    if n_rows < needed {
        return Err(PronyError::InsufficientData(format!(
            "{n_rows} prediction equations for order {order}"
        )));
    }

    match (params.method, params.algorithm) {
        (LpMethod::TotalLeastSquares, _) => total_least_squares(&h, &b, params.pinv_rank),
        (LpMethod::LeastSquares, LpAlgorithm::Svd) => {
            let (h_pinv, rank) = pinv(&h, params.pinv_rank)?;
            let c: Vec<f64> = (0..order)
                .map(|i| (0..n_rows).map(|k| h_pinv[(i, k)] * b[k]).sum::<f64>())
                .collect();
            Ok((c, rank))
        }
        (LpMethod::LeastSquares, LpAlgorithm::NormalEquations) => {
            let gram = h.transpose() * &h;
            let rhs: Vec<f64> = (0..order)
                .map(|i| (0..n_rows).map(|k| h[(k, i)] * b[k]).sum::<f64>())
                .collect();
            Ok((gauss_solve(&gram, &rhs)?, order))
        }
    }
}

/// Rank-truncated total least squares on the augmented matrix `[H | b]`.
fn total_least_squares(
    h: &Mat<f64>,
    b: &[f64],
    rank: Option<usize>,
) -> Result<(Vec<f64>, usize), PronyError> {
    let (n_rows, order) = (h.nrows(), h.ncols());
    let mut aug = Mat::<f64>::zeros(n_rows, order + 1);
    for i in 0..n_rows {
        for j in 0..order {
            aug[(i, j)] = h[(i, j)];
        }
        aug[(i, order)] = b[i];
    }

    let svd = aug
        .thin_svd()
        .map_err(|e| PronyError::SvdFailed(format!("{e:?}")))?;
    let v = svd.V();
    let r = rank.unwrap_or(order).min(order);

    // noise subspace: right singular vectors r..=order
    let denom: f64 = (r..=order).map(|j| v[(order, j)] * v[(order, j)]).sum();
    if denom < 1e-14 {
        return Err(PronyError::NumericalError(
            "total least squares solution is undefined".into(),
        ));
    }
    let c: Vec<f64> = (0..order)
        .map(|i| -(r..=order).map(|j| v[(i, j)] * v[(order, j)]).sum::<f64>() / denom)
        .collect();
    Ok((c, r))
}

/// Roots of `z^p − c_1 z^{p−1} − … − c_p` as poles.
fn prediction_roots(coeffs: &[f64], direction: Direction, dt: f64) -> Result<Vec<Pole>, PronyError> {
    let p = coeffs.len();
    let mut companion = Mat::<f64>::zeros(p, p);
    for (j, &c) in coeffs.iter().enumerate() {
        companion[(0, j)] = c;
    }
    for i in 1..p {
        companion[(i, i - 1)] = 1.0;
    }

    let eigen = companion
        .as_ref()
        .eigen()
        .map_err(|e| PronyError::EigenFailed(format!("{e:?}")))?;
    let ev = eigen.S().column_vector();

    let mut poles = Vec::with_capacity(p);
    for j in 0..p {
        let mut z = C64::new(ev[j].re, ev[j].im);
        if !z.is_finite() || z.norm() < MIN_ROOT_NORM {
            continue;
        }
        if direction == Direction::Backward {
            z = C64::one() / z;
        }
        poles.push(Pole::from_z(z, dt));
    }
    Ok(poles)
}

fn window_energy(b: C64, z: C64, n: usize) -> f64 {
    let r2 = z.norm_sqr();
    let mut power = 1.0;
    let mut sum = 0.0;
    for _ in 0..n {
        sum += power;
        power *= r2;
    }
    b.norm_sqr() * sum
}

/// Apply the trim band and residue floor to the extracted roots and keep the
/// `wanted` most energetic ones, known poles always retained.
fn select_extracted(
    signals: &[&[f64]],
    known: &[Pole],
    extracted: Vec<Pole>,
    wanted: usize,
    trim: &TrimParams,
) -> Result<Vec<Pole>, PronyError> {
    let in_band: Vec<Pole> = extracted
        .into_iter()
        .filter(|p| {
            let hz = p.s.im.abs() / (2.0 * PI);
            trim.freq_high.is_none_or(|hi| hz <= hi) && trim.freq_low.is_none_or(|lo| hz >= lo)
        })
        .collect();
    if in_band.is_empty() {
        return Ok(in_band);
    }

    let roots: Vec<C64> = known.iter().chain(in_band.iter()).map(|p| p.z).collect();
    let amps = signals
        .iter()
        .map(|y| complex_amplitudes(&roots, y))
        .collect::<Result<Vec<_>, _>>()?;

    let energy: Vec<f64> = roots
        .iter()
        .enumerate()
        .map(|(i, &z)| {
            signals
                .iter()
                .zip(&amps)
                .map(|(y, b)| window_energy(b[i], z, y.len()))
                .sum::<f64>()
        })
        .collect();
    let total: f64 = energy.iter().sum();

    let mut ranked: Vec<(Pole, f64)> = in_band
        .into_iter()
        .zip(energy[known.len()..].iter().copied())
        .filter(|&(_, e)| {
            trim.residue_floor
                .is_none_or(|floor| total <= 0.0 || e / total >= floor)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(wanted);
    Ok(ranked.into_iter().map(|(p, _)| p).collect())
}

/// One warning code per mode; the first matching condition wins.
fn mode_warnings(poles: &[Pole], amps: &[Vec<C64>], dt: f64, limits: &Limits) -> Vec<u16> {
    let largest = amps
        .iter()
        .flat_map(|b| b.iter().map(|bi| bi.norm()))
        .fold(0.0_f64, f64::max);

    poles
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let peak = amps.iter().map(|b| b[i].norm()).fold(0.0_f64, f64::max);
            let crowded = poles
                .iter()
                .enumerate()
                .any(|(j, q)| j != i && (q.z - p.z).norm() < limits.pole_separation);
            if p.z.norm() > 1.0 + 1e-10 {
                1
            } else if p.s.im.abs() * dt > limits.nyquist_warning_fraction * PI {
                2
            } else if crowded {
                3
            } else if peak <= limits.negligible_amplitude * largest {
                4
            } else {
                0
            }
        })
        .collect()
}
