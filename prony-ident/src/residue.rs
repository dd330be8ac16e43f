//! Transfer-function residues, from a known pulse-train excitation or from a
//! free (unforced) response.

use crate::types::{Pulse, C64};

/// Poles closer to the origin than this get a zero residue.
const MIN_POLE_NORM: f64 = 1e-12;

/// Mode parameters for one signal, in window time.
#[derive(Debug, Clone)]
pub struct ResidueRequest<'a> {
    pub pulses: &'a [Pulse],
    pub sample_period: f64,
    pub total_modes: usize,
    pub damping: &'a [f64],
    pub frequency: &'a [f64],
    pub amplitude: &'a [f64],
    pub phase: &'a [f64],
    /// Window offset in samples.
    pub shift: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResidueOutcome {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub dc_term: f64,
}

/// Transfer-function residue collaborator.
pub trait TransferFunctionSolver: Send + Sync {
    fn solve(&self, request: &ResidueRequest<'_>) -> ResidueOutcome;
}

/// Residues of a free response: the complex amplitude `A e^{jφ} / 2`.
pub fn free_response_residues(amplitude: &[f64], phase: &[f64]) -> (Vec<f64>, Vec<f64>) {
    amplitude
        .iter()
        .zip(phase)
        .map(|(a, p)| (a * p.cos() / 2.0, a * p.sin() / 2.0))
        .unzip()
}

/// Residues for a piecewise-constant input that holds `amplitude` from each
/// `delay` until the next breakpoint.
///
/// The fitted window is treated as the ringdown after the last breakpoint.
/// Matching `Σ_j Δa_j · R_i/p_i · e^{p_i (t − d_j)}` against the fitted term
/// `B_i e^{p_i (t − T_s)}` gives
/// `R_i = p_i B_i e^{−p_i T_s} / Σ_j Δa_j e^{−p_i d_j}`; the DC term cancels
/// the constant part of the step response when the final level is non-zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseTrainSolver;

impl TransferFunctionSolver for PulseTrainSolver {
    fn solve(&self, req: &ResidueRequest<'_>) -> ResidueOutcome {
        let shift_time = req.shift as f64 * req.sample_period;
        let n = req.amplitude.len().min(req.total_modes);

        let mut steps = Vec::with_capacity(req.pulses.len());
        let mut level = 0.0;
        for p in req.pulses {
            steps.push((p.delay, p.amplitude - level));
            level = p.amplitude;
        }
        let final_level = level;

        let mut out = ResidueOutcome {
            real: Vec::with_capacity(n),
            imag: Vec::with_capacity(n),
            dc_term: 0.0,
        };
        let mut dc = C64::zero();

        for i in 0..n {
            let pole = C64::new(req.damping[i], req.frequency[i]);
            let b = C64::from_polar(req.amplitude[i] / 2.0, req.phase[i]);

            let mut excitation = C64::zero();
            for &(delay, delta) in &steps {
                excitation += (pole * -delay).exp() * delta;
            }

            let residue = if pole.norm() < MIN_POLE_NORM || excitation.norm() < MIN_POLE_NORM {
                C64::zero()
            } else {
                pole * b * (pole * -shift_time).exp() / excitation
            };
            let residue = if residue.is_finite() {
                residue
            } else {
                C64::zero()
            };

            if pole.norm() >= MIN_POLE_NORM {
                dc += residue / pole;
            }
            out.real.push(residue.re);
            out.imag.push(residue.im);
        }

        if final_level != 0.0 {
            out.dc_term = dc.re;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    #[test]
    fn test_free_response_residues() {
        let (re, im) = free_response_residues(&[2.0, 1.0], &[0.0, PI / 2.0]);
        assert_near(re[0], 1.0, 1e-15);
        assert_near(im[0], 0.0, 1e-15);
        assert_near(re[1], 0.0, 1e-15);
        assert_near(im[1], 0.5, 1e-15);
    }

    #[test]
    fn test_rectangular_pulse_first_order() {
        // G(s) = R/(s − p), u = unit pulse on [0, τ)
        // ringdown for t ≥ τ: R/p (e^{pt} − e^{p(t−τ)})
        let (p, r, tau) = (-2.0_f64, 3.0_f64, 0.5_f64);
        let dt = 0.01;
        let shift = 100; // window starts at t = 1.0
        let t0 = shift as f64 * dt;
        let b = r / p * ((p * t0).exp() - (p * (t0 - tau)).exp());

        let pulses = [
            Pulse {
                delay: 0.0,
                amplitude: 1.0,
            },
            Pulse {
                delay: tau,
                amplitude: 0.0,
            },
        ];
        let (amp, phase) = (2.0 * b.abs(), if b >= 0.0 { 0.0 } else { PI });
        let out = PulseTrainSolver.solve(&ResidueRequest {
            pulses: &pulses,
            sample_period: dt,
            total_modes: 1,
            damping: &[p],
            frequency: &[0.0],
            amplitude: &[amp],
            phase: &[phase],
            shift,
        });
        assert_near(out.real[0], r, 1e-9);
        assert_near(out.imag[0], 0.0, 1e-9);
        // pulse returns to zero: no DC term
        assert_eq!(out.dc_term, 0.0);
    }

    #[test]
    fn test_step_dc_term() {
        // step response of R/(s − p) + D settles to D − R/p; with no
        // constant mode fitted the solver sets D = R/p.
        let (p, r) = (-1.0_f64, 2.0_f64);
        let pulses = [Pulse {
            delay: 0.0,
            amplitude: 1.0,
        }];
        let b = r / p;
        let out = PulseTrainSolver.solve(&ResidueRequest {
            pulses: &pulses,
            sample_period: 0.1,
            total_modes: 1,
            damping: &[p],
            frequency: &[0.0],
            amplitude: &[2.0 * b.abs()],
            phase: &[PI],
            shift: 0,
        });
        assert_near(out.real[0], r, 1e-9);
        assert_near(out.dc_term, r / p, 1e-9);
    }

    #[test]
    fn test_pole_at_origin_has_zero_residue() {
        let pulses = [Pulse {
            delay: 0.0,
            amplitude: 1.0,
        }];
        let out = PulseTrainSolver.solve(&ResidueRequest {
            pulses: &pulses,
            sample_period: 0.1,
            total_modes: 1,
            damping: &[0.0],
            frequency: &[0.0],
            amplitude: &[1.0],
            phase: &[0.0],
            shift: 0,
        });
        assert_eq!(out.real, vec![0.0]);
        assert_eq!(out.imag, vec![0.0]);
    }
}
