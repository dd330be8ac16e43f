//! Per-signal post-processing of the shared extraction result.
//!
//! Each signal is handled independently: scaling is undone, modes are
//! reordered and filtered, residues are computed in window time and finally
//! amplitude and phase are moved back to the true time origin. The per-signal
//! results are then put in one row order shared by every signal.

use rayon::prelude::*;
use std::f64::consts::PI;

use crate::control::{FitControl, ModeOrdering};
use crate::extract::ExtractionOutcome;
use crate::preprocess::{PreparedSignal, PreparedSignals};
use crate::reorder::{ModeReorderer, ReorderRequest};
use crate::residue::{free_response_residues, ResidueRequest, TransferFunctionSolver};
use crate::types::{Limits, Mode, Pulse, SignalWindow};
use crate::utils::wrap_phase;

/// Ranking weights handed to the reorderer: energy only.
const ENERGY_WEIGHT: f64 = 1.0;
const AMPLITUDE_WEIGHT: f64 = 0.0;

/// Identified modes of one signal, referenced to the true time origin.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalModel {
    pub modes: Vec<Mode>,
    /// Index of each mode in the shared pole vector (extraction order).
    pub poles: Vec<usize>,
    pub window: SignalWindow,
    /// Scale factor divided out before extraction (1.0 when unscaled).
    pub scale: f64,
    /// DC term of the transfer function; only set for pulse-train inputs.
    pub dc_term: Option<f64>,
}

/// Per-signal models in a common row order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedModels {
    /// Shared pole index of each row, best ranked first.
    pub poles: Vec<usize>,
    pub signals: Vec<SignalModel>,
}

/// Put every signal's modes in one row order.
///
/// Poles kept by any signal are ranked once, by `ordering` over the shared
/// damping and frequency and by relative energy summed across signals. At
/// most `rows` poles survive. Each signal keeps its own modes in that order.
pub fn align_signals(
    mut signals: Vec<SignalModel>,
    damping: &[f64],
    frequency: &[f64],
    ordering: ModeOrdering,
    rows: usize,
) -> AlignedModels {
    let mut score = vec![0.0; damping.len()];
    let mut kept = vec![false; damping.len()];
    for signal in &signals {
        for (mode, &p) in signal.modes.iter().zip(&signal.poles) {
            score[p] += mode.relative_energy;
            kept[p] = true;
        }
    }

    let by_score = |a: &usize, b: &usize| score[*b].total_cmp(&score[*a]).then(a.cmp(b));
    let mut poles: Vec<usize> = (0..damping.len()).filter(|&p| kept[p]).collect();
    match ordering {
        ModeOrdering::Energy => poles.sort_by(by_score),
        ModeOrdering::Frequency => poles.sort_by(|a, b| {
            let (fa, fb) = (frequency[*a], frequency[*b]);
            fa.abs()
                .total_cmp(&fb.abs())
                .then(fb.total_cmp(&fa))
                .then(by_score(a, b))
        }),
        ModeOrdering::Damping => poles.sort_by(|a, b| {
            damping[*a]
                .abs()
                .total_cmp(&damping[*b].abs())
                .then(by_score(a, b))
        }),
    }
    poles.truncate(rows);

    for signal in &mut signals {
        let mut placed: Vec<(usize, usize, Mode)> = signal
            .poles
            .iter()
            .zip(&signal.modes)
            .filter_map(|(&p, &m)| poles.iter().position(|&q| q == p).map(|row| (row, p, m)))
            .collect();
        placed.sort_by_key(|&(row, _, _)| row);
        signal.poles = placed.iter().map(|&(_, p, _)| p).collect();
        signal.modes = placed.into_iter().map(|(_, _, m)| m).collect();
    }

    AlignedModels { poles, signals }
}

/// Shared, read-only inputs of the per-signal loop.
pub struct PostProcessor<'a> {
    pub outcome: &'a ExtractionOutcome,
    pub signals: &'a PreparedSignals,
    pub sample_period: f64,
    pub pulses: &'a [Pulse],
    pub control: &'a FitControl,
    pub total_modes: usize,
    pub limits: &'a Limits,
    pub reorderer: &'a dyn ModeReorderer,
    pub solver: &'a dyn TransferFunctionSolver,
}

impl PostProcessor<'_> {
    /// Damping below which a mode decays past `stability_floor` within the
    /// fit window.
    pub fn stability_bound(&self, fit_length: usize) -> f64 {
        let span = self.sample_period * fit_length.saturating_sub(1).max(1) as f64;
        self.limits.stability_floor.ln() / span
    }

    /// Process every signal in parallel, then align their rows.
    ///
    /// Results keep signal order; on failure the reorder code of the first
    /// failing signal (in signal order) is returned.
    pub fn run(&self) -> Result<AlignedModels, u16> {
        let results: Vec<Result<SignalModel, u16>> = self
            .signals
            .signals
            .par_iter()
            .enumerate()
            .map(|(j, signal)| self.process(j, signal))
            .collect();
        let signals = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(align_signals(
            signals,
            &self.outcome.damping,
            &self.outcome.frequency,
            self.control.ordering,
            self.total_modes,
        ))
    }

    /// Process one signal.
    pub fn process(&self, index: usize, signal: &PreparedSignal) -> Result<SignalModel, u16> {
        let out = self.outcome;
        let dt = self.sample_period;
        let fit_length = signal.window.length;

        let amplitude: Vec<f64> = if self.control.scaling {
            out.amplitudes[index].iter().map(|a| a * signal.scale).collect()
        } else {
            out.amplitudes[index].clone()
        };

        let time: Vec<f64> = (0..fit_length).map(|k| k as f64 * dt).collect();
        let reordered = self.reorderer.reorder(&ReorderRequest {
            time: &time,
            fit_length,
            total_modes: self.total_modes,
            amplitude: &amplitude,
            damping: &out.damping,
            frequency: &out.frequency,
            phase: &out.phases[index],
            damping_cutoff: self.control.damping_cutoff,
            frequency_cutoff: self.control.trim.freq_high.map(|f| 2.0 * PI * f),
            stability_bound: self.stability_bound(fit_length),
            alpha: ENERGY_WEIGHT,
            beta: AMPLITUDE_WEIGHT,
            ordering: self.control.ordering,
        });
        if reordered.code != 0 {
            tracing::warn!(signal = index, code = reordered.code, "mode reordering failed");
            return Err(reordered.code);
        }

        // residues use window-time amplitude and phase
        let (residue_re, residue_im, dc_term) = if self.pulses.is_empty() {
            let (re, im) = free_response_residues(&reordered.amplitude, &reordered.phase);
            (re, im, None)
        } else {
            let r = self.solver.solve(&ResidueRequest {
                pulses: self.pulses,
                sample_period: dt,
                total_modes: self.total_modes,
                damping: &reordered.damping,
                frequency: &reordered.frequency,
                amplitude: &reordered.amplitude,
                phase: &reordered.phase,
                shift: signal.window.shift,
            });
            (r.real, r.imag, Some(r.dc_term))
        };

        // fitted term is A·e^{σ(t − T_s)}·cos(ω(t − T_s) + φ): at t = 0 the
        // amplitude is A·e^{−σT_s} and the phase φ − ωT_s
        let shift_time = signal.window.shift as f64 * dt;
        let modes = (0..reordered.len())
            .map(|m| {
                let damping = reordered.damping[m];
                let frequency = reordered.frequency[m];
                Mode {
                    damping,
                    frequency,
                    amplitude: reordered.amplitude[m] * (-damping * shift_time).exp(),
                    phase: wrap_phase(reordered.phase[m] - frequency * shift_time),
                    residue_re: residue_re.get(m).copied().unwrap_or(0.0),
                    residue_im: residue_im.get(m).copied().unwrap_or(0.0),
                    relative_energy: reordered.relative_energy[m],
                    fit_quality: reordered.fit_quality[m],
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(signal = index, modes = modes.len(), "signal post-processed");
        Ok(SignalModel {
            modes,
            poles: reordered.source,
            window: signal.window,
            scale: signal.scale,
            dc_term,
        })
    }
}
