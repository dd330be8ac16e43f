use faer::Mat;

use crate::control::{FitControl, ModeCount};
use crate::types::{ArgumentError, KnownMode, Limits, Pulse, SignalWindow};
use crate::utils::all_finite;

/// The six caller inputs, before validation.
#[derive(Debug, Clone)]
pub struct ProblemInputs {
    /// Samples × signals.
    pub signals: Mat<f64>,
    /// Sample period in seconds.
    pub sample_period: f64,
    /// 2 × signals: row 0 shift, row 1 fit length. Negative shifts clamp to
    /// 0, negative lengths select the remaining samples.
    pub windows: Mat<f64>,
    /// 0 rows, or pulses × 2 (delay, amplitude).
    pub pulses: Mat<f64>,
    /// 0 rows, or modes × 2 (damping, frequency).
    pub known_modes: Mat<f64>,
    /// Raw 12-slot control vector.
    pub control: Vec<f64>,
}

impl ProblemInputs {
    /// Inputs for `signals` fitted over their full length with no excitation,
    /// no known modes and the given control vector.
    pub fn free_response(signals: Mat<f64>, sample_period: f64, control: Vec<f64>) -> Self {
        let n_sig = signals.ncols();
        let mut windows = Mat::<f64>::zeros(2, n_sig);
        for j in 0..n_sig {
            windows[(1, j)] = -1.0;
        }
        Self {
            signals,
            sample_period,
            windows,
            pulses: Mat::<f64>::zeros(0, 2),
            known_modes: Mat::<f64>::zeros(0, 2),
            control,
        }
    }
}

/// Inputs that passed every check, in typed form.
#[derive(Debug, Clone)]
pub struct ValidatedProblem {
    pub sample_period: f64,
    pub windows: Vec<SignalWindow>,
    pub pulses: Vec<Pulse>,
    pub known_modes: Vec<KnownMode>,
    pub control: FitControl,
}

impl ValidatedProblem {
    pub fn n_signals(&self) -> usize {
        self.windows.len()
    }

    /// Shortest fit length over all signals.
    pub fn min_fit_length(&self) -> usize {
        self.windows.iter().map(|w| w.length).min().unwrap_or(0)
    }
}

/// Check every caller input against `limits`; the first violation wins.
pub fn validate(inputs: &ProblemInputs, limits: &Limits) -> Result<ValidatedProblem, ArgumentError> {
    let signals = &inputs.signals;
    let n_samples = signals.nrows();
    let n_sig = signals.ncols();

    if n_samples > limits.max_samples {
        return Err(ArgumentError::TooManySamples);
    }
    if n_sig > limits.max_signals {
        return Err(ArgumentError::TooManySignals);
    }
    if n_sig == 0 {
        return Err(ArgumentError::NoSignals);
    }
    if !all_finite(signals) {
        return Err(ArgumentError::NonFiniteInput);
    }

    if !inputs.sample_period.is_finite() || inputs.sample_period <= 0.0 {
        return Err(ArgumentError::InvalidSamplePeriod);
    }

    let windows = &inputs.windows;
    if windows.nrows() != 2 {
        return Err(ArgumentError::WindowRows);
    }
    if windows.ncols() != n_sig {
        return Err(ArgumentError::WindowColumns);
    }

    let pulses = &inputs.pulses;
    if pulses.nrows() > 0 {
        if pulses.nrows() > limits.max_pulses {
            return Err(ArgumentError::TooManyPulses);
        }
        if pulses.ncols() != 2 {
            return Err(ArgumentError::PulseColumns);
        }
    }

    let known = &inputs.known_modes;
    if known.nrows() > 0 {
        if known.nrows() > limits.max_modes {
            return Err(ArgumentError::TooManyKnownModes);
        }
        if known.ncols() != 2 {
            return Err(ArgumentError::KnownModeColumns);
        }
    }

    let control = FitControl::from_slice(&inputs.control)?;

    if !all_finite(windows) || !all_finite(pulses) || !all_finite(known) {
        return Err(ArgumentError::NonFiniteInput);
    }

    let mut clamped = Vec::with_capacity(n_sig);
    for j in 0..n_sig {
        let shift = windows[(0, j)].max(0.0) as usize;
        let length = if windows[(1, j)] < 0.0 {
            n_samples.saturating_sub(shift)
        } else {
            windows[(1, j)] as usize
        };
        if length < limits.min_fit_length {
            return Err(ArgumentError::FitTooShort);
        }
        if shift.checked_add(length).is_none_or(|end| end > n_samples) {
            return Err(ArgumentError::WindowOverrun);
        }
        clamped.push(SignalWindow { shift, length });
    }

    let additional = match control.additional_modes {
        ModeCount::Fixed(n) => n,
        ModeCount::Auto => 0,
    };
    if additional
        .checked_add(known.nrows())
        .is_none_or(|total| total > limits.max_modes)
    {
        return Err(ArgumentError::TooManyModes);
    }

    // an order or rank beyond the sample limit can never be solved
    let prediction = control.prediction;
    if [prediction.lp_order, prediction.pinv_rank]
        .into_iter()
        .flatten()
        .any(|n| n > limits.max_samples)
    {
        return Err(ArgumentError::InvalidSelector);
    }

    let pulse_list = (0..pulses.nrows())
        .map(|i| Pulse {
            delay: pulses[(i, 0)],
            amplitude: pulses[(i, 1)],
        })
        .collect();
    let known_list = (0..known.nrows())
        .map(|i| KnownMode {
            damping: known[(i, 0)],
            frequency: known[(i, 1)],
        })
        .collect();

    tracing::debug!(
        signals = n_sig,
        samples = n_samples,
        pulses = pulses.nrows(),
        known_modes = known.nrows(),
        "inputs validated"
    );

    Ok(ValidatedProblem {
        sample_period: inputs.sample_period,
        windows: clamped,
        pulses: pulse_list,
        known_modes: known_list,
        control,
    })
}
