//! The `Prony` orchestrator: validation, preprocessing, extraction,
//! per-signal post-processing and assembly.

use crate::assemble::{assemble, assemble_failure, FatalCode, Identification};
use crate::control::ControlOutput;
use crate::extract::{
    requested_modes, run_extraction, ConservativeModeCount, ModeCountStrategy, ModeExtractor,
};
use crate::lp::LinearPredictionExtractor;
use crate::postprocess::PostProcessor;
use crate::preprocess::prepare_signals;
use crate::reorder::{EnergyReorderer, ModeReorderer};
use crate::residue::{PulseTrainSolver, TransferFunctionSolver};
use crate::types::{Limits, PronyError};
use crate::validate::{validate, ProblemInputs};

/// Transfer-function identifier with pluggable collaborators.
///
/// # Example
///
/// ```rust
/// use prony_ident::{Limits, ProblemInputs, Prony};
///
/// let dt = 0.05;
/// let mut signals = faer::Mat::<f64>::zeros(120, 1);
/// for k in 0..120 {
///     let t = k as f64 * dt;
///     signals[(k, 0)] = (-0.4 * t).exp() * (3.0 * t).cos();
/// }
/// let mut control = vec![0.0; 12];
/// control[0] = 2.0;
///
/// let prony = Prony::new().with_limits(Limits::default());
/// let id = prony
///     .identify(&ProblemInputs::free_response(signals, dt, control))
///     .unwrap();
/// assert!(id.is_identified());
/// ```
pub struct Prony {
    limits: Limits,
    extractor: Box<dyn ModeExtractor>,
    reorderer: Box<dyn ModeReorderer>,
    solver: Box<dyn TransferFunctionSolver>,
    mode_count: Box<dyn ModeCountStrategy>,
}

impl Default for Prony {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            extractor: Box::new(LinearPredictionExtractor),
            reorderer: Box::new(EnergyReorderer),
            solver: Box::new(PulseTrainSolver),
            mode_count: Box::new(ConservativeModeCount::default()),
        }
    }
}

impl Prony {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_extractor(mut self, extractor: impl ModeExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_reorderer(mut self, reorderer: impl ModeReorderer + 'static) -> Self {
        self.reorderer = Box::new(reorderer);
        self
    }

    pub fn with_solver(mut self, solver: impl TransferFunctionSolver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    pub fn with_mode_count(mut self, strategy: impl ModeCountStrategy + 'static) -> Self {
        self.mode_count = Box::new(strategy);
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Identify the modes of every signal.
    ///
    /// Argument errors are returned as `Err`. Extraction or reordering
    /// failures are a successful call yielding [`Identification::Failed`].
    pub fn identify(&self, inputs: &ProblemInputs) -> Result<Identification, PronyError> {
        let problem = validate(inputs, &self.limits)?;
        let control = problem.control;
        tracing::debug!(
            signals = problem.n_signals(),
            min_fit_length = problem.min_fit_length(),
            scaling = control.scaling,
            "starting identification"
        );

        let prepared = prepare_signals(&inputs.signals, &problem.windows, control.scaling);
        let total_modes = requested_modes(
            control.additional_modes,
            problem.known_modes.len(),
            &prepared,
            self.mode_count.as_ref(),
            &self.limits,
        );

        let outcome = run_extraction(
            self.extractor.as_ref(),
            &prepared,
            problem.sample_period,
            control.prediction,
            &problem.known_modes,
            total_modes,
            control.trim,
            &self.limits,
        );

        let control_out = ControlOutput {
            achieved_modes: outcome.achieved,
            requested_modes: total_modes,
            prediction: outcome.prediction,
            input: control,
        };
        if !outcome.is_success() {
            return Ok(assemble_failure(
                FatalCode::Extraction(outcome.code),
                control_out,
            ));
        }

        let post = PostProcessor {
            outcome: &outcome,
            signals: &prepared,
            sample_period: problem.sample_period,
            pulses: &problem.pulses,
            control: &control,
            total_modes,
            limits: &self.limits,
            reorderer: self.reorderer.as_ref(),
            solver: self.solver.as_ref(),
        };
        let aligned = match post.run() {
            Ok(a) => a,
            Err(code) => return Ok(assemble_failure(FatalCode::Reorder(code), control_out)),
        };

        tracing::info!(
            requested = total_modes,
            achieved = outcome.achieved,
            "identification complete"
        );
        Ok(assemble(aligned, total_modes, control_out, &outcome.warnings))
    }
}

/// Identify with the default collaborators and limits.
pub fn identify(inputs: &ProblemInputs) -> Result<Identification, PronyError> {
    Prony::default().identify(inputs)
}
