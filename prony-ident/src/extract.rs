//! Mode-extraction adapter: decides how known modes are used, packages the
//! call to the [`ModeExtractor`] collaborator and unpacks its result.

use crate::control::{ModeCount, PredictionParams, TrimParams};
use crate::preprocess::PreparedSignals;
use crate::types::{KnownMode, Limits};

/// Result code returned when an extractor reports success but hands back
/// tables of inconsistent shape.
pub const INCONSISTENT_OUTCOME: u16 = 106;

/// How known modes take part in extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// No known modes: every mode is extracted.
    Blind,
    /// Known modes are held fixed and the rest are extracted.
    Constrained,
    /// Known modes cover the request: only amplitudes and phases are fitted.
    KnownOnly,
}

impl ExtractionMode {
    pub fn select(known: usize, total: usize) -> Self {
        if known == 0 {
            ExtractionMode::Blind
        } else if known < total {
            ExtractionMode::Constrained
        } else {
            ExtractionMode::KnownOnly
        }
    }
}

/// Everything the extractor needs, for all signals at once.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    /// Windowed samples, one slice per signal. Lengths may differ.
    pub signals: Vec<&'a [f64]>,
    pub sample_period: f64,
    pub prediction: PredictionParams,
    pub mode: ExtractionMode,
    pub known: &'a [KnownMode],
    /// Requested total mode count, known modes included.
    pub total_modes: usize,
    pub trim: TrimParams,
    pub limits: &'a Limits,
}

/// Multi-valued extractor result. `code == 0` means success.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Poles shared by every signal.
    pub damping: Vec<f64>,
    pub frequency: Vec<f64>,
    /// Per signal, per mode.
    pub amplitudes: Vec<Vec<f64>>,
    pub phases: Vec<Vec<f64>>,
    pub achieved: usize,
    /// One code per mode; 0 means no warning.
    pub warnings: Vec<u16>,
    pub code: u16,
    /// Prediction settings with defaults resolved.
    pub prediction: PredictionParams,
}

impl ExtractionOutcome {
    /// An outcome carrying only a failure code.
    pub fn failed(code: u16, prediction: PredictionParams) -> Self {
        Self {
            damping: Vec::new(),
            frequency: Vec::new(),
            amplitudes: Vec::new(),
            phases: Vec::new(),
            achieved: 0,
            warnings: Vec::new(),
            code,
            prediction,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    fn is_consistent(&self, n_signals: usize) -> bool {
        let m = self.achieved;
        self.damping.len() == m
            && self.frequency.len() == m
            && self.warnings.len() == m
            && self.amplitudes.len() == n_signals
            && self.phases.len() == n_signals
            && self.amplitudes.iter().all(|a| a.len() == m)
            && self.phases.iter().all(|p| p.len() == m)
    }
}

/// Linear-prediction mode extractor collaborator.
pub trait ModeExtractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractionOutcome;
}

/// What an automatic mode-count strategy may look at.
#[derive(Debug, Clone)]
pub struct ModeCountContext {
    pub fit_lengths: Vec<usize>,
    pub known_modes: usize,
    pub max_modes: usize,
}

/// Chooses the number of additional modes when the control vector asks for
/// automatic selection.
pub trait ModeCountStrategy: Send + Sync {
    fn additional_modes(&self, ctx: &ModeCountContext) -> usize;
}

/// `min(cap, shortest_fit_length / 4)`, at least 1, within the mode limit.
#[derive(Debug, Clone, Copy)]
pub struct ConservativeModeCount {
    pub cap: usize,
}

impl Default for ConservativeModeCount {
    fn default() -> Self {
        Self { cap: 10 }
    }
}

impl ModeCountStrategy for ConservativeModeCount {
    fn additional_modes(&self, ctx: &ModeCountContext) -> usize {
        let shortest = ctx.fit_lengths.iter().copied().min().unwrap_or(0);
        let n = (shortest / 4).min(self.cap).max(1);
        n.min(ctx.max_modes.saturating_sub(ctx.known_modes))
    }
}

/// Requested total mode count, known modes included.
pub fn requested_modes(
    count: ModeCount,
    known: usize,
    signals: &PreparedSignals,
    strategy: &dyn ModeCountStrategy,
    limits: &Limits,
) -> usize {
    let additional = match count {
        ModeCount::Fixed(n) => n,
        ModeCount::Auto => strategy.additional_modes(&ModeCountContext {
            fit_lengths: signals.fit_lengths(),
            known_modes: known,
            max_modes: limits.max_modes,
        }),
    };
    additional + known
}

/// Invoke the extractor once for every signal and check the shape of what
/// comes back.
#[allow(clippy::too_many_arguments)]
pub fn run_extraction(
    extractor: &dyn ModeExtractor,
    signals: &PreparedSignals,
    sample_period: f64,
    prediction: PredictionParams,
    known: &[KnownMode],
    total_modes: usize,
    trim: TrimParams,
    limits: &Limits,
) -> ExtractionOutcome {
    let mode = ExtractionMode::select(known.len(), total_modes);
    tracing::debug!(?mode, total_modes, known = known.len(), "running mode extraction");

    let request = ExtractionRequest {
        signals: signals.sequences(),
        sample_period,
        prediction,
        mode,
        known,
        total_modes,
        trim,
        limits,
    };
    let outcome = extractor.extract(&request);

    if outcome.is_success() && !outcome.is_consistent(signals.len()) {
        tracing::warn!(
            achieved = outcome.achieved,
            "extractor returned inconsistent tables"
        );
        return ExtractionOutcome::failed(INCONSISTENT_OUTCOME, outcome.prediction);
    }
    outcome
}
