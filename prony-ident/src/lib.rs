//! # prony-ident
//!
//! Multi-output transfer-function identification from sampled ringdown data
//! by Prony analysis.
//!
//! A set of signals sharing one dynamic system is fitted with a common set of
//! damped complex-exponential modes. For each signal the crate reports the
//! damping, frequency, amplitude, phase, transfer-function residue, relative
//! energy and a fit-quality score of every mode:
//!
//! - **Validation** ([`validate()`]): shape, limit and window checks against
//!   a static [`ErrorCatalog`]
//! - **Preprocessing** ([`prepare_signals`]): windowing and optional
//!   unit-peak scaling
//! - **Extraction** ([`ModeExtractor`], [`LinearPredictionExtractor`]):
//!   forward, backward or forward-backward linear prediction with SVD,
//!   normal-equation or total-least-squares solves, optionally constrained by
//!   known modes
//! - **Post-processing** ([`PostProcessor`]): per-signal reordering
//!   ([`EnergyReorderer`]), residues ([`PulseTrainSolver`]) and time-shift
//!   restoration, run in parallel over signals
//! - **Assembly** ([`Identification`]): model table, control vector, warnings
//!   or a single fatal diagnostic
//! - **Gateway** ([`gateway::call`]): the loosely typed six-input /
//!   four-output entry point
//!
//! ## Quick Start
//!
//! ```rust
//! use prony_ident::{identify, ProblemInputs};
//!
//! // Damped 1 Hz oscillation sampled at 20 Hz
//! let dt = 0.05;
//! let mut signals = faer::Mat::<f64>::zeros(200, 1);
//! for k in 0..200 {
//!     let t = k as f64 * dt;
//!     signals[(k, 0)] = (-0.5 * t).exp() * (2.0 * std::f64::consts::PI * t).cos();
//! }
//!
//! // Ask for two modes (one conjugate pair)
//! let mut control = vec![0.0; 12];
//! control[0] = 2.0;
//!
//! let id = identify(&ProblemInputs::free_response(signals, dt, control)).unwrap();
//! let modes = id.model().unwrap().modes(0);
//! assert!((modes[0].damping + 0.5).abs() < 1e-6);
//! assert_eq!(id.table().ncols(), 8);
//! ```
//!
//! ## References
//!
//! - Hauer, Demeure & Scharf (1990), *IEEE Trans. Power Syst.*, 5(1), 80-89
//! - Trudnowski, Johnson & Hauer (1999), *IEEE Trans. Power Syst.*, 14(1), 226-231
//! - Kumaresan & Tufts (1982), *IEEE Trans. ASSP*, 30(6), 833-840

pub mod catalog;
pub mod types;

pub mod assemble;
pub mod control;
pub mod extract;
pub mod gateway;
pub mod lp;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod reorder;
pub mod residue;
pub mod utils;
pub mod validate;

pub use assemble::{FatalCode, IdentifiedModel, Identification, ModeWarning};
pub use catalog::{catalog, Diagnostic, DiagnosticKind, ErrorCatalog};
pub use control::{
    ControlOutput, Direction, FitControl, LpAlgorithm, LpMethod, ModeCount, ModeOrdering,
    PredictionParams, TrimParams, CONTROL_LEN,
};
pub use extract::{
    ConservativeModeCount, ExtractionMode, ExtractionOutcome, ExtractionRequest,
    ModeCountContext, ModeCountStrategy, ModeExtractor,
};
pub use gateway::Value;
pub use lp::LinearPredictionExtractor;
pub use pipeline::{identify, Prony};
pub use postprocess::{align_signals, AlignedModels, PostProcessor, SignalModel};
pub use preprocess::{prepare_signals, PreparedSignal, PreparedSignals};
pub use reorder::{EnergyReorderer, ModeReorderer, ReorderOutcome, ReorderRequest};
pub use residue::{
    free_response_residues, PulseTrainSolver, ResidueOutcome, ResidueRequest,
    TransferFunctionSolver,
};
pub use types::{
    ArgumentError, KnownMode, Limits, Mode, PronyError, Pulse, SignalWindow, C64,
};
pub use validate::{validate, ProblemInputs, ValidatedProblem};
