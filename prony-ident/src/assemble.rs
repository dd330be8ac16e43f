//! Result assembly: model table, control output and the two diagnostic
//! channels.

use faer::Mat;
use serde::Serialize;

use crate::catalog::{catalog, Diagnostic, DiagnosticKind};
use crate::control::ControlOutput;
use crate::postprocess::{AlignedModels, SignalModel};
use crate::types::Mode;

/// Where a fatal result code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalCode {
    /// Primary code of the mode extractor.
    Extraction(u16),
    /// Secondary code of the mode reorderer.
    Reorder(u16),
}

impl FatalCode {
    /// The single fatal diagnostic reported for this code.
    pub fn diagnostic(self) -> Diagnostic {
        let (found, code) = match self {
            FatalCode::Extraction(c) => (catalog().for_extraction_code(c), c),
            FatalCode::Reorder(c) => (catalog().for_reorder_code(c), c),
        };
        found.unwrap_or(Diagnostic {
            kind: DiagnosticKind::Fatal,
            code,
            message: "unclassified failure",
        })
    }
}

/// A per-mode warning raised by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeWarning {
    /// Index of the mode in the shared pole vector (extraction order). Use
    /// [`IdentifiedModel::row_of`] for its table row.
    pub mode: usize,
    pub diagnostic: Diagnostic,
}

/// Identified modes for every signal.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedModel {
    /// Row count of the model table: the requested mode count.
    pub rows: usize,
    /// Shared pole index of each table row.
    pub poles: Vec<usize>,
    pub signals: Vec<SignalModel>,
}

impl IdentifiedModel {
    pub fn n_signals(&self) -> usize {
        self.signals.len()
    }

    pub fn modes(&self, signal: usize) -> &[Mode] {
        &self.signals[signal].modes
    }

    /// Table row holding the shared pole `pole`, if it survived.
    pub fn row_of(&self, pole: usize) -> Option<usize> {
        self.poles
            .iter()
            .position(|&p| p == pole)
            .filter(|&row| row < self.rows)
    }

    /// `rows × (8 · signals)` table, one block of [`Mode::COLUMNS`] columns
    /// per signal. Row `i` holds pole `poles[i]` in every block; a signal
    /// that dropped that pole has a zero row there.
    pub fn table(&self) -> Mat<f64> {
        let mut t = Mat::<f64>::zeros(self.rows, Mode::COLUMNS * self.signals.len());
        for (j, signal) in self.signals.iter().enumerate() {
            for (mode, &pole) in signal.modes.iter().zip(&signal.poles) {
                let Some(i) = self.row_of(pole) else { continue };
                for (c, v) in mode.to_row().into_iter().enumerate() {
                    t[(i, j * Mode::COLUMNS + c)] = v;
                }
            }
        }
        t
    }
}

/// Outcome of one identification call. Warnings and a fatal diagnostic are
/// never reported together.
#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    Identified {
        model: IdentifiedModel,
        control: ControlOutput,
        warnings: Vec<ModeWarning>,
    },
    Failed {
        control: ControlOutput,
        fatal: Diagnostic,
    },
}

impl Identification {
    pub fn is_identified(&self) -> bool {
        matches!(self, Identification::Identified { .. })
    }

    pub fn model(&self) -> Option<&IdentifiedModel> {
        match self {
            Identification::Identified { model, .. } => Some(model),
            Identification::Failed { .. } => None,
        }
    }

    pub fn control(&self) -> &ControlOutput {
        match self {
            Identification::Identified { control, .. } | Identification::Failed { control, .. } => {
                control
            }
        }
    }

    /// Collected warnings; empty on failure.
    pub fn warnings(&self) -> &[ModeWarning] {
        match self {
            Identification::Identified { warnings, .. } => warnings,
            Identification::Failed { .. } => &[],
        }
    }

    pub fn fatal(&self) -> Option<&Diagnostic> {
        match self {
            Identification::Identified { .. } => None,
            Identification::Failed { fatal, .. } => Some(fatal),
        }
    }

    /// Model table; `0 × 0` on failure.
    pub fn table(&self) -> Mat<f64> {
        self.model()
            .map(IdentifiedModel::table)
            .unwrap_or_else(|| Mat::zeros(0, 0))
    }
}

/// Map per-mode warning codes onto catalog entries, dropping zeros.
pub fn collect_warnings(codes: &[u16]) -> Vec<ModeWarning> {
    codes
        .iter()
        .enumerate()
        .filter(|(_, &code)| code != 0)
        .filter_map(|(mode, &code)| match catalog().warning(code) {
            Some(diagnostic) => Some(ModeWarning { mode, diagnostic }),
            None => {
                tracing::warn!(mode, code, "unknown warning code ignored");
                None
            }
        })
        .collect()
}

/// Assemble a successful identification.
pub fn assemble(
    aligned: AlignedModels,
    rows: usize,
    control: ControlOutput,
    warning_codes: &[u16],
) -> Identification {
    let warnings = collect_warnings(warning_codes);
    for w in &warnings {
        tracing::warn!(mode = w.mode, "{}", w.diagnostic);
    }
    Identification::Identified {
        model: IdentifiedModel {
            rows,
            poles: aligned.poles,
            signals: aligned.signals,
        },
        control,
        warnings,
    }
}

/// Assemble a failed identification. The control output reports no achieved
/// modes.
pub fn assemble_failure(code: FatalCode, mut control: ControlOutput) -> Identification {
    let fatal = code.diagnostic();
    tracing::warn!(?code, "{}", fatal);
    control.achieved_modes = 0;
    Identification::Failed { control, fatal }
}
