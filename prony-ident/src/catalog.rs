//! Static diagnostic catalog.
//!
//! Three disjoint code spaces: argument errors (raised before any numeric
//! work), per-mode warnings (collected, never fatal) and fatal errors (one per
//! failed identification). The tables are compiled in and never mutated.

use serde::Serialize;

/// Which code space a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Argument,
    Warning,
    Fatal,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Argument => write!(f, "argument error"),
            DiagnosticKind::Warning => write!(f, "warning"),
            DiagnosticKind::Fatal => write!(f, "fatal error"),
        }
    }
}

/// A catalog entry: code plus its fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: u16,
    pub message: &'static str,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.code, self.message)
    }
}

type Table = &'static [(u16, &'static str)];

const ARGUMENT_TABLE: Table = &[
    (1, "Exactly six input arguments are required"),
    (2, "Exactly four output arguments are required"),
    (3, "Signal matrix must be real-valued"),
    (4, "Signal matrix has too many rows (samples)"),
    (5, "Signal matrix has too many signal columns"),
    (6, "Signal matrix has no signal columns"),
    (7, "Sample period must be a scalar"),
    (8, "Sample period must be positive and finite"),
    (9, "Shift/length matrix must have exactly 2 rows"),
    (10, "Shift/length matrix must have one column per signal"),
    (11, "Pulse-train matrix has too many rows"),
    (12, "Pulse-train matrix must have exactly 2 columns"),
    (13, "Known-mode matrix has too many rows"),
    (14, "Known-mode matrix must have exactly 2 columns"),
    (15, "Control vector must have exactly 12 elements"),
    (16, "Fit length is shorter than the minimum number of samples"),
    (17, "Shift plus fit length exceeds the number of available samples"),
    (18, "Requested mode count (additional plus known) exceeds the maximum"),
    (19, "Input arguments must be real-valued matrices"),
    (20, "Inputs must not contain NaN or Inf values"),
    (21, "Control vector selector is out of range"),
];

const WARNING_TABLE: Table = &[
    (1, "Mode is unstable (positive damping)"),
    (2, "Mode frequency is close to the Nyquist limit"),
    (3, "Mode pole is poorly separated from another pole"),
    (4, "Mode amplitude is negligible in every signal"),
];

const FATAL_TABLE: Table = &[
    (1, "Linear prediction order is too large for the available fit length"),
    (2, "Matrix decomposition failed during linear prediction"),
    (3, "No modes could be identified from the data"),
    (4, "Linear system is singular; reduce the prediction order or pseudo-inverse rank"),
    (5, "Known modes are invalid or inconsistent with the requested mode count"),
    (6, "All modes were removed by the trim thresholds"),
    (7, "Internal computational error during mode identification"),
    (8, "Mode reordering failed"),
];

/// Read-only lookup over the three code spaces.
#[derive(Debug)]
pub struct ErrorCatalog {
    argument: Table,
    warning: Table,
    fatal: Table,
}

static CATALOG: ErrorCatalog = ErrorCatalog::build();

/// The process-wide catalog.
pub fn catalog() -> &'static ErrorCatalog {
    &CATALOG
}

impl ErrorCatalog {
    /// Assemble the three tables. Pure and usable in const context.
    pub const fn build() -> Self {
        Self {
            argument: ARGUMENT_TABLE,
            warning: WARNING_TABLE,
            fatal: FATAL_TABLE,
        }
    }

    pub fn argument(&self, code: u16) -> Option<Diagnostic> {
        lookup(self.argument, DiagnosticKind::Argument, code)
    }

    pub fn warning(&self, code: u16) -> Option<Diagnostic> {
        lookup(self.warning, DiagnosticKind::Warning, code)
    }

    pub fn fatal(&self, code: u16) -> Option<Diagnostic> {
        lookup(self.fatal, DiagnosticKind::Fatal, code)
    }

    /// Number of entries in a code space.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        match kind {
            DiagnosticKind::Argument => self.argument.len(),
            DiagnosticKind::Warning => self.warning.len(),
            DiagnosticKind::Fatal => self.fatal.len(),
        }
    }

    /// Map a primary (extraction) result code onto its fatal entry.
    /// Returns `None` for 0 (success).
    pub fn for_extraction_code(&self, code: u16) -> Option<Diagnostic> {
        let entry = match code {
            0 => return None,
            100 => 1,
            102 | 103 => 2,
            104 => 3,
            105 => 4,
            110 => 5,
            _ => 7,
        };
        self.fatal(entry)
    }

    /// Map a secondary (reordering) result code onto its fatal entry.
    /// Returns `None` for 0 (success).
    pub fn for_reorder_code(&self, code: u16) -> Option<Diagnostic> {
        let entry = match code {
            0 => return None,
            12 => 6,
            101 => 7,
            _ => 8,
        };
        self.fatal(entry)
    }
}

fn lookup(table: Table, kind: DiagnosticKind, code: u16) -> Option<Diagnostic> {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|&(code, message)| Diagnostic {
            kind,
            code,
            message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_have_unique_codes() {
        for table in [ARGUMENT_TABLE, WARNING_TABLE, FATAL_TABLE] {
            let mut codes: Vec<u16> = table.iter().map(|(c, _)| *c).collect();
            codes.sort_unstable();
            codes.dedup();
            assert_eq!(codes.len(), table.len());
        }
    }

    #[test]
    fn test_extraction_code_mapping() {
        let cat = catalog();
        assert!(cat.for_extraction_code(0).is_none());
        assert_eq!(cat.for_extraction_code(100).unwrap().code, 1);
        assert_eq!(cat.for_extraction_code(102).unwrap().code, 2);
        assert_eq!(cat.for_extraction_code(103).unwrap().code, 2);
        assert_eq!(cat.for_extraction_code(104).unwrap().code, 3);
        assert_eq!(cat.for_extraction_code(105).unwrap().code, 4);
        assert_eq!(cat.for_extraction_code(110).unwrap().code, 5);
        assert_eq!(cat.for_extraction_code(101).unwrap().code, 7);
        assert_eq!(cat.for_extraction_code(999).unwrap().code, 7);
    }

    #[test]
    fn test_reorder_code_mapping() {
        let cat = catalog();
        assert!(cat.for_reorder_code(0).is_none());
        assert_eq!(cat.for_reorder_code(12).unwrap().code, 6);
        assert_eq!(cat.for_reorder_code(101).unwrap().code, 7);
        assert_eq!(cat.for_reorder_code(13).unwrap().code, 8);
        assert_eq!(
            cat.for_reorder_code(12).unwrap().kind,
            DiagnosticKind::Fatal
        );
    }

    #[test]
    fn test_unknown_code_is_none() {
        assert!(catalog().warning(0).is_none());
        assert!(catalog().argument(500).is_none());
    }

    #[test]
    fn test_display() {
        let d = catalog().warning(1).unwrap();
        assert_eq!(
            d.to_string(),
            "warning 1: Mode is unstable (positive damping)"
        );
    }
}
