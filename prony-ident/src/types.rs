use serde::{Deserialize, Serialize};

use crate::catalog::{catalog, Diagnostic};

/// Caller-input violations, each backed by an argument entry of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentError {
    InputCount,
    OutputCount,
    ComplexSignal,
    TooManySamples,
    TooManySignals,
    NoSignals,
    SamplePeriodNotScalar,
    InvalidSamplePeriod,
    WindowRows,
    WindowColumns,
    TooManyPulses,
    PulseColumns,
    TooManyKnownModes,
    KnownModeColumns,
    ControlLength,
    FitTooShort,
    WindowOverrun,
    TooManyModes,
    ComplexArgument,
    NonFiniteInput,
    InvalidSelector,
}

impl ArgumentError {
    /// Catalog code.
    pub fn code(self) -> u16 {
        match self {
            ArgumentError::InputCount => 1,
            ArgumentError::OutputCount => 2,
            ArgumentError::ComplexSignal => 3,
            ArgumentError::TooManySamples => 4,
            ArgumentError::TooManySignals => 5,
            ArgumentError::NoSignals => 6,
            ArgumentError::SamplePeriodNotScalar => 7,
            ArgumentError::InvalidSamplePeriod => 8,
            ArgumentError::WindowRows => 9,
            ArgumentError::WindowColumns => 10,
            ArgumentError::TooManyPulses => 11,
            ArgumentError::PulseColumns => 12,
            ArgumentError::TooManyKnownModes => 13,
            ArgumentError::KnownModeColumns => 14,
            ArgumentError::ControlLength => 15,
            ArgumentError::FitTooShort => 16,
            ArgumentError::WindowOverrun => 17,
            ArgumentError::TooManyModes => 18,
            ArgumentError::ComplexArgument => 19,
            ArgumentError::NonFiniteInput => 20,
            ArgumentError::InvalidSelector => 21,
        }
    }

    /// The catalog entry for this error.
    pub fn diagnostic(self) -> Diagnostic {
        // Every variant has a table row; the test below pins that.
        catalog().argument(self.code()).unwrap_or(Diagnostic {
            kind: crate::catalog::DiagnosticKind::Argument,
            code: self.code(),
            message: "invalid argument",
        })
    }

    pub fn message(self) -> &'static str {
        self.diagnostic().message
    }
}

/// Error types for Prony identification.
#[derive(Debug, thiserror::Error)]
pub enum PronyError {
    #[error("{}", .0.message())]
    Argument(ArgumentError),

    #[error("not enough samples: {0}")]
    InsufficientData(String),

    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    #[error("eigendecomposition failed: {0}")]
    EigenFailed(String),

    #[error("linear solve failed: {0}")]
    SolveFailed(String),

    #[error("no modes identified: {0}")]
    NoModes(String),

    #[error("invalid known modes: {0}")]
    InvalidKnownModes(String),

    #[error("numerical error: {0}")]
    NumericalError(String),
}

impl From<ArgumentError> for PronyError {
    fn from(e: ArgumentError) -> Self {
        PronyError::Argument(e)
    }
}

impl PronyError {
    /// The argument error, if this is one.
    pub fn argument(&self) -> Option<ArgumentError> {
        match self {
            PronyError::Argument(a) => Some(*a),
            _ => None,
        }
    }

    /// Primary result code reported by the linear-prediction extractor.
    pub fn extraction_code(&self) -> u16 {
        match self {
            PronyError::InsufficientData(_) => 100,
            PronyError::SvdFailed(_) => 102,
            PronyError::EigenFailed(_) => 103,
            PronyError::NoModes(_) => 104,
            PronyError::SolveFailed(_) => 105,
            PronyError::InvalidKnownModes(_) => 110,
            PronyError::Argument(_) | PronyError::NumericalError(_) => 106,
        }
    }
}

/// Size limits and tolerance floors shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of samples (rows) per signal matrix.
    pub max_samples: usize,
    /// Maximum number of signal columns.
    pub max_signals: usize,
    /// Maximum number of pulse-train breakpoints.
    pub max_pulses: usize,
    /// Maximum total mode count, known modes included.
    pub max_modes: usize,
    /// Minimum fit length in samples.
    pub min_fit_length: usize,
    /// Relative decay over the fit window beyond which a mode is unusable.
    pub stability_floor: f64,
    /// Fraction of the Nyquist frequency above which a mode is flagged.
    pub nyquist_warning_fraction: f64,
    /// z-plane distance under which two poles are considered unresolved.
    pub pole_separation: f64,
    /// Amplitude, relative to the largest one, treated as negligible.
    pub negligible_amplitude: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_samples: 8192,
            max_signals: 20,
            max_pulses: 10,
            max_modes: 128,
            min_fit_length: 3,
            stability_floor: 1e-8,
            nyquist_warning_fraction: 0.9,
            pole_separation: 1e-6,
            negligible_amplitude: 1e-8,
        }
    }
}

/// A pole held fixed during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnownMode {
    pub damping: f64,
    pub frequency: f64,
}

/// One breakpoint of a piecewise-constant excitation: the input holds
/// `amplitude` from `delay` (seconds) until the next breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub delay: f64,
    pub amplitude: f64,
}

/// Window of one signal column, after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalWindow {
    /// First sample of the fit window.
    pub shift: usize,
    /// Number of samples in the fit window.
    pub length: usize,
}

/// One identified mode of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Mode {
    /// Real part of the pole (1/s). Negative for decaying modes.
    pub damping: f64,
    /// Imaginary part of the pole (rad/s).
    pub frequency: f64,
    pub amplitude: f64,
    /// Phase in (−π, π].
    pub phase: f64,
    pub residue_re: f64,
    pub residue_im: f64,
    pub relative_energy: f64,
    /// AFPE-style fit quality after this many ranked modes.
    pub fit_quality: f64,
}

impl Mode {
    /// Number of parameter columns per signal in the model table.
    pub const COLUMNS: usize = 8;

    /// The eight table columns in order.
    pub fn to_row(&self) -> [f64; Self::COLUMNS] {
        [
            self.damping,
            self.frequency,
            self.amplitude,
            self.phase,
            self.residue_re,
            self.residue_im,
            self.relative_energy,
            self.fit_quality,
        ]
    }

    /// The Laplace-domain pole σ + jω.
    pub fn pole(&self) -> C64 {
        C64::new(self.damping, self.frequency)
    }

    /// The residue as a complex number.
    pub fn residue(&self) -> C64 {
        C64::new(self.residue_re, self.residue_im)
    }
}

/// Complex number type (re, im).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct C64 {
    pub re: f64,
    pub im: f64,
}

impl C64 {
    /// Create a new complex number.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// r e^{iθ}.
    pub fn from_polar(r: f64, theta: f64) -> Self {
        Self {
            re: r * theta.cos(),
            im: r * theta.sin(),
        }
    }

    /// Magnitude |z| = sqrt(re² + im²).
    pub fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude re² + im².
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Phase angle atan2(im, re).
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Complex conjugate (re, -im).
    pub fn conj(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    /// e^z.
    pub fn exp(&self) -> Self {
        Self::from_polar(self.re.exp(), self.im)
    }

    /// Principal logarithm ln|z| + i arg z.
    pub fn ln(&self) -> Self {
        Self {
            re: self.norm().ln(),
            im: self.arg(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    /// The zero complex number (0 + 0i).
    pub fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }

    pub fn one() -> Self {
        Self { re: 1.0, im: 0.0 }
    }
}

impl std::ops::Add for C64 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl std::ops::AddAssign for C64 {
    fn add_assign(&mut self, rhs: Self) {
        self.re += rhs.re;
        self.im += rhs.im;
    }
}

impl std::ops::Sub for C64 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl std::ops::Neg for C64 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            re: -self.re,
            im: -self.im,
        }
    }
}

impl std::ops::Mul for C64 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl std::ops::Mul<f64> for C64 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            re: self.re * rhs,
            im: self.im * rhs,
        }
    }
}

impl std::ops::Div for C64 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.norm_sqr();
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

impl std::ops::Div<f64> for C64 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self {
            re: self.re / rhs,
            im: self.im / rhs,
        }
    }
}
