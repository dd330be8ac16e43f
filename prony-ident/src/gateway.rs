//! Loosely typed six-input / four-output call boundary.
//!
//! Inputs, in order: signal matrix, sample period, shift/length matrix,
//! pulse-train matrix, known-mode matrix, control vector. Outputs, in order:
//! model table, control vector (12 × 1), warnings, fatal message (empty on
//! success).

use faer::Mat;

use crate::control::CONTROL_LEN;
use crate::pipeline::Prony;
use crate::types::{ArgumentError, PronyError};
use crate::validate::ProblemInputs;

/// Number of inputs a call takes.
pub const N_INPUTS: usize = 6;
/// Number of outputs a call produces.
pub const N_OUTPUTS: usize = 4;

/// A value crossing the call boundary.
#[derive(Debug, Clone)]
pub enum Value {
    Real(Mat<f64>),
    Complex { re: Mat<f64>, im: Mat<f64> },
    Text(String),
    TextList(Vec<String>),
}

impl Value {
    /// 1 × 1 real value.
    pub fn scalar(v: f64) -> Self {
        Value::Real(Mat::from_fn(1, 1, |_, _| v))
    }

    /// Column vector from a slice.
    pub fn column(values: &[f64]) -> Self {
        Value::Real(Mat::from_fn(values.len(), 1, |i, _| values[i]))
    }

    pub fn as_real(&self) -> Option<&Mat<f64>> {
        match self {
            Value::Real(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Value::TextList(l) => Some(l),
            _ => None,
        }
    }
}

fn real(value: &Value) -> Result<&Mat<f64>, ArgumentError> {
    value.as_real().ok_or(ArgumentError::ComplexArgument)
}

/// Column-major flattening.
fn flatten(m: &Mat<f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(m.nrows() * m.ncols());
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            out.push(m[(i, j)]);
        }
    }
    out
}

fn parse(args: &[Value], n_outputs: usize) -> Result<ProblemInputs, ArgumentError> {
    if args.len() != N_INPUTS {
        return Err(ArgumentError::InputCount);
    }
    if n_outputs != N_OUTPUTS {
        return Err(ArgumentError::OutputCount);
    }

    let signals = match &args[0] {
        Value::Real(m) => m.clone(),
        Value::Complex { .. } => return Err(ArgumentError::ComplexSignal),
        _ => return Err(ArgumentError::ComplexArgument),
    };
    let dt = real(&args[1])?;
    if dt.nrows() != 1 || dt.ncols() != 1 {
        return Err(ArgumentError::SamplePeriodNotScalar);
    }

    Ok(ProblemInputs {
        signals,
        sample_period: dt[(0, 0)],
        windows: real(&args[2])?.clone(),
        pulses: real(&args[3])?.clone(),
        known_modes: real(&args[4])?.clone(),
        control: flatten(real(&args[5])?),
    })
}

/// Run an identification with the default collaborators.
pub fn call(args: &[Value], n_outputs: usize) -> Result<Vec<Value>, PronyError> {
    call_with(&Prony::default(), args, n_outputs)
}

/// Run an identification through `prony`.
pub fn call_with(prony: &Prony, args: &[Value], n_outputs: usize) -> Result<Vec<Value>, PronyError> {
    let inputs = parse(args, n_outputs)?;
    let id = prony.identify(&inputs)?;

    let control = id.control().to_vector();
    let warnings = id
        .warnings()
        .iter()
        .map(|w| w.diagnostic.to_string())
        .collect();
    let fatal = id.fatal().map(|d| d.to_string()).unwrap_or_default();

    Ok(vec![
        Value::Real(id.table()),
        Value::Real(Mat::from_fn(CONTROL_LEN, 1, |i, _| control[i])),
        Value::TextList(warnings),
        Value::Text(fatal),
    ])
}
