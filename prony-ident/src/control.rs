//! The 12-slot control vector, split into a parsed input record
//! ([`FitControl`]) and a derived output record ([`ControlOutput`]).
//!
//! | slot | meaning |
//! |------|---------|
//! | 0  | additional modes to extract; negative selects automatic counting |
//! | 1  | scaling toggle (non-zero scales each column to unit peak) |
//! | 2  | linear-prediction order (0 = number of modes to extract) |
//! | 3  | pseudo-inverse rank (0 = tolerance-based) |
//! | 4  | prediction method: 1 least squares, 2 total least squares |
//! | 5  | algorithm: 1 truncated-SVD pseudo-inverse, 2 normal equations |
//! | 6  | direction: 1 forward, 2 backward, 3 forward-backward |
//! | 7  | ordering: 1 energy, 2 frequency, 3 damping |
//! | 8  | residue-energy floor (≤ 0 disables) |
//! | 9  | high frequency bound in Hz (≤ 0 disables) |
//! | 10 | low frequency bound in Hz (negative disables) |
//! | 11 | damping cutoff in 1/s (≤ 0 disables) |
//!
//! A selector of 0 picks the default (1).

use serde::{Deserialize, Serialize};

use crate::types::ArgumentError;

/// Number of slots in the control vector.
pub const CONTROL_LEN: usize = 12;

/// Requested number of modes beyond the known ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeCount {
    Fixed(usize),
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpMethod {
    #[default]
    LeastSquares,
    TotalLeastSquares,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpAlgorithm {
    #[default]
    Svd,
    NormalEquations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
    ForwardBackward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOrdering {
    #[default]
    Energy,
    Frequency,
    Damping,
}

/// Linear-prediction settings handed to the mode extractor and echoed back
/// with defaults resolved.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionParams {
    /// None lets the extractor choose.
    pub lp_order: Option<usize>,
    /// None keeps every numerically non-zero singular value.
    pub pinv_rank: Option<usize>,
    pub method: LpMethod,
    pub algorithm: LpAlgorithm,
    pub direction: Direction,
}

/// Trim thresholds applied by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimParams {
    pub residue_floor: Option<f64>,
    /// Hz.
    pub freq_high: Option<f64>,
    /// Hz.
    pub freq_low: Option<f64>,
}

/// Parsed input control record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitControl {
    pub additional_modes: ModeCount,
    pub scaling: bool,
    pub prediction: PredictionParams,
    pub ordering: ModeOrdering,
    pub trim: TrimParams,
    /// 1/s.
    pub damping_cutoff: Option<f64>,
}

impl Default for FitControl {
    fn default() -> Self {
        Self {
            additional_modes: ModeCount::Auto,
            scaling: false,
            prediction: PredictionParams::default(),
            ordering: ModeOrdering::Energy,
            trim: TrimParams {
                residue_floor: None,
                freq_high: None,
                freq_low: None,
            },
            damping_cutoff: None,
        }
    }
}

fn selector(value: f64, max: u8) -> Result<u8, ArgumentError> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > max as f64 {
        return Err(ArgumentError::InvalidSelector);
    }
    Ok(value as u8)
}

fn optional_count(value: f64) -> Result<Option<usize>, ArgumentError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ArgumentError::InvalidSelector);
    }
    let n = value as usize;
    Ok((n > 0).then_some(n))
}

impl FitControl {
    /// Parse a raw control vector.
    pub fn from_slice(raw: &[f64]) -> Result<Self, ArgumentError> {
        if raw.len() != CONTROL_LEN {
            return Err(ArgumentError::ControlLength);
        }
        if raw.iter().any(|v| v.is_nan()) {
            return Err(ArgumentError::NonFiniteInput);
        }

        let additional_modes = if raw[0] < 0.0 {
            ModeCount::Auto
        } else if raw[0].is_finite() {
            ModeCount::Fixed(raw[0] as usize)
        } else {
            return Err(ArgumentError::NonFiniteInput);
        };

        let method = match selector(raw[4], 2)? {
            0 | 1 => LpMethod::LeastSquares,
            _ => LpMethod::TotalLeastSquares,
        };
        let algorithm = match selector(raw[5], 2)? {
            0 | 1 => LpAlgorithm::Svd,
            _ => LpAlgorithm::NormalEquations,
        };
        let direction = match selector(raw[6], 3)? {
            0 | 1 => Direction::Forward,
            2 => Direction::Backward,
            _ => Direction::ForwardBackward,
        };
        let ordering = match selector(raw[7], 3)? {
            0 | 1 => ModeOrdering::Energy,
            2 => ModeOrdering::Frequency,
            _ => ModeOrdering::Damping,
        };

        Ok(Self {
            additional_modes,
            scaling: raw[1] != 0.0,
            prediction: PredictionParams {
                lp_order: optional_count(raw[2])?,
                pinv_rank: optional_count(raw[3])?,
                method,
                algorithm,
                direction,
            },
            ordering,
            trim: TrimParams {
                residue_floor: (raw[8] > 0.0).then_some(raw[8]),
                freq_high: (raw[9] > 0.0).then_some(raw[9]),
                freq_low: (raw[10] >= 0.0).then_some(raw[10]),
            },
            damping_cutoff: (raw[11] > 0.0).then_some(raw[11]),
        })
    }

    /// Encode back into the 12-slot layout.
    pub fn to_vector(&self) -> [f64; CONTROL_LEN] {
        let modes = match self.additional_modes {
            ModeCount::Fixed(n) => n as f64,
            ModeCount::Auto => -1.0,
        };
        encode(
            modes,
            self.scaling,
            &self.prediction,
            self.ordering,
            &self.trim,
            self.damping_cutoff,
        )
    }
}

fn encode(
    modes: f64,
    scaling: bool,
    prediction: &PredictionParams,
    ordering: ModeOrdering,
    trim: &TrimParams,
    damping_cutoff: Option<f64>,
) -> [f64; CONTROL_LEN] {
    [
        modes,
        if scaling { 1.0 } else { 0.0 },
        prediction.lp_order.unwrap_or(0) as f64,
        prediction.pinv_rank.unwrap_or(0) as f64,
        match prediction.method {
            LpMethod::LeastSquares => 1.0,
            LpMethod::TotalLeastSquares => 2.0,
        },
        match prediction.algorithm {
            LpAlgorithm::Svd => 1.0,
            LpAlgorithm::NormalEquations => 2.0,
        },
        match prediction.direction {
            Direction::Forward => 1.0,
            Direction::Backward => 2.0,
            Direction::ForwardBackward => 3.0,
        },
        match ordering {
            ModeOrdering::Energy => 1.0,
            ModeOrdering::Frequency => 2.0,
            ModeOrdering::Damping => 3.0,
        },
        trim.residue_floor.unwrap_or(0.0),
        trim.freq_high.unwrap_or(0.0),
        trim.freq_low.unwrap_or(-1.0),
        damping_cutoff.unwrap_or(-1.0),
    ]
}

/// Derived control record returned next to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlOutput {
    /// Modes actually identified, known modes included.
    pub achieved_modes: usize,
    /// Modes requested, known modes included.
    pub requested_modes: usize,
    /// Prediction settings with the extractor's resolved order and rank.
    pub prediction: PredictionParams,
    pub input: FitControl,
}

impl ControlOutput {
    /// Control vector layout with slot 0 holding the achieved mode count and
    /// slots 2/3 the resolved prediction order and rank.
    pub fn to_vector(&self) -> [f64; CONTROL_LEN] {
        encode(
            self.achieved_modes as f64,
            self.input.scaling,
            &self.prediction,
            self.input.ordering,
            &self.input.trim,
            self.input.damping_cutoff,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> [f64; CONTROL_LEN] {
        [3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0, -1.0]
    }

    #[test]
    fn test_defaults_from_zero_selectors() {
        let c = FitControl::from_slice(&raw()).unwrap();
        assert_eq!(c.additional_modes, ModeCount::Fixed(3));
        assert!(!c.scaling);
        assert_eq!(c.prediction.lp_order, None);
        assert_eq!(c.prediction.pinv_rank, None);
        assert_eq!(c.prediction.method, LpMethod::LeastSquares);
        assert_eq!(c.prediction.direction, Direction::Forward);
        assert_eq!(c.ordering, ModeOrdering::Energy);
        assert_eq!(c.trim.freq_high, None);
        assert_eq!(c.trim.freq_low, None);
        assert_eq!(c.damping_cutoff, None);
    }

    #[test]
    fn test_negative_mode_count_is_auto() {
        let mut r = raw();
        r[0] = -1.0;
        let c = FitControl::from_slice(&r).unwrap();
        assert_eq!(c.additional_modes, ModeCount::Auto);
    }

    #[test]
    fn test_selectors() {
        let mut r = raw();
        r[1] = 1.0;
        r[2] = 12.0;
        r[3] = 6.0;
        r[4] = 2.0;
        r[5] = 2.0;
        r[6] = 3.0;
        r[7] = 2.0;
        r[9] = 5.0;
        r[10] = 0.1;
        r[11] = 4.0;
        let c = FitControl::from_slice(&r).unwrap();
        assert!(c.scaling);
        assert_eq!(c.prediction.lp_order, Some(12));
        assert_eq!(c.prediction.pinv_rank, Some(6));
        assert_eq!(c.prediction.method, LpMethod::TotalLeastSquares);
        assert_eq!(c.prediction.algorithm, LpAlgorithm::NormalEquations);
        assert_eq!(c.prediction.direction, Direction::ForwardBackward);
        assert_eq!(c.ordering, ModeOrdering::Frequency);
        assert_eq!(c.trim.freq_high, Some(5.0));
        assert_eq!(c.trim.freq_low, Some(0.1));
        assert_eq!(c.damping_cutoff, Some(4.0));
        assert_eq!(c.to_vector(), r);
    }

    #[test]
    fn test_out_of_range_selector() {
        let mut r = raw();
        r[6] = 4.0;
        assert_eq!(
            FitControl::from_slice(&r),
            Err(ArgumentError::InvalidSelector)
        );
        r[6] = 1.5;
        assert_eq!(
            FitControl::from_slice(&r),
            Err(ArgumentError::InvalidSelector)
        );
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            FitControl::from_slice(&[0.0; 11]),
            Err(ArgumentError::ControlLength)
        );
    }

    #[test]
    fn test_output_vector_reports_achieved_and_resolved() {
        let input = FitControl::from_slice(&raw()).unwrap();
        let out = ControlOutput {
            achieved_modes: 2,
            requested_modes: 3,
            prediction: PredictionParams {
                lp_order: Some(3),
                pinv_rank: Some(3),
                ..input.prediction
            },
            input,
        };
        let v = out.to_vector();
        assert_eq!(v.len(), CONTROL_LEN);
        assert_eq!(v[0], 2.0);
        assert_eq!(v[2], 3.0);
        assert_eq!(v[3], 3.0);
        assert_eq!(v[7], 1.0);
    }
}
