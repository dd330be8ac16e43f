//! Mode reordering and energy ranking.

use crate::control::ModeOrdering;

/// Every mode was removed by the cutoffs.
pub const ALL_MODES_TRIMMED: u16 = 12;
/// A mode energy could not be evaluated.
pub const NON_FINITE_ENERGY: u16 = 13;
/// The request tables are inconsistent.
pub const INVALID_REQUEST: u16 = 101;

/// Inputs for one signal.
#[derive(Debug, Clone)]
pub struct ReorderRequest<'a> {
    /// Window-relative sample times.
    pub time: &'a [f64],
    pub fit_length: usize,
    pub total_modes: usize,
    pub amplitude: &'a [f64],
    pub damping: &'a [f64],
    pub frequency: &'a [f64],
    pub phase: &'a [f64],
    /// Modes with |damping| above this are removed.
    pub damping_cutoff: Option<f64>,
    /// Modes with |frequency| (rad/s) above this are removed.
    pub frequency_cutoff: Option<f64>,
    /// Modes damped below this bound are removed.
    pub stability_bound: f64,
    /// Weight of relative energy in the ranking score.
    pub alpha: f64,
    /// Weight of relative amplitude in the ranking score.
    pub beta: f64,
    pub ordering: ModeOrdering,
}

/// Reordered mode parameters plus ranking metrics. `code == 0` means success.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReorderOutcome {
    pub amplitude: Vec<f64>,
    pub damping: Vec<f64>,
    pub frequency: Vec<f64>,
    pub phase: Vec<f64>,
    pub fit_quality: Vec<f64>,
    pub relative_energy: Vec<f64>,
    /// Index of each output mode in the request tables.
    pub source: Vec<usize>,
    pub code: u16,
}

impl ReorderOutcome {
    pub fn failed(code: u16) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Mode-reordering collaborator.
pub trait ModeReorderer: Send + Sync {
    fn reorder(&self, request: &ReorderRequest<'_>) -> ReorderOutcome;
}

/// Ranks modes by their energy over the fit window.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyReorderer;

impl ModeReorderer for EnergyReorderer {
    fn reorder(&self, req: &ReorderRequest<'_>) -> ReorderOutcome {
        let n = req.amplitude.len();
        if req.total_modes == 0
            || req.fit_length == 0
            || req.time.len() != req.fit_length
            || req.damping.len() != n
            || req.frequency.len() != n
            || req.phase.len() != n
        {
            return ReorderOutcome::failed(INVALID_REQUEST);
        }

        let kept: Vec<usize> = (0..n)
            .filter(|&i| {
                let d = req.damping[i];
                let w = req.frequency[i];
                (req.stability_bound >= 0.0 || d >= req.stability_bound)
                    && req.damping_cutoff.is_none_or(|c| d.abs() <= c)
                    && req.frequency_cutoff.is_none_or(|c| w.abs() <= c)
            })
            .collect();
        if kept.is_empty() {
            return ReorderOutcome::failed(ALL_MODES_TRIMMED);
        }

        let energy: Vec<f64> = kept
            .iter()
            .map(|&i| {
                let half = req.amplitude[i] / 2.0;
                let decay: f64 = req
                    .time
                    .iter()
                    .map(|t| (2.0 * req.damping[i] * t).exp())
                    .sum();
                half * half * decay
            })
            .collect();
        if energy.iter().any(|e| !e.is_finite()) {
            return ReorderOutcome::failed(NON_FINITE_ENERGY);
        }

        let total: f64 = energy.iter().sum();
        let relative: Vec<f64> = energy
            .iter()
            .map(|e| if total > 0.0 { e / total } else { 0.0 })
            .collect();
        let peak = kept
            .iter()
            .map(|&i| req.amplitude[i].abs())
            .fold(0.0_f64, f64::max);
        let score: Vec<f64> = kept
            .iter()
            .zip(&relative)
            .map(|(&i, r)| {
                let amp = if peak > 0.0 {
                    req.amplitude[i].abs() / peak
                } else {
                    0.0
                };
                req.alpha * r + req.beta * amp
            })
            .collect();

        let mut rank: Vec<usize> = (0..kept.len()).collect();
        match req.ordering {
            ModeOrdering::Energy => rank.sort_by(|&a, &b| score[b].total_cmp(&score[a])),
            ModeOrdering::Frequency => rank.sort_by(|&a, &b| {
                let (fa, fb) = (req.frequency[kept[a]], req.frequency[kept[b]]);
                fa.abs()
                    .total_cmp(&fb.abs())
                    .then(fb.total_cmp(&fa))
                    .then(score[b].total_cmp(&score[a]))
            }),
            ModeOrdering::Damping => rank.sort_by(|&a, &b| {
                let (da, db) = (req.damping[kept[a]], req.damping[kept[b]]);
                da.abs()
                    .total_cmp(&db.abs())
                    .then(score[b].total_cmp(&score[a]))
            }),
        }
        rank.truncate(req.total_modes);

        let n_fit = req.fit_length as f64;
        let mut captured = 0.0;
        let mut out = ReorderOutcome::default();
        for (m, &r) in rank.iter().enumerate() {
            let i = kept[r];
            captured += relative[r];
            let order = (m + 1) as f64;
            let residual = (1.0 - captured).max(0.0);
            let fpe = residual * (n_fit + order) / (n_fit - order).max(1.0);

            out.amplitude.push(req.amplitude[i]);
            out.damping.push(req.damping[i]);
            out.frequency.push(req.frequency[i]);
            out.phase.push(req.phase[i]);
            out.relative_energy.push(relative[r]);
            out.fit_quality.push(fpe);
            out.source.push(i);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    struct Fixture {
        time: Vec<f64>,
        amplitude: Vec<f64>,
        damping: Vec<f64>,
        frequency: Vec<f64>,
        phase: Vec<f64>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                time: (0..100).map(|k| k as f64 * 0.05).collect(),
                amplitude: vec![0.2, 1.0, 0.5],
                damping: vec![-0.1, -0.5, -2.0],
                frequency: vec![3.0, 1.0, 0.0],
                phase: vec![0.1, 0.2, 0.3],
            }
        }

        fn request(&self, ordering: ModeOrdering) -> ReorderRequest<'_> {
            ReorderRequest {
                time: &self.time,
                fit_length: self.time.len(),
                total_modes: 3,
                amplitude: &self.amplitude,
                damping: &self.damping,
                frequency: &self.frequency,
                phase: &self.phase,
                damping_cutoff: None,
                frequency_cutoff: None,
                stability_bound: (1e-8_f64).ln() / (0.05 * 99.0),
                alpha: 1.0,
                beta: 0.0,
                ordering,
            }
        }
    }

    #[test]
    fn test_energy_ordering() {
        let f = Fixture::new();
        let out = EnergyReorderer.reorder(&f.request(ModeOrdering::Energy));
        assert_eq!(out.code, 0);
        assert_eq!(out.source, vec![1, 0, 2]);
        assert_eq!(out.phase, vec![0.2, 0.1, 0.3]);
        let sum: f64 = out.relative_energy.iter().sum();
        assert_near(sum, 1.0, 1e-12);
        assert!(out.relative_energy[0] >= out.relative_energy[1]);
        // all energy captured by the last mode
        assert_near(*out.fit_quality.last().unwrap(), 0.0, 1e-12);
        assert!(out.fit_quality[0] > out.fit_quality[1]);
    }

    #[test]
    fn test_frequency_and_damping_ordering() {
        let f = Fixture::new();
        let out = EnergyReorderer.reorder(&f.request(ModeOrdering::Frequency));
        assert_eq!(out.source, vec![2, 1, 0]);
        let out = EnergyReorderer.reorder(&f.request(ModeOrdering::Damping));
        assert_eq!(out.source, vec![0, 1, 2]);
    }

    #[test]
    fn test_truncates_to_total_modes() {
        let f = Fixture::new();
        let mut req = f.request(ModeOrdering::Energy);
        req.total_modes = 2;
        let out = EnergyReorderer.reorder(&req);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_cutoffs() {
        let f = Fixture::new();
        let mut req = f.request(ModeOrdering::Energy);
        req.damping_cutoff = Some(1.0);
        req.frequency_cutoff = Some(2.0);
        let out = EnergyReorderer.reorder(&req);
        assert_eq!(out.source, vec![1]);
        assert_near(out.relative_energy[0], 1.0, 1e-12);
    }

    #[test]
    fn test_stability_bound_removes_overdamped() {
        let f = Fixture::new();
        let mut req = f.request(ModeOrdering::Energy);
        req.stability_bound = -1.0;
        let out = EnergyReorderer.reorder(&req);
        assert!(!out.source.contains(&2));
    }

    #[test]
    fn test_all_trimmed() {
        let f = Fixture::new();
        let mut req = f.request(ModeOrdering::Energy);
        req.frequency_cutoff = Some(-0.5);
        let out = EnergyReorderer.reorder(&req);
        assert_eq!(out.code, ALL_MODES_TRIMMED);
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_request() {
        let f = Fixture::new();
        let mut req = f.request(ModeOrdering::Energy);
        req.phase = &f.phase[..2];
        assert_eq!(EnergyReorderer.reorder(&req).code, INVALID_REQUEST);
        let mut req = f.request(ModeOrdering::Energy);
        req.total_modes = 0;
        assert_eq!(EnergyReorderer.reorder(&req).code, INVALID_REQUEST);
    }

    #[test]
    fn test_beta_weights_amplitude() {
        let f = Fixture::new();
        let mut req = f.request(ModeOrdering::Energy);
        req.alpha = 0.0;
        req.beta = 1.0;
        let out = EnergyReorderer.reorder(&req);
        assert_eq!(out.source, vec![1, 2, 0]);
    }
}
