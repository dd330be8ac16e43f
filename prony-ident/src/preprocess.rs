use faer::Mat;

use crate::types::SignalWindow;

/// One windowed (and possibly scaled) signal.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSignal {
    pub samples: Vec<f64>,
    pub window: SignalWindow,
    /// Peak magnitude divided out of `samples`; 1.0 when unscaled.
    pub scale: f64,
}

/// The windowed signal set. Each signal owns its own sequence so fit lengths
/// may differ.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSignals {
    pub signals: Vec<PreparedSignal>,
}

impl PreparedSignals {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn fit_lengths(&self) -> Vec<usize> {
        self.signals.iter().map(|s| s.window.length).collect()
    }

    pub fn scale_factors(&self) -> Vec<f64> {
        self.signals.iter().map(|s| s.scale).collect()
    }

    /// Sample slices, one per signal.
    pub fn sequences(&self) -> Vec<&[f64]> {
        self.signals.iter().map(|s| s.samples.as_slice()).collect()
    }

    /// Rectangular working matrix (longest fit length × signals).
    ///
    /// Shorter signals are zero-padded at the bottom. The padding is only a
    /// layout convenience for extractors that need a uniform width and
    /// carries no data.
    pub fn working_matrix(&self) -> Mat<f64> {
        let rows = self.fit_lengths().into_iter().max().unwrap_or(0);
        let mut m = Mat::<f64>::zeros(rows, self.signals.len());
        for (j, s) in self.signals.iter().enumerate() {
            for (i, &v) in s.samples.iter().enumerate() {
                m[(i, j)] = v;
            }
        }
        m
    }
}

/// Cut each column to its window and, if `scaling` is set, divide it by its
/// peak absolute value. All-zero columns keep a unit scale factor.
pub fn prepare_signals(signals: &Mat<f64>, windows: &[SignalWindow], scaling: bool) -> PreparedSignals {
    let prepared = windows
        .iter()
        .enumerate()
        .map(|(j, &window)| {
            let mut samples: Vec<f64> = (window.shift..window.shift + window.length)
                .map(|i| signals[(i, j)])
                .collect();

            let mut scale = 1.0;
            if scaling {
                let peak = samples.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
                if peak > 0.0 {
                    for v in samples.iter_mut() {
                        *v /= peak;
                    }
                    scale = peak;
                }
            }

            PreparedSignal {
                samples,
                window,
                scale,
            }
        })
        .collect();

    PreparedSignals { signals: prepared }
}
