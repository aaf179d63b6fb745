use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_ALPHA;
use crate::error::EwmaError;

/// Exponentially weighted moving average over a stream of samples.
///
/// The first sample seeds the average directly; every later sample is folded
/// in as `alpha * x + (1 - alpha) * value`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Ewma {
    alpha: f64,
    value: f64,
    #[serde(rename = "is_init")]
    initialized: bool,
}

fn alpha_in_range(alpha: f64) -> bool {
    (0.0..=1.0).contains(&alpha)
}

impl Ewma {
    /// Out-of-range alpha (including NaN) is replaced by `DEFAULT_ALPHA`.
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha_in_range(alpha) {
            alpha
        } else {
            DEFAULT_ALPHA
        };
        Self {
            alpha,
            value: 0.0,
            initialized: false,
        }
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        if !self.initialized {
            self.value = sample;
            self.initialized = true;
        } else {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        }
        self.value
    }

    /// Current average, 0 before the first sample.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.initialized = false;
    }

    /// Unlike `new`, an out-of-range alpha is rejected and nothing changes.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), EwmaError> {
        if !alpha_in_range(alpha) {
            return Err(EwmaError::InvalidAlpha(alpha));
        }
        self.alpha = alpha;
        Ok(())
    }

    /// Running trace: one output per input, same side effect as calling
    /// `update` on each sample in order.
    pub fn calculate_batch(&mut self, samples: &[f64]) -> Vec<f64> {
        samples.iter().map(|&x| self.update(x)).collect()
    }
}
