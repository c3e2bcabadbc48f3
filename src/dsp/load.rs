//! Compression-pulse load modulation.
//!
//! Each compression stroke briefly loads the starter and drags the motor
//! speed down. Modeled as a raised-cosine dip repeating at the pulse rate.

use std::f64::consts::TAU;

use crate::config::LoadPulseConfig;

#[derive(Debug, Clone)]
pub struct LoadModulator {
    config: LoadPulseConfig,
}

impl LoadModulator {
    pub fn new(config: &LoadPulseConfig) -> Self {
        LoadModulator {
            config: config.clone(),
        }
    }

    /// Frequency multiplier at time `t`, in `[1 - depth, 1]`.
    /// Always exactly 1.0 when disabled.
    pub fn factor_at(&self, t: f64) -> f64 {
        if !self.config.enabled {
            return 1.0;
        }
        let dip = 0.5 * (1.0 - (TAU * self.config.frequency * t).cos());
        1.0 - self.config.depth * dip
    }
}
