//! Phase accumulator — integrates instantaneous frequency into phase.
//!
//! Integrating `2π·f·dt` every sample keeps the waveform continuous while
//! `f` sweeps. Recomputing `2π·f·t` from absolute time jumps whenever `f`
//! changes between samples.

use std::f64::consts::TAU;

/// Running phase in radians. Never wrapped; consumers are periodic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseAccumulator {
    phase: f64,
    dt: f64,
}

impl PhaseAccumulator {
    /// Start at phase zero with a fixed time step of `1 / sample_rate`.
    pub fn new(sample_rate: f64) -> Self {
        PhaseAccumulator {
            phase: 0.0,
            dt: 1.0 / sample_rate,
        }
    }

    /// Advance by one sample at `frequency` Hz and return the new phase.
    pub fn advance(&mut self, frequency: f64) -> f64 {
        self.phase += TAU * frequency * self.dt;
        self.phase
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
