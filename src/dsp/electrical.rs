//! Electrical model — battery voltage sag under starter load.
//!
//! During the sag phase the voltage moves from `initial` toward `min_sag`
//! along `cos(π/2 · t/sag)^1.5`; afterwards it settles at the midpoint of
//! `initial` and `nominal`. The curve shape is part of the sound and must
//! not be simplified to a linear or exponential ramp.

use std::f64::consts::FRAC_PI_2;

use crate::config::VoltageProfile;

#[derive(Debug, Clone)]
pub struct ElectricalModel {
    profile: VoltageProfile,
}

impl ElectricalModel {
    pub fn new(profile: &VoltageProfile) -> Self {
        ElectricalModel {
            profile: profile.clone(),
        }
    }

    /// Supply voltage at elapsed time `t`.
    pub fn voltage_at(&self, t: f64) -> f64 {
        let p = &self.profile;
        if t < p.sag_duration {
            let progress = t / p.sag_duration;
            let recovery = (progress * FRAC_PI_2).cos().powf(1.5);
            p.initial + (p.min_sag - p.initial) * (1.0 - recovery)
        } else {
            p.initial + (p.nominal - p.initial) * 0.5
        }
    }

    /// `voltage / nominal`, roughly 0.85..1.0 for a healthy battery.
    pub fn voltage_factor_at(&self, t: f64) -> f64 {
        self.voltage_at(t) / self.profile.nominal
    }
}

/// Frequency multiplier for a given voltage factor: `0.95 + 0.05·vf`.
pub fn frequency_scale(voltage_factor: f64) -> f64 {
    0.95 + 0.05 * voltage_factor
}

/// Amplitude multiplier for a given voltage factor: `0.92 + 0.08·vf`.
pub fn amplitude_scale(voltage_factor: f64) -> f64 {
    0.92 + 0.08 * voltage_factor
}
