//! Envelope state machine — engine RPM and amplitude as functions of time.
//!
//! Stages run in strict order and are never revisited:
//! - **Engage**: solenoid pull-in, RPM held low, soft `sin^0.5` attack
//! - **RampUp**: RPM eases to target along a `progress^1.5` curve
//! - **Steady**: cranking at target RPM
//!
//! Amplitude shaping (global fades, spin-up ramp) is orthogonal to the
//! RPM stage and applied multiplicatively.

use std::f64::consts::FRAC_PI_2;

use crate::config::{FadeConfig, RenderConfig, RpmProfile};

/// Fraction of the ramp-up over which the spin-up amplitude reaches full.
const SPIN_UP_SPAN: f64 = 0.7;
/// Spin-up amplitude at the end of the engage stage.
const SPIN_UP_FLOOR: f64 = 0.3;

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Engage,
    RampUp,
    Steady,
}

/// RPM-side output of the state machine at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeFrame {
    pub stage: Stage,
    /// Engine RPM.
    pub rpm: f64,
    /// Engagement multiplier in [0, 1]; 1.0 outside the engage stage.
    pub engagement: f64,
}

/// Time-driven envelope for one render.
#[derive(Debug, Clone)]
pub struct Envelope {
    rpm: RpmProfile,
    fade: FadeConfig,
    duration: f64,
}

impl Envelope {
    pub fn new(config: &RenderConfig) -> Self {
        Envelope {
            rpm: config.rpm.clone(),
            fade: config.fade.clone(),
            duration: config.duration,
        }
    }

    /// End of the ramp-up stage, in seconds.
    fn rampup_end(&self) -> f64 {
        self.rpm.engage_duration + self.rpm.rampup_duration
    }

    pub fn stage_at(&self, t: f64) -> Stage {
        if t < self.rpm.engage_duration {
            Stage::Engage
        } else if t < self.rampup_end() {
            Stage::RampUp
        } else {
            Stage::Steady
        }
    }

    /// RPM and engagement multiplier at elapsed time `t`.
    pub fn evaluate(&self, t: f64) -> EnvelopeFrame {
        let p = &self.rpm;
        match self.stage_at(t) {
            Stage::Engage => {
                let progress = t / p.engage_duration;
                EnvelopeFrame {
                    stage: Stage::Engage,
                    rpm: p.engage_rpm,
                    engagement: (progress * FRAC_PI_2).sin().sqrt(),
                }
            }
            Stage::RampUp => {
                let progress = (t - p.engage_duration) / p.rampup_duration;
                let eased = progress.powf(1.5);
                EnvelopeFrame {
                    stage: Stage::RampUp,
                    rpm: p.engage_rpm + (p.target_rpm - p.engage_rpm) * eased,
                    engagement: 1.0,
                }
            }
            Stage::Steady => EnvelopeFrame {
                stage: Stage::Steady,
                rpm: p.target_rpm,
                engagement: 1.0,
            },
        }
    }

    /// Linear fade-in / fade-out at the edges of the render, floored at 0.
    pub fn fade_at(&self, t: f64) -> f64 {
        let FadeConfig { fade_in, fade_out } = self.fade;
        if fade_in > 0.0 && t < fade_in {
            t / fade_in
        } else if fade_out > 0.0 && t > self.duration - fade_out {
            ((self.duration - t) / fade_out).max(0.0)
        } else {
            1.0
        }
    }

    /// Spin-up amplitude ramp: 0.3 at the end of engagement rising to 1.0
    /// after 70% of the ramp-up. During engagement the line is extended
    /// backwards, so it starts slightly below 0.3 at t = 0.
    pub fn spin_up_at(&self, t: f64) -> f64 {
        if t < self.rampup_end() {
            let progress = ((t - self.rpm.engage_duration)
                / (self.rpm.rampup_duration * SPIN_UP_SPAN))
                .min(1.0);
            SPIN_UP_FLOOR + (1.0 - SPIN_UP_FLOOR) * progress
        } else {
            1.0
        }
    }

    /// Final amplitude multiplier: fade × engagement × spin-up.
    pub fn amplitude_at(&self, t: f64) -> f64 {
        self.fade_at(t) * self.evaluate(t).engagement * self.spin_up_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> (Envelope, RenderConfig) {
        let config = RenderConfig::default();
        (Envelope::new(&config), config)
    }

    #[test]
    fn stages_in_order() {
        let (env, _) = envelope();
        assert_eq!(env.stage_at(0.0), Stage::Engage);
        assert_eq!(env.stage_at(0.149), Stage::Engage);
        assert_eq!(env.stage_at(0.15), Stage::RampUp);
        assert_eq!(env.stage_at(2.649), Stage::RampUp);
        assert_eq!(env.stage_at(2.65), Stage::Steady);
        assert_eq!(env.stage_at(5.0), Stage::Steady);
    }

    #[test]
    fn engage_holds_low_rpm_with_soft_attack() {
        let (env, config) = envelope();
        let start = env.evaluate(0.0);
        assert_eq!(start.rpm, config.rpm.engage_rpm);
        assert_eq!(start.engagement, 0.0);

        let mid = env.evaluate(0.075);
        let expected = (std::f64::consts::FRAC_PI_4).sin().sqrt();
        assert!((mid.engagement - expected).abs() < 1e-12);
    }

    #[test]
    fn engagement_is_one_at_engage_boundary() {
        let (env, config) = envelope();
        let frame = env.evaluate(config.rpm.engage_duration);
        assert_eq!(frame.engagement, 1.0);
        assert_eq!(frame.rpm, config.rpm.engage_rpm);
    }

    #[test]
    fn rpm_is_exactly_target_at_rampup_end() {
        let (env, config) = envelope();
        let t = config.rpm.engage_duration + config.rpm.rampup_duration;
        let frame = env.evaluate(t);
        assert_eq!(frame.stage, Stage::Steady);
        assert_eq!(frame.rpm, config.rpm.target_rpm);
    }

    #[test]
    fn rampup_follows_power_curve() {
        let (env, config) = envelope();
        let t = config.rpm.engage_duration + 0.5 * config.rpm.rampup_duration;
        let frame = env.evaluate(t);
        let expected = 30.0 + 220.0 * 0.5_f64.powf(1.5);
        assert!((frame.rpm - expected).abs() < 1e-9, "got {}", frame.rpm);
    }

    #[test]
    fn rpm_is_monotonic() {
        let (env, _) = envelope();
        let mut prev = 0.0;
        for i in 0..5500 {
            let rpm = env.evaluate(i as f64 / 1000.0).rpm;
            assert!(rpm >= prev, "RPM decreased at {i} ms");
            prev = rpm;
        }
    }

    #[test]
    fn fades_at_edges() {
        let (env, _) = envelope();
        assert_eq!(env.fade_at(0.0), 0.0);
        assert!((env.fade_at(0.1) - 0.5).abs() < 1e-12);
        assert_eq!(env.fade_at(1.0), 1.0);
        assert!((env.fade_at(5.35) - 0.5).abs() < 1e-9);
        assert_eq!(env.fade_at(5.5), 0.0);
        assert_eq!(env.fade_at(6.0), 0.0);
    }

    #[test]
    fn spin_up_ramp() {
        let (env, config) = envelope();
        assert!((env.spin_up_at(config.rpm.engage_duration) - 0.3).abs() < 1e-12);
        let full = config.rpm.engage_duration + 0.7 * config.rpm.rampup_duration;
        assert!((env.spin_up_at(full) - 1.0).abs() < 1e-12);
        assert_eq!(env.spin_up_at(2.0), 1.0);
        assert_eq!(env.spin_up_at(4.0), 1.0);
        // extended backwards through engagement
        let at_zero = env.spin_up_at(0.0);
        assert!(at_zero < 0.3 && at_zero > 0.2, "got {at_zero}");
    }

    #[test]
    fn amplitude_in_unit_range() {
        let (env, _) = envelope();
        for i in 0..=5500 {
            let a = env.amplitude_at(i as f64 / 1000.0);
            assert!((0.0..=1.0).contains(&a), "amplitude {a} at {i} ms");
        }
    }

    #[test]
    fn zero_length_fades_are_flat() {
        let config = RenderConfig {
            fade: FadeConfig {
                fade_in: 0.0,
                fade_out: 0.0,
            },
            ..RenderConfig::default()
        };
        let env = Envelope::new(&config);
        assert_eq!(env.fade_at(0.0), 1.0);
        assert_eq!(env.fade_at(5.4999), 1.0);
    }
}
