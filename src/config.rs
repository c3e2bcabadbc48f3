//! Render configuration for the starter motor patch.
//!
//! A `RenderConfig` is built once before rendering and stays read-only for
//! the whole render. Every section has defaults that reproduce the
//! reference 12 V automotive starter (Bosch/Nippondenso class): 250 RPM
//! cranking speed through a 14.4:1 pinion, 580 Hz shaft whine, and a
//! 10.8 V worst-case sag under a 400 A draw.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Largest render whose 16-bit data chunk still fits a RIFF size field.
pub const MAX_SAMPLES: u64 = u32::MAX as u64 / 2;

// ── Sections ────────────────────────────────────────────────

/// Engine-speed progression through the engage / ramp-up / steady stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RpmProfile {
    /// Engine RPM held while the solenoid pulls in.
    pub engage_rpm: f64,
    /// Steady cranking RPM.
    pub target_rpm: f64,
    /// Solenoid engagement time in seconds.
    pub engage_duration: f64,
    /// Time from engagement to target RPM, in seconds.
    pub rampup_duration: f64,
}

impl Default for RpmProfile {
    fn default() -> Self {
        RpmProfile {
            engage_rpm: 30.0,
            target_rpm: 250.0,
            engage_duration: 0.15,
            rampup_duration: 2.5,
        }
    }
}

/// Mapping from engine speed to motor shaft speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MotorConfig {
    /// Motor shaft speed / engine speed.
    pub gear_ratio: f64,
    /// Shaft RPM at which the fundamental sits at `base_frequency`.
    pub target_shaft_rpm: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        MotorConfig {
            gear_ratio: 14.4,
            target_shaft_rpm: 3600.0,
        }
    }
}

/// Frequency ratio and mix weight of one oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorConfig {
    /// Multiple of the motor frequency.
    pub ratio: f64,
    /// Mix weight in the harmonic sum.
    pub amplitude: f64,
}

/// The fixed three-oscillator topology.
///
/// Deserializes through `BankPatch`, so a partial oscillator object keeps
/// that oscillator's own defaults for the fields it leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "BankPatch")]
pub struct OscillatorBankConfig {
    /// Fundamental frequency in Hz at `target_shaft_rpm`.
    pub base_frequency: f64,
    /// Sine at the motor frequency (the whine).
    pub fundamental: OscillatorConfig,
    /// Triangle at twice the motor frequency (gear teeth).
    pub gear: OscillatorConfig,
    /// Sine at half the motor frequency (hum).
    pub hum: OscillatorConfig,
}

impl Default for OscillatorBankConfig {
    fn default() -> Self {
        OscillatorBankConfig {
            base_frequency: 580.0,
            fundamental: OscillatorConfig {
                ratio: 1.0,
                amplitude: 0.35,
            },
            gear: OscillatorConfig {
                ratio: 2.0,
                amplitude: 0.25,
            },
            hum: OscillatorConfig {
                ratio: 0.5,
                amplitude: 0.18,
            },
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct OscillatorPatch {
    ratio: Option<f64>,
    amplitude: Option<f64>,
}

impl OscillatorPatch {
    fn over(self, base: OscillatorConfig) -> OscillatorConfig {
        OscillatorConfig {
            ratio: self.ratio.unwrap_or(base.ratio),
            amplitude: self.amplitude.unwrap_or(base.amplitude),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BankPatch {
    base_frequency: Option<f64>,
    fundamental: OscillatorPatch,
    gear: OscillatorPatch,
    hum: OscillatorPatch,
}

impl From<BankPatch> for OscillatorBankConfig {
    fn from(patch: BankPatch) -> Self {
        let base = OscillatorBankConfig::default();
        OscillatorBankConfig {
            base_frequency: patch.base_frequency.unwrap_or(base.base_frequency),
            fundamental: patch.fundamental.over(base.fundamental),
            gear: patch.gear.over(base.gear),
            hum: patch.hum.over(base.hum),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Fraction of broadband noise in the final mix, in [0, 1].
    pub mix: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig { mix: 0.42 }
    }
}

/// Battery voltage under starter load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoltageProfile {
    pub nominal: f64,
    /// Voltage at t = 0 (cold battery with internal resistance).
    pub initial: f64,
    /// Lowest voltage reached during the sag.
    pub min_sag: f64,
    /// Length of the sag phase in seconds.
    pub sag_duration: f64,
}

impl Default for VoltageProfile {
    fn default() -> Self {
        VoltageProfile {
            nominal: 12.0,
            initial: 11.5,
            min_sag: 10.8,
            sag_duration: 1.0,
        }
    }
}

/// Global linear fades at the edges of the render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FadeConfig {
    pub fade_in: f64,
    pub fade_out: f64,
}

impl Default for FadeConfig {
    fn default() -> Self {
        FadeConfig {
            fade_in: 0.2,
            fade_out: 0.3,
        }
    }
}

/// Periodic RPM dips from engine compression strokes.
///
/// A 4-cylinder cranking at ~250 RPM sees roughly 8 compression pulses per
/// second. Disabled by default so the cranking whine stays clean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadPulseConfig {
    pub enabled: bool,
    /// Pulse rate in Hz.
    pub frequency: f64,
    /// Fractional frequency dip at the bottom of each pulse, in [0, 1].
    pub depth: f64,
}

impl Default for LoadPulseConfig {
    fn default() -> Self {
        LoadPulseConfig {
            enabled: false,
            frequency: 8.0,
            depth: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    /// Peak level after normalization, as a fraction of full scale.
    pub normalize_ceiling: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            normalize_ceiling: 0.85,
        }
    }
}

// ── RenderConfig (top-level) ────────────────────────────────

/// Every tunable parameter of a render, supplied up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Total render length in seconds.
    pub duration: f64,
    pub rpm: RpmProfile,
    pub motor: MotorConfig,
    pub oscillators: OscillatorBankConfig,
    pub noise: NoiseConfig,
    pub voltage: VoltageProfile,
    pub fade: FadeConfig,
    pub load: LoadPulseConfig,
    pub output: OutputConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            sample_rate: 48_000,
            duration: 5.5,
            rpm: RpmProfile::default(),
            motor: MotorConfig::default(),
            oscillators: OscillatorBankConfig::default(),
            noise: NoiseConfig::default(),
            voltage: VoltageProfile::default(),
            fade: FadeConfig::default(),
            load: LoadPulseConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Number of samples a render of this config produces.
    pub fn total_samples(&self) -> usize {
        (self.sample_rate as f64 * self.duration).round() as usize
    }

    /// Check every invariant the render loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sample_rate", self.sample_rate as f64)?;
        positive("duration", self.duration)?;

        non_negative("rpm.engage_rpm", self.rpm.engage_rpm)?;
        non_negative("rpm.target_rpm", self.rpm.target_rpm)?;
        positive("rpm.engage_duration", self.rpm.engage_duration)?;
        positive("rpm.rampup_duration", self.rpm.rampup_duration)?;

        positive("motor.gear_ratio", self.motor.gear_ratio)?;
        positive("motor.target_shaft_rpm", self.motor.target_shaft_rpm)?;

        let bank = &self.oscillators;
        positive("oscillators.base_frequency", bank.base_frequency)?;
        for (name, osc) in [
            ("oscillators.fundamental", &bank.fundamental),
            ("oscillators.gear", &bank.gear),
            ("oscillators.hum", &bank.hum),
        ] {
            positive(name, osc.ratio)?;
            non_negative(name, osc.amplitude)?;
        }

        in_range("noise.mix", self.noise.mix, 0.0, 1.0)?;

        positive("voltage.nominal", self.voltage.nominal)?;
        non_negative("voltage.initial", self.voltage.initial)?;
        non_negative("voltage.min_sag", self.voltage.min_sag)?;
        positive("voltage.sag_duration", self.voltage.sag_duration)?;

        non_negative("fade.fade_in", self.fade.fade_in)?;
        non_negative("fade.fade_out", self.fade.fade_out)?;

        if self.load.enabled {
            positive("load.frequency", self.load.frequency)?;
            in_range("load.depth", self.load.depth, 0.0, 1.0)?;
        }

        positive("output.normalize_ceiling", self.output.normalize_ceiling)?;
        in_range(
            "output.normalize_ceiling",
            self.output.normalize_ceiling,
            0.0,
            1.0,
        )?;

        let samples = (self.sample_rate as f64 * self.duration).round();
        if samples > MAX_SAMPLES as f64 {
            return Err(ConfigError::TooLong {
                samples,
                max: MAX_SAMPLES,
            });
        }
        if self.total_samples() == 0 {
            return Err(ConfigError::EmptyRender {
                sample_rate: self.sample_rate,
                duration: self.duration,
            });
        }

        debug!(
            sample_rate = self.sample_rate,
            duration = self.duration,
            samples = self.total_samples(),
            "render config validated"
        );
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if finite(field, value)? > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if finite(field, value)? >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    let value = finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
