//! Starter renderer — runs the full per-sample pipeline over a fixed-length
//! buffer and hands the quantized result to a WAV sink.
//!
//! The time-only part of the pipeline (envelope, voltage, load) lives in
//! `MotorModel::control_at` and can be evaluated at any instant. The render
//! loop is then a sequential scan over the two recurrences: oscillator
//! phases and the noise filter state.

use std::io::Cursor;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::{ConfigError, StarterError};

use super::electrical::{self, ElectricalModel};
use super::envelope::{Envelope, Stage};
use super::load::LoadModulator;
use super::mixer::{self, Mixer};
use super::noise::NoiseShaper;
use super::oscillator::OscillatorBank;

/// Everything the pipeline derives from elapsed time alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlFrame {
    pub time: f64,
    pub stage: Stage,
    /// Engine RPM.
    pub rpm: f64,
    /// Engagement envelope multiplier.
    pub engagement: f64,
    /// Final amplitude multiplier (fade × engagement × spin-up).
    pub amplitude: f64,
    /// Supply voltage in volts.
    pub voltage: f64,
    pub voltage_factor: f64,
    /// Compression-load frequency multiplier (1.0 when disabled).
    pub load: f64,
    /// Fundamental oscillator frequency in Hz.
    pub motor_frequency: f64,
}

/// Time-driven control curves for one configuration.
#[derive(Debug, Clone)]
pub struct MotorModel {
    envelope: Envelope,
    electrical: ElectricalModel,
    load: LoadModulator,
    gear_ratio: f64,
    target_shaft_rpm: f64,
    base_frequency: f64,
}

impl MotorModel {
    pub fn new(config: &RenderConfig) -> Self {
        MotorModel {
            envelope: Envelope::new(config),
            electrical: ElectricalModel::new(&config.voltage),
            load: LoadModulator::new(&config.load),
            gear_ratio: config.motor.gear_ratio,
            target_shaft_rpm: config.motor.target_shaft_rpm,
            base_frequency: config.oscillators.base_frequency,
        }
    }

    /// Evaluate the control curves at elapsed time `t`.
    pub fn control_at(&self, t: f64) -> ControlFrame {
        let env = self.envelope.evaluate(t);
        let amplitude = self.envelope.amplitude_at(t);
        let voltage = self.electrical.voltage_at(t);
        let voltage_factor = self.electrical.voltage_factor_at(t);
        let load = self.load.factor_at(t);

        let shaft_rpm = env.rpm * self.gear_ratio;
        let motor_frequency = (shaft_rpm / self.target_shaft_rpm)
            * self.base_frequency
            * load
            * electrical::frequency_scale(voltage_factor);

        ControlFrame {
            time: t,
            stage: env.stage,
            rpm: env.rpm,
            engagement: env.engagement,
            amplitude,
            voltage,
            voltage_factor,
            load,
            motor_frequency,
        }
    }
}

/// The quantized output of a render, ready for a container writer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Peak magnitude of the raw mix before normalization.
    pub raw_peak: f64,
    /// Normalization gain applied; `None` for a silent render.
    pub gain: Option<f64>,
}

impl RenderedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64 / self.channels as f64
    }

    /// Samples as floats in [-1, 1), decoded the way WAV readers do (`v / 32768`).
    pub fn to_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64 / 32768.0).collect()
    }

    /// Encode as an in-memory 16-bit PCM WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, StarterError> {
        Ok(encode_wav(&self.samples, self.sample_rate, self.channels)?)
    }

    /// Write a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), StarterError> {
        let spec = pcm16_spec(self.sample_rate, self.channels);
        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        for &s in &self.samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        debug!(path = %path.as_ref().display(), samples = self.samples.len(), "wrote WAV");
        Ok(())
    }
}

/// The starter motor patch, bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct StarterSynth {
    config: RenderConfig,
    model: MotorModel,
}

impl StarterSynth {
    /// Validate `config` and prepare a synth. Fails fast on invalid input.
    pub fn new(config: RenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let model = MotorModel::new(&config);
        Ok(StarterSynth { config, model })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn model(&self) -> &MotorModel {
        &self.model
    }

    /// Buffer length: `round(sample_rate × duration)`.
    pub fn total_samples(&self) -> usize {
        self.config.total_samples()
    }

    /// Run the per-sample loop and return the un-normalized mix.
    pub fn render_raw<R: Rng>(&self, rng: R) -> Vec<f64> {
        let sample_rate = self.config.sample_rate as f64;
        let total = self.total_samples();

        let mut bank = OscillatorBank::new(&self.config.oscillators, sample_rate);
        let mut noise = NoiseShaper::new(rng);
        let mut mixer = Mixer::with_capacity(self.config.noise.mix, total);

        for i in 0..total {
            let t = i as f64 / sample_rate;
            let frame = self.model.control_at(t);

            let harmonic = bank.next_sample(frame.motor_frequency);
            let colored = noise.next_sample();
            let gain = electrical::amplitude_scale(frame.voltage_factor) * frame.amplitude;
            mixer.push(harmonic, colored, gain);
        }

        mixer.into_buffer()
    }

    /// Render, normalize to the configured ceiling, and quantize to 16 bits.
    pub fn render_with<R: Rng>(&self, rng: R) -> RenderedAudio {
        let mut buffer = self.render_raw(rng);
        let raw_peak = mixer::peak(&buffer);
        let gain = mixer::normalize(&mut buffer, self.config.output.normalize_ceiling);
        debug!(
            samples = buffer.len(),
            raw_peak,
            gain = gain.unwrap_or(0.0),
            "render complete"
        );

        RenderedAudio {
            samples: mixer::quantize_i16(&buffer),
            sample_rate: self.config.sample_rate,
            channels: 1,
            bits_per_sample: 16,
            raw_peak,
            gain,
        }
    }

    /// Render with a deterministic noise source.
    pub fn render_seeded(&self, seed: u64) -> RenderedAudio {
        self.render_with(Pcg64::seed_from_u64(seed))
    }

    /// Render with an entropy-seeded noise source.
    pub fn render(&self) -> RenderedAudio {
        self.render_with(rand::rng())
    }
}

fn pcm16_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
pub fn encode_wav(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut cursor, pcm16_spec(sample_rate, channels))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
