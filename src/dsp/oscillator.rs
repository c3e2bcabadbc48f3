//! Phase-driven oscillators and the fixed three-oscillator bank.

use std::f64::consts::TAU;

use crate::config::{OscillatorBankConfig, OscillatorConfig};

use super::phase::PhaseAccumulator;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// Evaluate the waveform at an (unwrapped) phase in radians.
    pub fn at(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Triangle => triangle(phase),
        }
    }
}

/// Symmetric 50%-duty triangle: -1 at phase 0, +1 at π, back to -1 at 2π.
fn triangle(phase: f64) -> f64 {
    let cycle = (phase / TAU).rem_euclid(1.0);
    if cycle < 0.5 {
        4.0 * cycle - 1.0
    } else {
        3.0 - 4.0 * cycle
    }
}

/// One oscillator: a waveform at a fixed multiple of the motor frequency,
/// with its own phase accumulator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    /// Multiple of the driving frequency.
    pub ratio: f64,
    /// Mix weight.
    pub amplitude: f64,
    phase: PhaseAccumulator,
}

impl Oscillator {
    pub fn new(waveform: Waveform, config: OscillatorConfig, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            ratio: config.ratio,
            amplitude: config.amplitude,
            phase: PhaseAccumulator::new(sample_rate),
        }
    }

    /// Advance one sample at `ratio × frequency` and return the unweighted
    /// waveform value.
    pub fn next_sample(&mut self, frequency: f64) -> f64 {
        let phase = self.phase.advance(frequency * self.ratio);
        self.waveform.at(phase)
    }

    pub fn phase(&self) -> f64 {
        self.phase.phase()
    }

    pub fn reset(&mut self) {
        self.phase.reset();
    }
}

/// Fundamental sine, 2× gear triangle, 0.5× hum sine.
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    pub fundamental: Oscillator,
    pub gear: Oscillator,
    pub hum: Oscillator,
}

impl OscillatorBank {
    pub fn new(config: &OscillatorBankConfig, sample_rate: f64) -> Self {
        OscillatorBank {
            fundamental: Oscillator::new(Waveform::Sine, config.fundamental, sample_rate),
            gear: Oscillator::new(Waveform::Triangle, config.gear, sample_rate),
            hum: Oscillator::new(Waveform::Sine, config.hum, sample_rate),
        }
    }

    /// Advance all three oscillators and return the weighted harmonic sum.
    pub fn next_sample(&mut self, motor_frequency: f64) -> f64 {
        let main = self.fundamental.next_sample(motor_frequency);
        let gear = self.gear.next_sample(motor_frequency);
        let hum = self.hum.next_sample(motor_frequency);
        self.fundamental.amplitude * main + self.gear.amplitude * gear + self.hum.amplitude * hum
    }

    /// Sum of the mix weights (the harmonic headroom below full scale).
    pub fn total_weight(&self) -> f64 {
        self.fundamental.amplitude + self.gear.amplitude + self.hum.amplitude
    }

    pub fn reset(&mut self) {
        self.fundamental.reset();
        self.gear.reset();
        self.hum.reset();
    }
}
