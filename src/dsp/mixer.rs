//! Mixer — blends harmonics with noise, then peak-normalizes and quantizes
//! the finished buffer.

use tracing::warn;

/// Largest magnitude of a signed 16-bit sample.
pub const I16_FULL_SCALE: f64 = 32767.0;

/// Accumulates the per-sample mix for one render.
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Noise fraction in [0, 1]; harmonics get the remainder.
    pub noise_mix: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    /// Prepare an empty buffer with room for `num_samples`.
    pub fn with_capacity(noise_mix: f64, num_samples: usize) -> Self {
        Mixer {
            noise_mix,
            buffer: Vec::with_capacity(num_samples),
        }
    }

    /// `harmonic·(1 − mix) + noise·mix`.
    pub fn blend(&self, harmonic: f64, noise: f64) -> f64 {
        harmonic * (1.0 - self.noise_mix) + noise * self.noise_mix
    }

    /// Blend one sample, scale it by `gain`, and append it.
    pub fn push(&mut self, harmonic: f64, noise: f64, gain: f64) {
        let sample = self.blend(harmonic, noise) * gain;
        self.buffer.push(sample);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Hand over the raw (pre-normalization) buffer.
    pub fn into_buffer(self) -> Vec<f64> {
        self.buffer
    }
}

/// Largest absolute sample value.
pub fn peak(buffer: &[f64]) -> f64 {
    buffer.iter().fold(0.0_f64, |acc, &s| acc.max(s.abs()))
}

/// Scale `buffer` in place so its peak equals `ceiling`.
///
/// Returns the applied gain, or `None` for an all-zero buffer, which is
/// left untouched.
pub fn normalize(buffer: &mut [f64], ceiling: f64) -> Option<f64> {
    let peak = peak(buffer);
    if peak > 0.0 {
        let gain = ceiling / peak;
        for s in buffer.iter_mut() {
            *s = *s / peak * ceiling;
        }
        Some(gain)
    } else {
        warn!("render is silent, skipping normalization");
        None
    }
}

/// Quantize normalized samples to signed 16-bit, truncating toward zero.
pub fn quantize_i16(buffer: &[f64]) -> Vec<i16> {
    buffer
        .iter()
        .map(|&s| (s * I16_FULL_SCALE).clamp(-32768.0, I16_FULL_SCALE) as i16)
        .collect()
}
