//! Colored broadband noise for the mechanical component of the motor.

use rand::Rng;

/// Uniform white noise through a one-pole low-pass:
/// `y[n] = 0.5·x[n] + 0.5·y[n-1]`.
///
/// Generic over the random source so renders can be reproduced from a seed.
#[derive(Debug, Clone)]
pub struct NoiseShaper<R> {
    rng: R,
    /// Previous filtered output.
    state: f64,
}

impl<R: Rng> NoiseShaper<R> {
    pub fn new(rng: R) -> Self {
        NoiseShaper { rng, state: 0.0 }
    }

    /// Draw one white sample in [-1, 1] and return the filtered output.
    pub fn next_sample(&mut self) -> f64 {
        let white: f64 = self.rng.random_range(-1.0..=1.0);
        self.state = 0.5 * white + 0.5 * self.state;
        self.state
    }

    pub fn state(&self) -> f64 {
        self.state
    }
}
