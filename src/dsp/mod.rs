//! DSP core — the fixed-topology starter motor patch.
//!
//! Control curves (envelope, voltage sag, load pulses) are pure functions of
//! elapsed time; the oscillator phases and the noise filter are the only
//! state carried from sample to sample, and both are owned by one render.

pub mod electrical;
pub mod envelope;
pub mod load;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod phase;
pub mod renderer;
