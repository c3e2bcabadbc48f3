pub mod config;
pub mod diagnostics;
pub mod dsp;
pub mod error;
pub mod wav;

use crate::config::RenderConfig;
use crate::dsp::renderer::{RenderedAudio, StarterSynth};
use crate::error::StarterError;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the starter_synth version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Validate `config` and render it with a seeded noise source.
pub fn render(config: RenderConfig, seed: u64) -> Result<RenderedAudio, StarterError> {
    let synth = StarterSynth::new(config)?;
    Ok(synth.render_seeded(seed))
}

/// Render straight to an in-memory 16-bit PCM WAV file.
pub fn render_wav(config: RenderConfig, seed: u64) -> Result<Vec<u8>, StarterError> {
    render(config, seed)?.to_wav_bytes()
}

/// Deserialize an optional JS config object; `undefined`/`null` means defaults.
fn config_from_js(config: JsValue) -> Result<RenderConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(RenderConfig::default());
    }
    serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render the starter patch to a WAV byte array.
#[wasm_bindgen]
pub fn render_starter_wav(config: JsValue, seed: u64) -> Result<Vec<u8>, JsValue> {
    let config = config_from_js(config)?;
    render_wav(config, seed).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render the starter patch to mono f32 samples in [-1, 1).
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_starter_samples(config: JsValue, seed: u64) -> Result<Vec<f32>, JsValue> {
    let config = config_from_js(config)?;
    let audio = render(config, seed).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(audio.to_f64().iter().map(|&s| s as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn render_wav_has_riff_header() {
        let config = RenderConfig {
            sample_rate: 8000,
            duration: 0.5,
            ..RenderConfig::default()
        };
        let bytes = render_wav(config, 3).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + 4000 * 2);
    }

    #[test]
    fn render_rejects_invalid_config() {
        let config = RenderConfig {
            sample_rate: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(render(config, 0), Err(StarterError::Config(_))));
    }
}
