//! WAV reader for the diagnostic tool, built on `hound::WavReader`.
//!
//! Accepts 16-bit integer PCM and 32-bit IEEE float payloads. A `data`
//! chunk that claims more bytes than the file holds is read as far as it
//! goes.

use std::io::{self, Cursor};

use hound::{SampleFormat, WavReader};

use crate::error::WavError;

/// Header metadata from the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormat {
    pub fn encoding_name(&self) -> &'static str {
        match self.sample_format {
            SampleFormat::Float => "Float32",
            SampleFormat::Int => "Int16",
        }
    }
}

/// A decoded container: interleaved samples normalized to [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct WavData {
    pub format: WavFormat,
    pub samples: Vec<f64>,
}

impl WavData {
    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.format.channels as usize
    }
}

fn is_eof(err: &hound::Error) -> bool {
    matches!(err, hound::Error::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

fn map_hound_error(err: hound::Error) -> WavError {
    match err {
        hound::Error::FormatError(msg) if msg.contains("RIFF") => {
            WavError::BadMagic { expected: "RIFF" }
        }
        hound::Error::FormatError(msg) if msg.contains("WAVE") => {
            WavError::BadMagic { expected: "WAVE" }
        }
        hound::Error::FormatError(msg) if msg.starts_with("missing fmt") => {
            WavError::MissingChunk("fmt ")
        }
        hound::Error::FormatError(msg) => WavError::InvalidFormat(msg.to_string()),
        hound::Error::Unsupported => {
            WavError::UnsupportedEncoding("format tag not supported".to_string())
        }
        ref e if is_eof(e) => WavError::Truncated,
        other => WavError::InvalidFormat(other.to_string()),
    }
}

fn collect_samples<S>(
    samples: impl Iterator<Item = hound::Result<S>>,
    to_f64: impl Fn(S) -> f64,
) -> Result<Vec<f64>, WavError> {
    let mut out = Vec::new();
    for sample in samples {
        match sample {
            Ok(v) => out.push(to_f64(v)),
            Err(e) if is_eof(&e) => break,
            Err(e) => return Err(map_hound_error(e)),
        }
    }
    Ok(out)
}

/// Parse a complete WAV file held in memory.
pub fn decode_wav(bytes: &[u8]) -> Result<WavData, WavError> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(map_hound_error)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(WavError::InvalidFormat("zero sample rate".to_string()));
    }

    let format = WavFormat {
        sample_format: spec.sample_format,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
    };
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => {
            collect_samples(reader.samples::<i16>(), |v| v as f64 / 32768.0)?
        }
        (SampleFormat::Float, 32) => collect_samples(reader.samples::<f32>(), |v| v as f64)?,
        (SampleFormat::Int, bits) => {
            return Err(WavError::UnsupportedEncoding(format!("{bits}-bit integer PCM")));
        }
        (SampleFormat::Float, bits) => {
            return Err(WavError::UnsupportedEncoding(format!("{bits}-bit float")));
        }
    };
    Ok(WavData { format, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::renderer::encode_wav;

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn fmt_body(format: u16, channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&format.to_le_bytes());
        b.extend_from_slice(&channels.to_le_bytes());
        b.extend_from_slice(&rate.to_le_bytes());
        b.extend_from_slice(&(rate * channels as u32 * bits as u32 / 8).to_le_bytes());
        b.extend_from_slice(&(channels * bits / 8).to_le_bytes());
        b.extend_from_slice(&bits.to_le_bytes());
        b
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn decodes_pcm16() {
        let bytes = encode_wav(&[0, 16384, -32768, 32767], 48000, 1).unwrap();
        let wav = decode_wav(&bytes).unwrap();
        assert_eq!(wav.format.sample_rate, 48000);
        assert_eq!(wav.format.channels, 1);
        assert_eq!(wav.format.encoding_name(), "Int16");
        assert_eq!(wav.samples, vec![0.0, 0.5, -1.0, 32767.0 / 32768.0]);
    }

    #[test]
    fn decodes_float32_and_skips_unknown_chunks() {
        let data: Vec<u8> = [0.25f32, -0.5, 1.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_body(3, 1, 44100, 32)),
            chunk(b"LIST", b"INFO"),
            chunk(b"data", &data),
        ]);
        let wav = decode_wav(&bytes).unwrap();
        assert_eq!(wav.format.encoding_name(), "Float32");
        assert_eq!(wav.samples, vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn stereo_frame_count() {
        let bytes = encode_wav(&[1, 2, 3, 4, 5, 6], 22050, 2).unwrap();
        let wav = decode_wav(&bytes).unwrap();
        assert_eq!(wav.num_frames(), 3);
    }

    #[test]
    fn rejects_non_riff() {
        let mut bytes = encode_wav(&[0; 4], 8000, 1).unwrap();
        bytes[0..4].copy_from_slice(b"RIFX");
        assert_eq!(decode_wav(&bytes), Err(WavError::BadMagic { expected: "RIFF" }));
    }

    #[test]
    fn rejects_non_wave() {
        let mut bytes = encode_wav(&[0; 4], 8000, 1).unwrap();
        bytes[8..12].copy_from_slice(b"AVI ");
        assert_eq!(decode_wav(&bytes), Err(WavError::BadMagic { expected: "WAVE" }));
    }

    #[test]
    fn missing_fmt_and_data() {
        let only_fmt = riff(&[chunk(b"fmt ", &fmt_body(1, 1, 8000, 16))]);
        assert_eq!(decode_wav(&only_fmt), Err(WavError::Truncated));

        let data_first = riff(&[chunk(b"data", &[0, 0]), chunk(b"fmt ", &fmt_body(1, 1, 8000, 16))]);
        assert_eq!(decode_wav(&data_first), Err(WavError::MissingChunk("fmt ")));

        let empty = riff(&[]);
        assert_eq!(decode_wav(&empty), Err(WavError::Truncated));
    }

    #[test]
    fn unsupported_encodings() {
        let pcm24 = riff(&[chunk(b"fmt ", &fmt_body(1, 1, 8000, 24)), chunk(b"data", &[0; 6])]);
        assert!(matches!(
            decode_wav(&pcm24),
            Err(WavError::UnsupportedEncoding(_))
        ));
        let alaw = riff(&[chunk(b"fmt ", &fmt_body(6, 1, 8000, 8)), chunk(b"data", &[0; 2])]);
        assert!(matches!(
            decode_wav(&alaw),
            Err(WavError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn zero_channels_is_invalid() {
        let bytes = riff(&[chunk(b"fmt ", &fmt_body(1, 0, 8000, 16)), chunk(b"data", &[])]);
        assert!(matches!(decode_wav(&bytes), Err(WavError::InvalidFormat(_))));
    }

    #[test]
    fn truncated_header() {
        assert_eq!(decode_wav(b"RIF"), Err(WavError::Truncated));
        let bytes = encode_wav(&[0; 4], 8000, 1).unwrap();
        assert_eq!(decode_wav(&bytes[..30]), Err(WavError::Truncated));
    }

    #[test]
    fn short_data_chunk_reads_what_is_there() {
        let bytes = encode_wav(&[100, 200, 300, 400], 8000, 1).unwrap();
        let wav = decode_wav(&bytes[..bytes.len() - 3]).unwrap();
        assert_eq!(wav.samples, vec![100.0 / 32768.0, 200.0 / 32768.0]);
    }
}
