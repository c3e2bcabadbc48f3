//! Crackle diagnostics — discontinuity, gap, and energy analysis of a
//! finished render.
//!
//! Treats the renderer as a black box: only the sample sequence and the
//! sample rate are needed. Multi-channel input is analysed on its first
//! channel. Every statistic degrades to "no data" on short input instead
//! of failing.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::StarterError;
use crate::wav::{self, WavData};

/// Magnitude below which a sample counts as silent.
pub const SILENCE_THRESHOLD: f64 = 0.001;
/// Shortest silent run that is reported as a gap.
pub const MIN_GAP_SAMPLES: usize = 10;
/// Magnitude treated as clipping.
pub const CLIP_THRESHOLD: f64 = 0.95;
/// Number of 20× jumps kept for the report.
const JUMP_REPORT_LIMIT: usize = 20;

/// Which part of the input to analyse.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalysisOptions {
    /// Seconds ignored at the start (warm-up, fade-in).
    pub skip_seconds: f64,
    /// Seconds ignored at the end (fade-out).
    pub trim_seconds: f64,
}

/// One sample-to-sample jump above the 20× threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jump {
    pub frame: usize,
    pub delta: f64,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaStats {
    pub mean: f64,
    pub max: f64,
    /// Frame of the largest delta.
    pub max_frame: usize,
    pub jumps_10x: usize,
    pub jumps_20x: usize,
    pub jumps_50x: usize,
    /// The first few jumps above 20× the mean.
    pub first_jumps: Vec<Jump>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilentGap {
    pub frame: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyWindow {
    pub frame: usize,
    pub rms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyStats {
    /// Window length in frames (`sample_rate / 60`).
    pub window: usize,
    pub mean_rms: f64,
    pub min_rms: f64,
    pub max_rms: f64,
    /// Windows below 20% of the mean.
    pub low: Vec<EnergyWindow>,
    /// Windows above 300% of the mean.
    pub high: Vec<EnergyWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeStats {
    pub peak: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
    pub dbfs: f64,
    /// More than 1% of samples above `CLIP_THRESHOLD`.
    pub clipping: bool,
}

/// A verdict-relevant finding.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// Jumps larger than 20× the mean delta.
    Discontinuities(usize),
    SilentGaps(usize),
    /// Percentage of exact zeros, when above 1%.
    ExcessZeros(f64),
    LowEnergy(usize),
    HighEnergy(usize),
    Clipping,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Discontinuities(n) => {
                write!(f, "CRACKLE: {n} amplitude discontinuities > 20x average")
            }
            Issue::SilentGaps(n) => write!(f, "CRACKLE: {n} silent gaps detected"),
            Issue::ExcessZeros(pct) => {
                write!(f, "WARNING: {pct:.1}% exact zeros (possible underruns)")
            }
            Issue::LowEnergy(n) => {
                write!(f, "WARNING: {n} low-energy windows (possible dropouts)")
            }
            Issue::HighEnergy(n) => write!(f, "WARNING: {n} high-energy windows (spikes)"),
            Issue::Clipping => write!(f, "WARNING: more than 1% of samples clipping"),
        }
    }
}

/// Full result of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticReport {
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: usize,
    /// First frame included in the analysis.
    pub skip_frames: usize,
    pub analyzed_frames: usize,
    /// First frame above the silence threshold, if any.
    pub first_audio_frame: Option<usize>,
    pub deltas: Option<DeltaStats>,
    pub gaps: Vec<SilentGap>,
    pub energy: Option<EnergyStats>,
    pub exact_zeros: usize,
    pub zero_percent: f64,
    pub amplitude: Option<AmplitudeStats>,
    pub issues: Vec<Issue>,
}

impl DiagnosticReport {
    /// No crackle or warning indicator fired.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Count of silent gaps of at least `MIN_GAP_SAMPLES`.
    pub fn gap_count(&self) -> usize {
        self.gaps.len()
    }

    pub fn jumps_20x(&self) -> usize {
        self.deltas.as_ref().map_or(0, |d| d.jumps_20x)
    }
}

/// Analyse interleaved normalized samples.
pub fn analyze(
    samples: &[f64],
    sample_rate: u32,
    channels: u16,
    options: &AnalysisOptions,
) -> DiagnosticReport {
    let ch = channels.max(1) as usize;
    let total_frames = samples.len() / ch;
    let sr = sample_rate as f64;
    let skip_frames = ((options.skip_seconds.max(0.0) * sr) as usize).min(total_frames);
    let trim_frames = (options.trim_seconds.max(0.0) * sr) as usize;
    let end = total_frames.saturating_sub(trim_frames).max(skip_frames);

    let left: Vec<f64> = (skip_frames..end).map(|i| samples[i * ch]).collect();

    let mut report = DiagnosticReport {
        sample_rate,
        channels,
        total_frames,
        skip_frames,
        analyzed_frames: left.len(),
        first_audio_frame: None,
        deltas: None,
        gaps: Vec::new(),
        energy: None,
        exact_zeros: 0,
        zero_percent: 0.0,
        amplitude: None,
        issues: Vec::new(),
    };

    if left.len() < 2 {
        debug!(frames = left.len(), "not enough samples to analyze");
        return report;
    }

    let first_audio = left.iter().position(|s| s.abs() > SILENCE_THRESHOLD);
    report.first_audio_frame = first_audio.map(|i| i + skip_frames);
    let start = first_audio.unwrap_or(0);
    let audible = &left[start..];

    report.deltas = delta_stats(&left, skip_frames);
    report.gaps = silent_gaps(&left, start, skip_frames);
    report.energy = energy_stats(&left, start, skip_frames, sample_rate as usize / 60);

    report.exact_zeros = audible.iter().filter(|&&s| s == 0.0).count();
    if !audible.is_empty() {
        report.zero_percent = report.exact_zeros as f64 / audible.len() as f64 * 100.0;
    }
    report.amplitude = amplitude_stats(audible);

    report.issues = collect_issues(&report);
    debug!(
        frames = report.analyzed_frames,
        issues = report.issues.len(),
        "diagnostics complete"
    );
    report
}

/// Analyse a decoded WAV container.
pub fn analyze_wav(data: &WavData, options: &AnalysisOptions) -> DiagnosticReport {
    analyze(
        &data.samples,
        data.format.sample_rate,
        data.format.channels,
        options,
    )
}

/// Read, parse, and analyse a WAV file. A missing file is reported as an
/// I/O error before any parsing happens.
pub fn analyze_wav_file(
    path: impl AsRef<Path>,
    options: &AnalysisOptions,
) -> Result<DiagnosticReport, StarterError> {
    let bytes = std::fs::read(path.as_ref())?;
    let data = wav::decode_wav(&bytes)?;
    Ok(analyze_wav(&data, options))
}

fn delta_stats(left: &[f64], offset: usize) -> Option<DeltaStats> {
    let deltas: Vec<f64> = left.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    if deltas.is_empty() {
        return None;
    }

    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let (max_idx, max) = deltas
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, d)| if d > best.1 { (i, d) } else { best });

    let count_above = |k: f64| deltas.iter().filter(|&&d| d > mean * k).count();
    let first_jumps = deltas
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d > mean * 20.0)
        .take(JUMP_REPORT_LIMIT)
        .map(|(i, &delta)| Jump {
            frame: i + 1 + offset,
            delta,
            before: left[i],
            after: left[i + 1],
        })
        .collect();

    Some(DeltaStats {
        mean,
        max,
        max_frame: max_idx + 1 + offset,
        jumps_10x: count_above(10.0),
        jumps_20x: count_above(20.0),
        jumps_50x: count_above(50.0),
        first_jumps,
    })
}

/// Silent runs that start after the first audible sample and end before
/// the buffer does.
fn silent_gaps(left: &[f64], start: usize, offset: usize) -> Vec<SilentGap> {
    let mut gaps = Vec::new();
    let mut silence_start: Option<usize> = None;

    for (i, s) in left.iter().enumerate().skip(start) {
        if s.abs() < SILENCE_THRESHOLD {
            silence_start.get_or_insert(i);
        } else if let Some(begin) = silence_start.take() {
            let length = i - begin;
            if length >= MIN_GAP_SAMPLES {
                gaps.push(SilentGap {
                    frame: begin + offset,
                    length,
                });
            }
        }
    }
    gaps
}

fn energy_stats(left: &[f64], start: usize, offset: usize, window: usize) -> Option<EnergyStats> {
    if window == 0 || left.len() <= window {
        return None;
    }

    let windows: Vec<EnergyWindow> = (start..left.len() - window)
        .step_by(window)
        .map(|i| {
            let chunk = &left[i..i + window];
            let rms = (chunk.iter().map(|s| s * s).sum::<f64>() / window as f64).sqrt();
            EnergyWindow {
                frame: i + offset,
                rms,
            }
        })
        .collect();
    if windows.is_empty() {
        return None;
    }

    let mean_rms = windows.iter().map(|w| w.rms).sum::<f64>() / windows.len() as f64;
    let min_rms = windows.iter().map(|w| w.rms).fold(f64::INFINITY, f64::min);
    let max_rms = windows.iter().map(|w| w.rms).fold(0.0, f64::max);
    let low = windows
        .iter()
        .filter(|w| w.rms < mean_rms * 0.2 && mean_rms > 0.01)
        .copied()
        .collect();
    let high = windows
        .iter()
        .filter(|w| w.rms > mean_rms * 3.0)
        .copied()
        .collect();

    Some(EnergyStats {
        window,
        mean_rms,
        min_rms,
        max_rms,
        low,
        high,
    })
}

fn amplitude_stats(audible: &[f64]) -> Option<AmplitudeStats> {
    if audible.is_empty() {
        return None;
    }
    let peak = audible.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
    let min = audible.iter().copied().fold(f64::INFINITY, f64::min);
    let max = audible.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rms = (audible.iter().map(|s| s * s).sum::<f64>() / audible.len() as f64).sqrt();
    let clipped = audible.iter().filter(|s| s.abs() > CLIP_THRESHOLD).count();

    Some(AmplitudeStats {
        peak,
        min,
        max,
        rms,
        dbfs: to_dbfs(rms),
        clipping: clipped as f64 > audible.len() as f64 * 0.01,
    })
}

/// RMS level in dBFS, floored at -100 dB.
pub fn to_dbfs(rms: f64) -> f64 {
    if rms < 1e-10 {
        -100.0
    } else {
        20.0 * rms.log10()
    }
}

fn collect_issues(report: &DiagnosticReport) -> Vec<Issue> {
    let mut issues = Vec::new();
    let jumps = report.jumps_20x();
    if jumps > 0 {
        issues.push(Issue::Discontinuities(jumps));
    }
    if !report.gaps.is_empty() {
        issues.push(Issue::SilentGaps(report.gaps.len()));
    }
    if report.zero_percent > 1.0 {
        issues.push(Issue::ExcessZeros(report.zero_percent));
    }
    if let Some(energy) = &report.energy {
        if !energy.low.is_empty() {
            issues.push(Issue::LowEnergy(energy.low.len()));
        }
        if !energy.high.is_empty() {
            issues.push(Issue::HighEnergy(energy.high.len()));
        }
    }
    if report.amplitude.is_some_and(|a| a.clipping) {
        issues.push(Issue::Clipping);
    }
    issues
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sr = self.sample_rate as f64;
        let secs = |frame: usize| frame as f64 / sr;

        writeln!(f, "=== WAV Analysis ===")?;
        writeln!(f, "Sample Rate: {} Hz", self.sample_rate)?;
        writeln!(f, "Channels: {}", self.channels)?;
        writeln!(
            f,
            "Total Frames: {} ({:.2} seconds)",
            self.total_frames,
            secs(self.total_frames)
        )?;
        writeln!(f, "Analyzed Frames: {} (from frame {})", self.analyzed_frames, self.skip_frames)?;

        let Some(deltas) = &self.deltas else {
            return writeln!(f, "\nNo data: not enough samples to analyze");
        };

        writeln!(f, "\n--- Amplitude Discontinuities ---")?;
        writeln!(f, "  Average sample delta: {:.6}", deltas.mean)?;
        writeln!(
            f,
            "  Max sample delta:     {:.6} at frame {} ({:.4}s)",
            deltas.max,
            deltas.max_frame,
            secs(deltas.max_frame)
        )?;
        writeln!(f, "  Jumps > 10x avg: {}", deltas.jumps_10x)?;
        writeln!(f, "  Jumps > 20x avg: {}", deltas.jumps_20x)?;
        writeln!(f, "  Jumps > 50x avg: {}", deltas.jumps_50x)?;
        for jump in &deltas.first_jumps {
            writeln!(
                f,
                "    Frame {} ({:.4}s): delta={:.6}, before={:.6}, after={:.6}",
                jump.frame,
                secs(jump.frame),
                jump.delta,
                jump.before,
                jump.after
            )?;
        }

        writeln!(f, "\n--- Silent Gaps ---")?;
        match self.first_audio_frame {
            Some(frame) => writeln!(f, "  First non-silent frame: {} ({:.4}s)", frame, secs(frame))?,
            None => writeln!(f, "  No non-silent frames")?,
        }
        writeln!(f, "  Silent gaps (>= {MIN_GAP_SAMPLES} samples): {}", self.gaps.len())?;
        for gap in self.gaps.iter().take(10) {
            writeln!(
                f,
                "    Frame {} ({:.4}s): {} samples ({:.2}ms)",
                gap.frame,
                secs(gap.frame),
                gap.length,
                secs(gap.length) * 1000.0
            )?;
        }

        writeln!(f, "\n--- RMS Energy ---")?;
        match &self.energy {
            Some(energy) => {
                writeln!(f, "  Window: {} frames", energy.window)?;
                writeln!(f, "  Average RMS: {:.6}", energy.mean_rms)?;
                writeln!(f, "  Min RMS: {:.6}", energy.min_rms)?;
                writeln!(f, "  Max RMS: {:.6}", energy.max_rms)?;
                writeln!(f, "  Low energy windows (< 20% avg): {}", energy.low.len())?;
                writeln!(f, "  High energy windows (> 3x avg): {}", energy.high.len())?;
            }
            None => writeln!(f, "  No data")?,
        }

        writeln!(f, "\n--- Exact Zero Samples ---")?;
        writeln!(f, "  Exact zeros: {} ({:.2}%)", self.exact_zeros, self.zero_percent)?;

        writeln!(f, "\n--- Amplitude Statistics ---")?;
        if let Some(amp) = &self.amplitude {
            writeln!(f, "  Peak amplitude: {:.6}", amp.peak)?;
            writeln!(f, "  Min sample: {:.6}", amp.min)?;
            writeln!(f, "  Max sample: {:.6}", amp.max)?;
            writeln!(f, "  RMS: {:.6} ({:.1} dBFS)", amp.rms, amp.dbfs)?;
        }

        writeln!(f, "\n=== VERDICT ===")?;
        if self.is_clean() {
            writeln!(f, "CLEAN: No crackle indicators detected!")
        } else {
            for issue in &self.issues {
                writeln!(f, "  {issue}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    const SR: u32 = 48000;

    fn sine(freq: f64, secs: f64, amp: f64) -> Vec<f64> {
        let n = (SR as f64 * secs) as usize;
        (0..n)
            .map(|i| amp * (TAU * freq * i as f64 / SR as f64).sin())
            .collect()
    }

    #[test]
    fn clean_sine_passes() {
        let report = analyze(&sine(440.0, 1.0, 0.5), SR, 1, &AnalysisOptions::default());
        assert!(report.is_clean(), "issues: {:?}", report.issues);
        assert_eq!(report.jumps_20x(), 0);
        assert_eq!(report.gap_count(), 0);
        let amp = report.amplitude.unwrap();
        assert!((amp.peak - 0.5).abs() < 1e-3);
        assert!((amp.rms - 0.5 / 2.0_f64.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn detects_click() {
        let mut samples = sine(100.0, 1.0, 0.3);
        samples[24000] = 0.95;
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        let deltas = report.deltas.as_ref().unwrap();
        assert!(deltas.jumps_20x >= 1);
        assert_eq!(deltas.first_jumps[0].frame, 24000);
        assert!(report.issues.contains(&Issue::Discontinuities(deltas.jumps_20x)));
        assert!(!report.is_clean());
    }

    #[test]
    fn detects_silent_gap() {
        let mut samples = sine(440.0, 1.0, 0.5);
        for s in &mut samples[10_000..10_100] {
            *s = 0.0;
        }
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert_eq!(report.gaps.len(), 1);
        // the run starts at the zero crossing nearest the blanked region
        assert!(report.gaps[0].length >= 100);
        assert!(report.issues.iter().any(|i| matches!(i, Issue::SilentGaps(1))));
    }

    #[test]
    fn short_silent_runs_are_ignored() {
        let mut samples = sine(440.0, 1.0, 0.5);
        for s in &mut samples[10_000..10_005] {
            *s = 0.0;
        }
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn leading_silence_is_not_a_gap() {
        let mut samples = vec![0.0; 4800];
        samples.extend(sine(440.0, 1.0, 0.5));
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert!(report.gaps.is_empty());
        assert!(report.first_audio_frame.unwrap() >= 4800);
        assert!(report.is_clean(), "issues: {:?}", report.issues);
    }

    #[test]
    fn trailing_silence_is_not_a_gap() {
        let mut samples = sine(440.0, 1.0, 0.5);
        samples.extend(vec![0.0; 4800]);
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn energy_dropout_flagged() {
        let mut samples = sine(440.0, 2.0, 0.5);
        for s in &mut samples[48_000..52_000] {
            *s *= 0.01;
        }
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        let energy = report.energy.as_ref().unwrap();
        assert_eq!(energy.window, 800);
        assert!(!energy.low.is_empty());
        assert!(report.issues.iter().any(|i| matches!(i, Issue::LowEnergy(_))));
    }

    #[test]
    fn energy_spike_flagged() {
        let mut samples = sine(440.0, 2.0, 0.1);
        for s in &mut samples[48_000..48_800] {
            *s *= 9.0;
        }
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert!(!report.energy.unwrap().high.is_empty());
    }

    #[test]
    fn excess_zeros_flagged() {
        let mut samples = sine(440.0, 1.0, 0.5);
        for i in (1000..samples.len()).step_by(20) {
            samples[i] = 0.0;
        }
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert!(report.zero_percent > 1.0);
        assert!(report.issues.iter().any(|i| matches!(i, Issue::ExcessZeros(_))));
    }

    #[test]
    fn clipping_flagged() {
        let samples: Vec<f64> = sine(440.0, 1.0, 1.5)
            .into_iter()
            .map(|s| s.clamp(-0.99, 0.99))
            .collect();
        let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
        assert!(report.amplitude.unwrap().clipping);
        assert!(report.issues.contains(&Issue::Clipping));
    }

    #[test]
    fn skip_and_trim_window() {
        let mut samples = vec![0.0; 4800];
        samples.extend(sine(440.0, 1.0, 0.5));
        samples[100] = 0.9;
        samples.extend(vec![0.0; 4800]);
        let options = AnalysisOptions {
            skip_seconds: 0.1,
            trim_seconds: 0.1,
        };
        let report = analyze(&samples, SR, 1, &options);
        assert_eq!(report.skip_frames, 4800);
        assert_eq!(report.analyzed_frames, 48000);
        assert_eq!(report.first_audio_frame.map(|f| f >= 4800), Some(true));
        assert!(report.is_clean(), "issues: {:?}", report.issues);
    }

    #[test]
    fn stereo_uses_first_channel() {
        let left = sine(440.0, 0.5, 0.5);
        let mut interleaved = Vec::with_capacity(left.len() * 2);
        for &s in &left {
            interleaved.push(s);
            interleaved.push(0.0);
        }
        let report = analyze(&interleaved, SR, 2, &AnalysisOptions::default());
        assert_eq!(report.total_frames, left.len());
        assert!(report.is_clean());
    }

    #[test]
    fn empty_and_tiny_inputs_report_no_data() {
        for samples in [vec![], vec![0.5]] {
            let report = analyze(&samples, SR, 1, &AnalysisOptions::default());
            assert!(report.deltas.is_none());
            assert!(report.energy.is_none());
            assert!(report.amplitude.is_none());
            assert!(report.is_clean());
            assert!(report.to_string().contains("No data"));
        }
    }

    #[test]
    fn all_silent_input_has_no_first_audio() {
        let report = analyze(&vec![0.0; 1000], SR, 1, &AnalysisOptions::default());
        assert_eq!(report.first_audio_frame, None);
        assert!(report.gaps.is_empty());
        assert_eq!(report.exact_zeros, 1000);
    }

    #[test]
    fn dbfs_floor() {
        assert_eq!(to_dbfs(0.0), -100.0);
        assert!((to_dbfs(1.0)).abs() < 1e-12);
        assert!((to_dbfs(0.5) + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn report_renders_verdict() {
        let report = analyze(&sine(440.0, 1.0, 0.5), SR, 1, &AnalysisOptions::default());
        let text = report.to_string();
        assert!(text.contains("=== VERDICT ==="));
        assert!(text.contains("CLEAN"));
    }
}
