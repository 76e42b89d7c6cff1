//! Adaptive content-bounds detection.
//!
//! Quiet runs are judged against a threshold relative to the clip's own mean
//! level. Offsets are tried from most to least aggressive and the first one
//! leaving a usable span wins.

use stillclip_models::{ContentBounds, PipelineConfig};
use tracing::{debug, trace};

use super::buffer::{dbfs_to_amplitude, AudioBuffer};

/// Silence is judged over windows slid by this many milliseconds.
const SEEK_STEP_MS: u64 = 1;

/// Detector tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsDetector {
    /// Minimum length of a quiet run for it to count as silence
    pub min_silence_len_ms: u64,
    /// dB below the mean level at which a window is quiet, tried in order
    pub offsets_db: Vec<f64>,
    /// The threshold never drops below this
    pub floor_db: f64,
    /// Smallest content span accepted from an offset
    pub min_span_ms: u64,
}

impl Default for BoundsDetector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl BoundsDetector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            min_silence_len_ms: config.silence_run_length_ms,
            offsets_db: config.silence_offsets_db.clone(),
            floor_db: config.silence_floor_db,
            min_span_ms: config.min_content_span_ms,
        }
    }

    /// Locate the first and last non-silent instants of `audio`.
    ///
    /// Returns the full span when no offset yields at least `min_span_ms` of
    /// content, and `[0, 0]` for an empty buffer.
    pub fn detect(&self, audio: &AudioBuffer) -> ContentBounds {
        let duration_ms = audio.duration_ms();
        if duration_ms == 0 {
            return ContentBounds::empty();
        }

        let mean_db = match audio.dbfs() {
            db if db.is_finite() => db,
            _ => self.floor_db,
        };

        let profile = EnergyProfile::new(audio, duration_ms);

        for &offset in &self.offsets_db {
            let threshold_db = (mean_db - offset).max(self.floor_db);
            let ranges = self.nonsilent_ranges(&profile, threshold_db);

            let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
                trace!(offset, threshold_db, "No content at offset");
                continue;
            };

            let start_ms = first.0;
            let end_ms = last.1.min(duration_ms);
            if end_ms.saturating_sub(start_ms) >= self.min_span_ms {
                debug!(
                    offset,
                    threshold_db,
                    mean_db,
                    start_ms,
                    end_ms,
                    "Content bounds detected"
                );
                if let Ok(bounds) = ContentBounds::new(start_ms, end_ms, duration_ms) {
                    return bounds;
                }
            }

            trace!(offset, start_ms, end_ms, "Content span too short");
        }

        debug!(mean_db, duration_ms, "No offset yielded content, keeping full span");
        ContentBounds::full(duration_ms)
    }

    /// Complement of the silent ranges over `[0, duration]`.
    fn nonsilent_ranges(&self, profile: &EnergyProfile, threshold_db: f64) -> Vec<(u64, u64)> {
        let duration_ms = profile.duration_ms();
        let silent = self.silent_ranges(profile, threshold_db);

        if silent.is_empty() {
            return vec![(0, duration_ms)];
        }
        if silent.len() == 1 && silent[0] == (0, duration_ms) {
            return Vec::new();
        }

        let mut ranges = Vec::with_capacity(silent.len() + 1);
        let mut prev_end = 0;
        for &(start, end) in &silent {
            ranges.push((prev_end, start));
            prev_end = end;
        }
        if prev_end < duration_ms {
            ranges.push((prev_end, duration_ms));
        }

        ranges.retain(|&r| r != (0, 0));
        ranges
    }

    /// Ranges where every `min_silence_len_ms` window has RMS at or below
    /// the threshold. Overlapping windows merge into one range.
    fn silent_ranges(&self, profile: &EnergyProfile, threshold_db: f64) -> Vec<(u64, u64)> {
        let len = self.min_silence_len_ms;
        let duration_ms = profile.duration_ms();
        if len == 0 || duration_ms < len {
            return Vec::new();
        }

        let threshold = dbfs_to_amplitude(threshold_db);
        let last_start = duration_ms - len;

        let mut ranges = Vec::new();
        let mut current: Option<(u64, u64)> = None; // (range start, previous window start)

        let starts = (0..=last_start)
            .step_by(SEEK_STEP_MS as usize)
            .chain((last_start % SEEK_STEP_MS != 0).then_some(last_start));

        for i in starts {
            if profile.window_rms(i, i + len) > threshold {
                continue;
            }
            current = match current {
                None => Some((i, i)),
                Some((range_start, prev)) => {
                    let continuous = i == prev + SEEK_STEP_MS;
                    let has_gap = i > prev + len;
                    if !continuous && has_gap {
                        ranges.push((range_start, prev + len));
                        Some((i, i))
                    } else {
                        Some((range_start, i))
                    }
                }
            };
        }

        if let Some((range_start, prev)) = current {
            ranges.push((range_start, prev + len));
        }
        ranges
    }
}

/// Cumulative signal energy at every millisecond boundary, so any window's
/// RMS is two lookups.
struct EnergyProfile {
    /// Sum of squared samples before each millisecond
    energy: Vec<f64>,
    /// Interleaved sample index at each millisecond
    offsets: Vec<usize>,
}

impl EnergyProfile {
    fn new(audio: &AudioBuffer, duration_ms: u64) -> Self {
        let channels = audio.channels() as usize;
        let samples = audio.samples();

        let mut energy = Vec::with_capacity(duration_ms as usize + 1);
        let mut offsets = Vec::with_capacity(duration_ms as usize + 1);

        let mut acc = 0.0f64;
        let mut cursor = 0usize;
        for ms in 0..=duration_ms {
            let next = audio.frame_at_ms(ms) * channels;
            for &s in &samples[cursor..next] {
                acc += (s as f64) * (s as f64);
            }
            cursor = next;
            energy.push(acc);
            offsets.push(next);
        }

        Self { energy, offsets }
    }

    fn duration_ms(&self) -> u64 {
        (self.energy.len() - 1) as u64
    }

    fn window_rms(&self, start_ms: u64, end_ms: u64) -> f64 {
        let (a, b) = (start_ms as usize, end_ms as usize);
        let count = self.offsets[b] - self.offsets[a];
        if count == 0 {
            return 0.0;
        }
        let sum = (self.energy[b] - self.energy[a]).max(0.0);
        (sum / count as f64).sqrt()
    }
}
