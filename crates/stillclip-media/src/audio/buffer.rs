//! Decoded PCM held in memory.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{MediaError, MediaResult};

/// Convert a linear amplitude (full scale = 1.0) to dBFS.
pub fn amplitude_to_dbfs(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

/// Convert dBFS to a linear amplitude (full scale = 1.0).
pub fn dbfs_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Interleaved f32 samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Wrap interleaved samples. The sample count must be a whole number of
    /// frames.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> MediaResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(MediaError::invalid_audio(format!(
                "unsupported format: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(MediaError::invalid_audio(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Build a buffer of `duration_ms` by evaluating `signal(t_secs)` for
    /// each frame and copying it to every channel.
    pub fn generate<F>(sample_rate: u32, channels: u16, duration_ms: u64, mut signal: F) -> MediaResult<Self>
    where
        F: FnMut(f64) -> f32,
    {
        let frames = (duration_ms * sample_rate as u64 / 1000) as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for frame in 0..frames {
            let value = signal(frame as f64 / sample_rate as f64);
            samples.extend(std::iter::repeat(value).take(channels as usize));
        }
        Self::new(sample_rate, channels, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in milliseconds, rounded to nearest.
    pub fn duration_ms(&self) -> u64 {
        let sr = self.sample_rate as u64;
        (self.frame_count() as u64 * 1000 + sr / 2) / sr
    }

    /// Frame index at `ms`, clamped to the buffer.
    pub fn frame_at_ms(&self, ms: u64) -> usize {
        let frame = (ms * self.sample_rate as u64 / 1000) as usize;
        frame.min(self.frame_count())
    }

    /// Copy of the `[start_ms, end_ms)` range.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> Self {
        let start = self.frame_at_ms(start_ms);
        let end = self.frame_at_ms(end_ms).max(start);
        let ch = self.channels as usize;
        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples[start * ch..end * ch].to_vec(),
        }
    }

    /// Root mean square over every sample of every channel.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt()
    }

    /// Mean level in dBFS; `-inf` for digital silence.
    pub fn dbfs(&self) -> f64 {
        amplitude_to_dbfs(self.rms())
    }

    /// Largest absolute sample.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    pub fn peak_dbfs(&self) -> f64 {
        amplitude_to_dbfs(self.peak() as f64)
    }

    /// Scale every sample by `db`, clipping at full scale.
    pub fn apply_gain_db(&mut self, db: f64) {
        let factor = dbfs_to_amplitude(db) as f32;
        for s in &mut self.samples {
            *s = (*s * factor).clamp(-1.0, 1.0);
        }
    }

    /// Decode a WAV file (integer or float PCM).
    pub fn read_wav(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let reader = WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        Self::new(spec.sample_rate, spec.channels, samples)
    }

    /// Encode as 16-bit PCM WAV.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path.as_ref(), spec)?;
        for &s in &self.samples {
            let v = (s as f64 * 32768.0).round().clamp(i16::MIN as f64, i16::MAX as f64);
            writer.write_sample(v as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use tempfile::TempDir;

    fn tone(duration_ms: u64, amplitude: f32) -> AudioBuffer {
        AudioBuffer::generate(48_000, 2, duration_ms, |t| {
            amplitude * (2.0 * PI * 440.0 * t).sin() as f32
        })
        .unwrap()
    }

    #[test]
    fn test_duration_and_frames() {
        let buf = AudioBuffer::generate(48_000, 2, 1500, |_| 0.0).unwrap();
        assert_eq!(buf.frame_count(), 72_000);
        assert_eq!(buf.samples().len(), 144_000);
        assert_eq!(buf.duration_ms(), 1500);
    }

    #[test]
    fn test_rejects_partial_frames() {
        assert!(AudioBuffer::new(48_000, 2, vec![0.0; 3]).is_err());
        assert!(AudioBuffer::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_dbfs_of_sine() {
        // A full-cycle sine has RMS = peak / sqrt(2), i.e. about -3 dB below peak
        let buf = tone(1000, 0.5);
        let expected = amplitude_to_dbfs(0.5 / 2f64.sqrt());
        assert!((buf.dbfs() - expected).abs() < 0.05, "got {}", buf.dbfs());
        assert!((buf.peak() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_silence_is_negative_infinity() {
        let buf = AudioBuffer::generate(16_000, 1, 500, |_| 0.0).unwrap();
        assert_eq!(buf.dbfs(), f64::NEG_INFINITY);
        assert_eq!(buf.peak_dbfs(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_slice_ms() {
        let buf = tone(2000, 0.1);
        let slice = buf.slice_ms(500, 1500);
        assert_eq!(slice.duration_ms(), 1000);
        assert_eq!(slice.channels(), 2);

        // Out-of-range ends clamp instead of panicking
        assert_eq!(buf.slice_ms(1900, 5000).duration_ms(), 100);
        assert!(buf.slice_ms(1500, 1000).is_empty());
    }

    #[test]
    fn test_apply_gain_clips() {
        let mut buf = tone(100, 0.5);
        buf.apply_gain_db(12.0);
        assert!((buf.peak() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wav_file_io() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");

        let buf = tone(250, 0.25);
        buf.write_wav(&path).unwrap();

        let loaded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(loaded.sample_rate(), 48_000);
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.frame_count(), buf.frame_count());
        assert!((loaded.dbfs() - buf.dbfs()).abs() < 0.01);
    }

    #[test]
    fn test_read_missing_wav() {
        let err = AudioBuffer::read_wav("/nonexistent/stillclip.wav").unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
