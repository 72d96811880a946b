//! Wav header inspection. A corpus only accepts uncompressed 16-bit integer PCM mono files at the
//! configured sample rate, every check here works on the header alone so scanning a large corpus
//! never decodes any audio.
use crate::error::{Error, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;

/// What we need to know about a wav file to validate a corpus against it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
    /// Number of frames, a frame holding one sample per channel
    pub frames: u32,
}

impl WavInfo {
    /// Reads the header of the wav at `path`. Compressed files are rejected by the reader
    /// itself and come back as an error.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|e| Error::wav(path, e))?;
        let spec = reader.spec();
        Ok(Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: spec.sample_format,
            frames: reader.duration(),
        })
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / self.sample_rate as f64
        }
    }

    /// Returns the reason this wav can't be part of a corpus, if any
    pub fn violation(&self, sample_rate: u32) -> Option<String> {
        if self.frames == 0 {
            Some("file is empty".to_string())
        } else if self.sample_rate != sample_rate {
            Some(format!(
                "sampled at {} Hz, expected {} Hz",
                self.sample_rate, sample_rate
            ))
        } else if self.channels != 1 {
            Some(format!("{} channels, only mono is supported", self.channels))
        } else if self.bits_per_sample != 16 || self.sample_format != SampleFormat::Int {
            Some(format!(
                "{}-bit {:?} samples, only 16-bit integer PCM is supported",
                self.bits_per_sample, self.sample_format
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
pub(crate) fn write_silence(path: &Path, spec: hound::WavSpec, frames: u32) {
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..frames * spec.channels as u32 {
        match spec.sample_format {
            SampleFormat::Int => writer.write_sample(0i16).unwrap(),
            SampleFormat::Float => writer.write_sample(0.0f32).unwrap(),
        }
    }
    writer.finalize().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(channels: u16, sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    #[test]
    fn read_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        write_silence(&path, spec(1, 16_000), 8_000);

        let info = WavInfo::read(&path).unwrap();
        assert_eq!(info.frames, 8_000);
        assert_eq!(info.duration(), 0.5);
        assert_eq!(info.violation(16_000), None);
    }

    #[test]
    fn format_violations() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("stereo.wav");
        write_silence(&path, spec(2, 16_000), 100);
        let info = WavInfo::read(&path).unwrap();
        assert_eq!(info.frames, 100);
        assert!(info.violation(16_000).unwrap().contains("mono"));

        let path = dir.path().join("rate.wav");
        write_silence(&path, spec(1, 22_050), 100);
        assert!(WavInfo::read(&path).unwrap().violation(16_000).is_some());

        let path = dir.path().join("float.wav");
        let float = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        write_silence(&path, float, 100);
        assert!(WavInfo::read(&path).unwrap().violation(16_000).is_some());

        let path = dir.path().join("empty.wav");
        write_silence(&path, spec(1, 16_000), 0);
        assert_eq!(
            WavInfo::read(&path).unwrap().violation(16_000).as_deref(),
            Some("file is empty")
        );
    }

    #[test]
    fn not_a_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.wav");
        std::fs::write(&path, "definitely not audio").unwrap();
        assert!(matches!(WavInfo::read(&path), Err(Error::Wav { .. })));
    }
}
