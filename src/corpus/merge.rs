//! Merging the wavs of each speaker into a single file.
use super::Corpus;
use crate::error::{Error, Result};
use crate::tables::Segment;
use hound::{WavReader, WavSpec, WavWriter};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

impl Corpus {
    /// Concatenates the wavs of each speaker into `<output_dir>/<speaker>.wav`, with `padding`
    /// seconds of silence between two source wavs, and returns the corpus pointing at them.
    ///
    /// Source wavs are merged in name order and must all share the format of the first one. The
    /// segments of the returned corpus are shifted by the offset of their wav in the merged file,
    /// so every utterance keeps its duration. The other tables are unchanged.
    pub fn merge_wavs(&self, output_dir: impl AsRef<Path>, padding: f64) -> Result<Corpus> {
        let output_dir = output_dir.as_ref();
        if !padding.is_finite() || padding < 0.0 {
            return Err(Error::size(format!(
                "padding must be a positive duration, got {}",
                padding
            )));
        }
        if !self.wav_folder.is_dir() {
            return Err(Error::MissingResource(self.wav_folder.clone()));
        }
        fs::create_dir_all(output_dir)
            .map_err(|e| Error::io(format!("creating {}", output_dir.display()), e))?;
        info!(
            "merging {} wavs into {} speaker wavs in {}",
            self.wavs().len(),
            self.spks().len(),
            output_dir.display()
        );

        let mut merged = self.clone();
        merged.wav_folder = output_dir.to_path_buf();
        merged.meta.comment = format!("wavs of {} merged by speaker", self.meta.name);
        for (spk, utts) in self.spk2utt() {
            let mut wavs = utts
                .iter()
                .map(|utt| self.segments[*utt].wav.as_str())
                .collect::<IndexSet<_>>();
            wavs.sort();

            let target = format!("{}.wav", spk);
            let offsets = self.concatenate(&wavs, &output_dir.join(&target), padding)?;
            for utt in utts {
                let segment = &self.segments[utt];
                let (offset, length) = offsets[segment.wav.as_str()];
                let (start, stop) = match segment.span {
                    Some(span) => (span.start, span.stop),
                    None => (0.0, length),
                };
                merged.segments.insert(
                    utt.to_string(),
                    Segment::within(target.as_str(), offset + start, offset + stop),
                );
            }
        }
        Ok(merged)
    }

    /// Writes `wavs` one after the other into `target` and returns the offset and duration of
    /// each of them in the merged file, in seconds.
    fn concatenate<'a>(
        &self,
        wavs: &IndexSet<&'a str>,
        target: &Path,
        padding: f64,
    ) -> Result<HashMap<&'a str, (f64, f64)>> {
        let mut writer: Option<(WavWriter<_>, WavSpec)> = None;
        let mut offsets = HashMap::new();
        let mut written = 0u64;
        for wav in wavs {
            let path = self.wav_folder.join(wav);
            let mut reader = WavReader::open(&path).map_err(|e| Error::wav(&path, e))?;
            let spec = reader.spec();
            let (out, out_spec) = match &mut writer {
                Some(w) => w,
                None => {
                    let out = WavWriter::create(target, spec)
                        .map_err(|e| Error::wav(target, e))?;
                    writer.insert((out, spec))
                }
            };
            if spec != *out_spec {
                return Err(Error::consistency(format!(
                    "{} does not share the format of the other wavs merged into {}",
                    path.display(),
                    target.display()
                )));
            }
            let rate = spec.sample_rate as f64;

            if !offsets.is_empty() {
                let frames = (padding * rate).round() as u64;
                for _ in 0..frames * spec.channels as u64 {
                    out.write_sample(0i16).map_err(|e| Error::wav(target, e))?;
                }
                written += frames;
            }
            let frames = reader.duration() as u64;
            offsets.insert(*wav, (written as f64 / rate, frames as f64 / rate));
            for sample in reader.samples::<i16>() {
                let sample = sample.map_err(|e| Error::wav(&path, e))?;
                out.write_sample(sample).map_err(|e| Error::wav(target, e))?;
            }
            written += frames;
        }
        if let Some((out, _)) = writer {
            out.finalize().map_err(|e| Error::wav(target, e))?;
        }
        debug!("merged {} wavs into {}", wavs.len(), target.display());
        Ok(offsets)
    }
}
