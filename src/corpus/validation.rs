//! Consistency checks of a corpus against itself and against its wav files. Nothing is repaired
//! here: fatal problems are returned as errors, everything else is logged.
use super::{format_duration, Corpus};
use crate::audio::WavInfo;
use crate::error::{resume_list, Error, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// OOV rate (types or tokens) above which a warning is logged
const OOV_WARNING_RATE: f64 = 0.1;

impl Corpus {
    /// Fails on the first problem found
    pub fn validate(&self) -> Result<()> {
        match self.violations().into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }

    /// Runs every check and returns all the problems making the corpus invalid
    pub fn violations(&self) -> Vec<Error> {
        info!("validating corpus");
        let mut errors = vec![];
        if self.segments.is_empty() && self.utt2spk.is_empty() {
            errors.push(Error::consistency("corpus is empty"));
            return errors;
        }
        let wavs = self.check_wavs(&mut errors);
        self.check_segments(&wavs, &mut errors);
        self.check_speakers(&mut errors);
        self.check_transcription(&mut errors);
        self.inventory.check(&self.config, &mut errors);
        self.check_lexicon(&mut errors);

        if errors.is_empty() {
            let duration = self
                .segments
                .iter()
                .map(|(_, s)| match s.span {
                    Some(span) => span.duration(),
                    None => wavs.get(s.wav.as_str()).map(|x| x.duration()).unwrap_or(0.0),
                })
                .sum::<f64>();
            info!(
                "corpus of {} utterances from {} speakers, total duration: {}",
                self.utt2spk.len(),
                self.spks().len(),
                format_duration(duration)
            );
        } else {
            debug!("corpus has {} violations", errors.len());
        }
        errors
    }

    /// Checks the wav files and returns the header of the readable ones
    fn check_wavs(&self, errors: &mut Vec<Error>) -> HashMap<&str, WavInfo> {
        debug!("checking wavs");
        let mut res = HashMap::new();
        if !self.wav_folder.is_dir() {
            errors.push(Error::MissingResource(self.wav_folder.clone()));
            return res;
        }

        let wavs = self.wavs();
        let wrong_extensions = wavs
            .iter()
            .filter(|w| !w.ends_with(".wav"))
            .collect::<Vec<_>>();
        if !wrong_extensions.is_empty() {
            errors.push(Error::consistency(format!(
                "the following wavs do not have a '.wav' extension: {}",
                resume_list(wrong_extensions, 10)
            )));
        }

        let mut missing = vec![];
        let mut unreadable = vec![];
        let mut bad_format = vec![];
        for wav in wavs {
            let path = self.wav_folder.join(wav);
            if !path.is_file() {
                missing.push(wav);
                continue;
            }
            match WavInfo::read(&path) {
                Ok(info) => {
                    if let Some(reason) = info.violation(self.config.sample_rate) {
                        bad_format.push(format!("{} ({})", wav, reason));
                    }
                    res.insert(wav, info);
                }
                Err(e) => {
                    debug!("{}", e);
                    unreadable.push(wav);
                }
            }
        }
        if !missing.is_empty() {
            errors.push(Error::consistency(format!(
                "the following wavs do not exist: {}",
                resume_list(missing, 10)
            )));
        }
        if !unreadable.is_empty() {
            errors.push(Error::consistency(format!(
                "the following wavs are compressed or not wav files: {}",
                resume_list(unreadable, 10)
            )));
        }
        if !bad_format.is_empty() {
            errors.push(Error::consistency(format!(
                "only mono 16-bit PCM files at {} Hz are supported: {}",
                self.config.sample_rate,
                resume_list(bad_format, 10)
            )));
        }
        res
    }

    /// Every utterance must lie within its wav. Utterances sharing a start or stop time, or
    /// overlapping each other, are only warned about.
    fn check_segments(&self, wavs: &HashMap<&str, WavInfo>, errors: &mut Vec<Error>) {
        debug!("checking segments");
        let mut short = vec![];
        let mut out_of_bounds = vec![];
        let mut overlapping = false;
        for (wav, utts) in self.wav2utt() {
            let Some(info) = wavs.get(wav) else {
                continue;
            };
            let duration = info.duration();
            let tolerance = 1.0 / self.config.sample_rate as f64;
            let mut spans = vec![];
            for (utt, span) in utts {
                let (start, stop) = match span {
                    Some(s) => (s.start, s.stop),
                    None => (0.0, duration),
                };
                if !(start >= 0.0 && start < stop && stop <= duration + tolerance) {
                    out_of_bounds.push(format!(
                        "{} [{}, {}] in {} [0, {}]",
                        utt, start, stop, wav, duration
                    ));
                    continue;
                }
                if stop - start < self.config.min_utterance_duration {
                    short.push(utt);
                }
                spans.push((utt, start, stop));
            }

            let starts = duplicates_f64(spans.iter().map(|x| (x.0, x.1)));
            if !starts.is_empty() {
                overlapping = true;
                warn!(
                    "the following utterances start at the same time in wavefile {}: {}",
                    wav,
                    resume_list(starts, 10)
                );
            }
            let stops = duplicates_f64(spans.iter().map(|x| (x.0, x.2)));
            if !stops.is_empty() {
                overlapping = true;
                warn!(
                    "the following utterances stop at the same time in wavefile {}: {}",
                    wav,
                    resume_list(stops, 10)
                );
            }
            spans.sort_by(|a, b| a.1.total_cmp(&b.1));
            for pair in spans.windows(2) {
                if pair[1].1 < pair[0].2 {
                    overlapping = true;
                    debug!(
                        "utterances {} and {} are overlapping in wavefile {}",
                        pair[0].0, pair[1].0, wav
                    );
                }
            }
        }
        if overlapping {
            warn!("some utterances are overlapping in time, see details in log");
        }
        if !out_of_bounds.is_empty() {
            errors.push(Error::consistency(format!(
                "the following utterances are not within their wav boundaries: {}",
                resume_list(out_of_bounds, 10)
            )));
        }
        if !short.is_empty() {
            debug!(
                "the following utterances are less than {}s long \
                 and won't be usable for feature extraction: {}",
                self.config.min_utterance_duration,
                resume_list(short, 10)
            );
        }
    }

    fn check_speakers(&self, errors: &mut Vec<Error>) {
        debug!("checking speakers");
        if let Some(e) = key_mismatch("utt2spk", &self.utt2spk, "segments", &self.segments) {
            errors.push(e);
        }
        let not_prefixed = self
            .utt2spk
            .iter()
            .filter(|(utt, spk)| !utt.starts_with(spk.as_str()))
            .map(|(utt, _)| utt)
            .collect::<Vec<_>>();
        if !not_prefixed.is_empty() {
            debug!(
                "utterance-ids not prefixed by their speaker-id: {}",
                resume_list(&not_prefixed, 10)
            );
            warn!(
                "utterance-ids should be prefixed by the corresponding speaker-id \
                 for sorting compatibility"
            );
        }
    }

    fn check_transcription(&self, errors: &mut Vec<Error>) {
        debug!("checking transcriptions");
        if let Some(e) = key_mismatch("text", &self.text, "segments", &self.segments) {
            errors.push(e);
        }
    }

    fn check_lexicon(&self, errors: &mut Vec<Error>) {
        debug!("checking lexicon");
        let empties = self
            .lexicon
            .iter()
            .filter(|(_, v)| v.is_empty() || v.iter().any(|p| p.is_empty()))
            .map(|(k, _)| k)
            .collect::<Vec<_>>();
        if !empties.is_empty() {
            errors.push(Error::consistency(format!(
                "the following words have an empty transcription in lexicon: {}",
                resume_list(empties, 10)
            )));
        }

        let oov_word = self.config.oov_word.as_str();
        let oov_pronunciation = vec![self.config.oov_phone.clone()];
        match self.lexicon.get_pronunciations(oov_word) {
            None => errors.push(Error::consistency(format!(
                "the OOV word '{}' is missing from the lexicon",
                oov_word
            ))),
            Some(p) if p.iter().any(|x| *x != oov_pronunciation) => {
                errors.push(Error::consistency(format!(
                    "'{}' word is reserved for mapping OOV items \
                     and should always be transcribed as '{}'",
                    oov_word, self.config.oov_phone
                )))
            }
            Some(_) => {}
        }

        self.log_oov_rates();

        let mut homophones: BTreeMap<String, usize> = BTreeMap::new();
        for pronunciation in self.lexicon.iter().flat_map(|(_, v)| v.iter()) {
            *homophones.entry(pronunciation.join(" ")).or_default() += 1;
        }
        homophones.retain(|_, count| *count > 1);
        if !homophones.is_empty() {
            warn!("there are homophones in the pronunciation dictionary");
            debug!(
                "there are {} phone sequences that correspond to several words in the lexicon",
                homophones.len()
            );
        }

        let inventory = self.inventory.symbols(&self.config);
        let used = self.lexicon.phones();
        let out_of_inventory = used
            .iter()
            .filter(|x| !inventory.contains(**x))
            .collect::<Vec<_>>();
        if !out_of_inventory.is_empty() {
            errors.push(Error::consistency(format!(
                "phonetic dictionary uses out-of-inventory phones: {}",
                resume_list(out_of_inventory, 10)
            )));
        }
        let unused = inventory
            .iter()
            .filter(|x| !used.contains(**x))
            .collect::<Vec<_>>();
        if !unused.is_empty() {
            debug!(
                "the following phones are never found in the lexicon: {}",
                resume_list(unused, 10)
            );
        }
    }

    fn log_oov_rates(&self) {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for word in self.text.values().flatten() {
            *counts.entry(word.as_str()).or_default() += 1;
        }
        if counts.is_empty() {
            return;
        }
        let tokens = counts.values().sum::<usize>();
        let mut oov = counts
            .iter()
            .filter(|(w, _)| !self.lexicon.contains(w))
            .map(|(w, c)| (*w, *c))
            .collect::<Vec<_>>();
        oov.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let oov_tokens = oov.iter().map(|x| x.1).sum::<usize>();
        debug!(
            "{} dictionary words used out of {}",
            counts.len() - oov.len(),
            self.lexicon.len()
        );
        debug!(
            "{} OOV word types in transcriptions out of {} types in total",
            oov.len(),
            counts.len()
        );
        debug!(
            "{} OOV word tokens in transcriptions out of {} tokens in total",
            oov_tokens, tokens
        );
        debug!(
            "list of OOV word types with occurrence counts: {}",
            resume_list(oov.iter().map(|(w, c)| format!("'{}': {}", w, c)), 20)
        );
        if oov.len() as f64 / counts.len() as f64 > OOV_WARNING_RATE {
            warn!("more than 10 percent of word types used are Out-Of-Vocabulary items");
        }
        if oov_tokens as f64 / tokens as f64 > OOV_WARNING_RATE {
            warn!("more than 10 percent of word tokens used are Out-Of-Vocabulary items");
        }
    }
}

/// Describes the difference between the key sets of two utterance tables, if any
fn key_mismatch<A, B>(
    name: &str,
    table: &IndexMap<String, A>,
    reference_name: &str,
    reference: &IndexMap<String, B>,
) -> Option<Error> {
    let keys = table.keys().map(|x| x.as_str()).collect::<IndexSet<_>>();
    let reference_keys = reference.keys().map(|x| x.as_str()).collect::<IndexSet<_>>();
    if keys == reference_keys {
        return None;
    }
    let only_here = keys.difference(&reference_keys).collect::<Vec<_>>();
    let only_there = reference_keys.difference(&keys).collect::<Vec<_>>();
    Some(Error::consistency(format!(
        "utterance-ids in {} and {} are not consistent: {} only in {}, {} only in {}",
        reference_name,
        name,
        resume_list(only_here, 10),
        name,
        resume_list(only_there, 10),
        reference_name
    )))
}

/// Utterances sharing the same timestamp as an earlier one in the list
fn duplicates_f64<'a>(items: impl Iterator<Item = (&'a str, f64)>) -> Vec<&'a str> {
    let mut seen: Vec<f64> = vec![];
    let mut res = vec![];
    for (utt, t) in items {
        if seen.contains(&t) {
            res.push(utt);
        } else {
            seen.push(t);
        }
    }
    res
}

