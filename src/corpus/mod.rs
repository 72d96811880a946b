//! A speech corpus in the abkhazia format. The corpus is a set of parallel tables keyed by
//! utterance (segments, speakers and transcriptions) plus the tables describing the language
//! (lexicon and phone inventory). Everything deriving a corpus from another one (subsets,
//! splits, phonemized versions) produces a fully independent copy of those tables, only the wav
//! folder is shared by reference.
//!
//! The type itself does very little checking when built, call [`Corpus::validate`] or
//! [`Corpus::is_valid`] before handing it to anything consuming the audio.
use crate::audio::WavInfo;
use crate::config::Config;
use crate::error::Result;
use crate::lexicon::Lexicon;
use crate::meta::Meta;
use crate::phones::PhoneInventory;
use crate::tables::{Segment, Span};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

mod io;
mod merge;
mod split;
mod validation;

#[derive(Debug, Clone)]
pub struct Corpus {
    pub meta: Meta,
    /// Folder the wav ids in the segments are relative to
    pub wav_folder: PathBuf,
    /// Utterance to the wav span holding its audio
    pub segments: IndexMap<String, Segment>,
    /// Utterance to speaker
    pub utt2spk: IndexMap<String, String>,
    /// Utterance to its transcription, one entry per word
    pub text: IndexMap<String, Vec<String>>,
    pub lexicon: Lexicon,
    pub inventory: PhoneInventory,
    config: Config,
}

/// Two corpora are equal when they hold the same tables. Metadata, configuration and the
/// location of the wav folder are not compared.
impl PartialEq for Corpus {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
            && self.utt2spk == other.utt2spk
            && self.text == other.text
            && self.lexicon == other.lexicon
            && self.inventory == other.inventory
    }
}

impl Corpus {
    /// An empty corpus
    pub fn new(config: Config) -> Self {
        Self {
            meta: Meta::new("", "", ""),
            wav_folder: PathBuf::new(),
            segments: IndexMap::new(),
            utt2spk: IndexMap::new(),
            text: IndexMap::new(),
            lexicon: Lexicon::new(),
            inventory: PhoneInventory::default(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Utterance ids in the order of the speaker table
    pub fn utts(&self) -> IndexSet<&str> {
        self.utt2spk.keys().map(|x| x.as_str()).collect()
    }

    /// Speaker ids in order of first appearance
    pub fn spks(&self) -> IndexSet<&str> {
        self.utt2spk.values().map(|x| x.as_str()).collect()
    }

    /// Speakers mapped to their utterances, both in order of first appearance in the speaker
    /// table.
    pub fn spk2utt(&self) -> IndexMap<&str, Vec<&str>> {
        let mut res: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (utt, spk) in &self.utt2spk {
            res.entry(spk.as_str()).or_default().push(utt.as_str());
        }
        res
    }

    /// Wav files referenced by the segments
    pub fn wavs(&self) -> IndexSet<&str> {
        self.segments.values().map(|x| x.wav.as_str()).collect()
    }

    /// Wav files mapped to the utterances they contain along with their span
    pub fn wav2utt(&self) -> IndexMap<&str, Vec<(&str, Option<Span>)>> {
        let mut res: IndexMap<&str, Vec<(&str, Option<Span>)>> = IndexMap::new();
        for (utt, segment) in &self.segments {
            res.entry(segment.wav.as_str())
                .or_default()
                .push((utt.as_str(), segment.span));
        }
        res
    }

    /// Words used in the transcriptions. When `in_lexicon` is set only the words with a lexicon
    /// entry are returned.
    pub fn words(&self, in_lexicon: bool) -> IndexSet<&str> {
        self.text
            .values()
            .flatten()
            .map(|x| x.as_str())
            .filter(|x| !in_lexicon || self.lexicon.contains(x))
            .collect()
    }

    /// True if at least one wav holds several utterances
    pub fn has_several_utts_per_wav(&self) -> bool {
        self.segments.values().any(|x| x.span.is_some())
    }

    /// Duration in seconds of every utterance. Utterances spanning a whole wav need its header,
    /// so this reads the wav folder.
    pub fn utt2duration(&self) -> Result<IndexMap<&str, f64>> {
        let mut wavs: HashMap<&str, f64> = HashMap::new();
        let mut res = IndexMap::new();
        for (utt, segment) in &self.segments {
            let duration = match segment.span {
                Some(span) => span.duration(),
                None => match wavs.get(segment.wav.as_str()) {
                    Some(d) => *d,
                    None => {
                        let d = WavInfo::read(self.wav_folder.join(&segment.wav))?.duration();
                        wavs.insert(segment.wav.as_str(), d);
                        d
                    }
                },
            };
            res.insert(utt.as_str(), duration);
        }
        Ok(res)
    }

    /// Total duration of the corpus in seconds
    pub fn duration(&self) -> Result<f64> {
        Ok(self.utt2duration()?.values().sum())
    }

    /// Returns the subcorpus made of the utterances in `utt_ids` which are part of this corpus,
    /// other ids are ignored.
    ///
    /// When `prune` is set the lexicon only keeps the words used in the retained transcriptions
    /// (plus the OOV word) and the phone table only the phones used by that lexicon. Otherwise
    /// both are copied unchanged. Silences and variant groups are always copied.
    pub fn subcorpus<I, S>(&self, utt_ids: I, prune: bool) -> Corpus
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = utt_ids
            .into_iter()
            .map(|x| x.as_ref().to_string())
            .collect::<IndexSet<String>>();

        let mut corpus = Corpus::new(self.config.clone());
        corpus.wav_folder = self.wav_folder.clone();
        corpus.lexicon = self.lexicon.clone();
        corpus.inventory = self.inventory.clone();
        corpus.segments = restrict(&self.segments, &requested);
        corpus.utt2spk = restrict(&self.utt2spk, &requested);
        corpus.text = restrict(&self.text, &requested);

        let unknown = requested
            .iter()
            .filter(|x| !self.utt2spk.contains_key(x.as_str()))
            .count();
        if unknown > 0 {
            debug!("{} requested utterances are not in the corpus", unknown);
        }

        corpus.meta = Meta::new(
            &format!("subcorpus of {}", self.meta.name),
            &self.meta.source,
            &format!(
                "{} utterances from {}",
                corpus.utt2spk.len(),
                self.utt2spk.len()
            ),
        );

        if prune {
            corpus.prune_lexicon();
        }
        corpus
    }

    /// Reduces the lexicon to the words of the transcriptions plus the OOV word, then the phones
    /// to the ones used by the lexicon.
    fn prune_lexicon(&mut self) {
        let words = self
            .words(false)
            .into_iter()
            .map(|x| x.to_string())
            .collect::<IndexSet<String>>();
        let oov_word = self.config.oov_word.clone();
        self.lexicon
            .retain(|word, _| word == oov_word || words.contains(word));
        if !self.lexicon.contains(&oov_word) {
            self.lexicon
                .insert(oov_word, vec![self.config.oov_phone.clone()]);
        }

        let used = self.lexicon.phones();
        self.inventory.retain_phones(&used);
    }

    /// Returns a copy of the corpus without the given phones and silences. Every lexicon word
    /// using one of them is removed, as are the utterances using such a word.
    pub fn remove_phones<P: AsRef<str>>(&self, phones: &[P], silences: &[P]) -> Corpus {
        let phones = phones.iter().map(|x| x.as_ref()).collect::<IndexSet<_>>();
        let silences = silences.iter().map(|x| x.as_ref()).collect::<IndexSet<_>>();
        for phone in phones.iter().filter(|x| !self.inventory.is_phone(x)) {
            info!("phone to be removed {} not in phoneset", phone);
        }
        for silence in silences.iter().filter(|x| !self.inventory.is_silence(x)) {
            info!("silence to be removed {} not in silences", silence);
        }

        let removed_words = self
            .lexicon
            .iter()
            .filter(|(_, pronunciations)| {
                pronunciations
                    .iter()
                    .flatten()
                    .any(|p| phones.contains(p.as_str()) || silences.contains(p.as_str()))
            })
            .map(|(word, _)| word.as_str())
            .collect::<IndexSet<_>>();
        info!(
            "removing {} lexicon words with undesirable phones/silences",
            removed_words.len()
        );

        let kept = self
            .text
            .iter()
            .filter(|(_, words)| !words.iter().any(|w| removed_words.contains(w.as_str())))
            .map(|(utt, _)| utt.as_str())
            .collect::<Vec<_>>();
        info!(
            "removing {} utterances with undesirable phones/silences",
            self.text.len() - kept.len()
        );

        let mut corpus = self.subcorpus(kept, false);
        corpus
            .lexicon
            .retain(|word, _| !removed_words.contains(word));
        corpus
            .inventory
            .phones
            .retain(|phone, _| !phones.contains(phone.as_str()));
        corpus
            .inventory
            .silences
            .retain(|silence| !silences.contains(silence.as_str()));
        corpus
    }

    /// Transcription of every utterance directly into phones, without word boundaries. Each word
    /// is replaced by its first pronunciation. An utterance with a word missing from the lexicon
    /// is dropped entirely rather than partially transcribed.
    pub fn phonemize_text(&self) -> IndexMap<String, Vec<String>> {
        let mut res = IndexMap::new();
        let mut dropped = 0;
        'utterances: for (utt, words) in &self.text {
            let mut phones = vec![];
            for word in words {
                match self.lexicon.first_pronunciation(word) {
                    Some(p) => phones.extend(p.iter().cloned()),
                    None => {
                        dropped += 1;
                        continue 'utterances;
                    }
                }
            }
            res.insert(utt.clone(), phones);
        }
        if dropped > 0 {
            debug!(
                "dropped {} utterances with out of vocabulary words while phonemizing",
                dropped
            );
        }
        res
    }

    /// A phone level version of the corpus: the text is [`Corpus::phonemize_text`] and the
    /// lexicon maps every symbol of the inventory, reserved ones included, to itself.
    /// Utterances dropped by the phonemization are removed from all the tables.
    pub fn phonemize(&self) -> Corpus {
        let text = self.phonemize_text();
        let mut corpus = self.subcorpus(text.keys(), false);
        corpus.text = text;
        corpus.lexicon = self
            .inventory
            .symbols(&self.config)
            .into_iter()
            .map(|p| (p, vec![p.to_string()]))
            .collect();
        corpus.lexicon.insert(
            self.config.oov_word.as_str(),
            vec![self.config.oov_phone.clone()],
        );
        corpus.meta = Meta::new(
            &format!("phonemized version of {}", self.meta.name),
            &self.meta.source,
            "",
        );
        corpus
    }
}

fn restrict<V: Clone>(table: &IndexMap<String, V>, keys: &IndexSet<String>) -> IndexMap<String, V> {
    table
        .iter()
        .filter(|(k, _)| keys.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Formats a duration in seconds as `hh:mm:ss`, dropping subseconds
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
pub(crate) mod tests;
