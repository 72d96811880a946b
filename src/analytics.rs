//! Does some analytics on corpora.
use crate::corpus::Corpus;
use crate::lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Utterances longer than this many phones are logged
const LONG_UTTERANCE: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DiphoneStat {
    pub phones: [String; 2],
    pub count: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusAnalytics {
    pub diphones: Vec<DiphoneStat>,
    pub phones: BTreeMap<String, usize>,
    /// Out of vocabulary words
    pub oov: BTreeMap<String, usize>,
    /// Utterance length in phones to the number of utterances of that length
    pub utterance_lengths: BTreeMap<usize, usize>,
    /// Number of utterances per speaker
    pub speakers: BTreeMap<String, usize>,
}

#[derive(Debug)]
pub struct AnalyticsGenerator<'a> {
    /// Dictionary used for analytics
    lexicon: &'a Lexicon,
    diphones: BTreeMap<[&'a str; 2], usize>,
    phones: BTreeMap<&'a str, usize>,
    oov: BTreeMap<String, usize>,
    utterance_lengths: BTreeMap<usize, usize>,
    speakers: BTreeMap<String, usize>,
}

impl<'a> AnalyticsGenerator<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            diphones: BTreeMap::new(),
            phones: BTreeMap::new(),
            oov: BTreeMap::new(),
            utterance_lengths: BTreeMap::new(),
            speakers: BTreeMap::new(),
        }
    }

    /// Counts the phones of the first pronunciation of `word`, returning how many there are.
    pub fn push_word(&mut self, word: &str) -> Option<usize> {
        let lexicon = self.lexicon;
        match lexicon.first_pronunciation(word) {
            Some(pronunciation) => {
                for window in pronunciation.windows(2) {
                    *self
                        .diphones
                        .entry([window[0].as_str(), window[1].as_str()])
                        .or_insert(0) += 1;
                }
                for phone in pronunciation {
                    *self.phones.entry(phone.as_str()).or_insert(0) += 1;
                }
                Some(pronunciation.len())
            }
            None => {
                *self.oov.entry(word.to_string()).or_insert(0) += 1;
                None
            }
        }
    }

    /// Counts one utterance. Its length only goes to the histogram when every word is in the
    /// lexicon.
    pub fn push_utterance<S: AsRef<str>>(&mut self, speaker: &str, words: &[S]) {
        *self.speakers.entry(speaker.to_string()).or_default() += 1;
        let mut utterance_len = Some(0);
        for word in words {
            let len = self.push_word(word.as_ref());
            utterance_len = utterance_len.zip(len).map(|(a, b)| a + b);
        }
        if let Some(len) = utterance_len {
            *self.utterance_lengths.entry(len).or_default() += 1;
            if len > LONG_UTTERANCE {
                info!(
                    "Very long utterance found from {}: '{}'",
                    speaker,
                    words
                        .iter()
                        .map(|x| x.as_ref())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
            }
        }
    }

    pub fn generate_report(&self) -> CorpusAnalytics {
        let diphones = self
            .diphones
            .iter()
            .map(|(k, v)| DiphoneStat {
                phones: [k[0].to_string(), k[1].to_string()],
                count: *v,
            })
            .collect();

        let phones = self
            .phones
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();

        CorpusAnalytics {
            diphones,
            phones,
            oov: self.oov.clone(),
            utterance_lengths: self.utterance_lengths.clone(),
            speakers: self.speakers.clone(),
        }
    }
}

impl Corpus {
    /// Statistics over the transcriptions of the corpus
    pub fn analytics(&self) -> CorpusAnalytics {
        let mut generator = AnalyticsGenerator::new(&self.lexicon);
        for (utt, words) in &self.text {
            match self.utt2spk.get(utt) {
                Some(speaker) => generator.push_utterance(speaker, words.as_slice()),
                None => generator.push_utterance("", words.as_slice()),
            }
        }
        generator.generate_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::corpus::tests::fixture;

    fn lexicon() -> Lexicon {
        [
            ("ab", vec!["a".to_string(), "b".to_string()]),
            ("ba", vec!["b".to_string(), "a".to_string()]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn counts_phones_and_oov() {
        let lexicon = lexicon();
        let mut generator = AnalyticsGenerator::new(&lexicon);
        generator.push_utterance("s1", &["ab", "ba", "ab"]);
        generator.push_utterance("s1", &["ab", "zz"]);
        generator.push_utterance("s2", &["zz", "zz"]);
        let report = generator.generate_report();

        assert_eq!(report.phones["a"], 4);
        assert_eq!(report.phones["b"], 4);
        assert_eq!(report.oov["zz"], 3);
        assert_eq!(report.speakers["s1"], 2);
        assert_eq!(report.speakers["s2"], 1);
        // only the first utterance is fully in vocabulary
        assert_eq!(report.utterance_lengths.len(), 1);
        assert_eq!(report.utterance_lengths[&6], 1);
        let ab = report
            .diphones
            .iter()
            .find(|x| x.phones == ["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(ab.count, 3);
    }

    #[test]
    fn corpus_report_serialises() {
        let (_dir, corpus) = fixture(Config::default());
        let report = corpus.analytics();
        assert_eq!(report.speakers["s03"], 8);
        assert!(report.oov.is_empty());
        assert_eq!(report.utterance_lengths.values().sum::<usize>(), 28);

        let json = serde_json::to_string(&report).unwrap();
        let parsed: CorpusAnalytics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
