use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by a corpus and everything derived from it. There is no process wide
/// configuration, a `Config` is handed to `Corpus::new`/`Corpus::load` and copied into every
/// subcorpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Placeholder word absorbing out of vocabulary items
    pub oov_word: String,
    /// Pronunciation of the OOV word, spoken noise
    pub oov_phone: String,
    /// Optional silence symbol
    pub silence_phone: String,
    /// Sample rate every wav must be recorded at
    pub sample_rate: u32,
    /// Utterances shorter than this (in seconds) are reported during validation
    pub min_utterance_duration: f64,
    /// Test proportion used when a split is requested without any proportion
    pub default_test_proportion: f64,
    /// Seed for the split shuffles, drawn from entropy when absent
    pub random_seed: Option<u64>,
}

impl Config {
    pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

    /// Reads a configuration from a JSON file, missing fields take their default value
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        serde_json::from_str(&data).map_err(|e| Error::json("parsing configuration", e))
    }

    /// Symbols that can't appear in the phone table but are always part of the inventory
    pub fn reserved_phones(&self) -> [&str; 2] {
        [self.silence_phone.as_str(), self.oov_phone.as_str()]
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oov_word: "<unk>".to_string(),
            oov_phone: "SPN".to_string(),
            silence_phone: "SIL".to_string(),
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            min_utterance_duration: 0.1,
            default_test_proportion: 0.5,
            random_seed: None,
        }
    }
}
