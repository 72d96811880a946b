//! The pronunciation dictionary of a corpus. A fairly simple map from word to the list of its
//! pronunciations, each pronunciation being a sequence of phone symbols. We don't try to pick the
//! right pronunciation in context, everything deriving phones from text uses the first listed
//! variant.
use crate::error::{Error, Result};
use crate::tables::{self, Table};
use indexmap::{map, IndexMap, IndexSet};
use std::io::prelude::*;
use std::path::Path;

/// Type alias for the pronunciation of a word
pub type Pronunciation = Vec<String>;

/// Type that wraps the dictionary, words are kept in the order they were first seen.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Lexicon {
    /// One word may have multiple pronunciations
    dictionary: IndexMap<String, Vec<Pronunciation>>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a lexicon table, a word listed on several lines gets one pronunciation per line.
    /// Listing the exact same pronunciation twice is harmless and only kept once.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut lexicon = Self::new();
        tables::for_each_line(Table::Lexicon, reader, |_, columns| {
            lexicon.insert(
                columns[0],
                columns[1..].iter().map(|x| x.to_string()).collect(),
            );
            Ok(())
        })?;
        Ok(lexicon)
    }

    /// Writes the lexicon sorted byte-wise on the words, one line per pronunciation
    pub fn write(&self, mut writer: impl Write) -> Result<()> {
        let mut words = self.dictionary.iter().collect::<Vec<_>>();
        words.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        for (word, pronunciations) in words {
            for pronunciation in pronunciations {
                writeln!(writer, "{} {}", word, pronunciation.join(" "))
                    .map_err(|e| Error::io(format!("writing {}", Table::Lexicon), e))?;
            }
        }
        Ok(())
    }

    /// Adds a pronunciation variant for `word`
    pub fn insert(&mut self, word: impl Into<String>, pronunciation: Pronunciation) {
        let pronunciations = self.dictionary.entry(word.into()).or_default();
        if !pronunciations.contains(&pronunciation) {
            pronunciations.push(pronunciation);
        }
    }

    /// Merge two lexicons, keeping the pronunciations already present first
    pub fn merge(&mut self, other: Lexicon) {
        for (k, mut v) in other.dictionary.into_iter() {
            for pronunc in v.drain(..) {
                self.insert(k.as_str(), pronunc);
            }
        }
    }

    /// Number of words in the lexicon
    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    /// Whether the lexicon is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, word: &str) -> bool {
        self.dictionary.contains_key(word)
    }

    #[inline(always)]
    pub fn get_pronunciations(&self, word: &str) -> Option<&Vec<Pronunciation>> {
        self.dictionary.get(word)
    }

    /// Pretends that words only have one possible pronunciation, and it's the first one listed.
    pub fn first_pronunciation(&self, word: &str) -> Option<&Pronunciation> {
        self.dictionary.get(word).and_then(|x| x.first())
    }

    /// Keeps only the words for which `f` returns true
    pub fn retain(&mut self, mut f: impl FnMut(&str, &[Pronunciation]) -> bool) {
        self.dictionary.retain(|k, v| f(k, v));
    }

    /// Every phone symbol used by at least one pronunciation
    pub fn phones(&self) -> IndexSet<&str> {
        self.dictionary
            .values()
            .flatten()
            .flatten()
            .map(|x| x.as_str())
            .collect()
    }

    /// Iterator over the words of the lexicon
    pub fn words(&self) -> map::Keys<'_, String, Vec<Pronunciation>> {
        self.dictionary.keys()
    }

    /// Iterator over the elements of the lexicon
    pub fn iter(&self) -> map::Iter<'_, String, Vec<Pronunciation>> {
        self.dictionary.iter()
    }
}

impl<W: Into<String>> FromIterator<(W, Pronunciation)> for Lexicon {
    fn from_iter<I: IntoIterator<Item = (W, Pronunciation)>>(iter: I) -> Self {
        let mut lexicon = Self::new();
        for (word, pronunciation) in iter {
            lexicon.insert(word, pronunciation);
        }
        lexicon
    }
}

/// Loads the lexicon of the corpus stored in `dir`
pub fn read_lexicon(dir: impl AsRef<Path>) -> Result<Lexicon> {
    Lexicon::from_reader(tables::open(dir, Table::Lexicon)?)
}
