//! The phone inventory of a corpus. This is made of three tables:
//!
//! * The phones proper, each optionally mapped to a human readable symbol (usually IPA).
//! * The silences, symbols marking non-speech. These must be disjoint from the phones.
//! * The variant groups, sets of phones that are interchangeable (tonal or stress variants of a
//!   same base phone for example). These are only hints used downstream to build phonological
//!   clustering questions for acoustic modelling.
//!
//! On top of those, two reserved symbols (optional silence and spoken noise, see
//! [`Config::reserved_phones`]) are always part of the inventory without being listed anywhere.
use crate::config::Config;
use crate::error::{resume_list, Error, Result};
use crate::tables::{self, Table};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone)]
pub struct PhoneInventory {
    /// Phone symbol to its optional IPA representation
    pub phones: IndexMap<String, Option<String>>,
    pub silences: Vec<String>,
    pub variants: Vec<Vec<String>>,
}

/// Silences and variant groups are compared regardless of their order, as they are stored sorted.
impl PartialEq for PhoneInventory {
    fn eq(&self, other: &Self) -> bool {
        fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
            let mut items = items.to_vec();
            items.sort_unstable();
            items
        }
        self.phones == other.phones
            && sorted(&self.silences) == sorted(&other.silences)
            && sorted(&self.variants) == sorted(&other.variants)
    }
}

impl PhoneInventory {
    /// Reads the phones, silences and variants tables from a corpus directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            phones: tables::read_phones(tables::open(dir, Table::Phones)?)?,
            silences: tables::read_silences(tables::open(dir, Table::Silences)?)?,
            variants: tables::read_variants(tables::open(dir, Table::Variants)?)?,
        })
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        tables::create(dir, Table::Phones, |w| tables::write_phones(w, &self.phones))?;
        tables::create(dir, Table::Silences, |w| {
            tables::write_silences(w, &self.silences)
        })?;
        tables::create(dir, Table::Variants, |w| {
            tables::write_variants(w, &self.variants)
        })
    }

    pub fn is_phone(&self, symbol: &str) -> bool {
        self.phones.contains_key(symbol)
    }

    pub fn is_silence(&self, symbol: &str) -> bool {
        self.silences.iter().any(|x| x == symbol)
    }

    /// All the symbols a pronunciation may use: phones, silences and the reserved symbols
    pub fn symbols<'a>(&'a self, config: &'a Config) -> IndexSet<&'a str> {
        self.phones
            .keys()
            .map(|x| x.as_str())
            .chain(self.silences.iter().map(|x| x.as_str()))
            .chain(config.reserved_phones())
            .collect()
    }

    /// Drops every phone not in `used`. Silences and variant groups are kept unchanged.
    pub fn retain_phones(&mut self, used: &IndexSet<&str>) {
        self.phones.retain(|k, _| used.contains(k.as_str()));
    }

    /// Checks the inventory on its own, fatal problems are pushed into `errors`
    pub(crate) fn check(&self, config: &Config, errors: &mut Vec<Error>) {
        debug!("checking phones");
        if self.phones.is_empty() {
            errors.push(Error::consistency("the phones inventory is empty"));
        }
        for reserved in config.reserved_phones() {
            if self.is_phone(reserved) {
                errors.push(Error::consistency(format!(
                    "'{}' symbol is reserved, it cannot be used in phones",
                    reserved
                )));
            }
        }
        let ipas = duplicates(self.phones.values().flatten().map(|x| x.as_str()));
        if !ipas.is_empty() {
            errors.push(Error::consistency(format!(
                "following IPA symbols are used several times in phones: {}",
                resume_list(ipas, 10)
            )));
        }
        let conflicts = self
            .phones
            .keys()
            .filter(|x| position_suffix().is_match(x))
            .collect::<Vec<_>>();
        if !conflicts.is_empty() {
            debug!(
                "the following phones are not compatible with word position dependent models: {}",
                resume_list(&conflicts, 10)
            );
            warn!("corpus is not compatible with word position dependent models");
        }

        debug!("checking silences");
        let sils = duplicates(self.silences.iter().map(|x| x.as_str()));
        if !sils.is_empty() {
            errors.push(Error::consistency(format!(
                "following symbols are used several times in silences: {}",
                resume_list(sils, 10)
            )));
        }
        let both = self
            .silences
            .iter()
            .filter(|x| self.is_phone(x))
            .collect::<Vec<_>>();
        if !both.is_empty() {
            errors.push(Error::consistency(format!(
                "the following symbols are used in both phones and silences: {}",
                resume_list(both, 10)
            )));
        }

        debug!("checking variants");
        let symbols = self.symbols(config);
        let unknown = self
            .variants
            .iter()
            .flatten()
            .filter(|x| !symbols.contains(x.as_str()))
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            warn!(
                "the following symbols are present in variants, \
                 but are neither in phones nor in silences: {}",
                resume_list(unknown, 10)
            );
        }
        let repeated = duplicates(self.variants.iter().flatten().map(|x| x.as_str()));
        if !repeated.is_empty() {
            warn!(
                "the following symbols are used several times in variants: {}",
                resume_list(repeated, 10)
            );
        }
    }
}

/// Kaldi appends `_B`, `_E`, `_I` or `_S` to phones for word position dependent models, a phone
/// already ending like this would be ambiguous.
fn position_suffix() -> &'static Regex {
    static POSITION_REGEX: OnceCell<Regex> = OnceCell::new();
    POSITION_REGEX.get_or_init(|| Regex::new(r"_[BEIS]$").expect("valid regex"))
}

/// Items seen more than once, in order of first repetition
pub(crate) fn duplicates<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut res = vec![];
    for item in items {
        let count = counts.entry(item).or_insert(0);
        *count += 1;
        if *count == 2 {
            res.push(item);
        }
    }
    res
}
