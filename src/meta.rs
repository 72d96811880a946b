use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Version of the on-disk layout written by this crate
pub const FORMAT_VERSION: u32 = 1;

/// Free form information attached to a corpus and dumped to `meta.txt`. Every value is a single
/// line of text, line breaks are flattened when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub version: u32,
    pub name: String,
    pub source: String,
    pub comment: String,
    pub utterances: usize,
    pub speakers: usize,
    pub words: usize,
    pub phones: usize,
}

impl Meta {
    pub fn new(name: &str, source: &str, comment: &str) -> Self {
        Self {
            version: FORMAT_VERSION,
            name: one_line(name),
            source: one_line(source),
            comment: one_line(comment),
            ..Default::default()
        }
    }

    /// Parses `key: value` lines, `#` starts a comment. Unknown keys are ignored and missing ones
    /// left to their default.
    pub fn parse(text: &str) -> Self {
        let mut meta = Self::default();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "version" => meta.version = value.parse().unwrap_or_default(),
                "name" => meta.name = value.to_string(),
                "source" => meta.source = value.to_string(),
                "comment" => meta.comment = value.to_string(),
                "utterances" => meta.utterances = value.parse().unwrap_or_default(),
                "speakers" => meta.speakers = value.parse().unwrap_or_default(),
                "words" => meta.words = value.parse().unwrap_or_default(),
                "phones" => meta.phones = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        meta
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        Ok(Self::parse(&text))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string())
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "name: {}", one_line(&self.name))?;
        writeln!(f, "source: {}", one_line(&self.source))?;
        writeln!(f, "comment: {}", one_line(&self.comment))?;
        writeln!(f, "utterances: {}", self.utterances)?;
        writeln!(f, "speakers: {}", self.speakers)?;
        writeln!(f, "words: {}", self.words)?;
        writeln!(f, "phones: {}", self.phones)
    }
}

fn one_line(s: &str) -> String {
    s.replace('\n', ". ").replace('#', "")
}
