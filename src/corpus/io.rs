//! Loading and saving a corpus directory. The layout is:
//!
//! ```text
//! <corpus>/
//!   meta.txt
//!   wavs/
//!   utt2spk.txt segments.txt text.txt
//!   lexicon.txt phones.txt silences.txt variants.txt
//! ```
use super::Corpus;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lexicon::read_lexicon;
use crate::meta::Meta;
use crate::phones::PhoneInventory;
use crate::tables::{self, Table};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

pub const META_FILE: &str = "meta.txt";
pub const WAVS_DIR: &str = "wavs";

impl Corpus {
    /// Loads the corpus stored in `dir`. The tables are only checked line by line, see
    /// [`Corpus::validate`] for the consistency checks.
    pub fn load(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        let dir = dir.as_ref();
        info!("loading corpus from {}", dir.display());
        if !dir.is_dir() {
            return Err(Error::MissingResource(dir.to_path_buf()));
        }
        let wav_folder = dir.join(WAVS_DIR);
        if !wav_folder.is_dir() {
            return Err(Error::MissingResource(wav_folder));
        }
        if let Some(missing) = Table::ALL
            .iter()
            .map(|t| dir.join(t.file_name()))
            .find(|p| !p.is_file())
        {
            return Err(Error::MissingResource(missing));
        }

        let mut corpus = Corpus::new(config);
        corpus.wav_folder = wav_folder;
        corpus.segments = tables::read_segments(tables::open(dir, Table::Segments)?)?;
        corpus.utt2spk = tables::read_utt2spk(tables::open(dir, Table::Utt2Spk)?)?;
        corpus.text = tables::read_text(tables::open(dir, Table::Text)?)?;
        corpus.lexicon = read_lexicon(dir)?;
        corpus.inventory = PhoneInventory::load(dir)?;

        let meta = dir.join(META_FILE);
        corpus.meta = if meta.is_file() {
            Meta::load(meta)?
        } else {
            debug!("no {} in {}", META_FILE, dir.display());
            Meta::new(&dir.to_string_lossy(), &dir.to_string_lossy(), "")
        };
        debug!(
            "loaded {} utterances, {} speakers and {} lexicon entries",
            corpus.utt2spk.len(),
            corpus.spks().len(),
            corpus.lexicon.len()
        );
        Ok(corpus)
    }

    /// Saves the corpus to `dir`, created if needed. The wavs are either copied (only the ones
    /// referenced by the segments) or linked to the current wav folder. A `dir` already holding
    /// wavs is rejected, as is copying a referenced wav that does not exist.
    pub fn save(&self, dir: impl AsRef<Path>, copy_wavs: bool) -> Result<()> {
        let dir = dir.as_ref();
        info!("saving corpus to {}", dir.display());
        fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;

        let wavs = dir.join(WAVS_DIR);
        if wavs.symlink_metadata().is_ok() {
            return Err(Error::io(
                format!("saving to {}", dir.display()),
                io::Error::new(io::ErrorKind::AlreadyExists, "wavs folder already exists"),
            ));
        }
        if copy_wavs {
            self.copy_wavs(&wavs)?;
        } else {
            self.link_wavs(&wavs)?;
        }

        tables::create(dir, Table::Segments, |w| {
            tables::write_segments(w, &self.segments)
        })?;
        tables::create(dir, Table::Utt2Spk, |w| tables::write_utt2spk(w, &self.utt2spk))?;
        tables::create(dir, Table::Text, |w| tables::write_text(w, &self.text))?;
        tables::create(dir, Table::Lexicon, |w| self.lexicon.write(w))?;
        self.inventory.save(dir)?;

        let mut meta = self.meta.clone();
        meta.utterances = self.utt2spk.len();
        meta.speakers = self.spks().len();
        meta.words = self.lexicon.len();
        meta.phones = self.inventory.phones.len();
        meta.save(dir.join(META_FILE))
    }

    fn copy_wavs(&self, target: &Path) -> Result<()> {
        fs::create_dir(target)
            .map_err(|e| Error::io(format!("creating {}", target.display()), e))?;
        let wavs = self.wavs();
        debug!("copying {} wavs to {}", wavs.len(), target.display());
        for wav in wavs {
            let source = self.wav_folder.join(wav);
            if !source.is_file() {
                return Err(Error::MissingResource(source));
            }
            fs::copy(&source, target.join(wav))
                .map_err(|e| Error::io(format!("copying {}", source.display()), e))?;
        }
        Ok(())
    }

    fn link_wavs(&self, target: &Path) -> Result<()> {
        let source = self
            .wav_folder
            .canonicalize()
            .map_err(|_| Error::MissingResource(self.wav_folder.clone()))?;
        debug!("linking {} to {}", target.display(), source.display());
        symlink_dir(&source, target)
            .map_err(|e| Error::io(format!("linking {}", target.display()), e))
    }
}

#[cfg(unix)]
fn symlink_dir(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink_dir(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(source, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::fixture;
    use crate::error::FormatIssue;

    #[test]
    fn save_and_load_with_links() {
        let (dir, corpus) = fixture(Config::default());
        let target = dir.path().join("saved");
        corpus.save(&target, false).unwrap();
        assert!(target.join(META_FILE).is_file());
        assert!(target.join(WAVS_DIR).join("s02.wav").is_file());

        let loaded = Corpus::load(&target, Config::default()).unwrap();
        assert_eq!(loaded, corpus);
        assert!(loaded.is_valid());
        assert_eq!(loaded.meta.name, "fixture");
        assert_eq!(loaded.meta.utterances, 28);
        assert_eq!(loaded.meta.speakers, 3);
    }

    #[test]
    fn copy_only_referenced_wavs() {
        let (dir, corpus) = fixture(Config::default());
        let sub = corpus.subcorpus(["s02_u01", "s03_u04"], true);
        let target = dir.path().join("copied");
        sub.save(&target, true).unwrap();

        let mut copied = fs::read_dir(target.join(WAVS_DIR))
            .unwrap()
            .map(|x| x.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        copied.sort();
        assert_eq!(copied, ["s02.wav", "s03_u04.wav"]);

        let loaded = Corpus::load(&target, Config::default()).unwrap();
        assert_eq!(loaded, sub);
        assert!(loaded.is_valid());
    }

    #[test]
    fn copying_a_missing_wav_fails() {
        let (dir, corpus) = fixture(Config::default());
        fs::remove_file(dir.path().join("wavs/s03_u02.wav")).unwrap();
        let err = corpus.save(dir.path().join("copied"), true).unwrap_err();
        match err {
            Error::MissingResource(path) => assert!(path.ends_with("s03_u02.wav")),
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn refuse_existing_wavs() {
        let (dir, corpus) = fixture(Config::default());
        // the fixture lives in `dir`, which already has a wavs folder
        let err = corpus.save(dir.path(), false).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn missing_resources() {
        let dir = tempfile::tempdir().unwrap();
        let err = Corpus::load(dir.path().join("nope"), Config::default()).unwrap_err();
        assert!(matches!(err, Error::MissingResource(_)));

        fs::create_dir(dir.path().join(WAVS_DIR)).unwrap();
        let err = Corpus::load(dir.path(), Config::default()).unwrap_err();
        match err {
            Error::MissingResource(path) => assert!(path.ends_with("utt2spk.txt")),
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn malformed_table_on_load() {
        let (dir, corpus) = fixture(Config::default());
        let target = dir.path().join("saved");
        corpus.save(&target, false).unwrap();
        fs::write(target.join("utt2spk.txt"), "s01_u00 s01\r\n").unwrap();
        let err = Corpus::load(&target, Config::default()).unwrap_err();
        assert_eq!(err.format_issue(), Some(&FormatIssue::CarriageReturn));
    }
}
