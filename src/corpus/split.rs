//! Train/test splits of a corpus, either over utterances or over speakers.
use super::Corpus;
use crate::error::{resume_list, Error, Result};
use indexmap::IndexSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

impl Corpus {
    /// Splits the corpus in a train and a test subcorpus holding disjoint utterance sets.
    ///
    /// `train` and `test` are proportions of the utterances, when `test` is missing it is the
    /// complement of `train` and when both are missing the configured default test proportion is
    /// used. Their sum may be below 1, the remaining utterances are then dropped.
    ///
    /// With `by_speakers` each speaker goes entirely to one side. Speakers are assigned greedily,
    /// largest first, so proportions are only approximated and a speaker fitting on neither side
    /// is left out.
    ///
    /// Shuffling uses the configured seed when there is one.
    pub fn split(
        &self,
        train: Option<f64>,
        test: Option<f64>,
        by_speakers: bool,
    ) -> Result<(Corpus, Corpus)> {
        let (train, test) = self.proportions(train, test)?;
        info!(
            "splitting corpus {} by {}: train {}, test {}",
            self.meta.name,
            if by_speakers { "speakers" } else { "utterances" },
            train,
            test
        );
        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (train_utts, test_utts) = if by_speakers {
            self.split_speakers(train, test, &mut rng)
        } else {
            self.split_utterances(train, test, &mut rng)
        };
        self.build_sides(train_utts, test_utts)
    }

    /// Splits the corpus along explicit speaker lists. Speakers of the corpus in neither list
    /// are dropped.
    pub fn split_by_speaker_lists<S: AsRef<str>>(
        &self,
        train: &[S],
        test: &[S],
    ) -> Result<(Corpus, Corpus)> {
        let spk2utt = self.spk2utt();
        let train = train.iter().map(|x| x.as_ref()).collect::<IndexSet<_>>();
        let test = test.iter().map(|x| x.as_ref()).collect::<IndexSet<_>>();

        let unknown = train
            .iter()
            .chain(test.iter())
            .filter(|x| !spk2utt.contains_key(**x))
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(Error::consistency(format!(
                "the following speakers are not in the corpus: {}",
                resume_list(unknown, 10)
            )));
        }
        let shared = train.intersection(&test).collect::<Vec<_>>();
        if !shared.is_empty() {
            return Err(Error::consistency(format!(
                "the following speakers are in both train and test: {}",
                resume_list(shared, 10)
            )));
        }

        let utts = |speakers: &IndexSet<&str>| {
            spk2utt
                .iter()
                .filter(|(spk, _)| speakers.contains(**spk))
                .flat_map(|(_, utts)| utts.iter().copied())
                .collect::<Vec<_>>()
        };
        self.build_sides(utts(&train), utts(&test))
    }

    fn proportions(&self, train: Option<f64>, test: Option<f64>) -> Result<(f64, f64)> {
        let (train, test) = match (train, test) {
            (Some(train), Some(test)) => (train, test),
            (Some(train), None) => (train, 1.0 - train),
            (None, Some(test)) => (1.0 - test, test),
            (None, None) => (
                1.0 - self.config.default_test_proportion,
                self.config.default_test_proportion,
            ),
        };
        let valid = |x: f64| (0.0..=1.0).contains(&x);
        if !valid(train) || !valid(test) || train + test > 1.0 + f64::EPSILON {
            return Err(Error::size(format!(
                "invalid proportions train {} and test {}, \
                 they must be in [0, 1] and sum to at most 1",
                train, test
            )));
        }
        Ok((train, test))
    }

    /// Cuts the whole utterance list once so both sides get the requested share of the corpus.
    /// Each speaker's shuffled utterances are spread evenly along the list before cutting, so
    /// both sides still get a similar speaker distribution.
    fn split_utterances(&self, train: f64, test: f64, rng: &mut StdRng) -> (Vec<&str>, Vec<&str>) {
        let mut speakers = self.spk2utt().into_values().collect::<Vec<_>>();
        speakers.shuffle(rng);

        // the i-th of n utterances of a speaker sits at (i + 0.5) / n, ties keep speaker order
        let mut ranked = vec![];
        for mut utts in speakers {
            utts.shuffle(rng);
            let n = utts.len() as f64;
            for (i, utt) in utts.into_iter().enumerate() {
                ranked.push(((i as f64 + 0.5) / n, utt));
            }
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = ranked.len();
        let n_train = ((total as f64 * train).round() as usize).min(total);
        let n_test = ((total as f64 * test).round() as usize).min(total - n_train);
        let mut utts = ranked.into_iter().map(|(_, utt)| utt);
        let train_utts = utts.by_ref().take(n_train).collect();
        let test_utts = utts.take(n_test).collect();
        (train_utts, test_utts)
    }

    fn split_speakers(&self, train: f64, test: f64, rng: &mut StdRng) -> (Vec<&str>, Vec<&str>) {
        let mut speakers = self.spk2utt().into_iter().collect::<Vec<_>>();
        speakers.shuffle(rng);
        // stable, so speakers of equal size stay in shuffled order
        speakers.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let total = self.utt2spk.len() as f64;
        let (train_target, test_target) = (train * total, test * total);
        let mut train_utts = vec![];
        let mut test_utts = vec![];
        let mut dropped = 0;
        for (spk, utts) in speakers {
            let train_deficit = train_target - train_utts.len() as f64;
            let test_deficit = test_target - test_utts.len() as f64;
            let (side, deficit) = if train_deficit >= test_deficit {
                (&mut train_utts, train_deficit)
            } else {
                (&mut test_utts, test_deficit)
            };
            if utts.len() as f64 <= 2.0 * deficit {
                side.extend(utts);
            } else {
                debug!("speaker {} fits on no side of the split", spk);
                dropped += 1;
            }
        }
        if dropped > 0 {
            info!("{} speakers dropped from the split", dropped);
        }
        (train_utts, test_utts)
    }

    fn build_sides(&self, train: Vec<&str>, test: Vec<&str>) -> Result<(Corpus, Corpus)> {
        if train.is_empty() || test.is_empty() {
            return Err(Error::size(format!(
                "split of {} utterances would give {} train and {} test utterances",
                self.utt2spk.len(),
                train.len(),
                test.len()
            )));
        }
        info!(
            "split gives {} train and {} test utterances ({} dropped)",
            train.len(),
            test.len(),
            self.utt2spk.len() - train.len() - test.len()
        );
        let mut train_corpus = self.subcorpus(train, true);
        train_corpus.meta.name = format!("train subcorpus of {}", self.meta.name);
        let mut test_corpus = self.subcorpus(test, true);
        test_corpus.meta.name = format!("test subcorpus of {}", self.meta.name);
        Ok((train_corpus, test_corpus))
    }
}
