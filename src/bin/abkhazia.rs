use abkhazia::*;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[clap(version, about = "Check and derive speech corpora in the abkhazia format")]
pub struct Args {
    /// JSON configuration file, defaults are used for missing fields
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Seed for the random splits, overrides the configuration
    #[clap(long, global = true)]
    seed: Option<u64>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a corpus and list everything making it invalid
    Validate { corpus: PathBuf },
    /// Print a summary of a corpus
    Info { corpus: PathBuf },
    /// Split a corpus in train and test subcorpora, saved in <output>/train and <output>/test
    Split {
        corpus: PathBuf,
        output: PathBuf,
        /// Proportion of the utterances going to train
        #[clap(long)]
        train: Option<f64>,
        /// Proportion of the utterances going to test, defaults to the complement of train
        #[clap(long)]
        test: Option<f64>,
        /// Keep the speakers of train and test disjoint
        #[clap(long)]
        by_speakers: bool,
        #[clap(long)]
        copy_wavs: bool,
    },
    /// Extract the utterances listed in a file, one id per line
    Subcorpus {
        corpus: PathBuf,
        output: PathBuf,
        #[clap(long, short)]
        utterances: PathBuf,
        /// Reduce the lexicon and phones to what the subcorpus uses
        #[clap(long)]
        prune: bool,
        #[clap(long)]
        copy_wavs: bool,
    },
    /// Make a phone level version of a corpus
    Phonemize {
        corpus: PathBuf,
        output: PathBuf,
        #[clap(long)]
        copy_wavs: bool,
    },
    /// Remove phones and silences, along with the words and utterances using them
    RemovePhones {
        corpus: PathBuf,
        output: PathBuf,
        #[clap(long, value_delimiter = ',')]
        phones: Vec<String>,
        #[clap(long, value_delimiter = ',')]
        silences: Vec<String>,
        #[clap(long)]
        copy_wavs: bool,
    },
    /// Merge the wavs of each speaker into one, saving the corpus to <output>
    MergeWavs {
        corpus: PathBuf,
        output: PathBuf,
        /// Seconds of silence inserted between two merged wavs
        #[clap(long, default_value_t = 0.0)]
        padding: f64,
    },
}

fn load(path: &Path, config: &Config) -> anyhow::Result<Corpus> {
    Corpus::load(path, config.clone())
        .with_context(|| format!("failed to load corpus {}", path.display()))
}

fn save(corpus: &Corpus, path: &Path, copy_wavs: bool) -> anyhow::Result<()> {
    corpus
        .save(path, copy_wavs)
        .with_context(|| format!("failed to save corpus to {}", path.display()))?;
    info!("saved {} utterances to {}", corpus.utt2spk.len(), path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    abkhazia::setup_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    match args.command {
        Command::Validate { corpus } => {
            let violations = load(&corpus, &config)?.violations();
            if violations.is_empty() {
                println!("{} is valid", corpus.display());
            } else {
                for violation in &violations {
                    error!("{}", violation);
                }
                anyhow::bail!(
                    "{} is not valid, {} problems found",
                    corpus.display(),
                    violations.len()
                );
            }
        }
        Command::Info { corpus: path } => {
            let corpus = load(&path, &config)?;
            println!("name: {}", corpus.meta.name);
            println!("source: {}", corpus.meta.source);
            println!("utterances: {}", corpus.utt2spk.len());
            println!("speakers: {}", corpus.spks().len());
            println!("wavs: {}", corpus.wavs().len());
            println!("words in lexicon: {}", corpus.lexicon.len());
            println!(
                "words used: {} ({} out of lexicon)",
                corpus.words(false).len(),
                corpus.words(false).len() - corpus.words(true).len()
            );
            println!("phones: {}", corpus.inventory.phones.len());
            println!("silences: {}", corpus.inventory.silences.len());
            println!("duration: {}", format_duration(corpus.duration()?));
        }
        Command::Split {
            corpus,
            output,
            train,
            test,
            by_speakers,
            copy_wavs,
        } => {
            let corpus = load(&corpus, &config)?;
            let (train, test) = corpus.split(train, test, by_speakers)?;
            save(&train, &output.join("train"), copy_wavs)?;
            save(&test, &output.join("test"), copy_wavs)?;
        }
        Command::Subcorpus {
            corpus,
            output,
            utterances,
            prune,
            copy_wavs,
        } => {
            let corpus = load(&corpus, &config)?;
            let list = std::fs::read_to_string(&utterances)
                .with_context(|| format!("failed to read {}", utterances.display()))?;
            let sub = corpus.subcorpus(list.split_whitespace(), prune);
            if sub.utt2spk.is_empty() {
                anyhow::bail!("none of the listed utterances are in the corpus");
            }
            save(&sub, &output, copy_wavs)?;
        }
        Command::Phonemize {
            corpus,
            output,
            copy_wavs,
        } => {
            let corpus = load(&corpus, &config)?;
            save(&corpus.phonemize(), &output, copy_wavs)?;
        }
        Command::RemovePhones {
            corpus,
            output,
            phones,
            silences,
            copy_wavs,
        } => {
            let corpus = load(&corpus, &config)?;
            let reduced = corpus.remove_phones(phones.as_slice(), silences.as_slice());
            save(&reduced, &output, copy_wavs)?;
        }
        Command::MergeWavs {
            corpus,
            output,
            padding,
        } => {
            let corpus = load(&corpus, &config)?;
            // merged wavs are written in a scratch folder, then copied to <output>/wavs
            let scratch = output.join("merged_wavs");
            let merged = corpus
                .merge_wavs(&scratch, padding)
                .context("failed to merge wavs")?;
            save(&merged, &output, true)?;
            std::fs::remove_dir_all(&scratch)
                .with_context(|| format!("failed to remove {}", scratch.display()))?;
        }
    }
    Ok(())
}
