//! Speech corpora in the abkhazia format: a directory of flat text tables (utterances, speakers,
//! transcriptions, lexicon and phone inventory) along with the wav files they reference.
//!
//! The [`Corpus`] type loads, checks and saves such directories and derives new corpora from
//! them: subsets, train/test splits and phone level versions.
use std::env;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{Layer, Registry};

pub mod analytics;
pub mod audio;
pub mod config;
pub mod corpus;
pub mod error;
pub mod lexicon;
pub mod meta;
pub mod phones;
pub mod tables;

pub use crate::config::Config;
pub use crate::corpus::{format_duration, Corpus};
pub use crate::error::{Error, FormatIssue, Result};
pub use crate::lexicon::Lexicon;
pub use crate::phones::PhoneInventory;

pub fn setup_logging() {
    let filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_env("RUST_LOG"),
        _ => EnvFilter::new("abkhazia=info,corpus_stats=info"),
    };

    let fmt = tracing_subscriber::fmt::Layer::default().with_writer(std::io::stderr);

    let subscriber = filter.and_then(fmt).with_subscriber(Registry::default());

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("logging was already set up");
    }
}
