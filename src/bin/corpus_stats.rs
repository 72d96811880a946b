use abkhazia::*;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct Args {
    /// Corpus to analyse
    corpus: PathBuf,
    /// Where to write the JSON report
    #[clap(short, long, default_value = "analysis.json")]
    output: PathBuf,
    /// JSON configuration file
    #[clap(long, short)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    abkhazia::setup_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let corpus = Corpus::load(&args.corpus, config)?;
    info!("Lexicon size (words): {}", corpus.lexicon.len());

    let report = corpus.analytics();

    println!("Number of OOV words: {}", report.oov.len());
    println!("Number of diphones: {}", report.diphones.len());
    println!("Number of phones: {}", report.phones.len());
    println!("Number of speakers: {}", report.speakers.len());

    let report = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.output, report)?;

    Ok(())
}
