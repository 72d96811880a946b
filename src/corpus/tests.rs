use super::*;
use crate::audio::write_silence;
use crate::error::Error;
use crate::tables::Segment;
use tempfile::TempDir;

const WORDS: [(&str, &str); 4] = [
    ("hello", "h e l o"),
    ("world", "w o r l d"),
    ("cat", "k a t"),
    ("dog", "d o g"),
];

fn mono(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn pronunciation(s: &str) -> Vec<String> {
    s.split(' ').map(|x| x.to_string()).collect()
}

/// A small valid corpus over three speakers with real wavs in a temporary folder:
///
/// * `s01`: 10 utterances of 1s, one wav each
/// * `s02`: 10 utterances of 0.9s, all within a single 10s wav
/// * `s03`: 8 utterances of 0.5s, one wav each
pub(crate) fn fixture(config: Config) -> (TempDir, Corpus) {
    let dir = tempfile::tempdir().unwrap();
    let wavs = dir.path().join("wavs");
    std::fs::create_dir(&wavs).unwrap();
    let spec = mono(config.sample_rate);
    let rate = config.sample_rate;

    let mut corpus = Corpus::new(config);
    corpus.meta = Meta::new("fixture", "generated", "");
    corpus.wav_folder = wavs.clone();

    let mut utts = vec![];
    for i in 0..10 {
        let utt = format!("s01_u{:02}", i);
        let wav = format!("{}.wav", utt);
        write_silence(&wavs.join(&wav), spec, rate);
        utts.push((utt, "s01", Segment::whole(wav)));
    }
    write_silence(&wavs.join("s02.wav"), spec, 10 * rate);
    for i in 0..10 {
        let start = i as f64;
        utts.push((
            format!("s02_u{:02}", i),
            "s02",
            Segment::within("s02.wav", start, start + 0.9),
        ));
    }
    for i in 0..8 {
        let utt = format!("s03_u{:02}", i);
        write_silence(&wavs.join(format!("{}.wav", utt)), spec, rate / 2);
        utts.push((utt.clone(), "s03", Segment::whole(utt)));
    }

    for (i, (utt, spk, segment)) in utts.into_iter().enumerate() {
        let mut words = vec![
            WORDS[i % 4].0.to_string(),
            WORDS[(i + 1) % 4].0.to_string(),
        ];
        if i % 7 == 0 {
            words.push("<unk>".to_string());
        }
        corpus.text.insert(utt.clone(), words);
        corpus.utt2spk.insert(utt.clone(), spk.to_string());
        corpus.segments.insert(utt, segment);
    }

    corpus.lexicon = WORDS
        .iter()
        .map(|(w, p)| (*w, pronunciation(p)))
        .chain([("<unk>", pronunciation("SPN"))])
        .collect();
    for phone in ["h", "e", "l", "o", "w", "r", "d", "k", "a", "t", "g"] {
        corpus.inventory.phones.insert(phone.to_string(), None);
    }
    corpus.inventory.phones.insert("x".to_string(), Some("χ".to_string()));
    corpus.inventory.silences = vec!["NSN".to_string()];
    corpus.inventory.variants = vec![vec!["o".to_string(), "a".to_string()]];
    (dir, corpus)
}

#[test]
fn speakers_in_order_of_appearance() {
    let mut corpus = Corpus::new(Config::default());
    for (utt, spk) in [("u1", "spk1"), ("u2", "spk1"), ("u3", "spk2")] {
        corpus.utt2spk.insert(utt.to_string(), spk.to_string());
    }
    let spk2utt = corpus.spk2utt();
    assert_eq!(spk2utt.len(), 2);
    assert_eq!(spk2utt["spk1"], ["u1", "u2"]);
    assert_eq!(spk2utt["spk2"], ["u3"]);
    assert_eq!(spk2utt.keys().copied().collect::<Vec<_>>(), ["spk1", "spk2"]);
}

#[test]
fn fixture_is_valid() {
    let (_dir, corpus) = fixture(Config::default());
    let violations = corpus.violations();
    assert!(violations.is_empty(), "{:?}", violations);
    assert!(corpus.validate().is_ok());
}

#[test]
fn empty_corpus_is_invalid() {
    let corpus = Corpus::new(Config::default());
    assert!(corpus.spk2utt().is_empty());
    assert!(matches!(corpus.validate(), Err(Error::Consistency(_))));
}

#[test]
fn views() {
    let (_dir, corpus) = fixture(Config::default());
    assert_eq!(corpus.utts().len(), 28);
    assert_eq!(corpus.spks().len(), 3);
    assert_eq!(corpus.wavs().len(), 19);
    assert_eq!(corpus.wav2utt()["s02.wav"].len(), 10);
    assert!(corpus.has_several_utts_per_wav());
    assert_eq!(corpus.words(false).len(), 5);

    let durations = corpus.utt2duration().unwrap();
    assert_eq!(durations["s01_u00"], 1.0);
    assert_eq!(durations["s03_u00"], 0.5);
    assert!((durations["s02_u03"] - 0.9).abs() < 1e-9);
    assert!((corpus.duration().unwrap() - 23.0).abs() < 1e-6);
}

#[test]
fn duration_formatting() {
    assert_eq!(format_duration(3725.7), "1:02:05");
    assert_eq!(format_duration(59.0), "0:00:59");
}

#[test]
fn subcorpus_is_an_intersection() {
    let (_dir, corpus) = fixture(Config::default());
    let sub = corpus.subcorpus(["s02_u03", "s01_u01", "not_an_utt"], false);
    assert_eq!(sub.utts().into_iter().collect::<Vec<_>>(), ["s01_u01", "s02_u03"]);
    assert_eq!(sub.segments.len(), 2);
    assert_eq!(sub.text.len(), 2);
    assert_eq!(sub.lexicon, corpus.lexicon);
    assert_eq!(sub.inventory, corpus.inventory);
    assert_eq!(sub.wav_folder, corpus.wav_folder);
    assert!(sub.is_valid());
}

#[test]
fn pruned_subcorpus() {
    let (_dir, corpus) = fixture(Config::default());
    // s01_u01 is "world cat"
    let sub = corpus.subcorpus(["s01_u01"], true);
    let mut words = sub.lexicon.words().cloned().collect::<Vec<_>>();
    words.sort();
    assert_eq!(words, ["<unk>", "cat", "world"]);
    for phone in sub.inventory.phones.keys() {
        assert!(sub.lexicon.phones().contains(phone.as_str()));
    }
    assert!(!sub.inventory.is_phone("x"));
    assert_eq!(sub.inventory.silences, corpus.inventory.silences);
    assert_eq!(sub.inventory.variants, corpus.inventory.variants);
    assert!(sub.is_valid());
}

#[test]
fn phonemize_drops_oov_utterances() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus
        .text
        .get_mut("s01_u02")
        .unwrap()
        .push("xyz".to_string());
    corpus
        .text
        .get_mut("s03_u05")
        .unwrap()
        .insert(0, "xyz".to_string());

    let phonemized = corpus.phonemize_text();
    assert_eq!(phonemized.len(), corpus.text.len() - 2);
    assert!(!phonemized.contains_key("s01_u02"));
    assert!(!phonemized.contains_key("s03_u05"));
    // s01_u01 is "world cat"
    assert_eq!(phonemized["s01_u01"], pronunciation("w o r l d k a t"));
    // s01_u00 is "hello world <unk>"
    assert_eq!(
        phonemized["s01_u00"],
        pronunciation("h e l o w o r l d SPN")
    );
}

#[test]
fn phonemized_corpus() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus.text.get_mut("s02_u00").unwrap()[0] = "xyz".to_string();
    let phonemized = corpus.phonemize();
    assert_eq!(phonemized.utts().len(), 27);
    assert!(!phonemized.segments.contains_key("s02_u00"));
    assert_eq!(
        phonemized.lexicon.first_pronunciation("k"),
        Some(&pronunciation("k"))
    );
    assert_eq!(
        phonemized.lexicon.first_pronunciation("NSN"),
        Some(&pronunciation("NSN"))
    );
    assert!(phonemized.is_valid(), "{:?}", phonemized.violations());
}

#[test]
fn removing_phones() {
    let (_dir, corpus) = fixture(Config::default());
    let reduced = corpus.remove_phones(&["g"], &["NSN"]);
    assert!(!reduced.lexicon.contains("dog"));
    assert!(!reduced.inventory.is_phone("g"));
    assert!(reduced.inventory.silences.is_empty());
    assert!(reduced
        .text
        .values()
        .all(|words| !words.iter().any(|w| w == "dog")));
    // every other utterance is kept
    let with_dog = corpus
        .text
        .values()
        .filter(|words| words.iter().any(|w| w == "dog"))
        .count();
    assert_eq!(reduced.utts().len(), corpus.utts().len() - with_dog);
    assert!(reduced.is_valid());
}

#[test]
fn missing_wav_is_reported() {
    let (dir, corpus) = fixture(Config::default());
    std::fs::remove_file(dir.path().join("wavs/s03_u02.wav")).unwrap();
    let violations = corpus.violations();
    assert_eq!(violations.len(), 1);
    assert!(violations[0].to_string().contains("s03_u02.wav"));
}

#[test]
fn wav_format_is_checked() {
    let (dir, corpus) = fixture(Config::default());
    write_silence(&dir.path().join("wavs/s01_u03.wav"), mono(8_000), 8_000);
    assert!(matches!(corpus.validate(), Err(Error::Consistency(_))));
}

#[test]
fn segments_out_of_bounds() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus
        .segments
        .insert("s02_u09".to_string(), Segment::within("s02.wav", 9.5, 10.5));
    assert!(!corpus.is_valid());

    let (_dir, mut corpus) = fixture(Config::default());
    corpus
        .segments
        .insert("s02_u09".to_string(), Segment::within("s02.wav", 3.0, 3.0));
    assert!(!corpus.is_valid());
}

#[test]
fn overlapping_segments_are_only_warned_about() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus
        .segments
        .insert("s02_u01".to_string(), Segment::within("s02.wav", 0.5, 1.9));
    assert!(corpus.is_valid());
}

#[test]
fn tables_must_share_keys() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus.utt2spk.shift_remove("s01_u04");
    assert!(matches!(corpus.validate(), Err(Error::Consistency(_))));

    let (_dir, mut corpus) = fixture(Config::default());
    corpus.text.shift_remove("s01_u04");
    assert!(matches!(corpus.validate(), Err(Error::Consistency(_))));
}

#[test]
fn lexicon_problems() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus.lexicon.insert("bird", pronunciation("b er d"));
    let message = corpus.validate().unwrap_err().to_string();
    assert!(message.contains("out-of-inventory"), "{}", message);

    let (_dir, mut corpus) = fixture(Config::default());
    corpus.lexicon.insert("<unk>", pronunciation("a"));
    assert!(!corpus.is_valid());

    let (_dir, mut corpus) = fixture(Config::default());
    corpus.lexicon.retain(|word, _| word != "<unk>");
    assert!(!corpus.is_valid());
}

#[test]
fn reserved_phone_in_inventory() {
    let (_dir, mut corpus) = fixture(Config::default());
    corpus.inventory.phones.insert("SIL".to_string(), None);
    assert!(!corpus.is_valid());
}
