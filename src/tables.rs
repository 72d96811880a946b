//! Readers and writers for the flat text tables making up a corpus directory. Every table is a
//! UTF-8 file with Unix line endings where columns are separated by exactly one space, the first
//! column being the key of the row.
//!
//! Readers are strict: they never try to repair a line, anything unexpected is reported as a
//! [`FormatIssue`] pointing at the offending line. Writers always emit rows sorted byte-wise on
//! their key so the same corpus gives the same files whatever the host locale.
use crate::error::{Error, FormatIssue, Result};
use indexmap::IndexMap;
use std::fmt;
use std::fs::File;
use std::io::{self, prelude::*};
use std::path::Path;

/// The tables stored in a corpus directory, along with the shape of their lines.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Table {
    /// `<utt-id> <speaker-id>`
    Utt2Spk,
    /// `<utt-id> <wav-file> [<start> <stop>]`
    Segments,
    /// `<utt-id> <word1> <word2> ...`
    Text,
    /// `<word> <phone1> <phone2> ...`
    Lexicon,
    /// `<phone> [<ipa>]`
    Phones,
    /// `<phone>`
    Silences,
    /// `<phone1> <phone2> ...`
    Variants,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Utt2Spk,
        Table::Segments,
        Table::Text,
        Table::Lexicon,
        Table::Phones,
        Table::Silences,
        Table::Variants,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Utt2Spk => "utt2spk.txt",
            Self::Segments => "segments.txt",
            Self::Text => "text.txt",
            Self::Lexicon => "lexicon.txt",
            Self::Phones => "phones.txt",
            Self::Silences => "silences.txt",
            Self::Variants => "variants.txt",
        }
    }

    fn accepts(&self, columns: usize) -> bool {
        match self {
            Self::Utt2Spk => columns == 2,
            Self::Segments => columns == 2 || columns == 4,
            Self::Text | Self::Lexicon | Self::Variants => columns >= 2,
            Self::Phones => columns == 1 || columns == 2,
            Self::Silences => columns == 1,
        }
    }

    fn expected_columns(&self) -> &'static str {
        match self {
            Self::Utt2Spk => "2",
            Self::Segments => "2 or 4",
            Self::Text | Self::Lexicon | Self::Variants => "2 or more",
            Self::Phones => "1 or 2",
            Self::Silences => "1",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Time interval of an utterance within its wav, in seconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub start: f64,
    pub stop: f64,
}

impl Span {
    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }
}

/// Where the audio of an utterance lives. Without a span the whole wav is the utterance.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub wav: String,
    pub span: Option<Span>,
}

impl Segment {
    pub fn whole(wav: impl Into<String>) -> Self {
        Self {
            wav: append_wav_extension(wav.into()),
            span: None,
        }
    }

    pub fn within(wav: impl Into<String>, start: f64, stop: f64) -> Self {
        Self {
            wav: append_wav_extension(wav.into()),
            span: Some(Span { start, stop }),
        }
    }
}

fn append_wav_extension(mut wav: String) -> String {
    if !wav.ends_with(".wav") {
        wav.push_str(".wav");
    }
    wav
}

/// Splits a raw line into its columns, enforcing the rules shared by all the tables.
pub(crate) fn parse_line(table: Table, number: usize, raw: &[u8]) -> Result<Vec<&str>> {
    let fail = |issue| Error::format(table.file_name(), number, issue);
    if raw.contains(&b'\r') {
        return Err(fail(FormatIssue::CarriageReturn));
    }
    let line = std::str::from_utf8(raw).map_err(|_| fail(FormatIssue::NotUtf8))?;
    if line.contains("  ") {
        return Err(fail(FormatIssue::DoubledSeparator));
    }
    let columns = line.split(' ').collect::<Vec<&str>>();
    if columns.iter().any(|x| x.is_empty()) {
        return Err(fail(FormatIssue::EmptyColumn));
    }
    if !table.accepts(columns.len()) {
        return Err(fail(FormatIssue::ColumnCount {
            expected: table.expected_columns(),
            found: columns.len(),
        }));
    }
    Ok(columns)
}

/// Runs `f` over the columns of every line of `reader`, numbering lines from 1. Only `\n` is
/// treated as a line break so a stray `\r` is caught by [`parse_line`].
pub(crate) fn for_each_line<R, F>(table: Table, reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, Vec<&str>) -> Result<()>,
{
    for (i, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.map_err(|e| Error::io(format!("reading {}", table), e))?;
        let number = i + 1;
        f(number, parse_line(table, number, &raw)?)?;
    }
    Ok(())
}

fn insert_unique<V>(
    table: Table,
    map: &mut IndexMap<String, V>,
    number: usize,
    key: &str,
    value: V,
) -> Result<()> {
    if map.insert(key.to_string(), value).is_some() {
        return Err(Error::consistency(format!(
            "'{}' is used several times in {} (again at line {})",
            key, table, number
        )));
    }
    Ok(())
}

/// Opens one table of the corpus stored in `dir`
pub fn open(dir: impl AsRef<Path>, table: Table) -> Result<io::BufReader<File>> {
    let path = dir.as_ref().join(table.file_name());
    match File::open(&path) {
        Ok(f) => Ok(io::BufReader::new(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::MissingResource(path)),
        Err(e) => Err(Error::io(format!("opening {}", path.display()), e)),
    }
}

/// Creates the file of `table` in `dir` and fills it with `f`
pub fn create<F>(dir: impl AsRef<Path>, table: Table, f: F) -> Result<()>
where
    F: FnOnce(&mut io::BufWriter<File>) -> Result<()>,
{
    let path = dir.as_ref().join(table.file_name());
    let file =
        File::create(&path).map_err(|e| Error::io(format!("creating {}", path.display()), e))?;
    let mut writer = io::BufWriter::new(file);
    f(&mut writer)?;
    writer.flush().map_err(write_err(table))
}

pub fn read_utt2spk(reader: impl BufRead) -> Result<IndexMap<String, String>> {
    let mut res = IndexMap::new();
    for_each_line(Table::Utt2Spk, reader, |number, columns| {
        insert_unique(Table::Utt2Spk, &mut res, number, columns[0], columns[1].to_string())
    })?;
    Ok(res)
}

/// Reads the segments, wav files listed without extension get `.wav` appended.
pub fn read_segments(reader: impl BufRead) -> Result<IndexMap<String, Segment>> {
    let mut res = IndexMap::new();
    for_each_line(Table::Segments, reader, |number, columns| {
        let segment = if columns.len() == 4 {
            let parse = |x: &str| {
                x.parse::<f64>().map_err(|_| {
                    Error::format(
                        Table::Segments.file_name(),
                        number,
                        FormatIssue::InvalidTimestamp(x.to_string()),
                    )
                })
            };
            Segment::within(columns[1], parse(columns[2])?, parse(columns[3])?)
        } else {
            Segment::whole(columns[1])
        };
        insert_unique(Table::Segments, &mut res, number, columns[0], segment)
    })?;
    Ok(res)
}

pub fn read_text(reader: impl BufRead) -> Result<IndexMap<String, Vec<String>>> {
    let mut res = IndexMap::new();
    for_each_line(Table::Text, reader, |number, columns| {
        let words = columns[1..].iter().map(|x| x.to_string()).collect();
        insert_unique(Table::Text, &mut res, number, columns[0], words)
    })?;
    Ok(res)
}

/// Reads the phone table, the IPA column is optional.
pub fn read_phones(reader: impl BufRead) -> Result<IndexMap<String, Option<String>>> {
    let mut res = IndexMap::new();
    for_each_line(Table::Phones, reader, |number, columns| {
        let ipa = columns.get(1).map(|x| x.to_string());
        insert_unique(Table::Phones, &mut res, number, columns[0], ipa)
    })?;
    Ok(res)
}

pub fn read_silences(reader: impl BufRead) -> Result<Vec<String>> {
    let mut res = vec![];
    for_each_line(Table::Silences, reader, |_, columns| {
        res.push(columns[0].to_string());
        Ok(())
    })?;
    Ok(res)
}

pub fn read_variants(reader: impl BufRead) -> Result<Vec<Vec<String>>> {
    let mut res = vec![];
    for_each_line(Table::Variants, reader, |_, columns| {
        res.push(columns.iter().map(|x| x.to_string()).collect());
        Ok(())
    })?;
    Ok(res)
}

fn sorted<'a, V>(map: &'a IndexMap<String, V>) -> Vec<(&'a String, &'a V)> {
    let mut rows = map.iter().collect::<Vec<_>>();
    rows.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    rows
}

fn write_err(table: Table) -> impl Fn(io::Error) -> Error {
    move |e| Error::io(format!("writing {}", table), e)
}

pub fn write_utt2spk(mut writer: impl Write, utt2spk: &IndexMap<String, String>) -> Result<()> {
    for (utt, spk) in sorted(utt2spk) {
        writeln!(writer, "{} {}", utt, spk).map_err(write_err(Table::Utt2Spk))?;
    }
    Ok(())
}

pub fn write_segments(mut writer: impl Write, segments: &IndexMap<String, Segment>) -> Result<()> {
    for (utt, segment) in sorted(segments) {
        let written = match segment.span {
            Some(span) => writeln!(writer, "{} {} {} {}", utt, segment.wav, span.start, span.stop),
            None => writeln!(writer, "{} {}", utt, segment.wav),
        };
        written.map_err(write_err(Table::Segments))?;
    }
    Ok(())
}

pub fn write_text(mut writer: impl Write, text: &IndexMap<String, Vec<String>>) -> Result<()> {
    for (utt, words) in sorted(text) {
        writeln!(writer, "{} {}", utt, words.join(" ")).map_err(write_err(Table::Text))?;
    }
    Ok(())
}

pub fn write_phones(
    mut writer: impl Write,
    phones: &IndexMap<String, Option<String>>,
) -> Result<()> {
    for (phone, ipa) in sorted(phones) {
        let written = match ipa {
            Some(ipa) => writeln!(writer, "{} {}", phone, ipa),
            None => writeln!(writer, "{}", phone),
        };
        written.map_err(write_err(Table::Phones))?;
    }
    Ok(())
}

pub fn write_silences(mut writer: impl Write, silences: &[String]) -> Result<()> {
    let mut silences = silences.iter().collect::<Vec<_>>();
    silences.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    for silence in silences {
        writeln!(writer, "{}", silence).map_err(write_err(Table::Silences))?;
    }
    Ok(())
}

pub fn write_variants(mut writer: impl Write, variants: &[Vec<String>]) -> Result<()> {
    let mut lines = variants.iter().map(|x| x.join(" ")).collect::<Vec<_>>();
    lines.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    for line in lines {
        writeln!(writer, "{}", line).map_err(write_err(Table::Variants))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(s: &str) -> io::Cursor<&[u8]> {
        io::Cursor::new(s.as_bytes())
    }

    #[test]
    fn reject_doubled_separator() {
        let err = read_segments(cursor("u1  file.wav 0.0 1.0\n")).unwrap_err();
        assert_eq!(err.format_issue(), Some(&FormatIssue::DoubledSeparator));
    }

    #[test]
    fn reject_carriage_return() {
        let err = read_utt2spk(cursor("u1 s1\r\nu2 s1\r\n")).unwrap_err();
        assert_eq!(err.format_issue(), Some(&FormatIssue::CarriageReturn));
    }

    #[test]
    fn reject_wrong_column_count() {
        let err = read_segments(cursor("u1 a.wav 0.0\n")).unwrap_err();
        assert_eq!(
            err.format_issue(),
            Some(&FormatIssue::ColumnCount {
                expected: "2 or 4",
                found: 3
            })
        );
        assert!(read_utt2spk(cursor("u1\n")).is_err());
        assert!(read_silences(cursor("SIL NSN\n")).is_err());
        assert!(read_text(cursor("u1\n")).is_err());
    }

    #[test]
    fn reject_trailing_space_and_empty_lines() {
        let err = read_utt2spk(cursor("u1 s1 \n")).unwrap_err();
        assert_eq!(err.format_issue(), Some(&FormatIssue::EmptyColumn));
        let err = read_silences(cursor("SIL\n\nNSN\n")).unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn reject_bad_timestamp() {
        let err = read_segments(cursor("u1 a.wav zero 1.0\n")).unwrap_err();
        assert_eq!(
            err.format_issue(),
            Some(&FormatIssue::InvalidTimestamp("zero".to_string()))
        );
    }

    #[test]
    fn duplicate_keys_are_inconsistent() {
        let err = read_utt2spk(cursor("u1 s1\nu1 s2\n")).unwrap_err();
        assert!(matches!(err, Error::Consistency(_)));
    }

    #[test]
    fn segments_with_and_without_span() {
        let segments = read_segments(cursor("u1 a 0.5 1.25\nu2 b.wav\n")).unwrap();
        assert_eq!(segments["u1"], Segment::within("a.wav", 0.5, 1.25));
        assert_eq!(segments["u2"], Segment::whole("b.wav"));
        assert_eq!(segments["u1"].span.unwrap().duration(), 0.75);
    }

    #[test]
    fn token_order_preserved() {
        let text = read_text(cursor("u2 c b a\nu1 hello\n")).unwrap();
        assert_eq!(text.keys().collect::<Vec<_>>(), ["u2", "u1"]);
        assert_eq!(text["u2"], ["c", "b", "a"]);

        let phones = read_phones(cursor("a ɑ\nb\n")).unwrap();
        assert_eq!(phones["a"].as_deref(), Some("ɑ"));
        assert_eq!(phones["b"], None);

        let variants = read_variants(cursor("a1 a2 a3\n")).unwrap();
        assert_eq!(variants, vec![vec!["a1", "a2", "a3"]]);
    }

    #[test]
    fn writers_sort_bytewise() {
        let mut utt2spk = IndexMap::new();
        utt2spk.insert("b".to_string(), "s1".to_string());
        utt2spk.insert("B".to_string(), "s1".to_string());
        utt2spk.insert("a".to_string(), "s2".to_string());
        let mut out = vec![];
        write_utt2spk(&mut out, &utt2spk).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "B s1\na s2\nb s1\n");

        let mut out = vec![];
        write_variants(&mut out, &[vec!["b".into(), "c".into()], vec!["a".into(), "d".into()]])
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a d\nb c\n");
    }

    #[test]
    fn segments_written_are_read_back() {
        let mut segments = IndexMap::new();
        segments.insert("u2".to_string(), Segment::within("a.wav", 0.0, 1.5));
        segments.insert("u1".to_string(), Segment::whole("b.wav"));
        let mut out = vec![];
        write_segments(&mut out, &segments).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "u1 b.wav\nu2 a.wav 0 1.5\n");
        assert_eq!(read_segments(cursor(&text)).unwrap(), segments);
    }
}
