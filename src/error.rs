use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while reading, checking or deriving a corpus.
#[derive(Debug, Error)]
pub enum Error {
    /// A malformed line in one of the corpus tables.
    #[error("{file}:{line}: {issue}")]
    Format {
        file: String,
        line: usize,
        issue: FormatIssue,
    },
    /// The tables disagree with each other, or with the audio they reference.
    #[error("inconsistent corpus: {0}")]
    Consistency(String),
    /// A split or subset request that would leave one side empty.
    #[error("invalid size: {0}")]
    Size(String),
    #[error("missing resource: {}", .0.display())]
    MissingResource(PathBuf),
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("wav error on {}: {source}", .path.display())]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a table line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatIssue {
    #[error("contains non Unix-style line breaks")]
    CarriageReturn,
    #[error("contains two consecutive separators")]
    DoubledSeparator,
    #[error("contains an empty column")]
    EmptyColumn,
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: &'static str, found: usize },
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("is not valid UTF-8")]
    NotUtf8,
}

impl Error {
    pub(crate) fn format(file: &str, line: usize, issue: FormatIssue) -> Self {
        Self::Format {
            file: file.to_string(),
            line,
            issue,
        }
    }

    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    pub(crate) fn size(message: impl Into<String>) -> Self {
        Self::Size(message.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn wav(path: impl Into<PathBuf>, source: hound::Error) -> Self {
        Self::Wav {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// The offending table line when this is a format error
    pub fn format_issue(&self) -> Option<&FormatIssue> {
        match self {
            Self::Format { issue, .. } => Some(issue),
            _ => None,
        }
    }
}

/// Display only the `n` first elements of a list, used to keep error messages readable on large
/// corpora.
pub(crate) fn resume_list<T: std::fmt::Display>(
    items: impl IntoIterator<Item = T>,
    n: usize,
) -> String {
    let items = items.into_iter().map(|x| x.to_string()).collect::<Vec<_>>();
    let shown = items.iter().take(n).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > n {
        format!("[{}] ... and {} more", shown, items.len() - n)
    } else {
        format!("[{}]", shown)
    }
}
