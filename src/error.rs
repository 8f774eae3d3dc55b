use std::path::PathBuf;

use thiserror::Error;

/// Why a single document could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated code fence `{fence}`")]
    UnterminatedFence { fence: String },

    #[error("malformed table: header has {header_cells} cells but delimiter row has {delimiter_cells}")]
    MalformedTable {
        header_cells: usize,
        delimiter_cells: usize,
    },
}

/// Parse failure for one document. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{document}:{line}: {kind}")]
pub struct ParseError {
    pub document: String,
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read {document}: {source}")]
    Io {
        document: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{document} is not valid UTF-8")]
    Encoding { document: String },
}

impl LoadError {
    pub fn document(&self) -> &str {
        match self {
            Self::Parse(err) => &err.document,
            Self::Io { document, .. } | Self::Encoding { document } => document,
        }
    }

    /// Source line the failure points at, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse(err) => Some(err.line),
            Self::Io { .. } | Self::Encoding { .. } => None,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Parse(err) => err.kind.to_string(),
            Self::Io { source, .. } => source.to_string(),
            Self::Encoding { .. } => "invalid UTF-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMismatchKind {
    MissingChapter,
    OrphanedDocument,
}

/// Disagreement between the index file and the loaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexMismatchError {
    #[error("chapter {chapter} ({title}) expects {file} but no such document was loaded")]
    MissingChapter {
        chapter: u32,
        title: String,
        file: String,
    },

    #[error("{file} is not referenced by the index")]
    OrphanedDocument { file: String },
}

impl IndexMismatchError {
    pub fn kind(&self) -> IndexMismatchKind {
        match self {
            Self::MissingChapter { .. } => IndexMismatchKind::MissingChapter,
            Self::OrphanedDocument { .. } => IndexMismatchKind::OrphanedDocument,
        }
    }
}

/// Invalid run configuration; reported before any document is read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("similarity threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("similarity threshold `{value}` from {source_name} is not a number")]
    ThresholdNotANumber { value: String, source_name: String },

    #[error("notes directory does not exist: {}", .0.display())]
    NotesDirMissing(PathBuf),

    #[error("index file does not exist: {}", .0.display())]
    IndexFileMissing(PathBuf),
}
