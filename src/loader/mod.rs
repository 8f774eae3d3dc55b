use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::{LoadError, ParseError};
use crate::model::Document;
use crate::util::sha256_text;

mod metadata;
mod parse;
#[cfg(test)]
mod tests;

pub use metadata::ChapterMetadataParser;
pub use parse::{MarkdownParser, split_table_row};

const NOTE_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];
/// Leading UTF-8 byte order mark written by some Windows editors.
pub const BYTE_ORDER_MARK: char = '\u{feff}';

/// Outcome of loading a whole notes directory. Failed files are kept for the
/// report; they never prevent the others from loading.
#[derive(Debug, Default)]
pub struct LoadedNotes {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadError>,
}

pub struct DocumentLoader {
    notes_dir: PathBuf,
    excluded: Option<PathBuf>,
    parser: MarkdownParser,
    metadata: ChapterMetadataParser,
}

impl DocumentLoader {
    pub fn new(notes_dir: &Path) -> Result<Self> {
        Ok(Self {
            notes_dir: notes_dir.to_path_buf(),
            excluded: None,
            parser: MarkdownParser::new()?,
            metadata: ChapterMetadataParser::new()?,
        })
    }

    /// Skip `path` during discovery (the index file often lives next to the
    /// chapters).
    pub fn excluding(mut self, path: &Path) -> Self {
        self.excluded = Some(fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));
        self
    }

    /// Lazily parses each note file in file-name order. Every call starts a
    /// fresh pass over the directory.
    pub fn documents(&self) -> Result<Documents<'_>> {
        let paths = self.discover()?;
        debug!(count = paths.len(), dir = %self.notes_dir.display(), "discovered note files");
        Ok(Documents {
            loader: self,
            paths: paths.into_iter(),
        })
    }

    pub fn load_all(&self) -> Result<LoadedNotes> {
        let mut notes = LoadedNotes::default();

        for outcome in self.documents()? {
            match outcome {
                Ok(document) => {
                    debug!(
                        document = %document.id,
                        chapter = ?document.chapter,
                        sections = document.section_count(),
                        "loaded document"
                    );
                    notes.documents.push(document);
                }
                Err(err) => {
                    warn!(
                        document = %err.document(),
                        line = ?err.line(),
                        error = %err,
                        "failed to load document"
                    );
                    notes.failures.push(err);
                }
            }
        }

        info!(
            loaded = notes.documents.len(),
            failed = notes.failures.len(),
            dir = %self.notes_dir.display(),
            "loaded notes directory"
        );

        Ok(notes)
    }

    pub fn load_file(&self, path: &Path) -> Result<Document, LoadError> {
        let id = document_id(path);
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            document: id.clone(),
            source,
        })?;
        let source = String::from_utf8(bytes).map_err(|_| LoadError::Encoding {
            document: id.clone(),
        })?;
        let source = match source.strip_prefix(BYTE_ORDER_MARK) {
            Some(rest) => rest.to_string(),
            None => source,
        };

        Ok(self.parse_document(&id, path, source)?)
    }

    pub fn parse_document(
        &self,
        id: &str,
        path: &Path,
        source: String,
    ) -> Result<Document, ParseError> {
        let body = self.parser.parse(id, &source)?;
        let (chapter, title) = self.metadata.derive(id, &body.sections);

        Ok(Document {
            id: id.to_string(),
            path: path.to_path_buf(),
            sha256: sha256_text(&source),
            source,
            chapter,
            title,
            preamble: body.preamble,
            sections: body.sections,
        })
    }

    fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        let entries = fs::read_dir(&self.notes_dir)
            .with_context(|| format!("failed to read {}", self.notes_dir.display()))?;

        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", self.notes_dir.display()))?;
            let path = entry.path();

            if !entry
                .file_type()
                .with_context(|| format!("failed to inspect file type: {}", path.display()))?
                .is_file()
            {
                continue;
            }

            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with('.'))
                .unwrap_or(true);
            let is_note = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    NOTE_EXTENSIONS
                        .iter()
                        .any(|candidate| ext.eq_ignore_ascii_case(candidate))
                })
                .unwrap_or(false);

            if hidden || !is_note || self.is_excluded(&path) {
                continue;
            }

            paths.push(path);
        }

        paths.sort_by_key(|path| document_id(path));
        Ok(paths)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(excluded) = &self.excluded else {
            return false;
        };
        let candidate = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        &candidate == excluded
    }
}

pub struct Documents<'a> {
    loader: &'a DocumentLoader,
    paths: std::vec::IntoIter<PathBuf>,
}

impl Iterator for Documents<'_> {
    type Item = Result<Document, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(self.loader.load_file(&path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
