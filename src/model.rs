use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::error::LoadError;

/// One loaded notes file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub path: PathBuf,
    pub source: String,
    pub sha256: String,
    pub chapter: Option<u32>,
    pub title: Option<String>,
    pub preamble: Vec<ContentBlock>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn section_count(&self) -> usize {
        self.sections.iter().map(Section::subtree_len).sum()
    }

    pub fn all_blocks(&self) -> Vec<&ContentBlock> {
        let mut out = self.preamble.iter().collect::<Vec<&ContentBlock>>();
        for section in &self.sections {
            out.extend(section.subtree_blocks());
        }
        out
    }

    pub fn source_entry(&self) -> SourceEntry {
        let mut blocks = BTreeMap::<String, usize>::new();
        let mut code_languages = BTreeSet::<String>::new();
        for block in self.all_blocks() {
            *blocks.entry(block.kind().to_string()).or_default() += 1;
            if let Some(language) = block.language() {
                code_languages.insert(language.to_string());
            }
        }

        SourceEntry {
            file: self.id.clone(),
            chapter: self.chapter,
            title: self.title.clone(),
            sections: self.section_count(),
            blocks,
            code_languages,
            sha256: self.sha256.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub level: u8,
    pub line: usize,
    pub document: String,
    pub blocks: Vec<ContentBlock>,
    pub children: Vec<Section>,
}

impl Section {
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Section::subtree_len).sum::<usize>()
    }

    /// Blocks of this section followed by those of every descendant, in
    /// document order.
    pub fn subtree_blocks(&self) -> Vec<&ContentBlock> {
        let mut out = self.blocks.iter().collect::<Vec<&ContentBlock>>();
        for child in &self.children {
            out.extend(child.subtree_blocks());
        }
        out
    }

    /// Body text used for similarity: own blocks plus every nested heading and
    /// block.
    pub fn body_text(&self) -> String {
        let mut parts = self
            .blocks
            .iter()
            .map(ContentBlock::plain_text)
            .collect::<Vec<String>>();
        for child in &self.children {
            parts.push(child.heading.clone());
            parts.push(child.body_text());
        }
        parts.retain(|part| !part.trim().is_empty());
        parts.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentBlock {
    Paragraph(String),
    /// `info` is the full info string after the opening fence.
    CodeBlock {
        fence: String,
        info: String,
        text: String,
    },
    /// `rows[0]` is the header row. `alignment` holds the raw delimiter cells.
    Table {
        rows: Vec<Vec<String>>,
        alignment: Vec<String>,
    },
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Paragraph(_) => "paragraph",
            Self::CodeBlock { .. } => "code",
            Self::Table { .. } => "table",
        }
    }

    /// Language tag of a code block: first word of its info string.
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::CodeBlock { info, .. } => info.split_whitespace().next(),
            Self::Paragraph(_) | Self::Table { .. } => None,
        }
    }

    pub fn plain_text(&self) -> String {
        match self {
            Self::Paragraph(text) => text.clone(),
            Self::CodeBlock { text, .. } => text.clone(),
            Self::Table { rows, .. } => rows
                .iter()
                .map(|row| row.join(" "))
                .collect::<Vec<String>>()
                .join("\n"),
        }
    }
}

/// Address of a root section: owning document plus position among its roots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SectionId {
    pub document: String,
    pub ordinal: usize,
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.document, self.ordinal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub chapter: u32,
    pub title: String,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub file: String,
    pub chapter: Option<u32>,
    pub title: Option<String>,
    pub sections: usize,
    /// Content block counts by kind across the whole document.
    pub blocks: BTreeMap<String, usize>,
    pub code_languages: BTreeSet<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedSource {
    pub file: String,
    pub line: Option<usize>,
    pub reason: String,
}

impl From<&LoadError> for FailedSource {
    fn from(error: &LoadError) -> Self {
        Self {
            file: error.document().to_string(),
            line: error.line(),
            reason: error.reason(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotesInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub documents: Vec<SourceEntry>,
    pub failures: Vec<FailedSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildPaths {
    pub notes_dir: String,
    pub index_file: String,
    pub merged_path: String,
    pub report_path: String,
    pub json_report_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildCounts {
    pub documents_loaded: usize,
    pub documents_failed: usize,
    pub root_sections: usize,
    pub duplicate_groups: usize,
    pub sections_discarded: usize,
    pub index_entries: usize,
    pub resolved: usize,
    pub missing: usize,
    pub orphaned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscardedSection {
    pub section: SectionId,
    pub heading: String,
    pub line: usize,
    pub canonical: SectionId,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub threshold: f64,
    pub metric: String,
    pub exit_code: u8,
    pub paths: BuildPaths,
    pub counts: BuildCounts,
    pub source_hashes: Vec<SourceEntry>,
    pub failures: Vec<FailedSource>,
    pub discarded: Vec<DiscardedSection>,
    pub warnings: Vec<String>,
}
