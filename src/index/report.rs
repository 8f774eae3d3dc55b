use serde::Serialize;

use crate::error::IndexMismatchError;
use crate::model::FailedSource;

pub const EXIT_OK: u8 = 0;
pub const EXIT_MISSING: u8 = 1;
pub const EXIT_PARSE_FAILURE: u8 = 2;
/// Configuration errors and unreadable inputs or outputs.
pub const EXIT_FATAL: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportEntry {
    Resolved {
        chapter: u32,
        title: String,
        document: String,
    },
    Missing {
        chapter: u32,
        title: String,
        file: String,
    },
    Orphaned {
        file: String,
    },
}

impl ReportEntry {
    pub fn line(&self) -> String {
        match self {
            Self::Resolved { chapter, title, .. } => format!("OK {chapter} {title}"),
            Self::Missing { chapter, title, .. } => format!("MISSING {chapter} {title}"),
            Self::Orphaned { file } => format!("ORPHANED {file}"),
        }
    }

    pub fn mismatch(&self) -> Option<IndexMismatchError> {
        match self {
            Self::Resolved { .. } => None,
            Self::Missing {
                chapter,
                title,
                file,
            } => Some(IndexMismatchError::MissingChapter {
                chapter: *chapter,
                title: title.clone(),
                file: file.clone(),
            }),
            Self::Orphaned { file } => {
                Some(IndexMismatchError::OrphanedDocument { file: file.clone() })
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub entries: Vec<ReportEntry>,
    pub failures: Vec<FailedSource>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn resolved_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, ReportEntry::Resolved { .. }))
            .count()
    }

    pub fn missing_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, ReportEntry::Missing { .. }))
            .count()
    }

    pub fn orphaned_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, ReportEntry::Orphaned { .. }))
            .count()
    }

    pub fn mismatches(&self) -> Vec<IndexMismatchError> {
        self.entries.iter().filter_map(ReportEntry::mismatch).collect()
    }

    /// Parse failures outrank missing chapters.
    pub fn exit_code(&self) -> u8 {
        if !self.failures.is_empty() {
            EXIT_PARSE_FAILURE
        } else if self.missing_count() > 0 {
            EXIT_MISSING
        } else {
            EXIT_OK
        }
    }

    pub fn render_text(&self) -> String {
        let mut lines = self
            .entries
            .iter()
            .map(ReportEntry::line)
            .collect::<Vec<String>>();

        for failure in &self.failures {
            let location = match failure.line {
                Some(line) => format!("{}:{line}", failure.file),
                None => failure.file.clone(),
            };
            lines.push(format!("FAILED {location} {}", failure.reason));
        }
        for warning in &self.warnings {
            lines.push(format!("WARNING {warning}"));
        }

        if lines.is_empty() {
            return String::new();
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}
