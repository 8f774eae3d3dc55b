use std::collections::BTreeMap;

use tracing::info;

use crate::dedup::DedupOutcome;
use crate::error::LoadError;
use crate::model::{Document, FailedSource, IndexEntry};
use crate::render::render_document;

mod report;
mod toc;

pub use report::{
    EXIT_FATAL, EXIT_MISSING, EXIT_OK, EXIT_PARSE_FAILURE, ReportEntry, ValidationReport,
};
pub use toc::{IndexParser, ParsedIndex};

/// Validation report plus the merged reference document.
#[derive(Debug, Clone)]
pub struct IndexBuild {
    pub report: ValidationReport,
    pub merged: String,
    /// Document ids in merged order.
    pub order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Exact(String),
    Normalized { document: String, candidates: usize },
    Unresolved,
}

pub fn build_index(
    documents: &[Document],
    dedup: &DedupOutcome,
    index: &ParsedIndex,
    failures: &[LoadError],
) -> IndexBuild {
    let mut report = ValidationReport {
        warnings: index.warnings.clone(),
        failures: failures
            .iter()
            .map(FailedSource::from)
            .collect(),
        ..ValidationReport::default()
    };
    let mut chapters_by_document = BTreeMap::<String, u32>::new();

    for entry in &index.entries {
        match resolve_entry(entry, documents) {
            Resolution::Exact(document) => {
                record_chapter(&mut chapters_by_document, &document, entry.chapter);
                report.entries.push(ReportEntry::Resolved {
                    chapter: entry.chapter,
                    title: entry.title.clone(),
                    document,
                });
            }
            Resolution::Normalized {
                document,
                candidates,
            } => {
                if candidates > 1 {
                    report.warnings.push(format!(
                        "index line {}: {} matches {candidates} documents; using {document}",
                        entry.line, entry.file
                    ));
                }
                record_chapter(&mut chapters_by_document, &document, entry.chapter);
                report.entries.push(ReportEntry::Resolved {
                    chapter: entry.chapter,
                    title: entry.title.clone(),
                    document,
                });
            }
            Resolution::Unresolved => {
                report.entries.push(ReportEntry::Missing {
                    chapter: entry.chapter,
                    title: entry.title.clone(),
                    file: entry.file.clone(),
                });
            }
        }
    }

    let mut orphans = documents
        .iter()
        .filter(|document| !chapters_by_document.contains_key(&document.id))
        .collect::<Vec<&Document>>();
    orphans.sort_by(|left, right| left.id.cmp(&right.id));
    for orphan in &orphans {
        report.entries.push(ReportEntry::Orphaned {
            file: orphan.id.clone(),
        });
    }

    let mut ordered = documents
        .iter()
        .filter_map(|document| {
            chapters_by_document
                .get(&document.id)
                .map(|chapter| (*chapter, document))
        })
        .collect::<Vec<(u32, &Document)>>();
    ordered.sort_by(|left, right| left.0.cmp(&right.0).then(left.1.id.cmp(&right.1.id)));
    let ordered = ordered
        .into_iter()
        .map(|(_, document)| document)
        .chain(orphans)
        .collect::<Vec<&Document>>();

    let merged_documents = dedup.canonicalize(&ordered);
    let merged = render_merged(&merged_documents);

    info!(
        resolved = report.resolved_count(),
        missing = report.missing_count(),
        orphaned = report.orphaned_count(),
        failed = report.failures.len(),
        warnings = report.warnings.len(),
        "validated index"
    );

    IndexBuild {
        report,
        merged,
        order: merged_documents
            .iter()
            .map(|document| document.id.clone())
            .collect(),
    }
}

pub fn render_merged(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|document| {
            let body = render_document(document);
            if body.is_empty() {
                format!("<!-- source: {} -->\n", document.id)
            } else {
                format!("<!-- source: {} -->\n\n{body}", document.id)
            }
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// File name component of an index target, with `%20` decoded.
fn target_file_name(target: &str) -> String {
    let name = target.rsplit(['/', '\\']).next().unwrap_or(target);
    name.replace("%20", " ")
}

/// Loose file key: file name only, lowercase, no extension, no punctuation,
/// digit runs without leading zeros. `Chapter 1.md` and `chapter-01.md`
/// share a key.
pub fn normalized_file_key(name: &str) -> String {
    let file = target_file_name(name);
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file.as_str(),
    };

    let mut key = String::with_capacity(stem.len());
    let mut digits = String::new();
    for ch in stem.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        flush_digits(&mut key, &mut digits);
        if ch.is_alphanumeric() {
            key.push(ch);
        }
    }
    flush_digits(&mut key, &mut digits);
    key
}

fn flush_digits(key: &mut String, digits: &mut String) {
    if digits.is_empty() {
        return;
    }
    let trimmed = digits.trim_start_matches('0');
    key.push_str(if trimmed.is_empty() { "0" } else { trimmed });
    digits.clear();
}

fn resolve_entry(entry: &IndexEntry, documents: &[Document]) -> Resolution {
    let file_name = target_file_name(&entry.file);
    if let Some(document) = documents.iter().find(|document| document.id == file_name) {
        return Resolution::Exact(document.id.clone());
    }

    let key = normalized_file_key(&entry.file);
    if key.is_empty() {
        return Resolution::Unresolved;
    }

    let mut matches = documents
        .iter()
        .filter(|document| normalized_file_key(&document.id) == key)
        .map(|document| document.id.as_str())
        .collect::<Vec<&str>>();
    matches.sort_unstable();

    match matches.first() {
        Some(first) => Resolution::Normalized {
            document: (*first).to_string(),
            candidates: matches.len(),
        },
        None => Resolution::Unresolved,
    }
}

fn record_chapter(chapters: &mut BTreeMap<String, u32>, document: &str, chapter: u32) {
    chapters
        .entry(document.to_string())
        .and_modify(|current| *current = (*current).min(chapter))
        .or_insert(chapter);
}
