use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::loader::split_table_row;
use crate::model::IndexEntry;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedIndex {
    pub entries: Vec<IndexEntry>,
    pub warnings: Vec<String>,
}

/// Reads a table of contents in any of the shapes notes repositories tend to
/// use: a pipe table, `|`- or tab-delimited lines, or a README list of links.
#[derive(Debug)]
pub struct IndexParser {
    list_link_regex: Regex,
    cell_link_regex: Regex,
    chapter_cell_regex: Regex,
    chapter_in_title_regex: Regex,
    delimiter_cell_regex: Regex,
}

impl IndexParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            list_link_regex: Regex::new(
                r"^(?:[-*+]\s+)?(?:(\d+)[.)]?\s+)?\[([^\]]+)\]\(<?([^)>\s]+)>?\)",
            )
            .context("failed to compile index list link regex")?,
            cell_link_regex: Regex::new(r"^\[([^\]]*)\]\(<?([^)>\s]+)>?\)$")
                .context("failed to compile index cell link regex")?,
            chapter_cell_regex: Regex::new(r"(?i)^(?:ch(?:apter)?\.?\s*)?(\d+)[.)]?$")
                .context("failed to compile chapter cell regex")?,
            chapter_in_title_regex: Regex::new(r"(?i)\bchapter\s+(\d+)\b")
                .context("failed to compile chapter title regex")?,
            delimiter_cell_regex: Regex::new(r"^:?-+:?$")
                .context("failed to compile index delimiter regex")?,
        })
    }

    pub fn parse(&self, source: &str) -> ParsedIndex {
        let lines = source.lines().collect::<Vec<&str>>();
        let mut parsed = ParsedIndex::default();

        for (index, raw_line) in lines.iter().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with("<!--") {
                continue;
            }

            if let Some(captures) = self.list_link_regex.captures(line) {
                let title = captures
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                let file = captures
                    .get(3)
                    .map(|m| note_path(m.as_str()).to_string())
                    .unwrap_or_default();
                if !links_to_note(&file) {
                    continue;
                }
                let chapter = captures
                    .get(1)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .or_else(|| self.chapter_from_title(&title));

                match chapter {
                    Some(chapter) => parsed.entries.push(IndexEntry {
                        chapter,
                        title,
                        file,
                        line: line_number,
                    }),
                    None => parsed.warnings.push(format!(
                        "index line {line_number}: no chapter number for link to {file}"
                    )),
                }
                continue;
            }

            let cells = if line.contains('|') {
                split_table_row(line)
            } else if line.contains('\t') {
                line.split('\t').map(|cell| cell.trim().to_string()).collect()
            } else {
                continue;
            };

            if self.is_delimiter_row(&cells) {
                continue;
            }
            if !line.starts_with('|') && !self.looks_like_entry(&cells) {
                continue;
            }
            let next_is_delimiter = lines
                .get(index + 1)
                .map(|next| next.contains('|') && self.is_delimiter_row(&split_table_row(next)))
                .unwrap_or(false);
            if next_is_delimiter {
                continue;
            }

            match self.entry_from_cells(&cells, line_number) {
                Ok(entry) => parsed.entries.push(entry),
                Err(warning) => parsed.warnings.push(warning),
            }
        }

        let mut seen = BTreeMap::<u32, usize>::new();
        for entry in &parsed.entries {
            if let Some(first_line) = seen.insert(entry.chapter, entry.line) {
                parsed.warnings.push(format!(
                    "index line {}: chapter {} already listed on line {first_line}",
                    entry.line, entry.chapter
                ));
            }
        }

        parsed
    }

    fn entry_from_cells(&self, cells: &[String], line_number: usize) -> Result<IndexEntry, String> {
        let cells = cells
            .iter()
            .filter(|cell| !cell.is_empty())
            .collect::<Vec<&String>>();
        let Some(first) = cells.first() else {
            return Err(format!("index line {line_number}: empty row"));
        };

        let chapter = self
            .chapter_cell_regex
            .captures(first)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| format!("index line {line_number}: chapter `{first}` is not a number"))?;

        if cells.len() < 3 {
            return Err(format!(
                "index line {line_number}: expected chapter, title and file but found {} cells",
                cells.len()
            ));
        }

        let (title, _) = self.unlink(cells[1]);
        let (file_text, file_target) = self.unlink(cells[2]);

        let file = file_target.unwrap_or(file_text);

        Ok(IndexEntry {
            chapter,
            title,
            file: note_path(&file).to_string(),
            line: line_number,
        })
    }

    /// Link text and target of a `[text](target)` cell; plain cells have no
    /// target.
    fn unlink(&self, cell: &str) -> (String, Option<String>) {
        match self.cell_link_regex.captures(cell) {
            Some(captures) => (
                captures
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                captures.get(2).map(|m| m.as_str().to_string()),
            ),
            None => (cell.trim().trim_matches('`').to_string(), None),
        }
    }

    fn chapter_from_title(&self, title: &str) -> Option<u32> {
        self.chapter_in_title_regex
            .captures(title)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    }

    /// A bare delimited line counts as an entry when it starts with a chapter
    /// number or names a note file; anything else is prose.
    fn looks_like_entry(&self, cells: &[String]) -> bool {
        let starts_with_chapter = cells
            .iter()
            .find(|cell| !cell.is_empty())
            .is_some_and(|cell| self.chapter_cell_regex.is_match(cell));

        starts_with_chapter
            || cells.iter().any(|cell| {
                let (text, target) = self.unlink(cell);
                links_to_note(note_path(target.as_deref().unwrap_or(&text)))
            })
    }

    fn is_delimiter_row(&self, cells: &[String]) -> bool {
        let non_empty = cells
            .iter()
            .filter(|cell| !cell.is_empty())
            .collect::<Vec<&String>>();
        !non_empty.is_empty()
            && non_empty
                .iter()
                .all(|cell| self.delimiter_cell_regex.is_match(cell))
    }
}

/// Link target without its `#fragment` or `?query`.
fn note_path(target: &str) -> &str {
    target.split(['#', '?']).next().unwrap_or(target)
}

/// Local link to a notes file. URLs, mail links and in-page anchors are not.
fn links_to_note(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    if lower.contains("://") || lower.starts_with("mailto:") {
        return false;
    }
    [".md", ".markdown", ".txt"]
        .iter()
        .any(|extension| lower.ends_with(extension))
}
