use anyhow::{Context, Result};
use regex::Regex;

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{ContentBlock, Section};

#[derive(Debug, Default, PartialEq)]
pub struct ParsedBody {
    pub preamble: Vec<ContentBlock>,
    pub sections: Vec<Section>,
}

/// Line-oriented Markdown splitter: headings, fenced code, pipe tables and
/// paragraphs. Everything else is paragraph text.
#[derive(Debug)]
pub struct MarkdownParser {
    heading_regex: Regex,
    fence_regex: Regex,
    delimiter_cell_regex: Regex,
}

impl MarkdownParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            heading_regex: Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$")
                .context("failed to compile heading regex")?,
            fence_regex: Regex::new(r"^\s*(`{3,}|~{3,})(.*)$")
                .context("failed to compile code fence regex")?,
            delimiter_cell_regex: Regex::new(r"^:?-+:?$")
                .context("failed to compile table delimiter regex")?,
        })
    }

    pub fn parse(&self, document: &str, source: &str) -> Result<ParsedBody, ParseError> {
        let lines = source.lines().collect::<Vec<&str>>();
        let mut body = ParsedBody::default();
        let mut open = Vec::<Section>::new();
        let mut index = 0usize;

        while index < lines.len() {
            let line = lines[index];

            if line.trim().is_empty() {
                index += 1;
                continue;
            }

            if let Some((fence, info)) = self.fence_open(line) {
                let close = find_fence_close(&lines, index + 1, &fence).ok_or_else(|| ParseError {
                    document: document.to_string(),
                    line: index + 1,
                    kind: ParseErrorKind::UnterminatedFence {
                        fence: fence.clone(),
                    },
                })?;
                let text = lines[index + 1..close].join("\n");
                push_block(&mut open, &mut body, ContentBlock::CodeBlock { fence, info, text });
                index = close + 1;
                continue;
            }

            if let Some((level, heading)) = self.heading(line) {
                close_sections(&mut open, &mut body.sections, level);
                open.push(Section {
                    heading,
                    level,
                    line: index + 1,
                    document: document.to_string(),
                    blocks: Vec::new(),
                    children: Vec::new(),
                });
                index += 1;
                continue;
            }

            if let Some(header_cells) = self.table_start(&lines, index) {
                let (block, next) = self.parse_table(document, &lines, index, header_cells)?;
                push_block(&mut open, &mut body, block);
                index = next;
                continue;
            }

            let start = index;
            index += 1;
            while index < lines.len() && !self.ends_paragraph(&lines, index) {
                index += 1;
            }
            let text = lines[start..index]
                .iter()
                .map(|line| line.trim_end())
                .collect::<Vec<&str>>()
                .join("\n");
            push_block(&mut open, &mut body, ContentBlock::Paragraph(text));
        }

        close_sections(&mut open, &mut body.sections, 1);
        Ok(body)
    }

    fn heading(&self, line: &str) -> Option<(u8, String)> {
        let captures = self.heading_regex.captures(line)?;
        let level = captures.get(1).map(|m| m.as_str().len())?;
        let text = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Some((u8::try_from(level).ok()?, text))
    }

    fn fence_open(&self, line: &str) -> Option<(String, String)> {
        let captures = self.fence_regex.captures(line)?;
        let fence = captures.get(1)?.as_str().to_string();
        let info = captures
            .get(2)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if fence.starts_with('`') && info.contains('`') {
            return None;
        }
        Some((fence, info.to_string()))
    }

    fn delimiter_cells(&self, line: &str) -> Option<Vec<String>> {
        let trimmed = line.trim();
        if !trimmed.contains('-') || !trimmed.contains('|') {
            return None;
        }
        let cells = split_table_row(trimmed);
        let valid = !cells.is_empty()
            && cells
                .iter()
                .all(|cell| self.delimiter_cell_regex.is_match(cell));
        valid.then_some(cells)
    }

    /// Header cell count when `lines[index]` opens a pipe table.
    fn table_start(&self, lines: &[&str], index: usize) -> Option<usize> {
        let header = lines[index].trim();
        if !header.starts_with('|') {
            return None;
        }
        let delimiter = lines.get(index + 1)?;
        self.delimiter_cells(delimiter)?;
        Some(split_table_row(header).len())
    }

    fn parse_table(
        &self,
        document: &str,
        lines: &[&str],
        index: usize,
        header_cells: usize,
    ) -> Result<(ContentBlock, usize), ParseError> {
        let alignment = self
            .delimiter_cells(lines[index + 1])
            .unwrap_or_default();
        if alignment.len() != header_cells {
            return Err(ParseError {
                document: document.to_string(),
                line: index + 2,
                kind: ParseErrorKind::MalformedTable {
                    header_cells,
                    delimiter_cells: alignment.len(),
                },
            });
        }

        let mut rows = vec![split_table_row(lines[index].trim())];
        let mut next = index + 2;
        while let Some(line) = lines.get(next) {
            let trimmed = line.trim();
            if !trimmed.starts_with('|') {
                break;
            }
            rows.push(split_table_row(trimmed));
            next += 1;
        }

        Ok((ContentBlock::Table { rows, alignment }, next))
    }

    fn ends_paragraph(&self, lines: &[&str], index: usize) -> bool {
        let line = lines[index];
        line.trim().is_empty()
            || self.fence_open(line).is_some()
            || self.heading(line).is_some()
            || self.table_start(lines, index).is_some()
    }
}

fn find_fence_close(lines: &[&str], from: usize, fence: &str) -> Option<usize> {
    let marker = fence.chars().next()?;
    let min_len = fence.chars().count();
    (from..lines.len()).find(|&index| {
        let trimmed = lines[index].trim();
        trimmed.chars().count() >= min_len && trimmed.chars().all(|ch| ch == marker)
    })
}

/// Splits a pipe-table row into trimmed cells. Escaped pipes stay inside the
/// cell.
pub fn split_table_row(row: &str) -> Vec<String> {
    let trimmed = row.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = if inner.ends_with('|') && !inner.ends_with("\\|") {
        &inner[..inner.len() - 1]
    } else {
        inner
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in inner.chars() {
        if ch == '|' && !escaped {
            cells.push(current.trim().to_string());
            current.clear();
            continue;
        }
        escaped = ch == '\\' && !escaped;
        current.push(ch);
    }
    cells.push(current.trim().to_string());
    cells
}

fn push_block(open: &mut [Section], body: &mut ParsedBody, block: ContentBlock) {
    match open.last_mut() {
        Some(section) => section.blocks.push(block),
        None => body.preamble.push(block),
    }
}

/// Closes every open section whose level is `>= level`, attaching each to its
/// parent or to the root list.
fn close_sections(open: &mut Vec<Section>, roots: &mut Vec<Section>, level: u8) {
    while let Some(section) = open.pop() {
        if section.level < level {
            open.push(section);
            break;
        }
        match open.last_mut() {
            Some(parent) => parent.children.push(section),
            None => roots.push(section),
        }
    }
}
