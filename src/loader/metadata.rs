use anyhow::{Context, Result};
use regex::Regex;

use crate::model::Section;

#[derive(Debug)]
pub struct ChapterMetadataParser {
    chapter_heading_regex: Regex,
    digits_regex: Regex,
}

impl ChapterMetadataParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chapter_heading_regex: Regex::new(r"(?i)^chapter\s+(\d+)\s*(?:[:.\-–—]\s*)?(.*)$")
                .context("failed to compile chapter heading regex")?,
            digits_regex: Regex::new(r"\d+").context("failed to compile digit run regex")?,
        })
    }

    /// Chapter number and title for a document. The first level-1 heading
    /// (else the first root heading) supplies the title; the chapter number
    /// comes from a `Chapter N` prefix or, failing that, the file stem.
    pub fn derive(&self, file_name: &str, sections: &[Section]) -> (Option<u32>, Option<String>) {
        let heading = sections
            .iter()
            .find(|section| section.level == 1)
            .or_else(|| sections.first())
            .map(|section| section.heading.trim())
            .filter(|heading| !heading.is_empty());

        let mut chapter = None;
        let mut title = heading.map(ToOwned::to_owned);

        if let Some(captures) = heading.and_then(|value| self.chapter_heading_regex.captures(value)) {
            chapter = captures
                .get(1)
                .and_then(|value| value.as_str().parse::<u32>().ok());
            let rest = captures
                .get(2)
                .map(|value| value.as_str().trim())
                .unwrap_or_default();
            if !rest.is_empty() {
                title = Some(rest.to_string());
            }
        }

        if chapter.is_none() {
            let stem = file_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(file_name);
            chapter = self
                .digits_regex
                .find(stem)
                .and_then(|value| value.as_str().parse::<u32>().ok());
        }

        (chapter, title)
    }
}
