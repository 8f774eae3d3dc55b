use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SimilarityConfig;
use crate::model::{ContentBlock, DiscardedSection, Document, Section, SectionId};
use crate::render::render_document;
use crate::util::{normalize_whitespace, sha256_text};

mod similarity;

pub use similarity::{heading_key, similarity, token_set};

/// Root sections judged near-identical, with the one kept in their place.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub members: Vec<SectionId>,
    pub canonical_id: SectionId,
    #[serde(skip)]
    pub canonical: Section,
    /// Similarity of each member to the canonical section, parallel to
    /// `members`.
    pub similarities: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub groups: Vec<DuplicateGroup>,
    /// Every root section mapped to its group's canonical section. Sections
    /// outside any group map to themselves.
    pub canonical: BTreeMap<SectionId, SectionId>,
    pub discarded: Vec<DiscardedSection>,
}

struct Candidate<'a> {
    id: SectionId,
    section: &'a Section,
    tokens: BTreeSet<String>,
    distinct_blocks: usize,
    text_len: usize,
}

impl<'a> Candidate<'a> {
    fn new(id: SectionId, section: &'a Section) -> Self {
        let body = section.body_text();
        let distinct_blocks = section
            .subtree_blocks()
            .into_iter()
            .collect::<HashSet<&ContentBlock>>()
            .len();

        Self {
            id,
            section,
            tokens: token_set(&body),
            distinct_blocks,
            text_len: normalize_whitespace(&body).chars().count(),
        }
    }

    /// `Less` means `self` is the better canonical choice.
    fn completeness_order(&self, other: &Self) -> Ordering {
        other
            .distinct_blocks
            .cmp(&self.distinct_blocks)
            .then(other.text_len.cmp(&self.text_len))
            .then(self.id.cmp(&other.id))
    }
}

/// Groups root sections by heading key and body similarity. Pure: the same
/// documents in any order give the same outcome.
pub fn deduplicate(documents: &[Document], config: &SimilarityConfig) -> DedupOutcome {
    let mut buckets = BTreeMap::<String, Vec<Candidate<'_>>>::new();
    let mut outcome = DedupOutcome::default();

    for document in documents {
        for (ordinal, section) in document.sections.iter().enumerate() {
            let id = SectionId {
                document: document.id.clone(),
                ordinal,
            };
            outcome.canonical.insert(id.clone(), id.clone());

            let key = heading_key(&section.heading);
            if key.is_empty() {
                continue;
            }
            buckets
                .entry(key)
                .or_default()
                .push(Candidate::new(id, section));
        }
    }

    for (key, mut candidates) in buckets {
        if candidates.len() < 2 {
            continue;
        }
        candidates.sort_by(|left, right| left.completeness_order(right));

        // The most complete remaining section claims everything within the
        // threshold of itself. Members are never linked through each other.
        let mut remaining = (0..candidates.len()).collect::<Vec<usize>>();
        while let Some((&best, rest)) = remaining.split_first() {
            let canonical = &candidates[best];
            let (mut members, left_over): (Vec<usize>, Vec<usize>) =
                rest.iter().copied().partition(|&index| {
                    similarity(&candidates[index].tokens, &canonical.tokens, config.metric)
                        >= config.threshold
                });
            remaining = left_over;

            if members.is_empty() {
                continue;
            }
            members.push(best);
            members.sort_by(|&left, &right| candidates[left].id.cmp(&candidates[right].id));

            let mut group = DuplicateGroup {
                key: key.clone(),
                members: Vec::with_capacity(members.len()),
                canonical_id: canonical.id.clone(),
                canonical: canonical.section.clone(),
                similarities: Vec::with_capacity(members.len()),
            };

            for &index in &members {
                let member = &candidates[index];
                let score = similarity(&member.tokens, &canonical.tokens, config.metric);
                group.members.push(member.id.clone());
                group.similarities.push(score);
                outcome
                    .canonical
                    .insert(member.id.clone(), canonical.id.clone());

                if index != best {
                    outcome.discarded.push(DiscardedSection {
                        section: member.id.clone(),
                        heading: member.section.heading.clone(),
                        line: member.section.line,
                        canonical: canonical.id.clone(),
                        similarity: score,
                    });
                }
            }

            debug!(
                key = %group.key,
                members = group.members.len(),
                canonical = %group.canonical_id,
                "duplicate group"
            );
            outcome.groups.push(group);
        }
    }

    outcome
        .groups
        .sort_by(|left, right| left.members[0].cmp(&right.members[0]));
    outcome
        .discarded
        .sort_by(|left, right| left.section.cmp(&right.section));

    info!(
        sections = outcome.canonical.len(),
        groups = outcome.groups.len(),
        discarded = outcome.discarded.len(),
        threshold = config.threshold,
        metric = config.metric.as_str(),
        "deduplicated sections"
    );

    outcome
}

impl DedupOutcome {
    pub fn group_for(&self, id: &SectionId) -> Option<&DuplicateGroup> {
        let canonical = self.canonical.get(id)?;
        self.groups
            .iter()
            .find(|group| &group.canonical_id == canonical)
    }

    /// Rebuilds `documents` (already in output order) with each duplicate
    /// group collapsed: the canonical section takes the place of the first
    /// member encountered and later members are dropped. Inputs are not
    /// modified.
    pub fn canonicalize(&self, documents: &[&Document]) -> Vec<Document> {
        let mut emitted = HashSet::<SectionId>::new();
        let mut merged = Vec::with_capacity(documents.len());

        for document in documents {
            let mut sections = Vec::with_capacity(document.sections.len());
            for (ordinal, section) in document.sections.iter().enumerate() {
                let id = SectionId {
                    document: document.id.clone(),
                    ordinal,
                };

                match self.group_for(&id) {
                    Some(group) => {
                        if emitted.insert(group.canonical_id.clone()) {
                            sections.push(rehome(&group.canonical, &document.id));
                        }
                    }
                    None => sections.push(section.clone()),
                }
            }

            let mut rebuilt = Document {
                id: document.id.clone(),
                path: document.path.clone(),
                source: String::new(),
                sha256: String::new(),
                chapter: document.chapter,
                title: document.title.clone(),
                preamble: document.preamble.clone(),
                sections,
            };
            rebuilt.source = render_document(&rebuilt);
            rebuilt.sha256 = sha256_text(&rebuilt.source);
            merged.push(rebuilt);
        }

        merged
    }
}

/// Copy of `section` owned by `document`.
fn rehome(section: &Section, document: &str) -> Section {
    Section {
        heading: section.heading.clone(),
        level: section.level,
        line: section.line,
        document: document.to_string(),
        blocks: section.blocks.clone(),
        children: section
            .children
            .iter()
            .map(|child| rehome(child, document))
            .collect(),
    }
}
