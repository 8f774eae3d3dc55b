use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::DuplicatesArgs;
use crate::config::{SimilarityConfig, ensure_notes_dir};
use crate::dedup::{DedupOutcome, DuplicateGroup, deduplicate};
use crate::index::{EXIT_OK, EXIT_PARSE_FAILURE};
use crate::loader::DocumentLoader;
use crate::model::{DiscardedSection, FailedSource};

#[cfg(test)]
mod tests;

#[derive(Debug, Serialize)]
struct DuplicatesResponse<'a> {
    threshold: f64,
    metric: &'static str,
    documents: usize,
    groups: &'a [DuplicateGroup],
    discarded: &'a [DiscardedSection],
    failures: &'a [FailedSource],
}

pub fn run(args: DuplicatesArgs) -> Result<u8> {
    let config = SimilarityConfig::from_args(&args.similarity)?;
    ensure_notes_dir(&args.notes_dir)?;

    let notes = DocumentLoader::new(&args.notes_dir)?.load_all()?;
    let outcome = deduplicate(&notes.documents, &config);
    let failures = notes
        .failures
        .iter()
        .map(FailedSource::from)
        .collect::<Vec<FailedSource>>();

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        let response = DuplicatesResponse {
            threshold: config.threshold,
            metric: config.metric.as_str(),
            documents: notes.documents.len(),
            groups: &outcome.groups,
            discarded: &outcome.discarded,
            failures: &failures,
        };
        write_json_response(&mut output, &response)?;
    } else {
        write_text_response(&mut output, &outcome, &failures)?;
    }
    output.flush()?;

    Ok(if failures.is_empty() {
        EXIT_OK
    } else {
        EXIT_PARSE_FAILURE
    })
}

fn write_json_response<W: Write>(output: &mut W, response: &DuplicatesResponse<'_>) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, response)
        .context("failed to serialize duplicates json output")?;
    writeln!(output)?;
    Ok(())
}

fn write_text_response<W: Write>(
    output: &mut W,
    outcome: &DedupOutcome,
    failures: &[FailedSource],
) -> Result<()> {
    writeln!(
        output,
        "Groups: {} discarded={}",
        outcome.groups.len(),
        outcome.discarded.len()
    )?;

    for group in &outcome.groups {
        writeln!(
            output,
            "{}\tcanonical={}\tline {}",
            group.key, group.canonical_id, group.canonical.line
        )?;
        for (member, score) in group.members.iter().zip(&group.similarities) {
            let marker = if member == &group.canonical_id { "*" } else { "-" };
            writeln!(output, "\t{marker} {member}\tsimilarity={score:.3}")?;
        }
    }

    for failure in failures {
        let location = match failure.line {
            Some(line) => format!("{}:{line}", failure.file),
            None => failure.file.clone(),
        };
        writeln!(output, "FAILED {location} {}", failure.reason)?;
    }

    Ok(())
}
