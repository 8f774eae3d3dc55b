use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::config::ensure_notes_dir;
use crate::index::{EXIT_OK, EXIT_PARSE_FAILURE};
use crate::loader::DocumentLoader;
use crate::model::{Document, FailedSource, NotesInventoryManifest};
use crate::util::{now_utc_string, write_json_pretty};

#[cfg(test)]
mod tests;

pub fn run(args: InventoryArgs) -> Result<u8> {
    let manifest = build_manifest(&args.notes_dir)?;
    let exit_code = if manifest.failures.is_empty() {
        EXIT_OK
    } else {
        EXIT_PARSE_FAILURE
    };

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            failures = manifest.failures.len(),
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(exit_code);
    }

    write_json_pretty(&args.manifest_path, &manifest)?;
    info!(path = %args.manifest_path.display(), "wrote inventory manifest");
    info!(document_count = manifest.document_count, "inventory completed");

    Ok(exit_code)
}

pub fn build_manifest(notes_dir: &Path) -> Result<NotesInventoryManifest> {
    ensure_notes_dir(notes_dir)?;

    let notes = DocumentLoader::new(notes_dir)?.load_all()?;
    if notes.documents.is_empty() && notes.failures.is_empty() {
        bail!("no note files found in {}", notes_dir.display());
    }

    let mut documents = notes
        .documents
        .iter()
        .map(Document::source_entry)
        .collect::<Vec<_>>();
    documents.sort_by(|a, b| a.chapter.cmp(&b.chapter).then(a.file.cmp(&b.file)));

    let failures = notes
        .failures
        .iter()
        .map(FailedSource::from)
        .collect::<Vec<FailedSource>>();

    Ok(NotesInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: notes_dir.display().to_string(),
        document_count: documents.len(),
        documents,
        failures,
    })
}
