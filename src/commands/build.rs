use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::BuildArgs;
use crate::config::{SimilarityConfig, ensure_index_file, ensure_notes_dir};
use crate::dedup::{DedupOutcome, deduplicate};
use crate::index::{EXIT_MISSING, EXIT_OK, IndexBuild, IndexParser, build_index};
use crate::loader::{BYTE_ORDER_MARK, DocumentLoader, LoadedNotes};
use crate::model::{BuildCounts, BuildPaths, BuildRunManifest, Document};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty, write_text_file};


const MANIFEST_VERSION: u32 = 1;

/// Everything one load → dedup → validate pass produced.
#[derive(Debug)]
pub struct PipelineRun {
    pub notes: LoadedNotes,
    pub dedup: DedupOutcome,
    pub index: IndexBuild,
}

pub fn run(args: BuildArgs) -> Result<u8> {
    let config = SimilarityConfig::from_args(&args.similarity)?;
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    info!(
        run_id = %run_id,
        notes_dir = %args.notes_dir.display(),
        index_file = %args.index_file.display(),
        threshold = config.threshold,
        metric = config.metric.as_str(),
        "starting build"
    );

    let pipeline = assemble(&args.notes_dir, &args.index_file, &config)?;
    let report = &pipeline.index.report;

    write_text_file(&args.out_path, &pipeline.index.merged)?;
    info!(path = %args.out_path.display(), documents = pipeline.index.order.len(), "wrote merged reference");

    write_text_file(&args.report_path, &report.render_text())?;
    info!(path = %args.report_path.display(), "wrote validation report");

    if let Some(path) = &args.json_report_path {
        write_json_pretty(path, report)?;
        info!(path = %path.display(), "wrote json validation report");
    }

    let exit_code = report.exit_code();

    if let Some(path) = &args.manifest_path {
        let manifest = build_manifest(&args, &config, &pipeline, run_id.clone(), started_at, exit_code);
        write_json_pretty(path, &manifest)?;
        info!(path = %path.display(), "wrote build manifest");
    }

    info!(run_id = %run_id, exit_code, "build completed");
    Ok(exit_code)
}

/// Loads, deduplicates and validates. Configuration problems surface before
/// any note is read; per-file parse failures are carried in the report.
pub fn assemble(notes_dir: &Path, index_file: &Path, config: &SimilarityConfig) -> Result<PipelineRun> {
    ensure_notes_dir(notes_dir)?;
    ensure_index_file(index_file)?;

    let index_source = fs::read_to_string(index_file)
        .with_context(|| format!("failed to read index file {}", index_file.display()))?;
    let parsed_index =
        IndexParser::new()?.parse(index_source.trim_start_matches(BYTE_ORDER_MARK));
    info!(
        entries = parsed_index.entries.len(),
        warnings = parsed_index.warnings.len(),
        path = %index_file.display(),
        "parsed index"
    );

    let loader = DocumentLoader::new(notes_dir)?.excluding(index_file);
    let notes = loader.load_all()?;
    let dedup = deduplicate(&notes.documents, config);
    let index = build_index(&notes.documents, &dedup, &parsed_index, &notes.failures);

    for mismatch in index.report.mismatches() {
        warn!(kind = ?mismatch.kind(), "{mismatch}");
    }
    for warning in &index.report.warnings {
        warn!(warning = %warning, "index warning");
    }

    Ok(PipelineRun {
        notes,
        dedup,
        index,
    })
}

fn build_manifest(
    args: &BuildArgs,
    config: &SimilarityConfig,
    pipeline: &PipelineRun,
    run_id: String,
    started_at: String,
    exit_code: u8,
) -> BuildRunManifest {
    let report = &pipeline.index.report;
    let status = match exit_code {
        EXIT_OK => "completed",
        EXIT_MISSING => "completed_with_missing_chapters",
        _ => "completed_with_parse_failures",
    };

    BuildRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_build_command(args, config),
        threshold: config.threshold,
        metric: config.metric.as_str().to_string(),
        exit_code,
        paths: BuildPaths {
            notes_dir: args.notes_dir.display().to_string(),
            index_file: args.index_file.display().to_string(),
            merged_path: args.out_path.display().to_string(),
            report_path: args.report_path.display().to_string(),
            json_report_path: args
                .json_report_path
                .as_ref()
                .map(|path| path.display().to_string()),
        },
        counts: BuildCounts {
            documents_loaded: pipeline.notes.documents.len(),
            documents_failed: pipeline.notes.failures.len(),
            root_sections: pipeline.dedup.canonical.len(),
            duplicate_groups: pipeline.dedup.groups.len(),
            sections_discarded: pipeline.dedup.discarded.len(),
            index_entries: report.resolved_count() + report.missing_count(),
            resolved: report.resolved_count(),
            missing: report.missing_count(),
            orphaned: report.orphaned_count(),
        },
        source_hashes: pipeline
            .notes
            .documents
            .iter()
            .map(Document::source_entry)
            .collect(),
        failures: report.failures.clone(),
        discarded: pipeline.dedup.discarded.clone(),
        warnings: report.warnings.clone(),
    }
}

fn render_build_command(args: &BuildArgs, config: &SimilarityConfig) -> String {
    let mut command = format!(
        "tournotes build {} {} --out {} --report {} --threshold {} --metric {}",
        args.notes_dir.display(),
        args.index_file.display(),
        args.out_path.display(),
        args.report_path.display(),
        config.threshold,
        config.metric.as_str()
    );
    if let Some(path) = &args.json_report_path {
        command.push_str(&format!(" --json-report-path {}", path.display()));
    }
    if let Some(path) = &args.manifest_path {
        command.push_str(&format!(" --manifest-path {}", path.display()));
    }
    command
}
