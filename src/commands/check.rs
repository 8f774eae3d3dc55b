use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CheckArgs;
use crate::commands::build::{PipelineRun, assemble};
use crate::config::SimilarityConfig;


pub fn run(args: CheckArgs) -> Result<u8> {
    let config = SimilarityConfig::from_args(&args.similarity)?;
    let pipeline = assemble(&args.notes_dir, &args.index_file, &config)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    write_check_output(&mut output, &pipeline)?;
    output.flush()?;

    let exit_code = pipeline.index.report.exit_code();
    info!(exit_code, "check completed");
    Ok(exit_code)
}

fn write_check_output<W: Write>(output: &mut W, pipeline: &PipelineRun) -> Result<()> {
    let report = &pipeline.index.report;

    output
        .write_all(report.render_text().as_bytes())
        .context("failed to write validation report")?;
    writeln!(
        output,
        "Summary: resolved={} missing={} orphaned={} failed={} duplicate_groups={} discarded={}",
        report.resolved_count(),
        report.missing_count(),
        report.orphaned_count(),
        report.failures.len(),
        pipeline.dedup.groups.len(),
        pipeline.dedup.discarded.len(),
    )?;

    Ok(())
}
