use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "tournotes",
    version,
    about = "Validate, deduplicate and assemble chapter notes into one reference"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the merged reference document and the validation report.
    Build(BuildArgs),
    /// Run the full pipeline and print the validation report only.
    Check(CheckArgs),
    /// Record every note file with its chapter, title and hash.
    Inventory(InventoryArgs),
    /// List duplicate section groups.
    Duplicates(DuplicatesArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SimilarityMetric {
    /// |A ∩ B| / |A ∪ B| over body tokens.
    Jaccard,
    /// |A ∩ B| / min(|A|, |B|); a draft contained in a fuller copy scores 1.
    Overlap,
}

impl SimilarityMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jaccard => "jaccard",
            Self::Overlap => "overlap",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimilarityArgs {
    /// Minimum similarity for two same-heading sections to be merged. Falls
    /// back to TOURNOTES_SIMILARITY_THRESHOLD, then 0.8.
    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, value_enum, default_value_t = SimilarityMetric::Jaccard)]
    pub metric: SimilarityMetric,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    pub notes_dir: PathBuf,

    pub index_file: PathBuf,

    #[arg(long = "out")]
    pub out_path: PathBuf,

    #[arg(long = "report")]
    pub report_path: PathBuf,

    #[arg(long)]
    pub json_report_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub similarity: SimilarityArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    pub notes_dir: PathBuf,

    pub index_file: PathBuf,

    #[command(flatten)]
    pub similarity: SimilarityArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    pub notes_dir: PathBuf,

    #[arg(long, default_value = ".cache/tournotes/notes_inventory.json")]
    pub manifest_path: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DuplicatesArgs {
    pub notes_dir: PathBuf,

    #[command(flatten)]
    pub similarity: SimilarityArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
