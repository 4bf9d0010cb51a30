use std::{num::NonZeroUsize, path::PathBuf};

use barcode_index::{
    alignment::DistanceMeasure, ngram_index::DEFAULT_NGRAM_LENGTH, token::BarcodeLayout,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: CliCommands,
}

#[derive(Subcommand)]
pub enum CliCommands {
    /// Index the UMI and well id tokens of barcode reads by their n-grams.
    CreateIndex(CreateIndexCommand),

    /// Group the indexed tokens with their near-duplicates.
    Cluster(ClusterCommand),

    /// Find known well ids inside the indexed tokens.
    LocateWells(LocateWellsCommand),

    /// Count the UMIs around each frequent UMI at increasing substitution distances.
    CountNeighbours(CountNeighboursCommand),

    /// Write the pairwise distances between frequent UMIs as CSV.
    DistanceMatrix(DistanceMatrixCommand),

    /// Write synthetic barcode reads.
    GenerateReads(GenerateReadsCommand),
}

#[derive(Args)]
pub struct CreateIndexCommand {
    /// Lines of the form `read_id<TAB>sequence`.
    /// The amplicon id is the part of the read id after the last `:`.
    #[arg(long, short)]
    pub input: PathBuf,

    #[arg(long, short)]
    pub output: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[arg(long, short, default_value_t = DEFAULT_NGRAM_LENGTH)]
    pub n_gram_length: usize,

    /// Compute the n-gram histogram of every token while indexing.
    #[arg(long)]
    pub build_histogram_cache: bool,

    /// Keep at most this many histograms in memory.
    #[arg(long)]
    pub histogram_cache_capacity: Option<NonZeroUsize>,
}

#[derive(Args)]
pub struct ClusterCommand {
    /// An index created with `create-index`.
    #[arg(long, short)]
    pub index: PathBuf,

    /// Number of query n-grams a near-duplicate may miss.
    #[arg(long, default_value_t = 2)]
    pub max_mismatches: usize,

    /// Require this fraction of shared n-grams instead of a number of mismatches.
    #[arg(long)]
    pub min_similarity: Option<f64>,

    /// Only use tokens read at least this often as cluster centres.
    #[arg(long, default_value_t = 1)]
    pub min_count: usize,
}

#[derive(Args)]
pub struct LocateWellsCommand {
    /// An index created with `create-index`.
    #[arg(long, short)]
    pub index: PathBuf,

    /// One known well id per line.
    #[arg(long, short)]
    pub wells: PathBuf,

    /// Number of well id n-grams that may be missing in a token.
    #[arg(long, default_value_t = 2)]
    pub max_mismatch: usize,

    /// Expected start of the well id within the token.
    #[arg(long, default_value_t = 16)]
    pub expected_position: usize,

    /// How far the well id may be shifted from its expected start.
    #[arg(long, default_value_t = 4)]
    pub max_well_offset: usize,
}

#[derive(Args)]
pub struct CountNeighboursCommand {
    /// Lines of the form `read_id<TAB>sequence`.
    #[arg(long, short)]
    pub input: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Sweep distances from one up to this.
    #[arg(long, default_value_t = 8)]
    pub max_distance: usize,

    /// Only UMIs read at least this often are centres of the sweep.
    #[arg(long, default_value_t = 100)]
    pub min_count: usize,
}

#[derive(Args)]
pub struct DistanceMatrixCommand {
    /// Lines of the form `read_id<TAB>sequence`.
    #[arg(long, short)]
    pub input: PathBuf,

    /// Defaults to standard output.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[arg(long, value_enum, default_value_t = CliDistanceMeasure::Hamming)]
    pub measure: CliDistanceMeasure,

    /// Only UMIs read at least this often are part of the matrix.
    #[arg(long, default_value_t = 100)]
    pub min_count: usize,
}

#[derive(Args)]
pub struct GenerateReadsCommand {
    #[arg(long, short)]
    pub output: PathBuf,

    /// Also write the generated well ids, one per line.
    #[arg(long)]
    pub well_ids_output: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[arg(long, default_value_t = 1000)]
    pub molecule_amount: usize,

    #[arg(long, default_value_t = 96)]
    pub well_id_amount: usize,

    #[arg(long, default_value_t = 4)]
    pub amplicon_amount: usize,

    /// Mean number of additional reads of each molecule.
    #[arg(long, default_value_t = 3.0)]
    pub duplicate_mean: f64,

    /// Mean number of substitutions in the barcode of each read.
    #[arg(long, default_value_t = 0.5)]
    pub substitution_mean: f64,

    /// Number of bases after the barcode.
    #[arg(long, default_value_t = 50)]
    pub insert_length: usize,

    #[arg(long, default_value_t = 0)]
    pub random_seed: u64,
}

#[derive(Args)]
pub struct LayoutArgs {
    #[arg(long, value_enum, default_value_t = CliLayout::Contiguous)]
    pub layout: CliLayout,

    #[arg(long, default_value_t = 0)]
    pub umi_start: usize,

    #[arg(long, default_value_t = 16)]
    pub umi_length: usize,

    #[arg(long, default_value_t = 8)]
    pub well_id_length: usize,

    #[arg(long, default_value_t = 4)]
    pub padding: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLayout {
    /// The UMI followed by the well id and padding.
    Contiguous,
    /// The interleaved segments of APHA-seq reads.
    Interleaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliDistanceMeasure {
    Hamming,
    Levenshtein,
}

impl From<CliDistanceMeasure> for DistanceMeasure {
    fn from(measure: CliDistanceMeasure) -> Self {
        match measure {
            CliDistanceMeasure::Hamming => Self::Hamming,
            CliDistanceMeasure::Levenshtein => Self::Levenshtein,
        }
    }
}

impl LayoutArgs {
    pub fn barcode_layout(&self) -> BarcodeLayout {
        match self.layout {
            CliLayout::Contiguous => BarcodeLayout::Contiguous {
                umi_start: self.umi_start,
                umi_length: self.umi_length,
                well_id_length: self.well_id_length,
                padding: self.padding,
            },
            CliLayout::Interleaved => BarcodeLayout::interleaved_apha_seq(),
        }
    }
}
