use clap::Parser;
use std::path::PathBuf;

/// Scan directory trees for files containing any of a list of keywords,
/// across text, PDF, DOCX, spreadsheet, image (OCR) and archive formats.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directories to scan (overrides the configuration file).
    pub roots: Vec<PathBuf>,

    /// Keyword list file, one term per line.
    #[clap(short, long, value_parser)]
    pub keywords: Option<PathBuf>,

    /// Configuration file to load instead of the standard locations.
    #[clap(short, long, value_parser)]
    pub config: Option<PathBuf>,

    /// File name patterns to consider, comma separated (e.g. "*.txt,*.pdf").
    #[clap(long, value_parser, use_value_delimiter = true)]
    pub patterns: Option<Vec<String>>,

    /// Worker thread count (0 = one per CPU).
    #[clap(short = 'j', long, value_parser)]
    pub workers: Option<usize>,

    /// Results file; matches are appended as they are found.
    #[clap(short, long, value_parser)]
    pub output: Option<PathBuf>,

    /// Skip files larger than this many megabytes.
    #[clap(long, value_parser)]
    pub max_size: Option<u64>,

    /// Per-file processing budget in seconds.
    #[clap(long, value_parser)]
    pub timeout: Option<u64>,

    /// Run OCR over image files (requires tesseract).
    #[clap(long, value_parser, default_value_t = false)]
    pub search_images: bool,

    /// Write the log to a file instead of stderr.
    #[clap(long, value_parser)]
    pub log: Option<PathBuf>,

    /// Disable the progress bar.
    #[clap(long, value_parser, default_value_t = false)]
    pub no_progress: bool,

    /// Write a default kwscan.toml in the current directory and exit.
    #[clap(long, value_parser, default_value_t = false)]
    pub init_config: bool,
}
