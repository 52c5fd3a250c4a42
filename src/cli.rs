use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean company layoff datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full cleaning pipeline and write the result to a separate file
    Clean(CleanArgs),
    /// Remove rows that repeat across the key columns, keeping the first
    Dedupe(DedupeArgs),
    /// Fill missing values of one column from rows sharing a join key
    Backfill(BackfillArgs),
    /// Check a cleaned file against the post-cleaning invariants
    Verify(VerifyArgs),
    /// Write the default pipeline configuration as YAML
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub struct IoArgs {
    /// Input CSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character for reading input (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output CSV file (stdout if omitted); must differ from the input
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub io: IoArgs,
    #[command(flatten)]
    pub out: OutputArgs,
    /// Pipeline configuration file (YAML); defaults reproduce the layoffs job
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Run every stage and print the stage report without writing output
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Also write the stage report as JSON to this path
    #[arg(long = "report-json")]
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DedupeArgs {
    #[command(flatten)]
    pub io: IoArgs,
    #[command(flatten)]
    pub out: OutputArgs,
    /// Key columns compared for duplicates (defaults to the full key tuple)
    #[arg(short = 'k', long = "key", action = clap::ArgAction::Append)]
    pub keys: Vec<String>,
    /// Keep every row and emit the `row_num` rank column instead of filtering
    #[arg(long = "show-ranks")]
    pub show_ranks: bool,
}

#[derive(Debug, Args)]
pub struct BackfillArgs {
    #[command(flatten)]
    pub io: IoArgs,
    #[command(flatten)]
    pub out: OutputArgs,
    /// Column whose missing values are filled
    #[arg(long, default_value = "industry")]
    pub target: String,
    /// Column that links a row to its donors
    #[arg(long = "join-key", default_value = "company")]
    pub join_key: String,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub io: IoArgs,
    /// Pipeline configuration providing key and measure columns
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Date format used by the cleaned file
    #[arg(long = "date-format", default_value = "%Y-%m-%d")]
    pub date_format: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
