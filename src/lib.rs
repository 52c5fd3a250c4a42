pub mod backfill;
pub mod cli;
pub mod config;
pub mod dates;
pub mod dedupe;
pub mod error;
pub mod io_utils;
pub mod pipeline;
pub mod prune;
pub mod record;
pub mod store;
pub mod table;
pub mod transform;
pub mod verify;

use std::{env, fs::File, io::BufWriter, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, IoArgs, OutputArgs},
    config::PipelineConfig,
    pipeline::{Pipeline, PipelineReport, Stage},
    record::{Field, NullTokens, WorkingTable, parse_field_list},
    store::{LoadOptions, WriteOptions},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("layoffs_clean", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Dedupe(args) => handle_dedupe(&args),
        Commands::Backfill(args) => handle_backfill(&args),
        Commands::Verify(args) => handle_verify(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

fn load_input(
    io: &IoArgs,
    null_tokens: NullTokens,
    parse_dates_with: Option<String>,
) -> Result<WorkingTable> {
    let delimiter = io_utils::resolve_input_delimiter(&io.input, io.delimiter);
    let encoding = io_utils::resolve_encoding(io.input_encoding.as_deref())?;
    info!(
        "Loading '{}' with delimiter '{}'",
        io.input.display(),
        printable_delimiter(delimiter)
    );
    let options = LoadOptions {
        delimiter,
        encoding,
        null_tokens,
        parse_dates_with,
    };
    let table = store::load_table(&io.input, &options)
        .with_context(|| format!("Loading {:?}", io.input))?;
    info!("Loaded {} row(s)", table.len());
    Ok(table)
}

fn check_destination(io: &IoArgs, out: &OutputArgs) -> Result<()> {
    if let Some(output) = &out.output {
        store::ensure_distinct(&io.input, output)?;
    }
    Ok(())
}

fn write_output(table: &WorkingTable, io: &IoArgs, out: &OutputArgs) -> Result<()> {
    let input_delimiter = io_utils::resolve_input_delimiter(&io.input, io.delimiter);
    let options = WriteOptions {
        delimiter: io_utils::resolve_output_delimiter(
            out.output.as_deref(),
            out.output_delimiter,
            input_delimiter,
        ),
        encoding: io_utils::resolve_encoding(out.output_encoding.as_deref())?,
    };
    let rows = store::write_table(out.output.as_deref(), table, &options)
        .with_context(|| format!("Writing output {:?}", out.output))?;
    let destination = out
        .output
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    info!("Wrote {} row(s) -> {}", rows, destination);
    Ok(())
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    if !args.dry_run {
        check_destination(&args.io, &args.out)?;
    }
    let mut table = load_input(&args.io, config.null_tokens(), None)?;
    let pipeline = Pipeline::new(config).context("Preparing pipeline")?;
    let report = pipeline
        .run(&mut table)
        .with_context(|| format!("Cleaning {:?}", args.io.input))?;
    info!(
        "Pipeline finished: {} row(s) kept, {} removed, {} backfill conflict(s)",
        table.len(),
        report.rows_removed(),
        report.backfill_conflicts
    );

    if let Some(path) = &args.report_json {
        write_report_json(path, &report)?;
    }
    if args.dry_run {
        crate::table::print_table(&PipelineReport::table_headers(), &report.table_rows());
        info!("Dry run: no output written");
        return Ok(());
    }
    write_output(&table, &args.io, &args.out)
}

fn write_report_json(path: &Path, report: &PipelineReport) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Writing report to {path:?}"))?;
    debug!("Stage report written to {:?}", path);
    Ok(())
}

fn handle_dedupe(args: &cli::DedupeArgs) -> Result<()> {
    check_destination(&args.io, &args.out)?;
    let keys = if args.keys.is_empty() {
        PipelineConfig::default().key_fields
    } else {
        parse_field_list(&args.keys)?
    };
    debug!("Dedupe key columns: {:?}", keys);
    let mut table = load_input(&args.io, NullTokens::default(), None)?;
    if args.show_ranks {
        let duplicates = dedupe::attach_ranks(&mut table, &keys);
        info!("Ranked {} row(s); {} rank above 1", table.len(), duplicates);
    } else {
        let outcome = dedupe::deduplicate(std::mem::take(&mut table.records), &keys);
        info!(
            "Kept {} row(s), removed {} duplicate(s)",
            outcome.kept.len(),
            outcome.removed
        );
        table = WorkingTable::new(outcome.kept);
    }
    write_output(&table, &args.io, &args.out)
}

fn handle_backfill(args: &cli::BackfillArgs) -> Result<()> {
    check_destination(&args.io, &args.out)?;
    let target: Field = args.target.parse()?;
    let join_key: Field = args.join_key.parse()?;
    let mut table = load_input(&args.io, NullTokens::default(), None)?;
    let blanked = backfill::blank_to_null(&mut table.records, target)?;
    let report = backfill::backfill(&mut table.records, target, join_key)?;
    info!(
        "Nulled {} blank {} value(s); filled {} from {} in {} pass(es)",
        blanked, target, report.filled, join_key, report.passes
    );
    write_output(&table, &args.io, &args.out)
}

fn handle_verify(args: &cli::VerifyArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let table = load_input(
        &args.io,
        config.null_tokens(),
        Some(args.date_format.clone()),
    )?;
    verify::check_invariants(
        &table,
        &config.key_fields,
        &config.prune_when_all_null,
        Stage::Verify,
    )
    .with_context(|| format!("Verifying {:?}", args.io.input))?;
    info!("✓ {:?} satisfies the cleaning invariants", args.io.input);
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = PipelineConfig::default();
    match &args.output {
        Some(path) => {
            config.save(path)?;
            info!("Default pipeline configuration written to {:?}", path);
        }
        None => print!("{}", config.to_yaml_string()?),
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
