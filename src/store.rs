//! Bulk read and write of the layoffs table.
//!
//! The source is only ever read. Results go to a separate destination, and
//! [`ensure_distinct`] refuses a destination that resolves to the source.

use std::{collections::HashMap, fs, path::Path};

use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    dates,
    error::{CleanError, Result},
    io_utils,
    pipeline::Stage,
    record::{EventDate, Field, NullTokens, RANK_COLUMN, Record, WorkingTable},
};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub null_tokens: NullTokens,
    /// When set, dates are parsed on load with this format. Used to read
    /// tables that were already cleaned.
    pub parse_dates_with: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            null_tokens: NullTokens::default(),
            parse_dates_with: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Position of every [`Field`] in the input header row.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &[String]) -> Result<Self> {
        let mut positions = HashMap::with_capacity(Field::ALL.len());
        for (idx, header) in headers.iter().enumerate() {
            if header.trim() == RANK_COLUMN {
                continue;
            }
            let field = Field::from_header(header)
                .ok_or_else(|| CleanError::UnknownColumn(header.clone()))?;
            if positions.insert(field, idx).is_some() {
                return Err(CleanError::Config(format!(
                    "Column '{field}' appears more than once in the header"
                )));
            }
        }
        if let Some(missing) = Field::ALL.iter().find(|f| !positions.contains_key(*f)) {
            return Err(CleanError::MissingColumn(missing.name()));
        }
        Ok(Self { positions })
    }

    pub fn position(&self, field: Field) -> usize {
        self.positions[&field]
    }
}

pub fn load_table(path: &Path, options: &LoadOptions) -> Result<WorkingTable> {
    let mut reader = io_utils::open_csv_reader_from_path(path, options.delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, options.encoding, path)?;
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let row = idx + 1;
        let record = record.map_err(|err| CleanError::csv(Stage::Load, err))?;
        let values = io_utils::decode_record(&record, options.encoding, path)?;
        let mut parsed = Record::from_cells(
            row,
            |field| values[columns.position(field)].as_str(),
            &options.null_tokens,
        )?;
        if let Some(format) = &options.parse_dates_with
            && let Some(EventDate::Text(text)) = &parsed.date
        {
            let date = dates::parse_event_date(text, format).ok_or_else(|| {
                CleanError::MalformedDate {
                    row,
                    company: parsed.company.clone(),
                    value: text.clone(),
                    format: format.clone(),
                }
            })?;
            parsed.date = Some(EventDate::Parsed(date));
        }
        records.push(parsed);
    }
    debug!("Loaded {} row(s) from {:?}", records.len(), path);
    Ok(WorkingTable::new(records))
}

/// Full rewrite of the destination. Returns the number of data rows written.
pub fn write_table(
    path: Option<&Path>,
    table: &WorkingTable,
    options: &WriteOptions,
) -> Result<usize> {
    let mut writer = io_utils::open_csv_writer(path, options.delimiter, options.encoding)?;
    writer
        .write_record(table.headers())
        .map_err(|err| CleanError::csv(Stage::Write, err))?;
    let rows = table.rows();
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|err| CleanError::csv(Stage::Write, err))?;
    }
    writer.flush().map_err(|err| {
        CleanError::io(
            Stage::Write,
            path.unwrap_or_else(|| Path::new("-")),
            err,
        )
    })?;
    Ok(rows.len())
}

/// Fails when `destination` is the same file as `source`.
pub fn ensure_distinct(source: &Path, destination: &Path) -> Result<()> {
    if io_utils::is_dash(source) || io_utils::is_dash(destination) {
        return Ok(());
    }
    let same = match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(left), Ok(right)) => left == right,
        _ => source == destination,
    };
    if same {
        return Err(CleanError::Config(format!(
            "Refusing to overwrite the source {source:?}; choose a separate output"
        )));
    }
    Ok(())
}
