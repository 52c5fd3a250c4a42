//! Layoff record model and the working copy that flows through the pipeline.
//!
//! A [`Record`] holds one layoff event. Nullable columns are `Option`s; the
//! company name is the only required value. Dates arrive as text and are
//! converted in place to [`EventDate::Parsed`] by the date stage.
//!
//! [`WorkingTable`] owns the records for the duration of a run, together with
//! the transient `row_num` rank column attached by the deduplicator.

use std::{borrow::Cow, fmt, str::FromStr};

use chrono::NaiveDate;
use heck::ToSnakeCase;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{CleanError, Result},
    pipeline::Stage,
};

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
pub const RANK_COLUMN: &str = "row_num";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Company,
    Location,
    Industry,
    TotalLaidOff,
    PercentageLaidOff,
    #[serde(alias = "event_date")]
    Date,
    Stage,
    Country,
    FundsRaisedMillions,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Company,
        Field::Location,
        Field::Industry,
        Field::TotalLaidOff,
        Field::PercentageLaidOff,
        Field::Date,
        Field::Stage,
        Field::Country,
        Field::FundsRaisedMillions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Company => "company",
            Field::Location => "location",
            Field::Industry => "industry",
            Field::TotalLaidOff => "total_laid_off",
            Field::PercentageLaidOff => "percentage_laid_off",
            Field::Date => "date",
            Field::Stage => "stage",
            Field::Country => "country",
            Field::FundsRaisedMillions => "funds_raised_millions",
        }
    }

    /// Free-text columns that trimming, canonicalization and backfill may touch.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Field::Company
                | Field::Location
                | Field::Industry
                | Field::PercentageLaidOff
                | Field::Stage
                | Field::Country
        )
    }

    /// Matches a header after snake-casing it, so `Total Laid Off` and
    /// `total_laid_off` resolve to the same column.
    pub fn from_header(header: &str) -> Option<Field> {
        let normalized = header.trim().to_snake_case();
        match normalized.as_str() {
            "event_date" => Some(Field::Date),
            other => Field::ALL.into_iter().find(|field| field.name() == other),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = CleanError;

    fn from_str(value: &str) -> Result<Self> {
        Field::from_header(value).ok_or_else(|| CleanError::UnknownColumn(value.to_string()))
    }
}

/// Splits a comma-separated column list such as `company,location`.
pub fn parse_field_list<S: AsRef<str>>(values: &[S]) -> Result<Vec<Field>> {
    values
        .iter()
        .flat_map(|value| value.as_ref().split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Field::from_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDate {
    Text(String),
    Parsed(NaiveDate),
}

impl EventDate {
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            EventDate::Text(text) => Cow::Borrowed(text.as_str()),
            EventDate::Parsed(date) => Cow::Owned(date.format(ISO_DATE_FORMAT).to_string()),
        }
    }
}

/// Tokens read as null on load, compared against the trimmed cell.
#[derive(Debug, Clone)]
pub struct NullTokens(Vec<String>);

impl NullTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty() || self.0.iter().any(|token| token.trim() == trimmed)
    }
}

impl Default for NullTokens {
    fn default() -> Self {
        NullTokens::new(["", "NULL", "null", "N/A", "NA"])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub company: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub total_laid_off: Option<u64>,
    pub percentage_laid_off: Option<String>,
    pub date: Option<EventDate>,
    pub stage: Option<String>,
    pub country: Option<String>,
    pub funds_raised_millions: Option<Decimal>,
}

impl Record {
    /// A record with only the company set. Mostly useful for building fixtures.
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            location: None,
            industry: None,
            total_laid_off: None,
            percentage_laid_off: None,
            date: None,
            stage: None,
            country: None,
            funds_raised_millions: None,
        }
    }

    /// Builds a record from raw cells. `row` is the 1-based data row used in
    /// error messages; `cell` returns the raw text for each column.
    pub fn from_cells<'a, F>(row: usize, cell: F, nulls: &NullTokens) -> Result<Self>
    where
        F: Fn(Field) -> &'a str,
    {
        let text = |field: Field| -> Option<String> {
            let raw = cell(field);
            if nulls.is_null(raw) {
                None
            } else {
                Some(raw.to_string())
            }
        };
        let company = text(Field::Company).ok_or_else(|| CleanError::ConstraintViolation {
            stage: Stage::Load,
            row,
            detail: "company is empty".to_string(),
        })?;
        let total_laid_off = match text(Field::TotalLaidOff) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                CleanError::MalformedNumber {
                    row,
                    column: Field::TotalLaidOff.name(),
                    value: raw.clone(),
                }
            })?),
            None => None,
        };
        let funds_raised_millions = match text(Field::FundsRaisedMillions) {
            Some(raw) => {
                let parsed = Decimal::from_str(raw.trim())
                    .ok()
                    .filter(|value| !value.is_sign_negative());
                Some(parsed.ok_or_else(|| CleanError::MalformedNumber {
                    row,
                    column: Field::FundsRaisedMillions.name(),
                    value: raw.clone(),
                })?)
            }
            None => None,
        };
        Ok(Self {
            company,
            location: text(Field::Location),
            industry: text(Field::Industry),
            total_laid_off,
            percentage_laid_off: text(Field::PercentageLaidOff),
            date: text(Field::Date).map(EventDate::Text),
            stage: text(Field::Stage),
            country: text(Field::Country),
            funds_raised_millions,
        })
    }

    /// Renders a column the way it is compared and written; `None` is null.
    pub fn render(&self, field: Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Company => Some(Cow::Borrowed(self.company.as_str())),
            Field::Location => self.location.as_deref().map(Cow::Borrowed),
            Field::Industry => self.industry.as_deref().map(Cow::Borrowed),
            Field::TotalLaidOff => self.total_laid_off.map(|v| Cow::Owned(v.to_string())),
            Field::PercentageLaidOff => self.percentage_laid_off.as_deref().map(Cow::Borrowed),
            Field::Date => self.date.as_ref().map(EventDate::render),
            Field::Stage => self.stage.as_deref().map(Cow::Borrowed),
            Field::Country => self.country.as_deref().map(Cow::Borrowed),
            Field::FundsRaisedMillions => self
                .funds_raised_millions
                .map(|v| Cow::Owned(v.normalize().to_string())),
        }
    }

    pub fn is_null(&self, field: Field) -> bool {
        self.render(field).is_none()
    }

    /// Text value of a text column; `None` for nulls and non-text columns.
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Company => Some(self.company.as_str()),
            _ => self.nullable_text(field)?.as_deref(),
        }
    }

    fn nullable_text(&self, field: Field) -> Option<&Option<String>> {
        match field {
            Field::Location => Some(&self.location),
            Field::Industry => Some(&self.industry),
            Field::PercentageLaidOff => Some(&self.percentage_laid_off),
            Field::Stage => Some(&self.stage),
            Field::Country => Some(&self.country),
            _ => None,
        }
    }

    /// Mutable slot of a nullable text column. `None` for the company (never
    /// null) and for typed columns.
    pub fn nullable_text_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Location => Some(&mut self.location),
            Field::Industry => Some(&mut self.industry),
            Field::PercentageLaidOff => Some(&mut self.percentage_laid_off),
            Field::Stage => Some(&mut self.stage),
            Field::Country => Some(&mut self.country),
            _ => None,
        }
    }

    /// Rewrites a non-null text value in place. Returns whether it changed.
    pub fn map_text<F>(&mut self, field: Field, f: F) -> bool
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let slot = match field {
            Field::Company => &mut self.company,
            _ => match self.nullable_text_mut(field) {
                Some(Some(value)) => value,
                _ => return false,
            },
        };
        match f(slot) {
            Some(updated) if updated != *slot => {
                *slot = updated;
                true
            }
            _ => false,
        }
    }

    /// Cells in [`Field::ALL`] order, nulls written as empty strings.
    pub fn to_row(&self) -> Vec<String> {
        Field::ALL
            .iter()
            .map(|field| {
                self.render(*field)
                    .map(Cow::into_owned)
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// The exclusively owned working copy of one pipeline run.
///
/// Each record remembers the 1-based data row it was loaded from, so
/// diagnostics raised after rows were removed still point into the input.
/// Remove rows through [`WorkingTable::retain`] to keep that mapping intact.
#[derive(Debug, Clone, Default)]
pub struct WorkingTable {
    pub records: Vec<Record>,
    /// Transient `row_num` column, index-aligned with `records`.
    pub ranks: Option<Vec<usize>>,
    source_rows: Vec<usize>,
}

impl WorkingTable {
    /// Records are numbered `1..=len` in the order given.
    pub fn new(records: Vec<Record>) -> Self {
        let source_rows = (1..=records.len()).collect();
        Self {
            records,
            ranks: None,
            source_rows,
        }
    }

    /// Input data row of the record at `idx`.
    pub fn source_row(&self, idx: usize) -> usize {
        self.source_rows.get(idx).copied().unwrap_or(idx + 1)
    }

    /// Keeps the records for which `keep` returns true, along with their
    /// rank and source row. `keep` sees each record with its rank, if ranks
    /// are attached. Returns the number of removed records.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Record, Option<usize>) -> bool,
    {
        let mask = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                keep(record, self.ranks.as_ref().and_then(|ranks| ranks.get(idx).copied()))
            })
            .collect::<Vec<_>>();

        let before = self.records.len();
        retain_by_mask(&mut self.records, &mask);
        retain_by_mask(&mut self.source_rows, &mask);
        if let Some(ranks) = self.ranks.as_mut() {
            retain_by_mask(ranks, &mask);
        }
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = Field::ALL
            .iter()
            .map(|field| field.name().to_string())
            .collect::<Vec<_>>();
        if self.ranks.is_some() {
            headers.push(RANK_COLUMN.to_string());
        }
        headers
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let mut row = record.to_row();
                if let Some(ranks) = &self.ranks {
                    row.push(ranks[idx].to_string());
                }
                row
            })
            .collect()
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, mask: &[bool]) {
    let mut flags = mask.iter().copied();
    values.retain(|_| flags.next().unwrap_or(false));
}
