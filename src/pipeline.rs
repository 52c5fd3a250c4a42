//! Straight-line cleaning pipeline over an exclusively owned working copy.
//!
//! Stages run in a fixed order and mutate the [`WorkingTable`] in place:
//!
//! 1. rank and dedupe on the key-field tuple
//! 2. trim whitespace, then canonicalize categorical values
//! 3. parse textual dates
//! 4. blank-to-null and backfill of the configured column
//! 5. prune rows without any measure, then drop the rank column
//! 6. verify the post-cleaning invariants
//!
//! The first error aborts the run. Nothing here touches the store; callers
//! load before and write after, so a failed run never produces output.

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::{
    backfill,
    config::PipelineConfig,
    dates, dedupe,
    error::Result,
    prune,
    record::WorkingTable,
    transform::{self, canonical::CanonicalTable},
    verify,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Rank,
    Dedupe,
    Trim,
    Canonicalize,
    ParseDates,
    Backfill,
    PruneRows,
    PruneColumns,
    Verify,
    Write,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Rank => "rank",
            Stage::Dedupe => "dedupe",
            Stage::Trim => "trim",
            Stage::Canonicalize => "canonicalize",
            Stage::ParseDates => "parse_dates",
            Stage::Backfill => "backfill",
            Stage::PruneRows => "prune_rows",
            Stage::PruneColumns => "prune_columns",
            Stage::Verify => "verify",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows_before: usize,
    pub rows_after: usize,
    pub cells_changed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub backfill_conflicts: usize,
}

impl PipelineReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    pub fn rows_removed(&self) -> usize {
        self.stages
            .iter()
            .map(|report| report.rows_before.saturating_sub(report.rows_after))
            .sum()
    }

    /// Rows for the stage summary table.
    pub fn table_rows(&self) -> Vec<Vec<String>> {
        self.stages
            .iter()
            .map(|report| {
                vec![
                    report.stage.to_string(),
                    report.rows_before.to_string(),
                    report.rows_after.to_string(),
                    report.cells_changed.to_string(),
                ]
            })
            .collect()
    }

    pub fn table_headers() -> Vec<String> {
        ["stage", "rows_in", "rows_out", "cells_changed"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn record(&mut self, stage: Stage, rows_before: usize, rows_after: usize, cells_changed: usize) {
        info!(
            "{stage}: {rows_before} -> {rows_after} row(s), {cells_changed} cell(s) changed"
        );
        self.stages.push(StageReport {
            stage,
            rows_before,
            rows_after,
            cells_changed,
        });
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    canonical: CanonicalTable,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let canonical = CanonicalTable::compile(&config.canonicalize)?;
        debug!(
            "Pipeline configured with {} key column(s) and {} canonical rule(s)",
            config.key_fields.len(),
            canonical.len()
        );
        Ok(Self { config, canonical })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, table: &mut WorkingTable) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let keys = &self.config.key_fields;

        let rows = table.len();
        let duplicates = dedupe::attach_ranks(table, keys);
        report.record(Stage::Rank, rows, table.len(), duplicates);

        let rows = table.len();
        dedupe::filter_by_rank(table)?;
        verify::check_unique(table, keys, Stage::Dedupe)?;
        report.record(Stage::Dedupe, rows, table.len(), 0);

        let rows = table.len();
        let trimmed = transform::trim_text_fields(&mut table.records);
        report.record(Stage::Trim, rows, table.len(), trimmed);

        let rows = table.len();
        let canonicalized = self.canonical.apply(&mut table.records);
        report.record(Stage::Canonicalize, rows, table.len(), canonicalized);

        let rows = table.len();
        let parsed = dates::parse_dates(table, &self.config.date_format)?;
        report.record(Stage::ParseDates, rows, table.len(), parsed);

        if let Some(settings) = &self.config.backfill {
            let rows = table.len();
            let blanked = backfill::blank_to_null(&mut table.records, settings.target)?;
            let filled =
                backfill::backfill(&mut table.records, settings.target, settings.join_key)?;
            report.backfill_conflicts = filled.conflicts.len();
            report.record(Stage::Backfill, rows, table.len(), blanked + filled.filled);
        }

        let rows = table.len();
        let measures = &self.config.prune_when_all_null;
        let pruned = prune::prune_rows(table, measures);
        report.record(Stage::PruneRows, rows, table.len(), pruned);

        let rows = table.len();
        let dropped = prune::prune_rank_column(table);
        report.record(Stage::PruneColumns, rows, table.len(), if dropped { rows } else { 0 });

        verify::check_invariants(table, keys, measures, Stage::Verify)?;
        report.record(Stage::Verify, table.len(), table.len(), 0);

        Ok(report)
    }
}
