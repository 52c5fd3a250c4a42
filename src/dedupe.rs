//! Duplicate detection by key-field tuple.
//!
//! Records are grouped by the rendered values of the key fields, with null
//! matching null. Within a group, ranks `1..=N` are handed out in input order,
//! so the same input always produces the same ranks. Rank-1 filtering keeps
//! the first record of every group.

use std::collections::HashMap;

use log::debug;

use crate::{
    error::{CleanError, Result},
    pipeline::Stage,
    record::{Field, Record, WorkingTable},
};

pub type GroupKey = Vec<Option<String>>;

pub fn group_key(record: &Record, key_fields: &[Field]) -> GroupKey {
    key_fields
        .iter()
        .map(|field| record.render(*field).map(|value| value.into_owned()))
        .collect()
}

/// 1-based rank of each record within its duplicate group, index-aligned with
/// `records`.
pub fn rank(records: &[Record], key_fields: &[Field]) -> Vec<usize> {
    let mut counters: HashMap<GroupKey, usize> = HashMap::with_capacity(records.len());
    records
        .iter()
        .map(|record| {
            let counter = counters.entry(group_key(record, key_fields)).or_insert(0);
            *counter += 1;
            *counter
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub kept: Vec<Record>,
    pub removed: usize,
}

/// Keeps the rank-1 record of every group, preserving input order.
pub fn deduplicate(records: Vec<Record>, key_fields: &[Field]) -> DedupeOutcome {
    let ranks = rank(&records, key_fields);
    let before = records.len();
    let kept = records
        .into_iter()
        .zip(ranks)
        .filter_map(|(record, rank)| (rank == 1).then_some(record))
        .collect::<Vec<_>>();
    DedupeOutcome {
        removed: before - kept.len(),
        kept,
    }
}

/// Attaches the `row_num` column to the working copy.
pub fn attach_ranks(table: &mut WorkingTable, key_fields: &[Field]) -> usize {
    let ranks = rank(&table.records, key_fields);
    let duplicates = ranks.iter().filter(|rank| **rank > 1).count();
    debug!(
        "Ranked {} row(s) over {} key column(s); {} duplicate(s)",
        ranks.len(),
        key_fields.len(),
        duplicates
    );
    table.ranks = Some(ranks);
    duplicates
}

/// Drops every row whose attached rank is above 1. The rank column stays
/// attached (all ones) until column pruning.
pub fn filter_by_rank(table: &mut WorkingTable) -> Result<usize> {
    let ranks = table.ranks.as_ref().ok_or_else(|| CleanError::ConstraintViolation {
        stage: Stage::Dedupe,
        row: 0,
        detail: "rank column is not attached".to_string(),
    })?;
    if ranks.len() != table.records.len() {
        return Err(CleanError::ConstraintViolation {
            stage: Stage::Dedupe,
            row: 0,
            detail: format!(
                "rank column has {} value(s) for {} row(s)",
                ranks.len(),
                table.records.len()
            ),
        });
    }
    Ok(table.retain(|_, rank| rank == Some(1)))
}

/// First pair of record indices sharing a group key, if any.
pub fn find_duplicate(records: &[Record], key_fields: &[Field]) -> Option<(usize, usize)> {
    let mut first_seen: HashMap<GroupKey, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        if let Some(first) = first_seen.insert(group_key(record, key_fields), idx) {
            return Some((first, idx));
        }
    }
    None
}
