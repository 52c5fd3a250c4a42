//! Null backfill from sibling records.
//!
//! A join index maps each join-key value to the first non-null target value
//! seen in input order. Null targets are then filled from the index. Passes
//! repeat until one changes nothing; on data without chains the first pass
//! does all the work.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::{
    error::{CleanError, Result},
    record::{Field, Record},
};

/// Join-key value to donor value, plus every key that saw more than one
/// distinct non-null value.
#[derive(Debug, Clone, Default)]
pub struct JoinIndex {
    donors: HashMap<String, String>,
    conflicts: BTreeMap<String, Vec<String>>,
}

impl JoinIndex {
    pub fn donor(&self, key: &str) -> Option<&str> {
        self.donors.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.donors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.donors.is_empty()
    }

    pub fn conflicts(&self) -> &BTreeMap<String, Vec<String>> {
        &self.conflicts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub filled: usize,
    pub passes: usize,
    /// Join keys with disagreeing donors; the first value was used.
    pub conflicts: BTreeMap<String, Vec<String>>,
}

fn ensure_target(target: Field) -> Result<()> {
    if target.is_text() && target != Field::Company {
        Ok(())
    } else {
        Err(CleanError::UnsupportedColumn {
            column: target.name(),
            purpose: "backfill target",
        })
    }
}

fn ensure_join_key(target: Field, join_key: Field) -> Result<()> {
    if !join_key.is_text() || join_key == target {
        return Err(CleanError::UnsupportedColumn {
            column: join_key.name(),
            purpose: "backfill join key",
        });
    }
    Ok(())
}

/// Turns empty and whitespace-only target values into null, since backfill
/// only treats null as missing.
pub fn blank_to_null(records: &mut [Record], target: Field) -> Result<usize> {
    ensure_target(target)?;
    let mut changed = 0usize;
    for record in records.iter_mut() {
        if let Some(slot) = record.nullable_text_mut(target)
            && slot.as_deref().is_some_and(|value| value.trim().is_empty())
        {
            *slot = None;
            changed += 1;
        }
    }
    Ok(changed)
}

pub fn build_join_index(records: &[Record], target: Field, join_key: Field) -> JoinIndex {
    let mut index = JoinIndex::default();
    for record in records {
        let (Some(key), Some(value)) = (record.text(join_key), record.text(target)) else {
            continue;
        };
        match index.donors.get(key) {
            None => {
                index.donors.insert(key.to_string(), value.to_string());
            }
            Some(existing) if existing != value => {
                let seen = index
                    .conflicts
                    .entry(key.to_string())
                    .or_insert_with(|| vec![existing.clone()]);
                if !seen.iter().any(|v| v == value) {
                    seen.push(value.to_string());
                }
            }
            Some(_) => {}
        }
    }
    index
}

fn fill_pass(records: &mut [Record], target: Field, join_key: Field, index: &JoinIndex) -> usize {
    let mut filled = 0usize;
    for record in records.iter_mut() {
        let Some(donor) = record.text(join_key).and_then(|key| index.donor(key)) else {
            continue;
        };
        let donor = donor.to_string();
        if let Some(slot) = record.nullable_text_mut(target)
            && slot.is_none()
        {
            *slot = Some(donor);
            filled += 1;
        }
    }
    filled
}

/// Fills null `target` values from records sharing the same `join_key`.
/// Never overwrites a non-null value.
pub fn backfill(records: &mut [Record], target: Field, join_key: Field) -> Result<BackfillReport> {
    ensure_target(target)?;
    ensure_join_key(target, join_key)?;

    let mut report = BackfillReport::default();
    loop {
        let index = build_join_index(records, target, join_key);
        if report.passes == 0 {
            report.conflicts = index.conflicts().clone();
        }
        let filled = fill_pass(records, target, join_key, &index);
        report.passes += 1;
        report.filled += filled;
        debug!(
            "Backfill pass {} filled {} {} value(s) from {} donor key(s)",
            report.passes,
            filled,
            target,
            index.len()
        );
        if filled == 0 {
            break;
        }
    }

    for (key, values) in &report.conflicts {
        warn!(
            "{join_key} '{key}' has conflicting {target} values {values:?}; using '{}'",
            values[0]
        );
    }
    Ok(report)
}
