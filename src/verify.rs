//! Post-cleaning invariant checks.
//!
//! Each check reports the first offending row as a
//! [`CleanError::ConstraintViolation`]; row numbers are the 1-based input
//! data rows the records were loaded from.

use itertools::Itertools;

use crate::{
    dedupe,
    error::{CleanError, Result},
    pipeline::Stage,
    record::{EventDate, Field, WorkingTable},
};

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':'];

fn violation(stage: Stage, row: usize, detail: String) -> CleanError {
    CleanError::ConstraintViolation { stage, row, detail }
}

pub fn check_unique(table: &WorkingTable, key_fields: &[Field], stage: Stage) -> Result<()> {
    match dedupe::find_duplicate(&table.records, key_fields) {
        Some((first, second)) => Err(violation(
            stage,
            table.source_row(second),
            format!(
                "duplicate of row {} across key columns [{}]",
                table.source_row(first),
                key_fields.iter().map(|f| f.name()).join(", ")
            ),
        )),
        None => Ok(()),
    }
}

pub fn check_invariants(
    table: &WorkingTable,
    key_fields: &[Field],
    measures: &[Field],
    stage: Stage,
) -> Result<()> {
    check_unique(table, key_fields, stage)?;
    for (idx, record) in table.records.iter().enumerate() {
        let row = table.source_row(idx);
        if !measures.is_empty() && measures.iter().all(|field| record.is_null(*field)) {
            return Err(violation(
                stage,
                row,
                format!(
                    "'{}' has no value in any of [{}]",
                    record.company,
                    measures.iter().map(|f| f.name()).join(", ")
                ),
            ));
        }
        if record
            .industry
            .as_deref()
            .is_some_and(|value| value.trim().is_empty())
        {
            return Err(violation(
                stage,
                row,
                format!("'{}' has an empty industry", record.company),
            ));
        }
        if let Some(EventDate::Text(text)) = &record.date {
            return Err(violation(
                stage,
                row,
                format!("'{}' has an unparsed date '{text}'", record.company),
            ));
        }
        if let Some(country) = record.country.as_deref()
            && country.ends_with(TRAILING_PUNCTUATION)
        {
            return Err(violation(
                stage,
                row,
                format!("country '{country}' ends with punctuation"),
            ));
        }
    }
    if table.ranks.is_some() {
        return Err(violation(
            stage,
            0,
            "rank column is still attached".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::Record;

    const KEYS: &[Field] = &[Field::Company, Field::Location];
    const MEASURES: &[Field] = &[Field::TotalLaidOff, Field::PercentageLaidOff];

    fn clean(company: &str) -> Record {
        let mut record = Record::new(company);
        record.total_laid_off = Some(10);
        record.country = Some("United States".to_string());
        record.date = Some(EventDate::Parsed(NaiveDate::from_ymd_opt(2023, 1, 4).unwrap()));
        record
    }

    fn detail_of(result: Result<()>) -> (usize, String) {
        match result {
            Err(CleanError::ConstraintViolation { row, detail, .. }) => (row, detail),
            other => panic!("expected violation, got {other:?}"),
        }
    }

    #[test]
    fn clean_table_passes() {
        let table = WorkingTable::new(vec![clean("Acme"), clean("Beta")]);
        check_invariants(&table, KEYS, MEASURES, Stage::Verify).unwrap();
    }

    #[test]
    fn duplicate_is_reported_on_second_row() {
        let table = WorkingTable::new(vec![clean("Acme"), clean("Beta"), clean("Acme")]);
        let (row, detail) = detail_of(check_unique(&table, KEYS, Stage::Dedupe));
        assert_eq!(row, 3);
        assert!(detail.contains("row 1"));
    }

    #[test]
    fn rows_are_reported_as_input_rows() {
        let mut table = WorkingTable::new(vec![
            clean("Zeta"),
            clean("Zeta"),
            clean("Acme"),
            clean("Beta"),
            clean("Acme"),
        ]);
        table.retain(|record, _| record.company != "Zeta");
        let (row, detail) = detail_of(check_unique(&table, KEYS, Stage::Verify));
        assert_eq!(row, 5);
        assert!(detail.contains("duplicate of row 3"));
    }

    #[test]
    fn each_invariant_is_enforced() {
        let mut no_measures = clean("Acme");
        no_measures.total_laid_off = None;
        let (row, _) = detail_of(check_invariants(
            &WorkingTable::new(vec![clean("Beta"), no_measures]),
            KEYS,
            MEASURES,
            Stage::Verify,
        ));
        assert_eq!(row, 2);

        let mut blank_industry = clean("Acme");
        blank_industry.industry = Some(String::new());
        let (_, detail) = detail_of(check_invariants(
            &WorkingTable::new(vec![blank_industry]),
            KEYS,
            MEASURES,
            Stage::Verify,
        ));
        assert!(detail.contains("empty industry"));

        let mut text_date = clean("Acme");
        text_date.date = Some(EventDate::Text("1/4/2023".to_string()));
        let (_, detail) = detail_of(check_invariants(
            &WorkingTable::new(vec![text_date]),
            KEYS,
            MEASURES,
            Stage::Verify,
        ));
        assert!(detail.contains("unparsed date"));

        let mut dotted = clean("Acme");
        dotted.country = Some("United States.".to_string());
        let (_, detail) = detail_of(check_invariants(
            &WorkingTable::new(vec![dotted]),
            KEYS,
            MEASURES,
            Stage::Verify,
        ));
        assert!(detail.contains("punctuation"));
    }

    #[test]
    fn attached_rank_column_fails() {
        let mut table = WorkingTable::new(vec![clean("Acme")]);
        table.ranks = Some(vec![1]);
        assert!(check_invariants(&table, KEYS, MEASURES, Stage::Verify).is_err());
    }
}
