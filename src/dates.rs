use chrono::NaiveDate;

use crate::{
    error::{CleanError, Result},
    record::{EventDate, WorkingTable},
};

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Strict single-format parse. Returns `None` when the text does not fit.
pub fn parse_event_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format).ok()
}

/// Converts every textual date to a calendar date. Dates already parsed are
/// left as they are, so running the stage twice is harmless. The first value
/// that does not parse aborts with the input data row it came from.
pub fn parse_dates(table: &mut WorkingTable, format: &str) -> Result<usize> {
    let mut converted = 0usize;
    for idx in 0..table.records.len() {
        let row = table.source_row(idx);
        let record = &mut table.records[idx];
        let Some(EventDate::Text(text)) = &record.date else {
            continue;
        };
        let parsed = parse_event_date(text, format).ok_or_else(|| CleanError::MalformedDate {
            row,
            company: record.company.clone(),
            value: text.clone(),
            format: format.to_string(),
        })?;
        record.date = Some(EventDate::Parsed(parsed));
        converted += 1;
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn with_date(text: &str) -> Record {
        let mut record = Record::new("Acme");
        record.date = Some(EventDate::Text(text.to_string()));
        record
    }

    #[test]
    fn parses_unpadded_month_day_year() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 6).unwrap();
        assert_eq!(parse_event_date("3/6/2023", DEFAULT_DATE_FORMAT), Some(expected));
        assert_eq!(parse_event_date("03/06/2023", DEFAULT_DATE_FORMAT), Some(expected));
        assert_eq!(parse_event_date("2023-03-06", DEFAULT_DATE_FORMAT), None);
        assert_eq!(parse_event_date("2/30/2023", DEFAULT_DATE_FORMAT), None);
    }

    #[test]
    fn parse_dates_is_idempotent() {
        let mut table = WorkingTable::new(vec![with_date("12/16/2022"), Record::new("Beta")]);
        assert_eq!(parse_dates(&mut table, DEFAULT_DATE_FORMAT).unwrap(), 1);
        assert_eq!(parse_dates(&mut table, DEFAULT_DATE_FORMAT).unwrap(), 0);
        assert_eq!(
            table.records[0].date,
            Some(EventDate::Parsed(NaiveDate::from_ymd_opt(2022, 12, 16).unwrap()))
        );
        assert_eq!(table.records[1].date, None);
    }

    #[test]
    fn malformed_date_fails_with_row() {
        let mut table = WorkingTable::new(vec![with_date("1/1/2023"), with_date("someday")]);
        let err = parse_dates(&mut table, DEFAULT_DATE_FORMAT).unwrap_err();
        match err {
            CleanError::MalformedDate { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "someday");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_date_reports_input_row_after_removals() {
        let mut table = WorkingTable::new(vec![
            with_date("1/1/2023"),
            with_date("1/1/2023"),
            with_date("1/1/2023"),
            with_date("2023-01-05"),
        ]);
        table.ranks = Some(vec![1, 2, 3, 1]);
        table.retain(|_, rank| rank == Some(1));

        let err = parse_dates(&mut table, DEFAULT_DATE_FORMAT).unwrap_err();
        assert!(matches!(err, CleanError::MalformedDate { row: 4, .. }));
    }
}
