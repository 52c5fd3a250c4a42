pub mod canonical;
pub mod string_ops;

use crate::record::{EventDate, Field, Record};

/// Trims whitespace on every text column, including dates still held as text.
/// Returns the number of cells that changed.
pub fn trim_text_fields(records: &mut [Record]) -> usize {
    let mut changed = 0usize;
    for record in records.iter_mut() {
        for field in Field::ALL.into_iter().filter(|field| field.is_text()) {
            if record.map_text(field, |value| Some(string_ops::trim(value).into_owned())) {
                changed += 1;
            }
        }
        if let Some(EventDate::Text(text)) = &mut record.date {
            let trimmed = string_ops::trim(text);
            if trimmed.len() != text.len() {
                *text = trimmed.into_owned();
                changed += 1;
            }
        }
    }
    changed
}
