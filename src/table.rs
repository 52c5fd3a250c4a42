use std::borrow::Cow;
use std::fmt::Write as _;

/// Renders an aligned plain-text table. Columns whose cells are all numeric
/// are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    let mut numeric = vec![!rows.is_empty(); column_count];

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
            numeric[idx] &= !cell.is_empty() && cell.chars().all(|ch| ch.is_ascii_digit());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &numeric));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &numeric));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .zip(numeric)
        .map(|((value, width), right)| {
            let sanitized = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
            if *right {
                format!("{padding}{sanitized}")
            } else {
                format!("{sanitized}{padding}")
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_are_right_aligned() {
        let headers = vec!["stage".to_string(), "rows".to_string()];
        let rows = vec![
            vec!["rank".to_string(), "2361".to_string()],
            vec!["prune_rows".to_string(), "1995".to_string()],
            vec!["verify".to_string(), "7".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "stage       rows");
        assert_eq!(lines[1], "----------  ----");
        assert_eq!(lines[4], "verify         7");
    }

    #[test]
    fn control_characters_are_flattened() {
        let rendered = render_table(&["note".to_string()], &[vec!["a\tb".to_string()]]);
        assert!(rendered.contains("a b"));
    }
}
