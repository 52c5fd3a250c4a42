use std::borrow::Cow;

use regex::Regex;

/// Trims leading/trailing whitespace while borrowing the original when unchanged.
pub fn trim(input: &str) -> Cow<'_, str> {
    let trimmed = input.trim();
    if trimmed.len() == input.len() {
        Cow::Borrowed(input)
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Removes any run of `chars` from the end of the value.
pub fn strip_trailing<'a>(input: &'a str, chars: &str) -> Cow<'a, str> {
    let stripped = input.trim_end_matches(|ch: char| chars.contains(ch));
    Cow::Borrowed(stripped)
}

/// Case-aware prefix test; `ignore_case` folds with Unicode lowercase.
pub fn starts_with(value: &str, prefix: &str, ignore_case: bool) -> bool {
    if ignore_case {
        value.to_lowercase().starts_with(&prefix.to_lowercase())
    } else {
        value.starts_with(prefix)
    }
}

pub fn equals(value: &str, other: &str, ignore_case: bool) -> bool {
    if ignore_case {
        value.to_lowercase() == other.to_lowercase()
    } else {
        value == other
    }
}

/// Applies a regex replacement while avoiding allocation when there are no matches.
pub fn regex_replace<'a>(value: &'a str, regex: &Regex, replacement: &str) -> Cow<'a, str> {
    if regex.is_match(value) {
        Cow::Owned(regex.replace_all(value, replacement).to_string())
    } else {
        Cow::Borrowed(value)
    }
}
