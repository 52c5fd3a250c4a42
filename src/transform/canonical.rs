//! Categorical value canonicalization.
//!
//! Rules are read from the pipeline configuration and compiled once. Each
//! rule targets a single text column; rules run in declaration order, so a
//! later rule sees the output of an earlier one.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{CleanError, Result},
    record::{Field, Record},
    transform::string_ops,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalRule {
    /// Whole-value substitution, used for known typos.
    Exact {
        column: Field,
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        ignore_case: bool,
    },
    /// Every value starting with `prefix` becomes `to`.
    Prefix {
        column: Field,
        prefix: String,
        to: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        ignore_case: bool,
    },
    /// Regex matched against the whole value; `to` may reference groups.
    Pattern {
        column: Field,
        pattern: String,
        to: String,
    },
    /// Strips trailing punctuation such as `United States.`.
    StripTrailing { column: Field, chars: String },
}

impl CanonicalRule {
    pub fn column(&self) -> Field {
        match self {
            CanonicalRule::Exact { column, .. }
            | CanonicalRule::Prefix { column, .. }
            | CanonicalRule::Pattern { column, .. }
            | CanonicalRule::StripTrailing { column, .. } => *column,
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact {
        from: String,
        to: String,
        ignore_case: bool,
    },
    Prefix {
        prefix: String,
        to: String,
        ignore_case: bool,
    },
    Pattern {
        regex: Regex,
        to: String,
    },
    StripTrailing {
        chars: String,
    },
}

impl Matcher {
    fn apply(&self, value: &str) -> Option<String> {
        match self {
            Matcher::Exact {
                from,
                to,
                ignore_case,
            } => string_ops::equals(value, from, *ignore_case).then(|| to.clone()),
            Matcher::Prefix {
                prefix,
                to,
                ignore_case,
            } => string_ops::starts_with(value, prefix, *ignore_case).then(|| to.clone()),
            Matcher::Pattern { regex, to } => {
                Some(string_ops::regex_replace(value, regex, to).into_owned())
            }
            Matcher::StripTrailing { chars } => {
                Some(string_ops::strip_trailing(value, chars).into_owned())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanonicalTable {
    rules: Vec<(Field, Matcher)>,
}

impl CanonicalTable {
    pub fn compile(rules: &[CanonicalRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let column = rule.column();
            if !column.is_text() {
                return Err(CleanError::UnsupportedColumn {
                    column: column.name(),
                    purpose: "canonicalization",
                });
            }
            let invalid = |detail: &str| CleanError::InvalidRule {
                column: column.name(),
                detail: detail.to_string(),
            };
            let matcher = match rule {
                CanonicalRule::Exact {
                    from,
                    to,
                    ignore_case,
                    ..
                } => Matcher::Exact {
                    from: from.clone(),
                    to: to.clone(),
                    ignore_case: *ignore_case,
                },
                CanonicalRule::Prefix {
                    prefix,
                    to,
                    ignore_case,
                    ..
                } => {
                    if prefix.is_empty() {
                        return Err(invalid("prefix must not be empty"));
                    }
                    Matcher::Prefix {
                        prefix: prefix.clone(),
                        to: to.clone(),
                        ignore_case: *ignore_case,
                    }
                }
                CanonicalRule::Pattern { pattern, to, .. } => {
                    let regex = Regex::new(&format!("^(?:{pattern})$"))
                        .map_err(|err| invalid(&err.to_string()))?;
                    Matcher::Pattern {
                        regex,
                        to: to.clone(),
                    }
                }
                CanonicalRule::StripTrailing { chars, .. } => {
                    if chars.is_empty() {
                        return Err(invalid("chars must not be empty"));
                    }
                    Matcher::StripTrailing {
                        chars: chars.clone(),
                    }
                }
            };
            compiled.push((column, matcher));
        }
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule to every record and returns the number of cell
    /// updates.
    pub fn apply(&self, records: &mut [Record]) -> usize {
        let mut changed = 0usize;
        for record in records.iter_mut() {
            for (column, matcher) in &self.rules {
                if record.map_text(*column, |value| matcher.apply(value)) {
                    changed += 1;
                }
            }
        }
        changed
    }
}
