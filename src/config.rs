//! Pipeline configuration and its YAML persistence.
//!
//! Every key is optional; the defaults reproduce the layoffs cleaning job
//! (full-row duplicate key, `Crypto*` industry collapse, trailing dot on
//! `United States.`, industry backfill by company, and pruning rows without
//! any layoff measure).

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    dates::DEFAULT_DATE_FORMAT,
    error::CleanError,
    record::{Field, NullTokens},
    transform::canonical::{CanonicalRule, CanonicalTable},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillConfig {
    pub target: Field,
    pub join_key: Field,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            target: Field::Industry,
            join_key: Field::Company,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub key_fields: Vec<Field>,
    pub null_tokens: Vec<String>,
    pub date_format: String,
    pub canonicalize: Vec<CanonicalRule>,
    pub backfill: Option<BackfillConfig>,
    pub prune_when_all_null: Vec<Field>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            key_fields: vec![
                Field::Company,
                Field::Location,
                Field::Industry,
                Field::TotalLaidOff,
                Field::Date,
                Field::Stage,
                Field::Country,
                Field::FundsRaisedMillions,
            ],
            null_tokens: ["", "NULL", "null", "N/A", "NA"]
                .into_iter()
                .map(String::from)
                .collect(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            canonicalize: vec![
                CanonicalRule::Prefix {
                    column: Field::Industry,
                    prefix: "Crypto".to_string(),
                    to: "Crypto".to_string(),
                    ignore_case: false,
                },
                CanonicalRule::StripTrailing {
                    column: Field::Country,
                    chars: ".".to_string(),
                },
            ],
            backfill: Some(BackfillConfig::default()),
            prune_when_all_null: vec![Field::TotalLaidOff, Field::PercentageLaidOff],
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening pipeline config {path:?}"))?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing pipeline config {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Validating pipeline config {path:?}"))?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        fs::write(path, yaml).with_context(|| format!("Writing pipeline config {path:?}"))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing pipeline config")
    }

    pub fn null_tokens(&self) -> NullTokens {
        NullTokens::new(self.null_tokens.iter().cloned())
    }

    pub fn validate(&self) -> std::result::Result<(), CleanError> {
        if self.key_fields.is_empty() {
            return Err(CleanError::Config(
                "key_fields must name at least one column".to_string(),
            ));
        }
        if let Some(dup) = self
            .key_fields
            .iter()
            .enumerate()
            .find(|(idx, field)| self.key_fields[..*idx].contains(field))
            .map(|(_, field)| field)
        {
            return Err(CleanError::Config(format!(
                "key_fields lists '{dup}' more than once"
            )));
        }
        if self.date_format.trim().is_empty() {
            return Err(CleanError::Config("date_format must not be empty".to_string()));
        }
        CanonicalTable::compile(&self.canonicalize)?;
        if let Some(backfill) = &self.backfill {
            if !backfill.target.is_text() || backfill.target == Field::Company {
                return Err(CleanError::UnsupportedColumn {
                    column: backfill.target.name(),
                    purpose: "backfill target",
                });
            }
            if !backfill.join_key.is_text() || backfill.join_key == backfill.target {
                return Err(CleanError::UnsupportedColumn {
                    column: backfill.join_key.name(),
                    purpose: "backfill join key",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid_and_round_trip_through_yaml() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("kind: prefix"));
        let parsed: PipelineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let parsed: PipelineConfig =
            serde_yaml::from_str("key_fields: [company, event_date]\nbackfill: null\n").unwrap();
        assert_eq!(parsed.key_fields, vec![Field::Company, Field::Date]);
        assert_eq!(parsed.backfill, None);
        assert_eq!(parsed.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(parsed.canonicalize.len(), 2);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut config = PipelineConfig::default();
        config.key_fields.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.key_fields.push(Field::Company);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.backfill = Some(BackfillConfig {
            target: Field::FundsRaisedMillions,
            join_key: Field::Company,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("pipeline.yaml");
        let mut config = PipelineConfig::default();
        config.date_format = "%Y-%m-%d".to_string();
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }
}
