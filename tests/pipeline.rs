mod common;

use chrono::NaiveDate;
use common::{TestWorkspace, fixture_path};
use layoffs_clean::{
    config::PipelineConfig,
    error::CleanError,
    pipeline::{Pipeline, Stage},
    record::{EventDate, Field, NullTokens, WorkingTable},
    store::{self, LoadOptions, WriteOptions},
};

fn load_sample() -> WorkingTable {
    store::load_table(&fixture_path("layoffs_sample.csv"), &LoadOptions::default())
        .expect("load fixture")
}

fn find<'a>(table: &'a WorkingTable, company: &str) -> Vec<&'a layoffs_clean::record::Record> {
    table
        .records
        .iter()
        .filter(|record| record.company == company)
        .collect()
}

#[test]
fn sample_is_cleaned_end_to_end() {
    let mut table = load_sample();
    assert_eq!(table.len(), 15);

    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let report = pipeline.run(&mut table).unwrap();

    assert_eq!(report.stage(Stage::Dedupe).unwrap().rows_after, 13);
    assert_eq!(report.stage(Stage::PruneRows).unwrap().rows_after, 11);
    assert_eq!(report.rows_removed(), 4);
    assert_eq!(table.len(), 11);
    assert!(table.ranks.is_none());

    assert!(find(&table, "Casper").is_empty());
    assert!(find(&table, "Zilch").is_empty());
    assert_eq!(find(&table, "Oda").len(), 1);
    assert_eq!(find(&table, "E Inc.").len(), 1);

    let airbnb = find(&table, "Airbnb");
    assert!(airbnb.iter().all(|r| r.industry.as_deref() == Some("Travel")));

    let ballys = find(&table, "Bally's Interactive");
    assert_eq!(ballys[0].industry, None);

    let gemini = find(&table, "Gemini")[0];
    assert_eq!(gemini.industry.as_deref(), Some("Crypto"));
    assert_eq!(gemini.country.as_deref(), Some("United States"));
    assert_eq!(
        gemini.date,
        Some(EventDate::Parsed(NaiveDate::from_ymd_opt(2023, 1, 24).unwrap()))
    );
    assert_eq!(find(&table, "BitMEX")[0].industry.as_deref(), Some("Crypto"));
}

#[test]
fn written_output_reloads_and_cleans_to_itself() {
    let workspace = TestWorkspace::new();
    let output = workspace.join("staging.csv");

    let mut table = load_sample();
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    pipeline.run(&mut table).unwrap();
    let written = store::write_table(Some(&output), &table, &WriteOptions::default()).unwrap();
    assert_eq!(written, 11);

    // Dates in the staged file are ISO, so re-cleaning parses them with that format.
    let mut config = PipelineConfig::default();
    config.date_format = "%Y-%m-%d".to_string();
    let mut reloaded = store::load_table(&output, &LoadOptions::default()).unwrap();
    let report = Pipeline::new(config).unwrap().run(&mut reloaded).unwrap();

    assert_eq!(reloaded.records, table.records);
    assert_eq!(report.rows_removed(), 0);
    for stage in [Stage::Rank, Stage::Trim, Stage::Canonicalize, Stage::Backfill] {
        assert_eq!(report.stage(stage).unwrap().cells_changed, 0, "{stage}");
    }
}

#[test]
fn custom_null_tokens_and_keys_come_from_config() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_layoffs(
        "layoffs.csv",
        &[
            "Acme,SF,Retail,10,,1/4/2023,Seed,United States,-",
            "Acme,SF,Retail,12,,1/4/2023,Seed,United States,-",
        ],
    );
    let yaml = "key_fields: [company, date]\nnull_tokens: ['', '-']\n";
    let config_path = workspace.write("pipeline.yaml", yaml);
    let config = PipelineConfig::load(&config_path).unwrap();
    assert_eq!(config.key_fields, vec![Field::Company, Field::Date]);

    let options = LoadOptions {
        null_tokens: config.null_tokens(),
        ..LoadOptions::default()
    };
    let mut table = store::load_table(&input, &options).unwrap();
    assert_eq!(table.records[0].funds_raised_millions, None);

    Pipeline::new(config).unwrap().run(&mut table).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.records[0].total_laid_off, Some(10));
}

#[test]
fn default_null_tokens_reject_unknown_placeholders_in_numbers() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_layoffs(
        "layoffs.csv",
        &["Acme,SF,Retail,ten,,1/4/2023,Seed,United States,"],
    );
    let options = LoadOptions {
        null_tokens: NullTokens::default(),
        ..LoadOptions::default()
    };
    let err = store::load_table(&input, &options).unwrap_err();
    assert!(matches!(
        err,
        CleanError::MalformedNumber { row: 1, column: "total_laid_off", .. }
    ));
}
