use std::collections::{HashMap, HashSet};

use layoffs_clean::{
    backfill,
    dedupe::{self, group_key},
    record::{Field, Record},
};
use proptest::prelude::*;

const KEYS: &[Field] = &[
    Field::Company,
    Field::Location,
    Field::Industry,
    Field::TotalLaidOff,
];

// Small value pools so that generated tables actually contain duplicates.
fn record_strategy() -> impl Strategy<Value = Record> {
    (
        prop::sample::select(vec!["Acme", "Beta", "Gamma"]),
        prop::option::of(prop::sample::select(vec!["SF", "NYC"])),
        prop::option::of(prop::sample::select(vec!["Retail", "Crypto", "Media"])),
        prop::option::of(0u64..3),
    )
        .prop_map(|(company, location, industry, total)| {
            let mut record = Record::new(company);
            record.location = location.map(str::to_string);
            record.industry = industry.map(str::to_string);
            record.total_laid_off = total;
            record
        })
}

fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), 0..40)
}

proptest! {
    #[test]
    fn dedupe_leaves_one_record_per_key(records in records_strategy()) {
        let distinct = records
            .iter()
            .map(|record| group_key(record, KEYS))
            .collect::<HashSet<_>>();
        let outcome = dedupe::deduplicate(records.clone(), KEYS);

        prop_assert_eq!(outcome.kept.len(), distinct.len());
        prop_assert_eq!(outcome.kept.len() + outcome.removed, records.len());
        prop_assert!(dedupe::find_duplicate(&outcome.kept, KEYS).is_none());
    }

    #[test]
    fn dedupe_is_idempotent(records in records_strategy()) {
        let once = dedupe::deduplicate(records, KEYS);
        let twice = dedupe::deduplicate(once.kept.clone(), KEYS);
        prop_assert_eq!(twice.removed, 0);
        prop_assert_eq!(twice.kept, once.kept);
    }

    #[test]
    fn ranks_are_consecutive_within_each_group(records in records_strategy()) {
        let ranks = dedupe::rank(&records, KEYS);
        let mut seen: HashMap<_, Vec<usize>> = HashMap::new();
        for (record, rank) in records.iter().zip(&ranks) {
            seen.entry(group_key(record, KEYS)).or_default().push(*rank);
        }
        for group in seen.values() {
            let expected = (1..=group.len()).collect::<Vec<_>>();
            prop_assert_eq!(group, &expected);
        }
    }

    #[test]
    fn backfill_never_overwrites_existing_values(records in records_strategy()) {
        let mut filled = records.clone();
        backfill::backfill(&mut filled, Field::Industry, Field::Company).unwrap();
        for (before, after) in records.iter().zip(&filled) {
            if before.industry.is_some() {
                prop_assert_eq!(&before.industry, &after.industry);
            }
            prop_assert_eq!(&before.company, &after.company);
            prop_assert_eq!(&before.location, &after.location);
        }
    }

    #[test]
    fn backfill_fills_every_row_with_a_donor(records in records_strategy()) {
        let donors = records
            .iter()
            .filter(|record| record.industry.is_some())
            .map(|record| record.company.clone())
            .collect::<HashSet<_>>();
        let mut filled = records;
        let report = backfill::backfill(&mut filled, Field::Industry, Field::Company).unwrap();

        for record in &filled {
            prop_assert_eq!(record.industry.is_some(), donors.contains(&record.company));
        }
        let again = backfill::backfill(&mut filled, Field::Industry, Field::Company).unwrap();
        prop_assert_eq!(again.filled, 0);
        prop_assert!(report.passes >= 1);
    }
}
