//! Property tests for the query pipeline
//!
//! Random tables are checked against a straightforward model: pages tile the
//! filtered list, sorting is non-decreasing and stable on ties.

use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use recstore_core::{Filter, MatchAll, Payload, Record, RecordId, SortField, SortSpec, Value};
use recstore_engine::{Collection, CollectionOptions, Context};

fn collection_of(scores: &[i64]) -> Collection {
    let coll = Collection::ephemeral("prop", CollectionOptions::new()).unwrap();
    let records = scores
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Record::new(i as i64, "1", Payload::new())
                .with_field("score", *s)
                .with_field("bucket", s % 3)
        })
        .collect();
    coll.insert(&Context::background(), records).unwrap();
    coll
}

fn position(id: &RecordId) -> i64 {
    match id {
        RecordId::Int(i) => *i,
        other => panic!("unexpected id {}", other),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_pages_tile_the_result(
        scores in prop::collection::vec(-20i64..20, 0..40),
        per_page in 1usize..7,
    ) {
        let coll = collection_of(&scores);
        let ctx = Context::background();
        let sort = SortSpec::none();

        let everything = coll.find(&ctx, &MatchAll, &sort, 1, 0).unwrap();
        prop_assert_eq!(everything.total, scores.len());

        let mut stitched = Vec::new();
        let pages = scores.len() / per_page + 2;
        for page in 1..=pages {
            let view = coll.find(&ctx, &MatchAll, &sort, page, per_page).unwrap();
            prop_assert_eq!(view.total, scores.len());
            prop_assert!(view.records.len() <= per_page);
            stitched.extend(view.records);
        }
        prop_assert_eq!(stitched, everything.records);
    }

    #[test]
    fn prop_sorted_filter_is_ordered_and_stable(
        scores in prop::collection::vec(-5i64..5, 0..40),
        bucket in 0i64..3,
    ) {
        let coll = collection_of(&scores);
        let filter = Filter::new().eq("bucket", bucket);
        let sort = SortSpec::new(vec![SortField::asc("score")]);
        let view = coll.find(&Context::background(), &filter, &sort, 1, 0).unwrap();

        let expected = scores.iter().filter(|s| *s % 3 == bucket).count();
        prop_assert_eq!(view.total, expected);

        for pair in view.records.windows(2) {
            let a = pair[0].field("score").and_then(Value::as_int).unwrap();
            let b = pair[1].field("score").and_then(Value::as_int).unwrap();
            prop_assert!(a <= b);
            if a == b {
                prop_assert!(position(&pair[0].id) < position(&pair[1].id));
            }
        }
    }

    #[test]
    fn prop_clear_removes_exactly_matches(
        scores in prop::collection::vec(-10i64..10, 0..30),
        seed in any::<u64>(),
    ) {
        let coll = collection_of(&scores);
        let ctx = Context::background();

        // Clear a random subset of buckets
        let mut buckets = vec![-2i64, -1, 0, 1, 2];
        buckets.shuffle(&mut StdRng::seed_from_u64(seed));
        let doomed = buckets[..2].to_vec();
        let predicate = move |p: &Payload| {
            matches!(p.get("bucket"), Some(Value::Int(b)) if doomed.contains(b))
        };

        let expected_removed = scores.iter().filter(|s| buckets[..2].contains(&(*s % 3))).count();
        let removed = coll.clear(&ctx, &predicate).unwrap();
        prop_assert_eq!(removed, expected_removed);

        let rest = coll.find(&ctx, &MatchAll, &SortSpec::none(), 1, 0).unwrap();
        prop_assert_eq!(rest.total, scores.len() - expected_removed);
        for record in &rest.records {
            prop_assert!(!predicate(&record.payload));
        }
    }
}
