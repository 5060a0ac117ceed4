//! Property tests for threshold crossing detection

use bigdecimal::BigDecimal;
use compound_governance::{crossed, Threshold, ThresholdSet};
use proptest::prelude::*;

fn threshold_set() -> impl Strategy<Value = ThresholdSet> {
    proptest::collection::vec((0u64..10_000, "[a-z]{1,8}"), 0..8).prop_map(|items| {
        ThresholdSet::new(
            items
                .into_iter()
                .map(|(amount, name)| Threshold::new(name, amount))
                .collect(),
        )
    })
}

proptest! {
    #[test]
    fn non_increasing_balance_crosses_nothing(
        set in threshold_set(),
        new in 0u64..10_000,
        delta in 0u64..10_000,
    ) {
        let previous = BigDecimal::from(new + delta);
        let new = BigDecimal::from(new);
        prop_assert!(crossed(&previous, &new, &set).is_empty());
    }

    #[test]
    fn increase_crosses_exactly_the_bracketed_thresholds(
        set in threshold_set(),
        previous in 0u64..10_000,
        delta in 1u64..10_000,
    ) {
        let p = BigDecimal::from(previous);
        let n = BigDecimal::from(previous + delta);
        let result = crossed(&p, &n, &set);

        let expected: Vec<Threshold> = set
            .thresholds()
            .iter()
            .filter(|t| p < t.min_amount && t.min_amount <= n)
            .cloned()
            .collect();
        prop_assert_eq!(&result, &expected);

        for pair in result.windows(2) {
            prop_assert!(pair[0].min_amount <= pair[1].min_amount);
        }
    }

    #[test]
    fn detection_is_pure(
        set in threshold_set(),
        previous in 0u64..10_000,
        new in 0u64..10_000,
    ) {
        let p = BigDecimal::from(previous);
        let n = BigDecimal::from(new);
        prop_assert_eq!(crossed(&p, &n, &set), crossed(&p, &n, &set));
    }
}

#[test]
fn scaled_token_amounts() {
    // Thresholds of 11 and 44 tokens with 2 decimals
    let set = ThresholdSet::new(vec![
        Threshold::new("proposal", 1100),
        Threshold::new("votingQuorum", 4400),
    ]);

    let one = crossed(&BigDecimal::from(1099), &BigDecimal::from(1101), &set);
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].name, "proposal");

    let both = crossed(&BigDecimal::from(1099), &BigDecimal::from(4401), &set);
    let names: Vec<_> = both.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["proposal", "votingQuorum"]);
}
