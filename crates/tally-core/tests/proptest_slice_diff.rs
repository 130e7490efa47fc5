use proptest::prelude::*;
use std::collections::BTreeSet;
use tally_core::diff::SliceDiff;
use tally_core::fingerprint::{Hamming, SimilarityComparator};

fn arb_members() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..16, 0..12)
}

fn as_set(values: &[u8]) -> BTreeSet<u8> {
    values.iter().copied().collect()
}

fn has_duplicates(values: &[u8]) -> bool {
    as_set(values).len() != values.len()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn applying_a_comparison_reaches_the_desired_members(
        new in arb_members(),
        current in arb_members(),
    ) {
        let diff = SliceDiff::compare(&new, &current);
        let applied = diff.apply_to(&current);
        prop_assert_eq!(as_set(&applied), as_set(&new));
        prop_assert!(!has_duplicates(&applied));
    }

    #[test]
    fn applying_twice_changes_nothing_more(
        new in arb_members(),
        current in arb_members(),
    ) {
        let diff = SliceDiff::compare(&new, &current);
        let once = diff.apply_to(&current);
        let twice = diff.apply_to(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn diffs_on_disjoint_members_commute(
        base in arb_members(),
        left_add in prop::collection::vec(0u8..8, 0..4),
        right_add in prop::collection::vec(8u8..16, 0..4),
    ) {
        let base: Vec<u8> = as_set(&base).into_iter().collect();
        let left = SliceDiff { added: left_add, removed: base.iter().copied().filter(|v| *v < 4).collect() };
        let right = SliceDiff { added: right_add, removed: base.iter().copied().filter(|v| *v >= 12).collect() };

        let lr = right.apply_to(&left.apply_to(&base));
        let rl = left.apply_to(&right.apply_to(&base));
        prop_assert_eq!(as_set(&lr), as_set(&rl));
    }

    #[test]
    fn hamming_distance_is_a_metric(a in any::<u64>(), b in any::<u64>()) {
        let (ha, hb) = (format!("{a:x}"), format!("{b:x}"));
        prop_assert_eq!(Hamming.distance(&ha, &ha), Some(0));
        prop_assert_eq!(Hamming.distance(&ha, &hb), Hamming.distance(&hb, &ha));
        prop_assert_eq!(Hamming.distance(&ha, &hb), Some((a ^ b).count_ones()));
    }
}
