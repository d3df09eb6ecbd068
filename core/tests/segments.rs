//! The segment decision table, checked over its whole domain.

use analytics_core::segment::{assign_segment, composite_score, fm_score, Segment};
use std::collections::BTreeSet;

use Segment::*;

/// Expected segment per recency score (rows) and combined f/m score (columns).
const EXPECTED: [[Segment; 5]; 5] = [
    [Lost,         Lost,               AtRisk,             AtRisk,         CantLose],
    [Hibernating,  Hibernating,        AtRisk,             AtRisk,         CantLose],
    [AboutToSleep, AboutToSleep,       NeedAttention,      LoyalCustomers, LoyalCustomers],
    [Promising,    PotentialLoyalists, PotentialLoyalists, LoyalCustomers, Champions],
    [NewCustomers, PotentialLoyalists, PotentialLoyalists, Champions,      Champions],
];

/// Combined score for f + m = 2..=10, halves rounded up.
const FM_FOR_SUM: [usize; 9] = [1, 2, 2, 3, 3, 4, 4, 5, 5];

#[test]
fn every_score_triple_matches_the_table() {
    let mut seen = BTreeSet::new();
    for r in 1..=5u8 {
        for f in 1..=5u8 {
            for m in 1..=5u8 {
                let fm = FM_FOR_SUM[(f + m - 2) as usize];
                let expected = EXPECTED[(r - 1) as usize][fm - 1];
                let segment = assign_segment(r, f, m);
                assert_eq!(segment, expected, "({r},{f},{m}) with fm={fm}");
                seen.insert(segment);
            }
        }
    }
    assert_eq!(seen.len(), 11, "every segment must be reachable, saw {seen:?}");
}

#[test]
fn interior_cells() {
    assert_eq!(assign_segment(3, 3, 3), NeedAttention);
    assert_eq!(assign_segment(2, 3, 3), AtRisk);
    assert_eq!(assign_segment(4, 1, 1), Promising);
    assert_eq!(assign_segment(4, 2, 3), PotentialLoyalists);
    assert_eq!(assign_segment(3, 4, 5), LoyalCustomers);
    assert_eq!(assign_segment(2, 2, 3), AtRisk, "(2+3)/2 rounds up to fm 3");
    assert_eq!(assign_segment(2, 2, 2), Hibernating);
}

#[test]
fn corner_cells() {
    assert_eq!(assign_segment(5, 5, 5), Segment::Champions);
    assert_eq!(assign_segment(1, 1, 1), Segment::Lost);
    assert_eq!(assign_segment(2, 1, 1), Segment::Hibernating);
    assert_eq!(assign_segment(1, 5, 5), Segment::CantLose);
    assert_eq!(assign_segment(5, 1, 1), Segment::NewCustomers);
    assert_eq!(assign_segment(4, 4, 4), Segment::LoyalCustomers);
}

#[test]
fn fm_rounds_half_up() {
    assert_eq!(fm_score(1, 2), 2);
    assert_eq!(fm_score(4, 5), 5);
    assert_eq!(fm_score(3, 3), 3);
    assert_eq!(fm_score(1, 1), 1);
}

#[test]
fn composite_orders_recency_first() {
    assert_eq!(composite_score(3, 4, 5), 345);
    assert!(composite_score(4, 1, 1) > composite_score(3, 5, 5));
    assert!(composite_score(3, 2, 1) > composite_score(3, 1, 5));
}

#[test]
fn labels_round_trip_and_support_substring_filters() {
    for segment in Segment::ALL {
        assert_eq!(Segment::from_label(segment.label()), Some(segment));
    }
    let at_risk: Vec<&str> = Segment::ALL
        .iter()
        .map(|s| s.label())
        .filter(|l| l.contains("At Risk") || l.contains("Lost"))
        .collect();
    assert_eq!(at_risk, vec!["At Risk", "Lost"]);
    assert!(Segment::Champions.label().contains("Champion"));
}
