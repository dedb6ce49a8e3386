//! End-to-end scenarios against a deterministic source, exercised through
//! the public [`rollgraph::DiceExpr`] API rather than the internal
//! evaluator, mirroring how a downstream caller would actually use the
//! crate.

use futures::executor::block_on;
use rollgraph::{DiceExpr, PreRolledRoller};

fn roll(expr: &str, rolls: impl IntoIterator<Item = i64>) -> rollgraph::RollSummary {
    let expr = DiceExpr::new(expr).unwrap();
    block_on(expr.roll_with(PreRolledRoller::new(rolls))).unwrap()
}

#[test]
fn four_d6() {
    let s = roll("4d6", [6, 2, 1, 5]);
    assert_eq!(s.total, 14);
    let mut kept: Vec<i64> = s.detailed_results.results.iter().map(|d| d.result).collect();
    kept.sort_unstable();
    assert_eq!(kept, vec![1, 2, 5, 6]);
}

#[test]
fn four_d6_keep_highest_two() {
    let s = roll("4d6 kh2", [6, 2, 1, 5]);
    assert_eq!(s.total, 11);
    let mut discarded: Vec<i64> = s.detailed_results.discarded.iter().map(|d| d.result).collect();
    discarded.sort_unstable();
    assert_eq!(discarded, vec![1, 2]);
}

#[test]
fn four_d6_count_above_three() {
    let s = roll("4d6#>3", [6, 2, 1, 5]);
    assert_eq!(s.total, 2);
}

#[test]
fn success_and_failure_flags_on_aggregate() {
    let s = roll("(4d6+1)#s#f", [6, 2, 1, 5]);
    assert_eq!(s.total, 15);
    assert_eq!(s.success_count, 1);
    assert_eq!(s.failure_count, 1);
}

#[test]
fn nine_d6_explode() {
    let s = roll("9d6!", [6, 2, 1, 5, 3, 5, 1, 4, 6, 5, 6, 4]);
    assert_eq!(s.total, 48);
}

#[test]
fn nine_d6_penetrate() {
    let s = roll("9d6p", [6, 2, 1, 5, 3, 5, 1, 4, 6, 5, 6, 4]);
    assert_eq!(s.total, 45);
}

#[test]
fn prerolled_delivers_left_to_right_depth_first() {
    let s = roll("2d6+3", [6, 1]);
    assert_eq!(s.total, 10);
}

#[test]
fn prerolled_exhaustion_surfaces_as_error() {
    let expr = DiceExpr::new("3d6").unwrap();
    let result = block_on(expr.roll_with(PreRolledRoller::new([1, 2])));
    assert!(result.is_err());
}

#[test]
fn json_projection_round_trips_total_and_omits_empty_fields() {
    let s = roll("4d6 kh2", [6, 2, 1, 5]);
    let json = s.to_json().unwrap();
    assert!(json.contains("\"total\":11"));
    assert!(!json.contains("\"left\":null"));
}
