//! Property-based tests for the universal invariants a dice expression must
//! hold regardless of which values a `Roller` happens to produce.
//!
//! Determinism comes from `PreRolledRoller`, fed with proptest-generated
//! sequences, rather than from the RNG-backed variant -- the property
//! harness supplies the randomness, not the crate under test.

use futures::executor::block_on;
use proptest::prelude::*;

use rollgraph::ast::parse;
use rollgraph::roller::PreRolledRoller;
use rollgraph::{eval, EvalContext, RollResult};

fn run(expr_text: &str, rolls: Vec<i64>) -> RollResult {
    let expr = parse(expr_text).unwrap();
    let mut ctx = EvalContext::new(PreRolledRoller::new(rolls));
    block_on(eval(&expr, &mut ctx, 0)).unwrap()
}

fn try_run(expr_text: &str, rolls: Vec<i64>) -> Option<RollResult> {
    let expr = parse(expr_text).unwrap();
    let mut ctx = EvalContext::new(PreRolledRoller::new(rolls));
    block_on(eval(&expr, &mut ctx, 0)).ok()
}

proptest! {
    #[test]
    fn total_is_sum_of_kept_results(rolls in prop::collection::vec(1i64..=6, 4)) {
        let r = run("4d6", rolls.clone());
        prop_assert_eq!(r.total(), rolls.iter().sum::<i64>());
    }

    #[test]
    fn addition_concatenates_both_pools(a in prop::collection::vec(1i64..=6, 2), b in prop::collection::vec(1i64..=8, 2)) {
        let mut rolls = a.clone();
        rolls.extend(b.clone());
        let r = run("2d6+2d8", rolls);
        prop_assert_eq!(r.results.len(), 4);
        let mut expected: Vec<i64> = a.iter().chain(b.iter()).copied().collect();
        let mut got: Vec<i64> = r.results.iter().map(|d| d.result).collect();
        expected.sort_unstable();
        got.sort_unstable();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn multiplication_collapses_to_a_single_die(a in 1i64..=6, b in 1i64..=6) {
        let r = run("1d6*1d6", vec![a, b]);
        prop_assert_eq!(r.results.len(), 1);
        prop_assert_eq!(r.total(), a * b);
    }

    #[test]
    fn kept_dice_never_rank_below_a_dropped_die(rolls in prop::collection::vec(1i64..=20, 6)) {
        let r = run("6d20 kh3", rolls);
        if let Some(min_kept) = r.results.iter().map(|d| d.result).min() {
            for d in &r.discarded {
                prop_assert!(d.result <= min_kept);
            }
        }
    }

    #[test]
    fn drop_modifiers_preserve_total_pool_size(rolls in prop::collection::vec(1i64..=20, 5)) {
        let r = run("5d20 kh2", rolls);
        prop_assert_eq!(r.results.len() + r.discarded.len(), 5);
    }

    #[test]
    fn explode_never_shortens_the_pool(rolls in prop::collection::vec(1i64..=6, 24)) {
        if let Some(r) = try_run("4d6!", rolls) {
            prop_assert!(r.results.len() >= 4);
        }
    }

    #[test]
    fn compound_preserves_pool_length(rolls in prop::collection::vec(1i64..=6, 24)) {
        if let Some(r) = try_run("4d6!!", rolls) {
            prop_assert_eq!(r.results.len(), 4);
        }
    }

    #[test]
    fn counting_flags_are_idempotent(rolls in prop::collection::vec(1i64..=6, 4)) {
        let once = run("4d6#s", rolls.clone());
        let twice = run("4d6#s#s", rolls);
        let once_success: Vec<i64> = once.results.iter().filter(|d| d.success).map(|d| d.result).collect();
        let twice_success: Vec<i64> = twice.results.iter().filter(|d| d.success).map(|d| d.result).collect();
        prop_assert_eq!(once_success, twice_success);
    }

    #[test]
    fn reroll_once_replaces_at_most_one_die_per_original(rolls in prop::collection::vec(1i64..=6, 8)) {
        if let Some(r) = try_run("4d6 ro1", rolls) {
            // each original die contributes exactly one kept die, never a chain of two replacements
            prop_assert_eq!(r.results.len(), 4);
        }
    }
}
