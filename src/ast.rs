//! The expression tree's value/arithmetic/dice/modifier variants, and the
//! parser driver that walks pest's `Pairs` into it.
//!
//! Building the tree never fails: grammar-level shape is already enforced by
//! `rollgraph.pest`, and the remaining mandatory-operand/range checks are
//! raised as eval-time `FormatError`s instead. Only [`parse`] itself can
//! fail, when pest rejects the input outright.

use pest::iterators::Pair;
use pest::Parser;

use crate::error::{RollError, Result};
use crate::grammar::{Rule, RollParser};

/// A comparator suffix on a counting/reroll/explode operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CmpOp {
    pub(crate) fn parse(s: &str) -> Self {
        match s {
            ">=" => CmpOp::Ge,
            "<=" => CmpOp::Le,
            ">" => CmpOp::Gt,
            "<" => CmpOp::Lt,
            "=" => CmpOp::Eq,
            _ => unreachable!("unknown comparator `{s}`"),
        }
    }

    pub fn matches(self, value: i64, target: i64) -> bool {
        match self {
            CmpOp::Eq => value == target,
            CmpOp::Gt => value > target,
            CmpOp::Lt => value < target,
            CmpOp::Ge => value >= target,
            CmpOp::Le => value <= target,
        }
    }
}

/// `-<`, `-<=`, `->`, `->=`, `-=` -- compare-and-drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// `-h`, `-l`, `kh`, `kl`, `k` -- keep/drop by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropHighLowOp {
    DropHigh,
    DropLow,
    KeepHigh,
    KeepLow,
}

/// `C>`/`c>`, `C<`/`c<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampOp {
    Ceiling,
    Floor,
}

/// `s`, `sd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOp {
    Ascending,
    Descending,
}

/// `r`, `ro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerollOp {
    Reroll,
    RerollOnce,
}

/// `!`, `!o`, `!!`, `!!o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplodeOp {
    Explode,
    ExplodeOnce,
    Compound,
    CompoundOnce,
}

/// `#`, `#s`, `#f`, `#cs`, `#cf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOp {
    Plain,
    Success,
    Failure,
    CritSuccess,
    CritFailure,
}

/// Expression tree node. Variant-tagged rather than a class hierarchy: the
/// evaluator (`evaluator.rs`) is a single `match` over this enum.
#[derive(Debug, Clone)]
pub enum Expr {
    /// An integer literal, or the empty atom (`None`).
    Value(Option<i64>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Comma(Box<Expr>, Box<Expr>),
    /// `{expr}` -- collapse to a single total.
    Aggregate(Box<Expr>),

    StdDice(Option<Box<Expr>>, Box<Expr>),
    PercentDice(Option<Box<Expr>>),
    D66Dice(Option<Box<Expr>>),
    FudgeDice(Option<Box<Expr>>),
    CsvDice(Option<Box<Expr>>, Vec<i64>),

    DropCompare(Box<Expr>, DropCompareOp, Option<i64>),
    DropHighLow(Box<Expr>, DropHighLowOp, Option<i64>),
    Clamp(Box<Expr>, ClampOp, Option<i64>),
    Sort(Box<Expr>, SortOp),

    Reroll(Box<Expr>, RerollOp, Option<CmpOp>, Option<i64>),
    Explode(Box<Expr>, ExplodeOp, Option<CmpOp>, Option<i64>),
    Penetrate(Box<Expr>, Option<i64>),

    Count(Box<Expr>, CountOp, Option<CmpOp>, Option<i64>),
}

/// Parse a dice-notation expression into an [`Expr`] tree.
pub fn parse(input: &str) -> Result<Expr> {
    let mut pairs = RollParser::parse(Rule::command, input).map_err(RollError::from)?;
    let command = pairs.next().expect("command always produced on success");
    let expr_pair = command
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .expect("command always contains expr");
    Ok(build_expr(expr_pair))
}

fn parse_int(pair: &Pair<Rule>) -> i64 {
    pair.as_str().parse::<i64>().unwrap_or(i64::MAX)
}

fn build_expr(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_term(inner.next().expect("expr always contains term"));
    while let Some(op_pair) = inner.next() {
        let rhs_pair = inner.next().expect("arith_op always followed by term");
        let rhs = build_term(rhs_pair);
        lhs = match op_pair.as_str() {
            "+" => Expr::Add(Box::new(lhs), Box::new(rhs)),
            "-" => Expr::Sub(Box::new(lhs), Box::new(rhs)),
            "," => Expr::Comma(Box::new(lhs), Box::new(rhs)),
            other => unreachable!("unknown arith_op `{other}`"),
        };
    }
    lhs
}

fn build_term(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_count(inner.next().expect("term always contains count"));
    while let Some(_op_pair) = inner.next() {
        let rhs_pair = inner.next().expect("mul_op always followed by count");
        let rhs = build_count(rhs_pair);
        lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
    }
    lhs
}

fn build_count(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_drop(inner.next().expect("count always contains drop"));
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str().to_ascii_lowercase().as_str() {
            "#cs" => CountOp::CritSuccess,
            "#cf" => CountOp::CritFailure,
            "#s" => CountOp::Success,
            "#f" => CountOp::Failure,
            "#" => CountOp::Plain,
            other => unreachable!("unknown count_op `{other}`"),
        };
        let (cmp, target) = match peek_if(&mut inner, Rule::count_target) {
            Some(target_pair) => parse_cmp_target(target_pair),
            None => (None, None),
        };
        lhs = Expr::Count(Box::new(lhs), op, cmp, target);
    }
    lhs
}

fn build_drop(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_reroll(inner.next().expect("drop always contains reroll"));
    while let Some(op_pair) = inner.next() {
        let op_str = op_pair.as_str().to_ascii_lowercase();
        let target = peek_if(&mut inner, Rule::int).map(|p| parse_int(&p));
        lhs = match op_str.as_str() {
            "-<=" => Expr::DropCompare(Box::new(lhs), DropCompareOp::Le, target),
            "-<" => Expr::DropCompare(Box::new(lhs), DropCompareOp::Lt, target),
            "->=" => Expr::DropCompare(Box::new(lhs), DropCompareOp::Ge, target),
            "->" => Expr::DropCompare(Box::new(lhs), DropCompareOp::Gt, target),
            "-=" => Expr::DropCompare(Box::new(lhs), DropCompareOp::Eq, target),
            "-h" => Expr::DropHighLow(Box::new(lhs), DropHighLowOp::DropHigh, target),
            "-l" => Expr::DropHighLow(Box::new(lhs), DropHighLowOp::DropLow, target),
            "kh" | "k" => Expr::DropHighLow(Box::new(lhs), DropHighLowOp::KeepHigh, target),
            "kl" => Expr::DropHighLow(Box::new(lhs), DropHighLowOp::KeepLow, target),
            "c>" => Expr::Clamp(Box::new(lhs), ClampOp::Ceiling, target),
            "c<" => Expr::Clamp(Box::new(lhs), ClampOp::Floor, target),
            "sd" => Expr::Sort(Box::new(lhs), SortOp::Descending),
            "s" => Expr::Sort(Box::new(lhs), SortOp::Ascending),
            other => unreachable!("unknown drop_op `{other}`"),
        };
    }
    lhs
}

fn build_reroll(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_explode(inner.next().expect("reroll always contains explode"));
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str().to_ascii_lowercase().as_str() {
            "ro" => RerollOp::RerollOnce,
            "r" => RerollOp::Reroll,
            other => unreachable!("unknown reroll_op `{other}`"),
        };
        let (cmp, target) = match peek_if(&mut inner, Rule::reroll_target) {
            Some(target_pair) => parse_cmp_target(target_pair),
            None => (None, None),
        };
        lhs = Expr::Reroll(Box::new(lhs), op, cmp, target);
    }
    lhs
}

fn build_explode(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_dice(inner.next().expect("explode always contains dice"));
    while let Some(op_pair) = inner.next() {
        match op_pair.as_rule() {
            Rule::bang_op => {
                let op = match op_pair.as_str().to_ascii_lowercase().as_str() {
                    "!!o" => ExplodeOp::CompoundOnce,
                    "!!" => ExplodeOp::Compound,
                    "!o" => ExplodeOp::ExplodeOnce,
                    "!" => ExplodeOp::Explode,
                    other => unreachable!("unknown bang_op `{other}`"),
                };
                let (cmp, target) = match peek_if(&mut inner, Rule::bang_target) {
                    Some(target_pair) => parse_cmp_target(target_pair),
                    None => (None, None),
                };
                lhs = Expr::Explode(Box::new(lhs), op, cmp, target);
            }
            Rule::pen_op => {
                let target = peek_if(&mut inner, Rule::pen_target)
                    .map(|p| parse_int(&p.into_inner().next().expect("pen_target contains int")));
                lhs = Expr::Penetrate(Box::new(lhs), target);
            }
            other => unreachable!("unknown explode suffix `{other:?}`"),
        }
    }
    lhs
}

fn build_dice(pair: Pair<Rule>) -> Expr {
    let mut lhs: Option<Expr> = None;
    let mut rhs_pair = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::dice_lhs => lhs = Some(build_dice_lhs(p)),
            Rule::dice_rhs => rhs_pair = Some(p),
            other => unreachable!("unknown dice child `{other:?}`"),
        }
    }
    match rhs_pair {
        None => lhs.unwrap_or(Expr::Value(None)),
        Some(rhs) => build_dice_with_rhs(lhs, rhs),
    }
}

fn build_dice_lhs(pair: Pair<Rule>) -> Expr {
    let inner = pair
        .into_inner()
        .next()
        .expect("dice_lhs always contains one alternative");
    match inner.as_rule() {
        Rule::paren_expr => {
            let e = inner
                .into_inner()
                .next()
                .expect("paren_expr always contains expr");
            build_expr(e)
        }
        Rule::brace_expr => {
            let e = inner
                .into_inner()
                .next()
                .expect("brace_expr always contains expr");
            Expr::Aggregate(Box::new(build_expr(e)))
        }
        Rule::int => Expr::Value(Some(parse_int(&inner))),
        other => unreachable!("unknown dice_lhs alternative `{other:?}`"),
    }
}

fn build_dice_with_rhs(lhs: Option<Expr>, rhs_pair: Pair<Rule>) -> Expr {
    let text = rhs_pair.as_str();
    if text == "D66" {
        return Expr::D66Dice(lhs.map(Box::new));
    }
    if let Some(first) = rhs_pair.into_inner().next() {
        return match first.as_rule() {
            Rule::csv_list => {
                let vals = first.into_inner().map(|p| parse_int(&p)).collect();
                Expr::CsvDice(lhs.map(Box::new), vals)
            }
            Rule::paren_expr => {
                let e = first
                    .into_inner()
                    .next()
                    .expect("paren_expr always contains expr");
                Expr::StdDice(lhs.map(Box::new), Box::new(build_expr(e)))
            }
            Rule::int => {
                let sides = parse_int(&first);
                Expr::StdDice(lhs.map(Box::new), Box::new(Expr::Value(Some(sides))))
            }
            other => unreachable!("unknown dice_rhs child `{other:?}`"),
        };
    }
    let lower = text.to_ascii_lowercase();
    if lower.ends_with('%') {
        Expr::PercentDice(lhs.map(Box::new))
    } else if lower.ends_with('f') {
        Expr::FudgeDice(lhs.map(Box::new))
    } else {
        unreachable!("unexpected dice_rhs text `{text}`")
    }
}

fn parse_cmp_target(pair: Pair<Rule>) -> (Option<CmpOp>, Option<i64>) {
    let mut inner = pair.into_inner();
    let first = inner.next().expect("*_target always has a child");
    match first.as_rule() {
        Rule::cmp_op => {
            let cmp = CmpOp::parse(first.as_str());
            let int_pair = inner.next().expect("cmp_op always followed by int");
            (Some(cmp), Some(parse_int(&int_pair)))
        }
        Rule::int => (None, Some(parse_int(&first))),
        other => unreachable!("unknown *_target child `{other:?}`"),
    }
}

/// Consume the next pair from `inner` only if it matches `rule`, otherwise
/// leave `inner` untouched. Used because `*_target`/`int` suffixes are
/// optional: when absent, the next pair belongs to the *following* loop
/// iteration's operator, not to this one.
fn peek_if<'a>(inner: &mut pest::iterators::Pairs<'a, Rule>, rule: Rule) -> Option<Pair<'a, Rule>> {
    let mut clone = inner.clone();
    match clone.next() {
        Some(p) if p.as_rule() == rule => {
            *inner = clone;
            Some(p)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_as_value_none() {
        let e = parse("").unwrap();
        assert!(matches!(e, Expr::Value(None)));
    }

    #[test]
    fn parses_plain_dice() {
        let e = parse("4d6").unwrap();
        match e {
            Expr::StdDice(Some(lhs), rhs) => {
                assert!(matches!(*lhs, Expr::Value(Some(4))));
                assert!(matches!(*rhs, Expr::Value(Some(6))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn d6_defaults_left_to_none() {
        let e = parse("d6").unwrap();
        match e {
            Expr::StdDice(None, rhs) => assert!(matches!(*rhs, Expr::Value(Some(6)))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keep_high_chain() {
        let e = parse("4d20 kh2").unwrap();
        match e {
            Expr::DropHighLow(inner, DropHighLowOp::KeepHigh, Some(2)) => {
                assert!(matches!(*inner, Expr::StdDice(..)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn counting_with_comparator() {
        let e = parse("4d6#>3").unwrap();
        match e {
            Expr::Count(_, CountOp::Plain, Some(CmpOp::Gt), Some(3)) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn distinguishes_d66_from_lowercase() {
        match parse("2D66").unwrap() {
            Expr::D66Dice(Some(_)) => {}
            other => panic!("unexpected {other:?}"),
        }
        match parse("2d66").unwrap() {
            Expr::StdDice(Some(_), rhs) => assert!(matches!(*rhs, Expr::Value(Some(66)))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explode_then_count() {
        let e = parse("9d6!").unwrap();
        assert!(matches!(e, Expr::Explode(..)));
    }

    #[test]
    fn penetrate_with_die_size() {
        let e = parse("9d6p8").unwrap();
        match e {
            Expr::Penetrate(_, Some(8)) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn leading_minus_is_binary_subtraction() {
        let e = parse("-6").unwrap();
        match e {
            Expr::Sub(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Value(None)));
                assert!(matches!(*rhs, Expr::Value(Some(6))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn aggregate_brace_expr() {
        let e = parse("{2d6+2d10}!").unwrap();
        match e {
            Expr::Explode(inner, ..) => assert!(matches!(*inner, Expr::Aggregate(_))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_comparator_without_int_is_format_error() {
        assert!(parse("4d6#=").is_err());
    }

    #[test]
    fn csv_dice() {
        let e = parse("3d[1,3,5]").unwrap();
        match e {
            Expr::CsvDice(Some(_), vals) => assert_eq!(vals, vec![1, 3, 5]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn csv_dice_allows_negative_faces() {
        let e = parse("1d[-1,-1,0,0,1,1]").unwrap();
        match e {
            Expr::CsvDice(Some(_), vals) => assert_eq!(vals, vec![-1, -1, 0, 0, 1, 1]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dynamic_sides_expr() {
        let e = parse("2d(1d6)").unwrap();
        match e {
            Expr::StdDice(Some(_), rhs) => assert!(matches!(*rhs, Expr::StdDice(..))),
            other => panic!("unexpected {other:?}"),
        }
    }
}
