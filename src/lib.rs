#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
//! `rollgraph` is a dice-notation parser and evaluator. It turns text like
//! `4d20 kh2 #cs #cf`, `9d6!`, or `(2d6+2d10)!` into a structured, provenance-
//! tracked roll result tree instead of a single number.
//!
//! The crate only supplies the grammar, the expression tree, and the
//! evaluation semantics. Three things are deliberately left to the caller:
//!
//! - **Randomness**: implement [`Roller`] (or use [`RngRoller`],
//!   [`PreRolledRoller`], or [`CallbackRoller`]).
//! - **Aggregation over many rolls**: see [`stats::roll_stats`].
//! - **Logging**: the crate emits [`tracing`] events; attach a subscriber if
//!   you want to see them.
//!
//! # Usage
//!
//! ```
//! use rollgraph::{DiceExpr, RngRoller};
//!
//! # futures::executor::block_on(async {
//! let expr = DiceExpr::new("4d20 kh2").unwrap();
//! let summary = expr.roll_with(RngRoller::secure()).await.unwrap();
//! println!("{summary}");
//! # });
//! ```
//!
//! # Syntax
//!
//! ```text
//! expr    := term (('+'|'-'|',') term)*
//! term    := count ('*' count)*
//! count   := drop (('#'|'#s'|'#f'|'#cs'|'#cf') cmpOp? int?)*
//! drop    := reroll (('-<'|'-<='|'->'|'->='|'-='|'-h'|'-l'|'kh'|'kl'|'k'|'C>'|'C<'|'s'|'sd') int?)*
//! reroll  := explode (('r'|'ro') cmpOp? int?)*
//! explode := dice (('!!o'|'!!'|'!o'|'!'|'p') cmpOp? int?)*
//! dice    := atom ('d' diceRhs | 'D66' | 'd%')?
//! diceRhs := int | 'F' | '66' | '%' | '[' int (',' int)* ']' | '(' expr ')'
//! atom    := int | '(' expr ')' | ε
//! cmpOp   := '=' | '>' | '<' | '>=' | '<='
//! ```
//!
//! `{expr}` aggregates a subexpression's pool down to one value before any
//! outer modifier sees it, e.g. `(2d6+2d10)!` explodes the combined pool,
//! while `2d6!+2d10!` explodes each pool independently.
//!
//! # Modifiers
//!
//! - `kh2`/`kl2`/`-h2`/`-l2`: keep/drop by rank.
//! - `-<5`, `->=3`, `-=1`: drop by comparison against a target.
//! - `C>18`, `C<1`: clamp results to a ceiling/floor.
//! - `s`, `sd`: sort ascending/descending.
//! - `r1`, `ro<=2`: reroll (indefinitely, or once with `ro`) while a die
//!   matches.
//! - `!`, `!o`, `!!`, `!!o`: explode/compound, indefinitely or once.
//! - `p`, `p8`: penetrate (explode with a -1 per follow-on roll), optionally
//!   against a different die size.
//! - `#`, `#>3`, `#s`, `#f`, `#cs`, `#cf`: count matches, or flag
//!   success/failure/critical dice without collapsing the pool.
//!
//! # Non-goals
//!
//! Persistence, networking, concurrency across expressions, internationalized
//! text, symbolic algebra/expected-value computation, and parser error
//! recovery beyond the first offending position are all out of scope.

pub mod ast;
pub mod error;
pub mod evaluator;
pub(crate) mod grammar;
pub mod rolldie;
pub mod roller;
pub mod rollresult;
pub mod stats;
pub mod summary;

pub use ast::{parse, Expr};
pub use error::*;
pub use evaluator::{eval, roll, EvalContext, Listener};
pub use rolldie::{DieType, RolledDie};
pub use roller::{
    CallbackRoller, DiceResultRoller, EvalConfig, PreRolledRoller, Roller, RngRoller, FUDGE_FACES,
    MAX_NDICE, MAX_NSIDES, MIN_NDICE, MIN_NSIDES,
};
pub use rollresult::{OpType, RollResult};
pub use summary::RollSummary;

/// A parsed dice-notation expression, reusable across many independent rolls.
///
/// Building a [`DiceExpr`] only runs the grammar; it never touches a
/// [`Roller`]. Mandatory-operand and range checks (an
/// [`error::FormatError`], e.g. a missing clamp target or an out-of-range
/// `nsides`) surface from [`DiceExpr::roll`] instead.
#[derive(Debug, Clone)]
pub struct DiceExpr {
    text: String,
    expr: Expr,
}

impl DiceExpr {
    /// Parse `input` into a reusable expression tree.
    pub fn new(input: &str) -> Result<Self> {
        let expr = parse(input)?;
        Ok(DiceExpr {
            text: input.to_owned(),
            expr,
        })
    }

    /// The original input text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The parsed expression tree, for callers that want to inspect its
    /// shape (e.g. to drive [`stats::roll_stats`] directly).
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate this expression against an existing [`EvalContext`],
    /// producing an independent [`RollSummary`] each call. The expression
    /// tree itself is never mutated, so it may be rolled repeatedly.
    pub async fn roll<R, L>(&self, ctx: &mut EvalContext<R, L>) -> Result<RollSummary>
    where
        R: Roller,
        L: Listener,
    {
        roll(&self.expr, self.text.clone(), ctx).await
    }

    /// Convenience entry point: build a fresh, listener-less [`EvalContext`]
    /// around `roller` and evaluate once.
    pub async fn roll_with<R: Roller>(&self, roller: R) -> Result<RollSummary> {
        let mut ctx = EvalContext::new(roller);
        self.roll(&mut ctx).await
    }

    /// Convenience entry point over the default secure RNG-backed roller.
    pub async fn roll_secure(&self) -> Result<RollSummary> {
        self.roll_with(RngRoller::secure()).await
    }
}

impl std::str::FromStr for DiceExpr {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self> {
        DiceExpr::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn parses_and_rolls_against_prerolled() {
        let expr = DiceExpr::new("4d6 kh2").unwrap();
        let summary = block_on(expr.roll_with(PreRolledRoller::new([6, 2, 1, 5]))).unwrap();
        assert_eq!(summary.total, 11);
    }

    #[test]
    fn reusable_across_independent_rolls() {
        let expr = DiceExpr::new("2d6").unwrap();
        let first = block_on(expr.roll_with(PreRolledRoller::new([3, 4]))).unwrap();
        let second = block_on(expr.roll_with(PreRolledRoller::new([1, 2]))).unwrap();
        assert_eq!(first.total, 7);
        assert_eq!(second.total, 3);
    }

    #[test]
    fn from_str_impl() {
        let expr: DiceExpr = "1d20".parse().unwrap();
        assert_eq!(expr.text(), "1d20");
    }

    #[test]
    fn malformed_expression_is_format_error() {
        assert!(DiceExpr::new("4d6#=").is_err());
    }

    #[test]
    fn empty_input_rolls_to_zero() {
        let expr = DiceExpr::new("").unwrap();
        let summary = block_on(expr.roll_with(PreRolledRoller::new([]))).unwrap();
        assert_eq!(summary.total, 0);
    }
}
