//! Repeats an expression against its own [`Roller`] and aggregates basic
//! descriptive statistics.

use std::collections::BTreeMap;

use crate::ast::Expr;
use crate::error::Result;
use crate::evaluator::{eval, EvalContext, Listener};
use crate::roller::Roller;

/// Default repeat count when the caller doesn't ask for a specific `k`.
pub const DEFAULT_ROLLS: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub mean: f64,
    /// Standard deviation, rounded to two decimal places.
    pub stddev: f64,
    pub min: i64,
    pub max: i64,
    pub count: u32,
    /// `total -> frequency`.
    pub histogram: BTreeMap<i64, u32>,
}

/// Roll `expr` `count` times through `ctx`'s Roller, aggregating totals.
pub async fn roll_stats<R: Roller, L: Listener>(
    expr: &Expr,
    ctx: &mut EvalContext<R, L>,
    count: u32,
) -> Result<Stats> {
    let mut totals = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let root = eval(expr, ctx, 0).await?;
        totals.push(root.total());
    }
    Ok(summarize(&totals))
}

fn summarize(totals: &[i64]) -> Stats {
    let count = totals.len() as u32;
    let sum: i64 = totals.iter().sum();
    let mean = sum as f64 / count.max(1) as f64;
    let variance = totals.iter().map(|t| {
        let d = *t as f64 - mean;
        d * d
    }).sum::<f64>() / count.max(1) as f64;
    let stddev = (variance.sqrt() * 100.0).round() / 100.0;
    let min = totals.iter().copied().min().unwrap_or(0);
    let max = totals.iter().copied().max().unwrap_or(0);
    let mut histogram = BTreeMap::new();
    for t in totals {
        *histogram.entry(*t).or_insert(0) += 1;
    }
    Stats {
        mean,
        stddev,
        min,
        max,
        count,
        histogram,
    }
}
