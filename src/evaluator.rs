//! The asynchronous post-order walk that turns an [`Expr`] tree
//! into a [`RollResult`] tree, invoking a [`Roller`] at every dice-producing
//! leaf and an optional [`Listener`] at every non-root node.
//!
//! Recursion is expressed with boxed futures (`BoxFuture`) rather than a
//! native recursive `async fn`, since the latter would require an
//! infinitely-sized future type.

use std::rc::Rc;

use futures::future::BoxFuture;

use crate::ast::{ClampOp, CmpOp, CountOp, DropCompareOp, DropHighLowOp, Expr, ExplodeOp, RerollOp, SortOp};
use crate::error::{FormatError, Result};
use crate::rolldie::RolledDie;
use crate::roller::{DiceResultRoller, EvalConfig, Roller};
use crate::rollresult::{OpType, RollResult};

/// Observes evaluation as it happens. The default `()` implementation does
/// nothing; supply your own to drive a live display or transcript.
pub trait Listener {
    /// Invoked once per non-root node, with that node's freshly built result.
    fn on_roll(&mut self, _result: &RollResult) {}
    /// Invoked once, after the whole tree is built, with the root summary.
    fn on_summary(&mut self, _summary: &crate::summary::RollSummary) {}
}

impl Listener for () {}

/// Threads a [`Roller`], the iteration bound, and an optional [`Listener`]
/// through one evaluation.
pub struct EvalContext<R: Roller, L: Listener = ()> {
    pub roller: DiceResultRoller<R>,
    pub config: EvalConfig,
    pub listener: L,
}

impl<R: Roller> EvalContext<R, ()> {
    pub fn new(roller: R) -> Self {
        EvalContext {
            roller: DiceResultRoller::new(roller),
            config: EvalConfig::default(),
            listener: (),
        }
    }
}

impl<R: Roller, L: Listener> EvalContext<R, L> {
    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_listener<L2: Listener>(self, listener: L2) -> EvalContext<R, L2> {
        EvalContext {
            roller: self.roller,
            config: self.config,
            listener,
        }
    }
}

fn iteration_bound(config: &EvalConfig, once: bool) -> u32 {
    if once {
        1
    } else {
        config.iteration_bound
    }
}

fn predicate(cmp: Option<CmpOp>, target: i64) -> impl Fn(i64) -> bool {
    move |v| cmp.unwrap_or(CmpOp::Eq).matches(v, target)
}

/// Whether `expr` is a raw integer literal (or the empty atom) -- such a
/// node's `RollResult` is folded into its parent's `results`/`discarded` but
/// never attached as a `left`/`right` child.
fn is_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Value(_))
}

/// Evaluate `expr`, recursing into children before building this node's
/// result (post-order). `depth` distinguishes the root call (`0`, no
/// listener callback) from every nested call (listener fires on return).
pub fn eval<'a, R, L>(expr: &'a Expr, ctx: &'a mut EvalContext<R, L>, depth: u32) -> BoxFuture<'a, Result<RollResult>>
where
    R: Roller + 'a,
    L: Listener + 'a,
{
    Box::pin(async move {
        tracing::trace!(depth, ?expr, "evaluating node");
        let node = match expr {
            Expr::Value(None) => RollResult::new("", OpType::Value),
            Expr::Value(Some(v)) => {
                RollResult::new(v.to_string(), OpType::Value).with_results(vec![RolledDie::single(*v)])
            }

            Expr::Add(a, b) => {
                let la = eval(a, ctx, depth + 1).await?;
                let lb = eval(b, ctx, depth + 1).await?;
                RollResult::add(render(expr), la, lb, is_literal(a), is_literal(b))
            }
            Expr::Sub(a, b) => {
                let la = eval(a, ctx, depth + 1).await?;
                let lb = eval(b, ctx, depth + 1).await?;
                RollResult::sub(render(expr), la, lb, is_literal(a), is_literal(b))
            }
            Expr::Mul(a, b) => {
                let la = eval(a, ctx, depth + 1).await?;
                let lb = eval(b, ctx, depth + 1).await?;
                RollResult::mul(render(expr), la, lb, is_literal(a), is_literal(b))
            }
            Expr::Comma(a, b) => {
                let la = eval(a, ctx, depth + 1).await?;
                let lb = eval(b, ctx, depth + 1).await?;
                RollResult::comma(render(expr), la, lb, is_literal(a), is_literal(b))
            }
            Expr::Aggregate(inner) => {
                let r = eval(inner, ctx, depth + 1).await?;
                RollResult::aggregate(render(expr), r, is_literal(inner))
            }

            Expr::StdDice(left, right) => {
                let (ndice, left_result) = match left {
                    Some(e) => {
                        let r = eval(e, ctx, depth + 1).await?;
                        (r.total(), (!is_literal(e)).then(|| Rc::new(r)))
                    }
                    None => (1, None),
                };
                let right_result = eval(right, ctx, depth + 1).await?;
                let nsides = right_result.total();
                check_dice_bounds(ndice, nsides, &render(expr))?;
                let dice = ctx.roller.roll(ndice, nsides).await?;
                let right_child = (!is_literal(right)).then(|| Rc::new(right_result));
                RollResult::new(render(expr), OpType::RollDice)
                    .with_results(dice)
                    .with_children(left_result, right_child)
            }
            Expr::PercentDice(left) => {
                let (ndice, left_result) = match left {
                    Some(e) => {
                        let r = eval(e, ctx, depth + 1).await?;
                        (r.total(), (!is_literal(e)).then(|| Rc::new(r)))
                    }
                    None => (1, None),
                };
                check_dice_bounds(ndice, 100, &render(expr))?;
                let dice = ctx.roller.roll_percent(ndice).await?;
                RollResult::new(render(expr), OpType::RollPercent)
                    .with_results(dice)
                    .with_children(left_result, None)
            }
            Expr::D66Dice(left) => {
                let (ndice, left_result) = match left {
                    Some(e) => {
                        let r = eval(e, ctx, depth + 1).await?;
                        (r.total(), (!is_literal(e)).then(|| Rc::new(r)))
                    }
                    None => (1, None),
                };
                check_dice_bounds(ndice, 66, &render(expr))?;
                let dice = ctx.roller.roll_d66(ndice).await?;
                RollResult::new(render(expr), OpType::RollD66)
                    .with_results(dice)
                    .with_children(left_result, None)
            }
            Expr::FudgeDice(left) => {
                let (ndice, left_result) = match left {
                    Some(e) => {
                        let r = eval(e, ctx, depth + 1).await?;
                        (r.total(), (!is_literal(e)).then(|| Rc::new(r)))
                    }
                    None => (1, None),
                };
                check_dice_bounds(ndice, 6, &render(expr))?;
                let dice = ctx.roller.roll_fudge(ndice).await?;
                RollResult::new(render(expr), OpType::RollFudge)
                    .with_results(dice)
                    .with_children(left_result, None)
            }
            Expr::CsvDice(left, vals) => {
                let (ndice, left_result) = match left {
                    Some(e) => {
                        let r = eval(e, ctx, depth + 1).await?;
                        (r.total(), (!is_literal(e)).then(|| Rc::new(r)))
                    }
                    None => (1, None),
                };
                if vals.is_empty() {
                    return Err(FormatError::new("Invalid dice list. Empty value set", render(expr)).into());
                }
                check_dice_bounds(ndice, vals.len() as i64, &render(expr))?;
                let dice = ctx.roller.roll_vals(ndice, vals).await?;
                RollResult::new(render(expr), OpType::RollVals)
                    .with_results(dice)
                    .with_children(left_result, None)
            }

            Expr::DropCompare(lhs, op, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let Some(t) = target else {
                    return Err(
                        FormatError::new("Invalid drop operation. Missing drop target", render(expr)).into(),
                    );
                };
                let matches = |v: i64| match op {
                    DropCompareOp::Lt => v < *t,
                    DropCompareOp::Le => v <= *t,
                    DropCompareOp::Gt => v > *t,
                    DropCompareOp::Ge => v >= *t,
                    DropCompareOp::Eq => v == *t,
                };
                let mut results = Vec::new();
                let mut discarded = lhs_result.discarded.clone();
                for die in &lhs_result.results {
                    if matches(die.result) {
                        discarded.push(die.derive().discarded(true).build());
                    } else {
                        results.push(die.clone());
                    }
                }
                RollResult::new(render(expr), OpType::Drop)
                    .with_results(results)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::DropHighLow(lhs, op, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let k = (*target).unwrap_or(1).max(0) as usize;
                let mut sorted = lhs_result.results.clone();
                sorted.sort_by_key(|d| d.result);
                let len = sorted.len();
                let split = k.min(len);
                let (kept, dropped): (Vec<RolledDie>, Vec<RolledDie>) = match op {
                    DropHighLowOp::DropHigh => {
                        let (keep, drop) = sorted.split_at(len - split);
                        (keep.to_vec(), drop.to_vec())
                    }
                    DropHighLowOp::DropLow => {
                        let (drop, keep) = sorted.split_at(split);
                        (keep.to_vec(), drop.to_vec())
                    }
                    DropHighLowOp::KeepHigh => {
                        let (drop, keep) = sorted.split_at(len - split);
                        (keep.to_vec(), drop.to_vec())
                    }
                    DropHighLowOp::KeepLow => {
                        let (keep, drop) = sorted.split_at(split);
                        (keep.to_vec(), drop.to_vec())
                    }
                };
                let mut discarded = lhs_result.discarded.clone();
                discarded.extend(dropped.into_iter().map(|d| d.derive().discarded(true).build()));
                RollResult::new(render(expr), OpType::Drop)
                    .with_results(kept)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::Clamp(lhs, op, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let Some(t) = target else {
                    return Err(FormatError::new("Invalid clamp operation. Missing clamp target", render(expr)).into());
                };
                let mut results = Vec::new();
                let mut discarded = lhs_result.discarded.clone();
                for die in &lhs_result.results {
                    match op {
                        ClampOp::Ceiling if die.result > *t => {
                            discarded.push(die.clone());
                            results.push(die.derive().result((*t).min(die.result)).clamp_ceiling(true).build());
                        }
                        ClampOp::Floor if die.result < *t => {
                            discarded.push(die.clone());
                            results.push(die.derive().result((*t).max(die.result)).clamp_floor(true).build());
                        }
                        _ => results.push(die.clone()),
                    }
                }
                RollResult::new(render(expr), OpType::Clamp)
                    .with_results(results)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::Sort(lhs, op) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let mut results = lhs_result.results.clone();
                let mut discarded = lhs_result.discarded.clone();
                match op {
                    SortOp::Ascending => {
                        results.sort_by_key(|d| d.result);
                        discarded.sort_by_key(|d| d.result);
                    }
                    SortOp::Descending => {
                        results.sort_by_key(|d| std::cmp::Reverse(d.result));
                        discarded.sort_by_key(|d| std::cmp::Reverse(d.result));
                    }
                }
                RollResult::new(render(expr), OpType::Sort)
                    .with_results(results)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::Reroll(lhs, op, cmp, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let Some(t) = target else {
                    return Err(
                        FormatError::new("Invalid reroll operation. Missing reroll target", render(expr)).into(),
                    );
                };
                let bound = iteration_bound(&ctx.config, matches!(op, RerollOp::RerollOnce));
                let matches = predicate(*cmp, *t);
                let mut results = Vec::new();
                let mut discarded = lhs_result.discarded.clone();
                for die in &lhs_result.results {
                    if matches(die.result) {
                        let mut current = ctx.roller.reroll(die).await?;
                        let mut iterations = 1;
                        while matches(current.result) && iterations < bound {
                            current = ctx.roller.reroll(&current).await?;
                            iterations += 1;
                        }
                        discarded.push(die.derive().discarded(true).rerolled(true).build());
                        results.push(current.derive().reroll(true).from(vec![Rc::new(die.clone())]).build());
                    } else {
                        results.push(die.clone());
                    }
                }
                RollResult::new(render(expr), OpType::Reroll)
                    .with_results(results)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::Explode(lhs, op, cmp, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let compound = matches!(op, ExplodeOp::Compound | ExplodeOp::CompoundOnce);
                let once = matches!(op, ExplodeOp::ExplodeOnce | ExplodeOp::CompoundOnce);
                let bound = iteration_bound(&ctx.config, once);
                let mut results = Vec::new();
                let mut discarded = lhs_result.discarded.clone();
                for die in &lhs_result.results {
                    if !die.die_type.explodable() {
                        results.push(die.clone());
                        continue;
                    }
                    let t = (*target).unwrap_or_else(|| die.max_potential());
                    let matches = predicate(*cmp, t);
                    if !matches(die.result) {
                        results.push(die.clone());
                        continue;
                    }
                    if compound {
                        discarded.push(die.derive().discarded(true).compounded(true).build());
                        let mut sum = die.result;
                        let mut current = die.clone();
                        let mut iterations = 0;
                        loop {
                            let next = ctx.roller.reroll(&current).await?;
                            iterations += 1;
                            sum += next.result;
                            discarded.push(next.derive().compounded(true).build());
                            if matches(next.result) && iterations < bound {
                                current = next;
                            } else {
                                break;
                            }
                        }
                        results.push(die.derive().result(sum).compounded_final(true).from(vec![Rc::new(die.clone())]).build());
                    } else {
                        results.push(die.derive().exploded(true).build());
                        let mut current = die.clone();
                        let mut iterations = 0;
                        loop {
                            let next = ctx.roller.reroll(&current).await?;
                            iterations += 1;
                            let flagged = next.derive().explosion(true).build();
                            let keep_going = matches(flagged.result) && iterations < bound;
                            results.push(flagged.clone());
                            if keep_going {
                                current = flagged;
                            } else {
                                break;
                            }
                        }
                    }
                }
                RollResult::new(render(expr), if compound { OpType::Compound } else { OpType::Explode })
                    .with_results(results)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::Penetrate(lhs, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                let bound = ctx.config.iteration_bound;
                let mut results = Vec::new();
                let mut discarded = lhs_result.discarded.clone();
                for die in &lhs_result.results {
                    if die.die_type != crate::rolldie::DieType::Polyhedral || die.result != die.max_potential() {
                        results.push(die.clone());
                        continue;
                    }
                    let m = (*target).unwrap_or(die.nsides);
                    let mut sum = die.result;
                    let mut num_penetrations: i64 = 0;
                    let mut maxed = true;
                    while maxed && (num_penetrations as u32) < bound {
                        let next = ctx.roller.roll(1, m).await?.remove(0);
                        num_penetrations += 1;
                        sum += next.result;
                        maxed = next.result == m;
                        discarded.push(next.derive().penetrator(true).build());
                    }
                    sum -= num_penetrations;
                    discarded.push(RolledDie::single(-num_penetrations).derive().penetrator(true).build());
                    results.push(die.derive().result(sum).penetrated(true).from(vec![Rc::new(die.clone())]).build());
                }
                RollResult::new(render(expr), OpType::RollPenetration)
                    .with_results(results)
                    .with_discarded(discarded)
                    .with_children(Some(Rc::new(lhs_result)), None)
            }

            Expr::Count(lhs, op, cmp, target) => {
                let lhs_result = eval(lhs, ctx, depth + 1).await?;
                match op {
                    CountOp::Plain => {
                        let count = match target {
                            Some(t) => {
                                let matches = predicate(*cmp, *t);
                                lhs_result.results.iter().filter(|d| matches(d.result)).count()
                            }
                            None => lhs_result.results.len(),
                        };
                        let mut discarded = lhs_result.discarded.clone();
                        discarded.extend(lhs_result.results.clone());
                        RollResult::new(render(expr), OpType::Count)
                            .with_results(vec![RolledDie::single(count as i64)])
                            .with_discarded(discarded)
                            .with_children(Some(Rc::new(lhs_result)), None)
                    }
                    _ => {
                        let mut results = Vec::new();
                        for die in &lhs_result.results {
                            let hit = match target {
                                Some(t) => predicate(*cmp, *t)(die.result),
                                None => {
                                    if die.is_constant() {
                                        false
                                    } else {
                                        match op {
                                            CountOp::Success | CountOp::CritSuccess => die.result == die.max_potential(),
                                            CountOp::Failure | CountOp::CritFailure => die.result == die.min_potential(),
                                            CountOp::Plain => unreachable!(),
                                        }
                                    }
                                }
                            };
                            let flagged = if !hit {
                                die.clone()
                            } else {
                                match op {
                                    CountOp::Success => die.derive().success(true).build(),
                                    CountOp::Failure => die.derive().failure(true).build(),
                                    CountOp::CritSuccess => die.derive().crit_success(true).build(),
                                    CountOp::CritFailure => die.derive().crit_failure(true).build(),
                                    CountOp::Plain => unreachable!(),
                                }
                            };
                            results.push(flagged);
                        }
                        RollResult::new(render(expr), OpType::Count)
                            .with_results(results)
                            .with_discarded(lhs_result.discarded.clone())
                            .with_children(Some(Rc::new(lhs_result)), None)
                    }
                }
            }
        };

        if depth > 0 {
            ctx.listener.on_roll(&node);
        }
        Ok(node)
    })
}

/// Evaluate `expr` to completion and wrap the root in a [`RollSummary`],
/// firing `ctx.listener.on_summary` once the tree is fully built.
pub async fn roll<R, L>(
    expr: &Expr,
    expression: impl Into<String>,
    ctx: &mut EvalContext<R, L>,
) -> Result<crate::summary::RollSummary>
where
    R: Roller,
    L: Listener,
{
    let root = eval(expr, ctx, 0).await?;
    let summary = crate::summary::RollSummary::new(expression, root);
    ctx.listener.on_summary(&summary);
    Ok(summary)
}

fn check_dice_bounds(ndice: i64, nsides: i64, expression: &str) -> Result<()> {
    if !(0..=1000).contains(&ndice) {
        return Err(FormatError::new(format!("Invalid number of dice: {ndice}"), expression).into());
    }
    if !(2..=100_000).contains(&nsides) {
        return Err(FormatError::new(format!("Invalid number of sides: {nsides}"), expression).into());
    }
    Ok(())
}

/// Canonical re-print of an [`Expr`] subtree, used to label every node's
/// `expression` field.
fn render(expr: &Expr) -> String {
    match expr {
        Expr::Value(None) => String::new(),
        Expr::Value(Some(v)) => v.to_string(),
        Expr::Add(a, b) => format!("{}+{}", render(a), render(b)),
        Expr::Sub(a, b) => format!("{}-{}", render(a), render(b)),
        Expr::Mul(a, b) => format!("{}*{}", render(a), render(b)),
        Expr::Comma(a, b) => format!("{},{}", render(a), render(b)),
        Expr::Aggregate(inner) => format!("{{{}}}", render(inner)),
        Expr::StdDice(l, r) => format!("{}d{}", render_opt(l), render(r)),
        Expr::PercentDice(l) => format!("{}d%", render_opt(l)),
        Expr::D66Dice(l) => format!("{}D66", render_opt(l)),
        Expr::FudgeDice(l) => format!("{}dF", render_opt(l)),
        Expr::CsvDice(l, vals) => format!(
            "{}d[{}]",
            render_opt(l),
            vals.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
        ),
        Expr::DropCompare(lhs, op, t) => format!("{}{}{}", render(lhs), drop_compare_token(*op), render_target(t)),
        Expr::DropHighLow(lhs, op, t) => format!("{}{}{}", render(lhs), drop_hl_token(*op), render_target(t)),
        Expr::Clamp(lhs, op, t) => format!("{}{}{}", render(lhs), clamp_token(*op), render_target(t)),
        Expr::Sort(lhs, op) => format!("{}{}", render(lhs), sort_token(*op)),
        Expr::Reroll(lhs, op, cmp, t) => format!("{}{}{}", render(lhs), reroll_token(*op), render_cmp_target(*cmp, t)),
        Expr::Explode(lhs, op, cmp, t) => format!("{}{}{}", render(lhs), explode_token(*op), render_cmp_target(*cmp, t)),
        Expr::Penetrate(lhs, t) => format!("{}p{}", render(lhs), render_target(t)),
        Expr::Count(lhs, op, cmp, t) => format!("{}{}{}", render(lhs), count_token(*op), render_cmp_target(*cmp, t)),
    }
}

fn render_opt(e: &Option<Box<Expr>>) -> String {
    e.as_deref().map(render).unwrap_or_default()
}

fn render_target(t: &Option<i64>) -> String {
    t.map(|v| v.to_string()).unwrap_or_default()
}

fn render_cmp_target(cmp: Option<CmpOp>, t: &Option<i64>) -> String {
    match (cmp, t) {
        (Some(c), Some(v)) => format!("{}{}", cmp_token(c), v),
        (None, Some(v)) => v.to_string(),
        _ => String::new(),
    }
}

fn cmp_token(c: CmpOp) -> &'static str {
    match c {
        CmpOp::Eq => "=",
        CmpOp::Gt => ">",
        CmpOp::Lt => "<",
        CmpOp::Ge => ">=",
        CmpOp::Le => "<=",
    }
}

fn drop_compare_token(op: DropCompareOp) -> &'static str {
    match op {
        DropCompareOp::Lt => "-<",
        DropCompareOp::Le => "-<=",
        DropCompareOp::Gt => "->",
        DropCompareOp::Ge => "->=",
        DropCompareOp::Eq => "-=",
    }
}

fn drop_hl_token(op: DropHighLowOp) -> &'static str {
    match op {
        DropHighLowOp::DropHigh => "-h",
        DropHighLowOp::DropLow => "-l",
        DropHighLowOp::KeepHigh => "kh",
        DropHighLowOp::KeepLow => "kl",
    }
}

fn clamp_token(op: ClampOp) -> &'static str {
    match op {
        ClampOp::Ceiling => "C>",
        ClampOp::Floor => "C<",
    }
}

fn sort_token(op: SortOp) -> &'static str {
    match op {
        SortOp::Ascending => "s",
        SortOp::Descending => "sd",
    }
}

fn reroll_token(op: RerollOp) -> &'static str {
    match op {
        RerollOp::Reroll => "r",
        RerollOp::RerollOnce => "ro",
    }
}

fn explode_token(op: ExplodeOp) -> &'static str {
    match op {
        ExplodeOp::Explode => "!",
        ExplodeOp::ExplodeOnce => "!o",
        ExplodeOp::Compound => "!!",
        ExplodeOp::CompoundOnce => "!!o",
    }
}

fn count_token(op: CountOp) -> &'static str {
    match op {
        CountOp::Plain => "#",
        CountOp::Success => "#s",
        CountOp::Failure => "#f",
        CountOp::CritSuccess => "#cs",
        CountOp::CritFailure => "#cf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse;
    use crate::roller::PreRolledRoller;
    use futures::executor::block_on;

    fn run(expr_text: &str, rolls: impl IntoIterator<Item = i64>) -> RollResult {
        let expr = parse(expr_text).unwrap();
        let mut ctx = EvalContext::new(PreRolledRoller::new(rolls));
        block_on(eval(&expr, &mut ctx, 0)).unwrap()
    }

    #[test]
    fn four_d6_totals_14() {
        let r = run("4d6", [6, 2, 1, 5]);
        assert_eq!(r.total(), 14);
    }

    #[test]
    fn keep_high_two() {
        let r = run("4d6 kh2", [6, 2, 1, 5]);
        assert_eq!(r.total(), 11);
        assert_eq!(r.discarded.iter().map(|d| d.result).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn count_above_three() {
        let r = run("4d6#>3", [6, 2, 1, 5]);
        assert_eq!(r.total(), 2);
        assert_eq!(r.op_type, OpType::Count);
    }

    #[test]
    fn success_and_failure_flags() {
        let r = run("(4d6+1)#s#f", [6, 2, 1, 5]);
        assert_eq!(r.success_count(), 1);
        assert_eq!(r.failure_count(), 1);
    }

    #[test]
    fn prerolled_delivers_in_order() {
        let r = run("2d6+3", [6, 1]);
        assert_eq!(r.total(), 10);
    }

    #[test]
    fn prerolled_exhaustion_propagates() {
        let expr = parse("3d6").unwrap();
        let mut ctx = EvalContext::new(PreRolledRoller::new([1, 2]));
        assert!(block_on(eval(&expr, &mut ctx, 0)).is_err());
    }

    #[test]
    fn explode_matches_scenario() {
        let r = run("9d6!", [6, 2, 1, 5, 3, 5, 1, 4, 6, 5, 6, 4]);
        assert_eq!(r.total(), 48);
    }

    #[test]
    fn penetrate_matches_scenario() {
        let r = run("9d6p", [6, 2, 1, 5, 3, 5, 1, 4, 6, 5, 6, 4]);
        assert_eq!(r.total(), 45);
    }

    #[test]
    fn explode_never_shortens_pool() {
        let r = run("9d6!", [6, 2, 1, 5, 3, 5, 1, 4, 6, 5, 6, 4]);
        assert!(r.results.len() >= 9);
    }

    #[test]
    fn compound_preserves_length() {
        let r = run("9d6!!", [6, 2, 1, 5, 3, 5, 1, 4, 6, 5, 6, 4]);
        assert_eq!(r.results.len(), 9);
    }

    #[test]
    fn leading_minus_reads_as_subtraction() {
        let r = run("-6", []);
        assert_eq!(r.total(), -6);
    }

    #[test]
    fn literal_operands_never_become_children() {
        let r = run("2d6+1", [3, 4]);
        assert_eq!(r.total(), 8);
        assert!(r.left.is_some());
        assert!(r.right.is_none());
    }

    #[derive(Default)]
    struct RecordingListener {
        rolls: usize,
        summary_total: Option<i64>,
    }

    impl Listener for RecordingListener {
        fn on_roll(&mut self, _result: &RollResult) {
            self.rolls += 1;
        }
        fn on_summary(&mut self, summary: &crate::summary::RollSummary) {
            self.summary_total = Some(summary.total);
        }
    }

    #[test]
    fn roll_fires_on_roll_per_node_and_on_summary_once() {
        let expr = parse("4d6 kh2").unwrap();
        let mut ctx = EvalContext::new(PreRolledRoller::new([6, 2, 1, 5])).with_listener(RecordingListener::default());
        let summary = block_on(roll(&expr, "4d6 kh2", &mut ctx)).unwrap();
        assert_eq!(summary.total, 11);
        assert_eq!(ctx.listener.summary_total, Some(11));
        // dice node + kh node, root itself doesn't get on_roll (depth 0)
        assert_eq!(ctx.listener.rolls, 2);
    }
}
