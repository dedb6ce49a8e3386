//! The evaluated tree node and the arithmetic combinators defined directly
//! on it. One `RollResult` is produced per node visited by
//! the evaluator; `left`/`right` are attached only when they represent a
//! meaningful subexpression, never for raw integer literals.

use std::rc::Rc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::rolldie::RolledDie;

/// The operator that produced a [`RollResult`] node, mirrored into its JSON
/// projection as `opType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OpType {
    Value,
    Add,
    Subtract,
    Multiply,
    Count,
    Drop,
    Clamp,
    RollDice,
    RollFudge,
    RollPercent,
    RollD66,
    RollVals,
    RollPenetration,
    Reroll,
    Compound,
    Explode,
    Sort,
    Comma,
    Total,
}

/// Node of the evaluated roll tree. Value type: every combinator below
/// produces a fresh instance rather than mutating its operands.
#[derive(Debug, Clone)]
pub struct RollResult {
    /// Canonical re-print of the subexpression this node came from.
    pub expression: String,
    pub op_type: OpType,
    /// Dice contributing to `total`.
    pub results: Vec<RolledDie>,
    /// Dice that do not contribute to `total`, retained for provenance.
    pub discarded: Vec<RolledDie>,
    pub left: Option<Rc<RollResult>>,
    pub right: Option<Rc<RollResult>>,
}

impl RollResult {
    pub fn new(expression: impl Into<String>, op_type: OpType) -> Self {
        RollResult {
            expression: expression.into(),
            op_type,
            results: Vec::new(),
            discarded: Vec::new(),
            left: None,
            right: None,
        }
    }

    pub fn with_results(mut self, results: Vec<RolledDie>) -> Self {
        self.results = results;
        self
    }

    pub fn with_discarded(mut self, discarded: Vec<RolledDie>) -> Self {
        self.discarded = discarded;
        self
    }

    pub fn with_children(mut self, left: Option<Rc<RollResult>>, right: Option<Rc<RollResult>>) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// `Σ results[i].result`.
    pub fn total(&self) -> i64 {
        self.results.iter().map(|d| d.result).sum()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|d| d.success || d.crit_success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|d| d.failure || d.crit_failure).count()
    }

    pub fn crit_success_count(&self) -> usize {
        self.results.iter().filter(|d| d.crit_success).count()
    }

    pub fn crit_failure_count(&self) -> usize {
        self.results.iter().filter(|d| d.crit_failure).count()
    }

    /// Addition concatenates `results` and `discarded` from both sides.
    ///
    /// `lhs_is_literal`/`rhs_is_literal` tell it which side, if any, came
    /// from a raw integer literal -- that side is folded into `results` but
    /// never attached as a child, per the no-literal-children rule above.
    pub fn add(expression: String, lhs: RollResult, rhs: RollResult, lhs_is_literal: bool, rhs_is_literal: bool) -> RollResult {
        let mut results = lhs.results.clone();
        results.extend(rhs.results.clone());
        let mut discarded = lhs.discarded.clone();
        discarded.extend(rhs.discarded.clone());
        let left = (!lhs_is_literal).then(|| Rc::new(lhs));
        let right = (!rhs_is_literal).then(|| Rc::new(rhs));
        RollResult::new(expression, OpType::Add)
            .with_results(results)
            .with_discarded(discarded)
            .with_children(left, right)
    }

    /// Subtraction keeps left's results unchanged and appends a single
    /// `singleVal` whose value is `-Σright.results`; all of right's results
    /// move to `discarded`.
    pub fn sub(expression: String, lhs: RollResult, rhs: RollResult, lhs_is_literal: bool, rhs_is_literal: bool) -> RollResult {
        let negated = RolledDie::single(-rhs.total());
        let mut results = lhs.results.clone();
        results.push(negated);
        let mut discarded = lhs.discarded.clone();
        discarded.extend(rhs.discarded.clone());
        discarded.extend(rhs.results.clone());
        let left = (!lhs_is_literal).then(|| Rc::new(lhs));
        let right = (!rhs_is_literal).then(|| Rc::new(rhs));
        RollResult::new(expression, OpType::Subtract)
            .with_results(results)
            .with_discarded(discarded)
            .with_children(left, right)
    }

    /// Multiplication collapses both sides into one `singleVal`.
    pub fn mul(expression: String, lhs: RollResult, rhs: RollResult, lhs_is_literal: bool, rhs_is_literal: bool) -> RollResult {
        let product = lhs.total() * rhs.total();
        let mut discarded = lhs.discarded.clone();
        discarded.extend(lhs.results.clone());
        discarded.extend(rhs.discarded.clone());
        discarded.extend(rhs.results.clone());
        let left = (!lhs_is_literal).then(|| Rc::new(lhs));
        let right = (!rhs_is_literal).then(|| Rc::new(rhs));
        RollResult::new(expression, OpType::Multiply)
            .with_results(vec![RolledDie::single(product)])
            .with_discarded(discarded)
            .with_children(left, right)
    }

    /// Comma splices ordered aggregation: a side that is already a comma
    /// node contributes its results directly; otherwise the side collapses
    /// to one totaled `singleVal` and its originals move to `discarded`.
    pub fn comma(expression: String, lhs: RollResult, rhs: RollResult, lhs_is_literal: bool, rhs_is_literal: bool) -> RollResult {
        let mut results = Vec::new();
        let mut discarded = Vec::new();

        let splice = |side: &RollResult, results: &mut Vec<RolledDie>, discarded: &mut Vec<RolledDie>| {
            if side.op_type == OpType::Comma {
                results.extend(side.results.clone());
                discarded.extend(side.discarded.clone());
            } else {
                discarded.extend(side.discarded.clone());
                discarded.extend(side.results.clone());
                results.push(RolledDie::single(side.total()));
            }
        };
        splice(&lhs, &mut results, &mut discarded);
        splice(&rhs, &mut results, &mut discarded);

        let left = (!lhs_is_literal).then(|| Rc::new(lhs));
        let right = (!rhs_is_literal).then(|| Rc::new(rhs));
        RollResult::new(expression, OpType::Comma)
            .with_results(results)
            .with_discarded(discarded)
            .with_children(left, right)
    }

    /// `{expr}` -- collapse inner results to one `singleVal`, discarding the
    /// originals.
    pub fn aggregate(expression: String, inner: RollResult, inner_is_literal: bool) -> RollResult {
        let total = inner.total();
        let mut discarded = inner.discarded.clone();
        discarded.extend(inner.results.clone());
        let left = (!inner_is_literal).then(|| Rc::new(inner));
        RollResult::new(expression, OpType::Total)
            .with_results(vec![RolledDie::single(total)])
            .with_discarded(discarded)
            .with_children(left, None)
    }
}

impl Serialize for RollResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RollResult", 11)?;
        if self.expression.is_empty() {
            state.skip_field("expression")?;
        } else {
            state.serialize_field("expression", &self.expression)?;
        }
        state.serialize_field("opType", &self.op_type)?;
        if self.results.is_empty() {
            state.skip_field("results")?;
        } else {
            state.serialize_field("results", &self.results)?;
        }
        if self.discarded.is_empty() {
            state.skip_field("discarded")?;
        } else {
            state.serialize_field("discarded", &self.discarded)?;
        }
        match &self.left {
            Some(l) => state.serialize_field("left", l.as_ref())?,
            None => state.skip_field("left")?,
        }
        match &self.right {
            Some(r) => state.serialize_field("right", r.as_ref())?,
            None => state.skip_field("right")?,
        }
        let total = self.total();
        if total == 0 {
            state.skip_field("total")?;
        } else {
            state.serialize_field("total", &total)?;
        }
        let success_count = self.success_count();
        if success_count == 0 {
            state.skip_field("successCount")?;
        } else {
            state.serialize_field("successCount", &success_count)?;
        }
        let failure_count = self.failure_count();
        if failure_count == 0 {
            state.skip_field("failureCount")?;
        } else {
            state.serialize_field("failureCount", &failure_count)?;
        }
        let crit_success_count = self.crit_success_count();
        if crit_success_count == 0 {
            state.skip_field("critSuccessCount")?;
        } else {
            state.serialize_field("critSuccessCount", &crit_success_count)?;
        }
        let crit_failure_count = self.crit_failure_count();
        if crit_failure_count == 0 {
            state.skip_field("critFailureCount")?;
        } else {
            state.serialize_field("critFailureCount", &crit_failure_count)?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(v: i64) -> RolledDie {
        RolledDie::single(v)
    }

    #[test]
    fn add_concatenates_pools() {
        let lhs = RollResult::new("2d6", OpType::RollDice).with_results(vec![single(3), single(4)]);
        let rhs = RollResult::new("1", OpType::Value).with_results(vec![single(1)]);
        let sum = RollResult::add("2d6+1".into(), lhs, rhs, false, true);
        assert_eq!(sum.total(), 8);
        assert_eq!(sum.results.len(), 3);
        assert!(sum.right.is_none());
    }

    #[test]
    fn sub_moves_right_to_discarded() {
        let lhs = RollResult::new("2d6", OpType::RollDice).with_results(vec![single(3), single(4)]);
        let rhs = RollResult::new("2", OpType::Value).with_results(vec![single(2)]);
        let diff = RollResult::sub("2d6-2".into(), lhs, rhs, false, true);
        assert_eq!(diff.total(), 5);
        assert_eq!(diff.discarded.len(), 1);
    }

    #[test]
    fn mul_collapses_to_one() {
        let lhs = RollResult::new("2d6", OpType::RollDice).with_results(vec![single(3), single(4)]);
        let rhs = RollResult::new("3", OpType::Value).with_results(vec![single(3)]);
        let prod = RollResult::mul("2d6*3".into(), lhs, rhs, false, true);
        assert_eq!(prod.results.len(), 1);
        assert_eq!(prod.total(), 21);
    }

    #[test]
    fn comma_splices_chained_nodes() {
        let a = RollResult::new("1", OpType::Value).with_results(vec![single(1)]);
        let b = RollResult::new("2", OpType::Value).with_results(vec![single(2)]);
        let c = RollResult::new("3", OpType::Value).with_results(vec![single(3)]);
        let ab = RollResult::comma("1,2".into(), a, b, true, true);
        let abc = RollResult::comma("1,2,3".into(), ab, c, false, true);
        assert_eq!(abc.results.len(), 3);
        assert_eq!(abc.total(), 6);
    }

    #[test]
    fn aggregate_discards_originals() {
        let inner = RollResult::new("2d6", OpType::RollDice).with_results(vec![single(3), single(4)]);
        let agg = RollResult::aggregate("{2d6}".into(), inner, false);
        assert_eq!(agg.results.len(), 1);
        assert_eq!(agg.total(), 7);
        assert_eq!(agg.discarded.len(), 2);
    }

    #[test]
    fn json_projection_omits_empty_fields() {
        let r = RollResult::new("2", OpType::Value).with_results(vec![single(2)]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"total\":2"));
        assert!(!json.contains("discarded"));
        assert!(!json.contains("left"));
    }
}
