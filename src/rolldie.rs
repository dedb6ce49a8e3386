//! The atomic outcome type produced by a [`crate::roller::Roller`] and carried,
//! copy-with-overrides, through modifier application.

use std::rc::Rc;

/// Kind of die a [`RolledDie`] came from.
///
/// Determines how `min_potential`/`max_potential` are derived and whether
/// `potential_values` is required to be non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DieType {
    /// A standard N-sided die, 1..=N.
    Polyhedral,
    /// A fudge/FATE die drawn from `[-1,-1,0,0,1,1]` by default.
    Fudge,
    /// The composed `tens*10 + ones` die built from two d6.
    D66,
    /// A die whose faces are an arbitrary, explicit list of values.
    #[serde(rename = "nvals")]
    NVals,
    /// A single constant value (a literal, or the collapsed result of an
    /// aggregating operator).
    SingleVal,
}

impl DieType {
    /// Whether this die type must carry a non-empty `potential_values`.
    pub fn requires_potential_values(self) -> bool {
        matches!(self, DieType::Fudge | DieType::NVals | DieType::SingleVal)
    }

    /// Whether this die type must carry a non-zero `nsides`.
    pub fn requires_nsides(self) -> bool {
        matches!(self, DieType::Polyhedral | DieType::D66)
    }

    /// Whether dice of this type are eligible to explode/compound/penetrate.
    pub fn explodable(self) -> bool {
        matches!(self, DieType::Polyhedral | DieType::Fudge | DieType::NVals)
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// One atomic outcome, plus the provenance/state flags recorded as modifiers
/// are applied over it.
///
/// `RolledDie` is a value type: every modifier produces new, immutable
/// instances via [`RolledDie::derive`] rather than mutating existing ones.
///
/// The JSON projection omits `from` and `totaled` entirely and drops every
/// other field whose value is zero, empty or `false`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolledDie {
    /// The rolled (or derived) value.
    #[serde(skip_serializing_if = "is_zero")]
    pub result: i64,
    /// What kind of die produced this outcome.
    pub die_type: DieType,
    /// Number of sides, `0` when not applicable (fudge/nvals/singleVal).
    #[serde(skip_serializing_if = "is_zero")]
    pub nsides: i64,
    /// The ordered face values this die could show; empty except for
    /// fudge/nvals/singleVal.
    #[serde(rename = "potentialValues", skip_serializing_if = "Vec::is_empty")]
    pub potential_values: Vec<i64>,

    /// Dice this die was derived from (reroll original, penetration chain, …).
    #[serde(skip)]
    pub from: Vec<Rc<RolledDie>>,

    #[serde(skip_serializing_if = "is_false")]
    pub discarded: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub success: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub failure: bool,
    #[serde(rename = "critSuccess", skip_serializing_if = "is_false")]
    pub crit_success: bool,
    #[serde(rename = "critFailure", skip_serializing_if = "is_false")]
    pub crit_failure: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub exploded: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub explosion: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub compounded: bool,
    #[serde(rename = "compoundedFinal", skip_serializing_if = "is_false")]
    pub compounded_final: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub penetrated: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub penetrator: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub reroll: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub rerolled: bool,
    #[serde(rename = "clampHigh", skip_serializing_if = "is_false")]
    pub clamp_ceiling: bool,
    #[serde(rename = "clampLow", skip_serializing_if = "is_false")]
    pub clamp_floor: bool,
    #[serde(skip)]
    pub totaled: bool,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl RolledDie {
    /// Build a freshly rolled polyhedral die, `result` in `1..=nsides`.
    pub fn polyhedral(result: i64, nsides: i64) -> Self {
        RolledDie {
            result,
            die_type: DieType::Polyhedral,
            nsides,
            potential_values: Vec::new(),
            from: Vec::new(),
            discarded: false,
            success: false,
            failure: false,
            crit_success: false,
            crit_failure: false,
            exploded: false,
            explosion: false,
            compounded: false,
            compounded_final: false,
            penetrated: false,
            penetrator: false,
            reroll: false,
            rerolled: false,
            clamp_ceiling: false,
            clamp_floor: false,
            totaled: false,
        }
    }

    /// Build a die drawn from an explicit face set (fudge or arbitrary nvals).
    pub fn from_vals(result: i64, die_type: DieType, potential_values: Vec<i64>) -> Self {
        debug_assert!(die_type.requires_potential_values());
        RolledDie {
            result,
            die_type,
            nsides: 0,
            potential_values,
            ..RolledDie::polyhedral(result, 0)
        }
    }

    /// Build the composed d66 die (`tens*10 + ones`), recording both source
    /// d6 rolls as `from`.
    pub fn d66(tens: i64, ones: i64, tens_die: RolledDie, ones_die: RolledDie) -> Self {
        RolledDie {
            result: tens * 10 + ones,
            die_type: DieType::D66,
            nsides: 66,
            potential_values: Vec::new(),
            from: vec![Rc::new(tens_die), Rc::new(ones_die)],
            ..RolledDie::polyhedral(0, 66)
        }
    }

    /// Build a single constant-value die (literal, or a collapsed aggregate).
    pub fn single(result: i64) -> Self {
        RolledDie {
            result,
            die_type: DieType::SingleVal,
            nsides: 0,
            potential_values: vec![result],
            ..RolledDie::polyhedral(result, 0)
        }
    }

    /// The smallest value this die could have shown on its initial roll.
    pub fn min_potential(&self) -> i64 {
        match self.die_type {
            DieType::Polyhedral => 1,
            DieType::D66 => 1,
            DieType::SingleVal => self.result,
            DieType::Fudge | DieType::NVals => {
                self.potential_values.iter().copied().min().unwrap_or(self.result)
            }
        }
    }

    /// The largest value this die could have shown on its initial roll.
    ///
    /// Compounding/penetration may legitimately push `result` above this.
    pub fn max_potential(&self) -> i64 {
        match self.die_type {
            DieType::Polyhedral => self.nsides,
            DieType::D66 => 66,
            DieType::SingleVal => self.result,
            DieType::Fudge | DieType::NVals => {
                self.potential_values.iter().copied().max().unwrap_or(self.result)
            }
        }
    }

    /// Whether `min_potential == max_potential`, i.e. the die cannot vary —
    /// used to suppress "trivial" defaulted-target matches on constant dice.
    pub fn is_constant(&self) -> bool {
        self.min_potential() == self.max_potential()
    }

    /// Copy this die with a new result and an extra provenance flag set,
    /// keeping everything else (including `from`) intact. The modifier
    /// helpers below build on this to keep call sites terse and avoid
    /// repeating the full field list at each call site.
    pub fn derive(&self) -> RolledDieBuilder {
        RolledDieBuilder(self.clone())
    }
}

/// Builder returned by [`RolledDie::derive`] for terse copy-with-overrides.
pub struct RolledDieBuilder(RolledDie);

impl RolledDieBuilder {
    pub fn result(mut self, result: i64) -> Self {
        self.0.result = result;
        self
    }
    pub fn discarded(mut self, v: bool) -> Self {
        self.0.discarded = v;
        self
    }
    pub fn success(mut self, v: bool) -> Self {
        self.0.success = v;
        self
    }
    pub fn failure(mut self, v: bool) -> Self {
        self.0.failure = v;
        self
    }
    pub fn crit_success(mut self, v: bool) -> Self {
        self.0.crit_success = v;
        self
    }
    pub fn crit_failure(mut self, v: bool) -> Self {
        self.0.crit_failure = v;
        self
    }
    pub fn exploded(mut self, v: bool) -> Self {
        self.0.exploded = v;
        self
    }
    pub fn explosion(mut self, v: bool) -> Self {
        self.0.explosion = v;
        self
    }
    pub fn compounded(mut self, v: bool) -> Self {
        self.0.compounded = v;
        self
    }
    pub fn compounded_final(mut self, v: bool) -> Self {
        self.0.compounded_final = v;
        self
    }
    pub fn penetrated(mut self, v: bool) -> Self {
        self.0.penetrated = v;
        self
    }
    pub fn penetrator(mut self, v: bool) -> Self {
        self.0.penetrator = v;
        self
    }
    pub fn reroll(mut self, v: bool) -> Self {
        self.0.reroll = v;
        self
    }
    pub fn rerolled(mut self, v: bool) -> Self {
        self.0.rerolled = v;
        self
    }
    pub fn clamp_ceiling(mut self, v: bool) -> Self {
        self.0.clamp_ceiling = v;
        self
    }
    pub fn clamp_floor(mut self, v: bool) -> Self {
        self.0.clamp_floor = v;
        self
    }
    pub fn from(mut self, from: Vec<Rc<RolledDie>>) -> Self {
        self.0.from = from;
        self
    }
    pub fn build(self) -> RolledDie {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyhedral_bounds() {
        let d = RolledDie::polyhedral(4, 6);
        assert_eq!(d.min_potential(), 1);
        assert_eq!(d.max_potential(), 6);
        assert!(!d.is_constant());
    }

    #[test]
    fn single_val_is_constant() {
        let d = RolledDie::single(7);
        assert_eq!(d.min_potential(), 7);
        assert_eq!(d.max_potential(), 7);
        assert!(d.is_constant());
    }

    #[test]
    fn derive_keeps_from() {
        let original = RolledDie::polyhedral(6, 6);
        let origin = Rc::new(original.clone());
        let derived = original
            .derive()
            .result(3)
            .reroll(true)
            .from(vec![origin.clone()])
            .build();
        assert_eq!(derived.result, 3);
        assert!(derived.reroll);
        assert_eq!(derived.from.len(), 1);
        assert_eq!(derived.from[0].result, 6);
    }

    #[test]
    fn d66_records_source_dice() {
        let tens = RolledDie::polyhedral(3, 6);
        let ones = RolledDie::polyhedral(5, 6);
        let composed = RolledDie::d66(3, 5, tens, ones);
        assert_eq!(composed.result, 35);
        assert_eq!(composed.min_potential(), 1);
        assert_eq!(composed.max_potential(), 66);
        assert_eq!(composed.from.len(), 2);
    }
}
