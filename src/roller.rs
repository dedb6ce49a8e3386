//! The pluggable randomness source: one trait, three variants (RNG-backed,
//! pre-rolled queue, async callback), plus [`DiceResultRoller`], a thin
//! wrapper adding typed convenience entry points dispatched by [`DieType`].

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::future::BoxFuture;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{Result, RollerError};
use crate::rolldie::{DieType, RolledDie};

/// Lower bound (inclusive) on the number of dice a single roll may request.
pub const MIN_NDICE: i64 = 0;
/// Upper bound (inclusive) on the number of dice a single roll may request.
pub const MAX_NDICE: i64 = 1000;
/// Lower bound (inclusive) on the number of sides a die may have.
pub const MIN_NSIDES: i64 = 2;
/// Upper bound (inclusive) on the number of sides a die may have.
pub const MAX_NSIDES: i64 = 100_000;

/// The default fudge/FATE die face set.
pub const FUDGE_FACES: [i64; 6] = [-1, -1, 0, 0, 1, 1];

fn check_ndice(ndice: i64) -> Result<()> {
    if !(MIN_NDICE..=MAX_NDICE).contains(&ndice) {
        return Err(RollerError::OutOfRange {
            value: ndice,
            requested: format!("ndice in [{MIN_NDICE},{MAX_NDICE}]"),
        }
        .into());
    }
    Ok(())
}

fn check_nsides(nsides: i64) -> Result<()> {
    if !(MIN_NSIDES..=MAX_NSIDES).contains(&nsides) {
        return Err(RollerError::OutOfRange {
            value: nsides,
            requested: format!("nsides in [{MIN_NSIDES},{MAX_NSIDES}]"),
        }
        .into());
    }
    Ok(())
}

/// Produces raw integer outcomes for a requested die specification.
///
/// The three concrete variants below ([`RngRoller`], [`PreRolledRoller`],
/// [`CallbackRoller`]) share this one interface; [`DiceResultRoller`] wraps
/// any of them with typed, `RolledDie`-producing convenience methods.
#[async_trait]
pub trait Roller: Send {
    /// Roll `ndice` dice of `nsides` sides, each in `[min, min + nsides - 1]`.
    async fn roll(&mut self, ndice: i64, nsides: i64, min: i64, die_type: DieType) -> Result<Vec<i64>>;

    /// Roll `ndice` dice, each drawn from `vals`.
    async fn roll_vals(&mut self, ndice: i64, vals: &[i64], die_type: DieType) -> Result<Vec<i64>>;
}

/// RNG-backed variant. Generic over any [`rand::Rng`]; defaults to a
/// `StdRng` seeded from the OS.
pub struct RngRoller<R: RngCore + Send> {
    rng: R,
}

impl RngRoller<rand::rngs::StdRng> {
    /// Build a roller seeded from the OS's secure entropy source.
    pub fn secure() -> Self {
        RngRoller {
            rng: rand::rngs::StdRng::from_entropy(),
        }
    }
}

impl<R: RngCore + Send> RngRoller<R> {
    /// Build a roller over a caller-supplied RNG (e.g. for reproducible
    /// seeded testing).
    pub fn from_rng(rng: R) -> Self {
        RngRoller { rng }
    }
}

#[async_trait]
impl<R: RngCore + Send> Roller for RngRoller<R> {
    async fn roll(&mut self, ndice: i64, nsides: i64, min: i64, _die_type: DieType) -> Result<Vec<i64>> {
        check_ndice(ndice)?;
        check_nsides(nsides)?;
        let values: Vec<i64> = (0..ndice)
            .map(|_| self.rng.gen_range(min..min + nsides))
            .collect();
        tracing::debug!(ndice, nsides, min, ?values, "rng roll");
        Ok(values)
    }

    async fn roll_vals(&mut self, ndice: i64, vals: &[i64], _die_type: DieType) -> Result<Vec<i64>> {
        check_ndice(ndice)?;
        if vals.is_empty() {
            return Err(RollerError::OutOfRange {
                value: 0,
                requested: "non-empty value set".into(),
            }
            .into());
        }
        let values: Vec<i64> = (0..ndice)
            .map(|_| vals[self.rng.gen_range(0..vals.len())])
            .collect();
        tracing::debug!(ndice, ?values, "rng roll_vals");
        Ok(values)
    }
}

/// Consumes an ordered queue of pre-determined integers. Fails with
/// [`RollerError::Exhausted`] when the queue runs dry, and
/// [`RollerError::OutOfRange`] when a consumed value falls outside the
/// requested interval/value set -- this is what makes the grammar's
/// left-to-right, depth-first, post-order evaluation order observable.
pub struct PreRolledRoller {
    queue: VecDeque<i64>,
}

impl PreRolledRoller {
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        PreRolledRoller {
            queue: values.into_iter().collect(),
        }
    }

    fn pop(&mut self) -> Result<i64> {
        self.queue.pop_front().ok_or(RollerError::Exhausted.into())
    }
}

#[async_trait]
impl Roller for PreRolledRoller {
    async fn roll(&mut self, ndice: i64, nsides: i64, min: i64, _die_type: DieType) -> Result<Vec<i64>> {
        check_ndice(ndice)?;
        check_nsides(nsides)?;
        let mut values = Vec::with_capacity(ndice as usize);
        for _ in 0..ndice {
            let v = self.pop()?;
            if v < min || v > min + nsides - 1 {
                return Err(RollerError::OutOfRange {
                    value: v,
                    requested: format!("[{min},{}]", min + nsides - 1),
                }
                .into());
            }
            values.push(v);
        }
        Ok(values)
    }

    async fn roll_vals(&mut self, ndice: i64, vals: &[i64], _die_type: DieType) -> Result<Vec<i64>> {
        check_ndice(ndice)?;
        let mut values = Vec::with_capacity(ndice as usize);
        for _ in 0..ndice {
            let v = self.pop()?;
            if !vals.contains(&v) {
                return Err(RollerError::OutOfRange {
                    value: v,
                    requested: format!("{vals:?}"),
                }
                .into());
            }
            values.push(v);
        }
        Ok(values)
    }
}

/// Delegates to user-supplied asynchronous functions returning materialized
/// sequences, e.g. a roll performed by a physical-dice-scanning service or a
/// remote RNG. Each callback receives the same parameters as [`Roller::roll`]
/// / [`Roller::roll_vals`].
pub struct CallbackRoller {
    roll_fn: Box<
        dyn Fn(i64, i64, i64, DieType) -> BoxFuture<'static, Result<Vec<i64>>> + Send + Sync,
    >,
    roll_vals_fn: Box<
        dyn Fn(i64, Vec<i64>, DieType) -> BoxFuture<'static, Result<Vec<i64>>> + Send + Sync,
    >,
}

impl CallbackRoller {
    pub fn new(
        roll_fn: impl Fn(i64, i64, i64, DieType) -> BoxFuture<'static, Result<Vec<i64>>>
            + Send
            + Sync
            + 'static,
        roll_vals_fn: impl Fn(i64, Vec<i64>, DieType) -> BoxFuture<'static, Result<Vec<i64>>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        CallbackRoller {
            roll_fn: Box::new(roll_fn),
            roll_vals_fn: Box::new(roll_vals_fn),
        }
    }
}

#[async_trait]
impl Roller for CallbackRoller {
    async fn roll(&mut self, ndice: i64, nsides: i64, min: i64, die_type: DieType) -> Result<Vec<i64>> {
        check_ndice(ndice)?;
        check_nsides(nsides)?;
        (self.roll_fn)(ndice, nsides, min, die_type).await
    }

    async fn roll_vals(&mut self, ndice: i64, vals: &[i64], die_type: DieType) -> Result<Vec<i64>> {
        check_ndice(ndice)?;
        (self.roll_vals_fn)(ndice, vals.to_vec(), die_type).await
    }
}

/// Wraps a [`Roller`] and adds typed convenience entry points dispatched by
/// [`DieType`], producing [`RolledDie`] values directly instead of raw
/// integers.
pub struct DiceResultRoller<R: Roller> {
    roller: R,
}

impl<R: Roller> DiceResultRoller<R> {
    pub fn new(roller: R) -> Self {
        DiceResultRoller { roller }
    }

    /// Roll `n` polyhedral dice of `sides` sides.
    pub async fn roll(&mut self, n: i64, sides: i64) -> Result<Vec<RolledDie>> {
        let values = self.roller.roll(n, sides, 1, DieType::Polyhedral).await?;
        Ok(values
            .into_iter()
            .map(|v| RolledDie::polyhedral(v, sides))
            .collect())
    }

    /// Roll `n` d100 (percentile) dice.
    pub async fn roll_percent(&mut self, n: i64) -> Result<Vec<RolledDie>> {
        self.roll(n, 100).await
    }

    /// Roll `n` fudge dice from the default face set.
    pub async fn roll_fudge(&mut self, n: i64) -> Result<Vec<RolledDie>> {
        let values = self
            .roller
            .roll_vals(n, &FUDGE_FACES, DieType::Fudge)
            .await?;
        Ok(values
            .into_iter()
            .map(|v| RolledDie::from_vals(v, DieType::Fudge, FUDGE_FACES.to_vec()))
            .collect())
    }

    /// Roll `n` composed d66 dice: each is two d6 rolls combined as
    /// `tens*10 + ones`, with both source d6 recorded as `from`.
    pub async fn roll_d66(&mut self, n: i64) -> Result<Vec<RolledDie>> {
        let mut out = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let tens_val = self.roller.roll(1, 6, 1, DieType::D66).await?[0];
            let ones_val = self.roller.roll(1, 6, 1, DieType::D66).await?[0];
            out.push(RolledDie::d66(
                tens_val,
                ones_val,
                RolledDie::polyhedral(tens_val, 6),
                RolledDie::polyhedral(ones_val, 6),
            ));
        }
        Ok(out)
    }

    /// Roll `n` dice, each drawn uniformly from `vals`.
    pub async fn roll_vals(&mut self, n: i64, vals: &[i64]) -> Result<Vec<RolledDie>> {
        let values = self.roller.roll_vals(n, vals, DieType::NVals).await?;
        Ok(values
            .into_iter()
            .map(|v| RolledDie::from_vals(v, DieType::NVals, vals.to_vec()))
            .collect())
    }

    /// Produce one replacement for `die`, matching its own die type.
    pub async fn reroll(&mut self, die: &RolledDie) -> Result<RolledDie> {
        match die.die_type {
            DieType::Polyhedral => Ok(self.roll(1, die.nsides).await?.remove(0)),
            DieType::Fudge => Ok(self.roll_fudge(1).await?.remove(0)),
            DieType::NVals => Ok(self.roll_vals(1, &die.potential_values).await?.remove(0)),
            DieType::D66 => Ok(self.roll_d66(1).await?.remove(0)),
            DieType::SingleVal => Ok(die.clone()),
        }
    }
}

/// Bounds the iterative modifiers (reroll/explode/compound/penetrate)
/// against runaway inputs. `ro`/`!o`/`!!o` override this to `1`.
#[derive(Debug, Clone, Copy)]
pub struct EvalConfig {
    pub iteration_bound: u32,
}

impl EvalConfig {
    pub const DEFAULT_BOUND: u32 = 1000;

    pub fn once() -> Self {
        EvalConfig { iteration_bound: 1 }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            iteration_bound: Self::DEFAULT_BOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn pre_rolled_delivers_in_order() {
        let mut roller = DiceResultRoller::new(PreRolledRoller::new([6, 1]));
        let dice = block_on(roller.roll(2, 6)).unwrap();
        assert_eq!(dice[0].result, 6);
        assert_eq!(dice[1].result, 1);
    }

    #[test]
    fn pre_rolled_exhausted() {
        let mut roller = PreRolledRoller::new([1, 2]);
        assert!(block_on(roller.roll(3, 6, 1, DieType::Polyhedral)).is_err());
    }

    #[test]
    fn pre_rolled_rejects_out_of_range() {
        let mut roller = PreRolledRoller::new([7]);
        let err = block_on(roller.roll(1, 6, 1, DieType::Polyhedral)).unwrap_err();
        assert!(matches!(
            err,
            crate::error::RollError::Roller(RollerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn ndice_out_of_range_rejected() {
        let mut roller = RngRoller::secure();
        assert!(block_on(roller.roll(1001, 6, 1, DieType::Polyhedral)).is_err());
    }

    #[test]
    fn nsides_out_of_range_rejected() {
        let mut roller = RngRoller::secure();
        assert!(block_on(roller.roll(1, 1, 1, DieType::Polyhedral)).is_err());
    }

    #[test]
    fn d66_records_two_source_dice() {
        let mut roller = DiceResultRoller::new(PreRolledRoller::new([3, 5]));
        let dice = block_on(roller.roll_d66(1)).unwrap();
        assert_eq!(dice[0].result, 35);
        assert_eq!(dice[0].from.len(), 2);
    }

    #[test]
    fn custom_rngcore_backs_rng_roller() {
        struct CountingRng(u64);
        impl rand_core::RngCore for CountingRng {
            fn next_u32(&mut self) -> u32 {
                self.next_u64() as u32
            }
            fn next_u64(&mut self) -> u64 {
                self.0 = self.0.wrapping_add(1);
                self.0
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                rand_core::impls::fill_bytes_via_next(self, dest)
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
                self.fill_bytes(dest);
                Ok(())
            }
        }

        let mut roller = RngRoller::from_rng(CountingRng(0));
        let values = block_on(roller.roll(5, 6, 1, DieType::Polyhedral)).unwrap();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|v| (1..=6).contains(v)));
    }

    #[test]
    fn callback_roller_delegates() {
        let roller = CallbackRoller::new(
            |n, _sides, _min, _dt| Box::pin(async move { Ok(vec![42; n as usize]) }),
            |n, vals, _dt| Box::pin(async move { Ok(vec![vals[0]; n as usize]) }),
        );
        let mut roller = DiceResultRoller::new(roller);
        let dice = block_on(roller.roll(3, 6)).unwrap();
        assert!(dice.iter().all(|d| d.result == 42));
    }
}
