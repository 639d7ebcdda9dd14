//! Probabilistic sweeping of expired rows.
//!
//! With a cleaning factor `N > 0`, every write rolls an `N`-sided die and
//! sweeps expired rows first when it comes up 1. `N = 0` disables the sweep;
//! expired rows then only go away through an explicit clean.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of uniformly distributed die rolls.
pub trait Dice: Send {
    /// Roll a value in `1..=sides`. `sides` is never 0.
    fn roll(&mut self, sides: u32) -> u32;
}

/// A [`Dice`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngDice<R>(pub R);

impl RngDice<StdRng> {
    /// Dice seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Reproducible dice.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> Dice for RngDice<R> {
    fn roll(&mut self, sides: u32) -> u32 {
        self.0.gen_range(1..=sides)
    }
}

/// Dice that always lands on the same face (clamped to the die size).
///
/// `LoadedDice(1)` forces a sweep on every write, `LoadedDice(u32::MAX)`
/// suppresses it for any factor above 1.
#[derive(Debug, Clone, Copy)]
pub struct LoadedDice(pub u32);

impl Dice for LoadedDice {
    fn roll(&mut self, sides: u32) -> u32 {
        self.0.clamp(1, sides)
    }
}

/// Decides, per write, whether expired rows should be swept first.
pub struct CleaningScheduler {
    factor: u32,
    dice: Mutex<Box<dyn Dice>>,
}

impl CleaningScheduler {
    /// Scheduler with a 1-in-`factor` sweep probability.
    pub fn new(factor: u32) -> Self {
        Self::with_dice(factor, RngDice::from_entropy())
    }

    /// Scheduler using the given source of randomness.
    pub fn with_dice(factor: u32, dice: impl Dice + 'static) -> Self {
        Self { factor, dice: Mutex::new(Box::new(dice)) }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    pub fn is_enabled(&self) -> bool {
        self.factor > 0
    }

    /// Roll for the current write.
    pub fn should_sweep(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let mut dice = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
        dice.roll(self.factor) == 1
    }
}

impl fmt::Debug for CleaningScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleaningScheduler").field("factor", &self.factor).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dice that panics when rolled.
    struct ForbiddenDice;

    impl Dice for ForbiddenDice {
        fn roll(&mut self, _sides: u32) -> u32 {
            panic!("dice must not be rolled when cleaning is disabled");
        }
    }

    #[test]
    fn test_zero_factor_never_rolls() {
        let scheduler = CleaningScheduler::with_dice(0, ForbiddenDice);
        assert!(!scheduler.is_enabled());
        for _ in 0..100 {
            assert!(!scheduler.should_sweep());
        }
    }

    #[test]
    fn test_factor_one_always_sweeps() {
        let scheduler = CleaningScheduler::new(1);
        for _ in 0..100 {
            assert!(scheduler.should_sweep());
        }
    }

    #[test]
    fn test_loaded_dice() {
        assert!(CleaningScheduler::with_dice(1000, LoadedDice(1)).should_sweep());
        assert!(!CleaningScheduler::with_dice(1000, LoadedDice(u32::MAX)).should_sweep());
        assert!(!CleaningScheduler::with_dice(2, LoadedDice(2)).should_sweep());
    }

    #[test]
    fn test_rng_dice_stays_in_range() {
        let mut dice = RngDice::seeded(7);
        for _ in 0..1_000 {
            let roll = dice.roll(6);
            assert!((1..=6).contains(&roll));
        }
    }

    #[test]
    fn test_seeded_scheduler_is_reproducible() {
        let a = CleaningScheduler::with_dice(4, RngDice::seeded(42));
        let b = CleaningScheduler::with_dice(4, RngDice::seeded(42));
        let rolls_a: Vec<bool> = (0..64).map(|_| a.should_sweep()).collect();
        let rolls_b: Vec<bool> = (0..64).map(|_| b.should_sweep()).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_sweep_frequency_roughly_one_in_n() {
        let scheduler = CleaningScheduler::with_dice(10, RngDice::seeded(1));
        let sweeps = (0..10_000).filter(|_| scheduler.should_sweep()).count();
        assert!((700..=1_300).contains(&sweeps), "sweeps = {sweeps}");
    }
}
