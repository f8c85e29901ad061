use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of every random draw the engine makes: risk rolls, event triggers, dialogue lines.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `[0, 100)`.
    fn roll_percent(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;

    /// Bernoulli trial with the given probability in `[0, 1]`.
    fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.roll_percent() < probability * 100.0
    }
}

/// Reproducible generator used by the game itself.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRng {
    fn roll_percent(&mut self) -> f64 {
        self.rng.gen_range(0.0..100.0)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }
}

/// Replays a fixed list of rolls, then falls back to `fallback`.
///
/// Lets callers force outcomes such as "roll 50 against risk 10".
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
    fallback: f64,
    consumed: usize,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: 99.0,
            consumed: 0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl RandomSource for ScriptedRolls {
    fn roll_percent(&mut self) -> f64 {
        self.consumed += 1;
        self.rolls
            .pop_front()
            .unwrap_or(self.fallback)
            .clamp(0.0, 99.999_999)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        let roll = self.roll_percent();
        ((roll / 100.0) * len.max(1) as f64) as usize
    }
}

/// ECS resource wrapping whichever source the game was built with.
#[derive(Resource)]
pub struct GameRng(pub Box<dyn RandomSource>);

impl GameRng {
    pub fn seeded(seed: u64) -> Self {
        Self(Box::new(SeededRng::new(seed)))
    }
}

impl std::fmt::Debug for GameRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GameRng(..)")
    }
}
