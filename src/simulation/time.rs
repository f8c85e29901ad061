use std::fmt;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Hours of in-game time that pass per turn.
pub const HOURS_PER_TURN: u8 = 6;

/// Global resource tracking the game timeline. One turn is a quarter of a day.
#[derive(Resource, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameTime {
    pub turn: u64,
    pub day: u32,
    pub hour: u8,
}

impl Default for GameTime {
    fn default() -> Self {
        Self {
            turn: 0,
            day: 1,
            hour: 6,
        }
    }
}

impl GameTime {
    pub fn advance(&mut self) {
        self.turn += 1;
        self.hour += HOURS_PER_TURN;
        if self.hour >= 24 {
            self.hour -= 24;
            self.day += 1;
        }
    }

    pub fn is_night(&self) -> bool {
        self.hour < 6 || self.hour >= 18
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = if self.is_night() { "night" } else { "day" };
        write!(
            f,
            "Day {}, {:02}:00 ({}, turn {})",
            self.day, self.hour, phase, self.turn
        )
    }
}

/// System: advances the clock by one turn.
pub fn advance_time_system(mut time: ResMut<GameTime>) {
    time.advance();
}
