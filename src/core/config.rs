use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "./ghost.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level game configuration. Every field has a default, so a partial TOML file works.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub seed: u64,
    pub data_dir: PathBuf,
    pub save_db: PathBuf,
    pub rules: RulesConfig,
    pub player: StartingProfile,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_C0DE,
            data_dir: PathBuf::from("./assets/data"),
            save_db: PathBuf::from("./ghost_saves.db"),
            rules: RulesConfig::default(),
            player: StartingProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn risk_multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub difficulty: Difficulty,
    /// Turns that must pass after a faction switch before the next one.
    pub faction_switch_cooldown: u64,
    pub faction_reputation_cap: i32,
    /// Standing lost with the old faction when leaving it.
    pub defection_penalty: i32,
    pub heat_decay_per_turn: i32,
    /// Heat above this level starts adding mission risk.
    pub heat_risk_threshold: u8,
    pub heat_risk_per_point: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            faction_switch_cooldown: 12,
            faction_reputation_cap: 100,
            defection_penalty: 25,
            heat_decay_per_turn: 1,
            heat_risk_threshold: 50,
            heat_risk_per_point: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingProfile {
    pub handle: String,
    pub reputation: u32,
    pub usd: i64,
    pub btc: f64,
    pub skills: BTreeMap<String, u32>,
    pub contacts: Vec<String>,
}

impl Default for StartingProfile {
    fn default() -> Self {
        let skills = [
            ("scanning", 1),
            ("exploitation", 0),
            ("social_engineering", 0),
            ("cryptography", 0),
            ("stealth", 0),
            ("forensics", 0),
        ]
        .into_iter()
        .map(|(name, level)| (name.to_string(), level))
        .collect();
        Self {
            handle: "ghost".to_string(),
            reputation: 10,
            usd: 100,
            btc: 0.0,
            skills,
            contacts: vec!["cipher".to_string()],
        }
    }
}

impl GameConfig {
    pub fn from_toml_str(raw: &str, path: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(raw).map_err(|source| ConfigError::Toml {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, &path.display().to_string())
    }

    /// Loads the file when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.faction_reputation_cap <= 0 {
            return Err(ConfigError::Invalid(
                "rules.faction_reputation_cap must be positive".to_string(),
            ));
        }
        if self.rules.heat_decay_per_turn < 0 {
            return Err(ConfigError::Invalid(
                "rules.heat_decay_per_turn cannot be negative".to_string(),
            ));
        }
        if !self.rules.heat_risk_per_point.is_finite() || self.rules.heat_risk_per_point < 0.0 {
            return Err(ConfigError::Invalid(
                "rules.heat_risk_per_point must be a non-negative number".to_string(),
            ));
        }
        if self.rules.heat_risk_threshold > 100 {
            return Err(ConfigError::Invalid(
                "rules.heat_risk_threshold must be within 0..=100".to_string(),
            ));
        }
        if !self.player.btc.is_finite() || self.player.btc < 0.0 {
            return Err(ConfigError::Invalid(
                "player.btc must be a non-negative number".to_string(),
            ));
        }
        if self.player.handle.trim().is_empty() {
            return Err(ConfigError::Invalid("player.handle cannot be empty".to_string()));
        }
        Ok(())
    }
}
