//! Lifecycle configuration resource.
//!
//! Durations that govern corpses and the server loop, loaded from an INI
//! file. Defaults are safe to run with when no file exists.
//!
//! # Configuration File Format
//!
//! ```ini
//! [corpses]
//! npc_decay_ms = 300000
//! player_loot_grace_ms = 300000
//! abandonment_threshold_ms = 604800000
//! durability_loss_percent = 10
//! abandon_sweep_interval_ms = 3600000
//!
//! [server]
//! tick_ms = 100
//! snapshot_path = ./data/corpses.json
//! autosave_interval_ms = 60000
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

const DEFAULT_NPC_DECAY_MS: u64 = 5 * 60 * 1000;
const DEFAULT_PLAYER_LOOT_GRACE_MS: u64 = 5 * 60 * 1000;
const DEFAULT_ABANDONMENT_THRESHOLD_MS: u64 = 7 * 24 * 60 * 60 * 1000;
const DEFAULT_DURABILITY_LOSS_PERCENT: f32 = 10.0;
const DEFAULT_ABANDON_SWEEP_INTERVAL_MS: u64 = 60 * 60 * 1000;
const DEFAULT_TICK_MS: u64 = 100;
const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 60 * 1000;
const DEFAULT_SNAPSHOT_PATH: &str = "./data/corpses.json";
const DEFAULT_CONFIG_PATH: &str = "./corpsekeeper.ini";

/// Corpse and server timing configuration.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// How long an NPC corpse lies before it decays and the NPC respawns.
    pub npc_decay_ms: u64,
    /// Delay between a player looting their corpse and its removal.
    pub player_loot_grace_ms: u64,
    /// Age after which an unlooted player corpse of an inactive owner is swept.
    pub abandonment_threshold_ms: u64,
    /// Percent of max durability every item loses when a player dies.
    pub durability_loss_percent: f32,
    /// How often the server re-runs the abandonment sweep; 0 runs it only at startup.
    pub abandon_sweep_interval_ms: u64,
    pub tick_ms: u64,
    /// How often the server writes a snapshot; 0 disables autosave.
    pub autosave_interval_ms: u64,
    pub snapshot_path: PathBuf,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleConfig {
    /// Create a configuration with safe default values.
    pub fn new() -> Self {
        Self {
            npc_decay_ms: DEFAULT_NPC_DECAY_MS,
            player_loot_grace_ms: DEFAULT_PLAYER_LOOT_GRACE_MS,
            abandonment_threshold_ms: DEFAULT_ABANDONMENT_THRESHOLD_MS,
            durability_loss_percent: DEFAULT_DURABILITY_LOSS_PERCENT,
            abandon_sweep_interval_ms: DEFAULT_ABANDON_SWEEP_INTERVAL_MS,
            tick_ms: DEFAULT_TICK_MS,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn with_npc_decay_ms(mut self, ms: u64) -> Self {
        self.npc_decay_ms = ms;
        self
    }

    pub fn with_player_loot_grace_ms(mut self, ms: u64) -> Self {
        self.player_loot_grace_ms = ms;
        self
    }

    pub fn with_abandonment_threshold_ms(mut self, ms: u64) -> Self {
        self.abandonment_threshold_ms = ms;
        self
    }

    pub fn with_durability_loss_percent(mut self, percent: f32) -> Self {
        self.durability_loss_percent = percent;
        self
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [corpses] section
        if let Some(ms) = config.getuint("corpses", "npc_decay_ms").ok().flatten() {
            self.npc_decay_ms = ms;
        }
        if let Some(ms) = config
            .getuint("corpses", "player_loot_grace_ms")
            .ok()
            .flatten()
        {
            self.player_loot_grace_ms = ms;
        }
        if let Some(ms) = config
            .getuint("corpses", "abandonment_threshold_ms")
            .ok()
            .flatten()
        {
            self.abandonment_threshold_ms = ms;
        }
        if let Some(percent) = config
            .getfloat("corpses", "durability_loss_percent")
            .ok()
            .flatten()
        {
            self.durability_loss_percent = percent as f32;
        }
        if let Some(ms) = config
            .getuint("corpses", "abandon_sweep_interval_ms")
            .ok()
            .flatten()
        {
            self.abandon_sweep_interval_ms = ms;
        }

        // [server] section
        if let Some(ms) = config.getuint("server", "tick_ms").ok().flatten() {
            self.tick_ms = ms.max(1);
        }
        if let Some(ms) = config
            .getuint("server", "autosave_interval_ms")
            .ok()
            .flatten()
        {
            self.autosave_interval_ms = ms;
        }
        if let Some(path) = config.get("server", "snapshot_path") {
            self.snapshot_path = PathBuf::from(path);
        }

        info!(
            "Loaded config: npc decay {}ms, loot grace {}ms, abandonment {}ms, durability loss {}%, tick {}ms, snapshot {:?}",
            self.npc_decay_ms,
            self.player_loot_grace_ms,
            self.abandonment_threshold_ms,
            self.durability_loss_percent,
            self.tick_ms,
            self.snapshot_path
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [corpses] section
        config.set("corpses", "npc_decay_ms", Some(self.npc_decay_ms.to_string()));
        config.set(
            "corpses",
            "player_loot_grace_ms",
            Some(self.player_loot_grace_ms.to_string()),
        );
        config.set(
            "corpses",
            "abandonment_threshold_ms",
            Some(self.abandonment_threshold_ms.to_string()),
        );
        config.set(
            "corpses",
            "durability_loss_percent",
            Some(self.durability_loss_percent.to_string()),
        );
        config.set(
            "corpses",
            "abandon_sweep_interval_ms",
            Some(self.abandon_sweep_interval_ms.to_string()),
        );

        // [server] section
        config.set("server", "tick_ms", Some(self.tick_ms.to_string()));
        config.set(
            "server",
            "autosave_interval_ms",
            Some(self.autosave_interval_ms.to_string()),
        );
        config.set(
            "server",
            "snapshot_path",
            Some(self.snapshot_path.display().to_string()),
        );

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
