use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use simcore::{
    SimRegion, Vec2, World, WorldObjectKind, DEFAULT_MAX_ENTITY_COUNT, DEFAULT_MAX_SIM_ENTITIES,
};
use thiserror::Error;

use super::gameplay::{draw_list_scratch_bytes, WorldObjectSpec};

pub(crate) const CONFIG_ENV_VAR: &str = "CHUNKSIM_CONFIG";
pub(crate) const FRAMES_ENV_VAR: &str = "CHUNKSIM_FRAMES";

const MEGABYTE: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}{}: {source}", format_location(.location))]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{FRAMES_ENV_VAR} must be a non-negative integer, got '{value}'")]
    InvalidFrameOverride { value: String },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

fn format_location(location: &str) -> String {
    if location.is_empty() || location == "." {
        String::new()
    } else {
        format!(" at {location}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) world: WorldConfig,
    pub(crate) sim: SimConfig,
    pub(crate) generation: GenerationConfig,
    #[serde(rename = "loop")]
    pub(crate) loop_config: LoopConfig,
    pub(crate) script: ScriptConfig,
    /// Per-kind overrides layered over the built-in world object table.
    pub(crate) world_objects: BTreeMap<WorldObjectKind, WorldObjectSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub(crate) max_entity_count: usize,
    pub(crate) world_arena_bytes: usize,
    pub(crate) frame_arena_bytes: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entity_count: DEFAULT_MAX_ENTITY_COUNT,
            world_arena_bytes: 64 * MEGABYTE,
            frame_arena_bytes: 32 * MEGABYTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimConfig {
    pub(crate) max_sim_entities: usize,
    pub(crate) region_chunk_radius: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_sim_entities: DEFAULT_MAX_SIM_ENTITIES,
            region_chunk_radius: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GenerationConfig {
    pub(crate) seed: u64,
    pub(crate) tree_count: u32,
    pub(crate) gold_deposit_count: u32,
    pub(crate) spread_chunks: u32,
    pub(crate) max_placement_attempts: u32,
    pub(crate) player_spawn: Vec2,
    pub(crate) pawn_spawns: Vec<Vec2>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 123_456_789,
            tree_count: 1000,
            gold_deposit_count: 40,
            spread_chunks: 15,
            max_placement_attempts: 64,
            player_spawn: Vec2::ZERO,
            pawn_spawns: vec![
                Vec2::new(5.0, 5.0),
                Vec2::new(-5.0, 5.0),
                Vec2::new(5.0, -5.0),
                Vec2::new(-5.0, -5.0),
                Vec2::new(15.0, 15.0),
                Vec2::new(-15.0, 15.0),
                Vec2::new(15.0, -15.0),
                Vec2::new(-15.0, -15.0),
            ],
        }
    }
}

impl GenerationConfig {
    pub(crate) fn entity_count(&self) -> usize {
        1 + self.pawn_spawns.len() + self.tree_count as usize + self.gold_deposit_count as usize
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) frame_count: u64,
    pub(crate) metrics_log_interval_ms: u64,
    pub(crate) pace_to_real_time: bool,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            frame_count: 600,
            metrics_log_interval_ms: 1000,
            pace_to_real_time: false,
            window_width: 1280,
            window_height: 720,
        }
    }
}

/// Drives the headless loop in place of a player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScriptConfig {
    pub(crate) walk_leg_frames: u32,
    pub(crate) click_interval_frames: u32,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            walk_leg_frames: 240,
            click_interval_frames: 45,
        }
    }
}

impl GameConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.world.max_entity_count < 2 {
            return Err(invalid(
                "world.max_entity_count",
                "must leave room for at least one entity besides the null slot",
            ));
        }
        if self.sim.max_sim_entities == 0 {
            return Err(invalid("sim.max_sim_entities", "must be greater than zero"));
        }
        if self.generation.entity_count() >= self.world.max_entity_count {
            return Err(invalid(
                "generation",
                format!(
                    "generates {} entities but world.max_entity_count is {}",
                    self.generation.entity_count(),
                    self.world.max_entity_count
                ),
            ));
        }
        let scattered = self
            .generation
            .tree_count
            .saturating_add(self.generation.gold_deposit_count);
        if self.generation.spread_chunks == 0 && scattered > 0 {
            return Err(invalid("generation.spread_chunks", "must be greater than zero"));
        }
        if self.generation.max_placement_attempts == 0 {
            return Err(invalid(
                "generation.max_placement_attempts",
                "must be greater than zero",
            ));
        }

        let world_bytes = self.min_world_arena_bytes();
        if self.world.world_arena_bytes < world_bytes {
            return Err(invalid(
                "world.world_arena_bytes",
                format!(
                    "needs at least {world_bytes} bytes for the entity store and {} chunks",
                    self.chunk_budget()
                ),
            ));
        }
        let frame_bytes = self.min_frame_arena_bytes();
        if self.world.frame_arena_bytes < frame_bytes {
            return Err(invalid(
                "world.frame_arena_bytes",
                format!(
                    "needs at least {frame_bytes} bytes for a {}-entity region and its draw list",
                    self.sim.max_sim_entities
                ),
            ));
        }

        if self.loop_config.target_tps == 0 {
            return Err(invalid("loop.target_tps", "must be greater than zero"));
        }
        if self.loop_config.window_width == 0 || self.loop_config.window_height == 0 {
            return Err(invalid("loop.window_width", "window size must be non-zero"));
        }

        for (kind, spec) in &self.world_objects {
            spec.validate()
                .map_err(|reason| invalid(format!("world_objects.{}", kind.as_token()), reason))?;
        }
        Ok(())
    }

    /// Chunks the world is expected to hold: the scattered-object spread, one
    /// per spawn point and the neighbourhood a region covers around the player.
    pub(crate) fn chunk_budget(&self) -> usize {
        let scattered = self
            .generation
            .tree_count
            .saturating_add(self.generation.gold_deposit_count);
        let spread_chunks = if scattered > 0 {
            let side = (self.generation.spread_chunks as usize).saturating_mul(2);
            side.saturating_mul(side)
        } else {
            0
        };
        let region_side = (self.sim.region_chunk_radius as usize)
            .saturating_mul(2)
            .saturating_add(1);
        spread_chunks
            .saturating_add(1 + self.generation.pawn_spawns.len())
            .saturating_add(region_side.saturating_mul(region_side))
    }

    /// Smallest world arena that holds the entity store, the chunk budget and
    /// every overflow block the entities can fill.
    pub(crate) fn min_world_arena_bytes(&self) -> usize {
        World::arena_bytes_required(self.world.max_entity_count, self.chunk_budget())
    }

    /// Smallest frame arena that holds either the creation region or a frame's
    /// region plus its draw-list sort scratch.
    pub(crate) fn min_frame_arena_bytes(&self) -> usize {
        let max_sim = self.sim.max_sim_entities;
        let frame = SimRegion::frame_bytes_required(max_sim) + draw_list_scratch_bytes(max_sim);
        let creation = SimRegion::frame_bytes_required(self.creation_region_capacity());
        frame.max(creation)
    }

    /// Capacity of the one-off region that populates a fresh world.
    pub(crate) fn creation_region_capacity(&self) -> usize {
        self.world.max_entity_count - 1
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Defaults, then the file named by `CHUNKSIM_CONFIG`, then the
/// `CHUNKSIM_FRAMES` override.
pub(crate) fn load_config() -> Result<GameConfig, ConfigError> {
    let mut config = match read_env_var(CONFIG_ENV_VAR)? {
        Some(path) => load_config_from_path(Path::new(&path))?,
        None => GameConfig::default(),
    };
    if let Some(raw) = read_env_var(FRAMES_ENV_VAR)? {
        config.loop_config.frame_count = parse_frame_override(&raw)?;
    }
    config.validate()?;
    Ok(config)
}

pub(crate) fn load_config_from_path(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw, path)
}

fn parse_config_json(raw: &str, path: &Path) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            location,
            source: error.into_inner(),
        }
    })
}

pub(crate) fn parse_frame_override(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidFrameOverride {
            value: raw.to_string(),
        })
}

fn read_env_var(var: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::EnvVar { var, source }),
    }
}
