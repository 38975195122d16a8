/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::domain::ai::personality::PersonalityKind;
use crate::error::ConfigError;

/// Spawn corners available to agents.
pub const MAX_AGENTS: usize = 4;

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub arena: ArenaConfig,
    pub roster: RosterConfig,
    pub timing: TimingConfig,
    pub agent: AgentConfig,
    pub ai: AiConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    pub width: usize,
    pub height: usize,
    pub block_density: f64,
    pub power_up_chance: f64,
    /// None: derive from the clock at match start.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RosterConfig {
    pub humans: usize,
    pub bots: usize,
    /// Assigned to bots in order; missing entries are drawn at random.
    pub personalities: Vec<PersonalityKind>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimingConfig {
    pub fps: u32,
    pub bomb_fuse_ticks: u32,
    pub bomb_grace_ticks: u32,     // owner may still cross a fresh bomb
    pub explosion_ticks: u32,
    pub cell_units: i32,           // sub-cell movement units per cell
    pub max_ticks: u64,
    pub target_refresh_ticks: u64, // bots re-pick a human target
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub speed: i32,
    pub max_bombs: u32,
    pub power: i32,
    pub collision_radius: f32,     // fraction of a cell
}

#[derive(Clone, Debug, PartialEq)]
pub struct AiConfig {
    pub strategy_interval_ticks: u32,
    pub vision_radius: i32,
    pub danger_radius: i32,
    pub max_path_steps: usize,
    pub stuck_window: usize,
    pub stuck_threshold: u32,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    arena: TomlArena,
    #[serde(default)]
    roster: TomlRoster,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    agent: TomlAgent,
    #[serde(default)]
    ai: TomlAi,
}

#[derive(Deserialize, Debug)]
struct TomlArena {
    #[serde(default = "default_width")]
    width: usize,
    #[serde(default = "default_height")]
    height: usize,
    #[serde(default = "default_block_density")]
    block_density: f64,
    #[serde(default = "default_power_up_chance")]
    power_up_chance: f64,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlRoster {
    #[serde(default)]
    humans: usize,
    #[serde(default = "default_bots")]
    bots: usize,
    #[serde(default)]
    personalities: Vec<PersonalityKind>,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_fuse")]
    bomb_fuse_ticks: u32,
    #[serde(default = "default_grace")]
    bomb_grace_ticks: u32,
    #[serde(default = "default_explosion")]
    explosion_ticks: u32,
    #[serde(default = "default_cell_units")]
    cell_units: i32,
    #[serde(default = "default_max_ticks")]
    max_ticks: u64,
    #[serde(default = "default_target_refresh")]
    target_refresh_ticks: u64,
}

#[derive(Deserialize, Debug)]
struct TomlAgent {
    #[serde(default = "default_speed")]
    speed: i32,
    #[serde(default = "default_max_bombs")]
    max_bombs: u32,
    #[serde(default = "default_power")]
    power: i32,
    #[serde(default = "default_collision_radius")]
    collision_radius: f32,
}

#[derive(Deserialize, Debug)]
struct TomlAi {
    #[serde(default = "default_strategy_interval")]
    strategy_interval_ticks: u32,
    #[serde(default = "default_vision")]
    vision_radius: i32,
    #[serde(default = "default_danger_radius")]
    danger_radius: i32,
    #[serde(default = "default_path_steps")]
    max_path_steps: usize,
    #[serde(default = "default_stuck_window")]
    stuck_window: usize,
    #[serde(default = "default_stuck_threshold")]
    stuck_threshold: u32,
}

// ── Defaults ──

fn default_width() -> usize { 21 }
fn default_height() -> usize { 17 }
fn default_block_density() -> f64 { 0.4 }
fn default_power_up_chance() -> f64 { 0.3 }
fn default_bots() -> usize { 4 }
fn default_fps() -> u32 { 60 }
fn default_fuse() -> u32 { 180 }          // 3s at 60 fps
fn default_grace() -> u32 { 10 }
fn default_explosion() -> u32 { 120 }     // 2s
fn default_cell_units() -> i32 { 48 }
fn default_max_ticks() -> u64 { 10_800 }  // 3 minutes
fn default_target_refresh() -> u64 { 120 }
fn default_speed() -> i32 { 3 }
fn default_max_bombs() -> u32 { 1 }
fn default_power() -> i32 { 2 }
fn default_collision_radius() -> f32 { 0.35 }
fn default_strategy_interval() -> u32 { 120 }
fn default_vision() -> i32 { 6 }
fn default_danger_radius() -> i32 { 8 }   // wider than vision to see threats coming
fn default_path_steps() -> usize { 8 }
fn default_stuck_window() -> usize { 10 }
fn default_stuck_threshold() -> u32 { 15 }

impl Default for TomlArena {
    fn default() -> Self {
        TomlArena {
            width: default_width(),
            height: default_height(),
            block_density: default_block_density(),
            power_up_chance: default_power_up_chance(),
            seed: None,
        }
    }
}

impl Default for TomlRoster {
    fn default() -> Self {
        TomlRoster { humans: 0, bots: default_bots(), personalities: Vec::new() }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            fps: default_fps(),
            bomb_fuse_ticks: default_fuse(),
            bomb_grace_ticks: default_grace(),
            explosion_ticks: default_explosion(),
            cell_units: default_cell_units(),
            max_ticks: default_max_ticks(),
            target_refresh_ticks: default_target_refresh(),
        }
    }
}

impl Default for TomlAgent {
    fn default() -> Self {
        TomlAgent {
            speed: default_speed(),
            max_bombs: default_max_bombs(),
            power: default_power(),
            collision_radius: default_collision_radius(),
        }
    }
}

impl Default for TomlAi {
    fn default() -> Self {
        TomlAi {
            strategy_interval_ticks: default_strategy_interval(),
            vision_radius: default_vision(),
            danger_radius: default_danger_radius(),
            max_path_steps: default_path_steps(),
            stuck_window: default_stuck_window(),
            stuck_threshold: default_stuck_threshold(),
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        GameConfig {
            arena: ArenaConfig {
                width: t.arena.width,
                height: t.arena.height,
                block_density: t.arena.block_density,
                power_up_chance: t.arena.power_up_chance,
                seed: t.arena.seed,
            },
            roster: RosterConfig {
                humans: t.roster.humans,
                bots: t.roster.bots,
                personalities: t.roster.personalities,
            },
            timing: TimingConfig {
                fps: t.timing.fps,
                bomb_fuse_ticks: t.timing.bomb_fuse_ticks,
                bomb_grace_ticks: t.timing.bomb_grace_ticks,
                explosion_ticks: t.timing.explosion_ticks,
                cell_units: t.timing.cell_units,
                max_ticks: t.timing.max_ticks,
                target_refresh_ticks: t.timing.target_refresh_ticks,
            },
            agent: AgentConfig {
                speed: t.agent.speed,
                max_bombs: t.agent.max_bombs,
                power: t.agent.power,
                collision_radius: t.agent.collision_radius,
            },
            ai: AiConfig {
                strategy_interval_ticks: t.ai.strategy_interval_ticks,
                vision_radius: t.ai.vision_radius,
                danger_radius: t.ai.danger_radius,
                max_path_steps: t.ai.max_path_steps,
                stuck_window: t.ai.stuck_window,
                stuck_threshold: t.ai.stuck_threshold,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from(TomlConfig::default())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        GameConfig::default().ai
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(error = %e, "using default settings");
                    return GameConfig::default();
                }
            }
        }
        GameConfig::default()
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    /// Strict parse: malformed TOML and out-of-range values are errors.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: TomlConfig = toml::from_str(text)?;
        let cfg = GameConfig::from(raw);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.arena;
        if a.width < 5 || a.height < 5 {
            return Err(ConfigError::Invalid(format!("arena {}x{} is smaller than 5x5", a.width, a.height)));
        }
        if !(0.0..=1.0).contains(&a.block_density) || !(0.0..=1.0).contains(&a.power_up_chance) {
            return Err(ConfigError::Invalid("probabilities must lie in 0..=1".into()));
        }
        let agents = self.roster.humans + self.roster.bots;
        if agents == 0 || agents > MAX_AGENTS {
            return Err(ConfigError::Invalid(format!("{agents} agents, expected 1..={MAX_AGENTS}")));
        }
        if self.roster.personalities.len() > self.roster.bots {
            return Err(ConfigError::Invalid("more personalities than bots".into()));
        }
        let t = &self.timing;
        if t.fps == 0 || t.bomb_fuse_ticks == 0 || t.explosion_ticks == 0 || t.cell_units < 4 {
            return Err(ConfigError::Invalid("timing values must be positive (cell_units ≥ 4)".into()));
        }
        let g = &self.agent;
        if g.speed <= 0 || g.max_bombs == 0 || g.power <= 0 {
            return Err(ConfigError::Invalid("agent speed, bombs and power must be positive".into()));
        }
        if !(0.05..0.5).contains(&g.collision_radius) {
            return Err(ConfigError::Invalid("collision_radius must lie in 0.05..0.5".into()));
        }
        if self.ai.max_path_steps == 0 || self.ai.stuck_window == 0 {
            return Err(ConfigError::Invalid("ai search depth and stuck window must be positive".into()));
        }
        Ok(())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, GameConfig::default());
        assert_eq!(cfg.arena.width, 21);
        assert_eq!(cfg.timing.bomb_fuse_ticks, 180);
        assert_eq!(cfg.ai.danger_radius, 8);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            r#"
            [arena]
            width = 15
            seed = 42

            [roster]
            bots = 2
            personalities = ["hunter", "trapper"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.arena.width, 15);
        assert_eq!(cfg.arena.height, 17);
        assert_eq!(cfg.arena.seed, Some(42));
        assert_eq!(cfg.roster.personalities, vec![PersonalityKind::Hunter, PersonalityKind::Trapper]);
        assert_eq!(cfg.agent.power, 2);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = GameConfig::from_toml_str("[arena\nwidth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_personality_is_rejected() {
        let err = GameConfig::from_toml_str("[roster]\npersonalities = [\"pacifist\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn too_many_agents_is_invalid() {
        let err = GameConfig::from_toml_str("[roster]\nhumans = 2\nbots = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn tiny_arena_is_invalid() {
        let err = GameConfig::from_toml_str("[arena]\nwidth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = GameConfig::from_file(std::path::Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
