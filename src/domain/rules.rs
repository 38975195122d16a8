/// Bomb, power-up and scoring rules, truth-table driven.
///
/// Pure functions: they encode "what is legal" and "what it is worth"
/// without touching the world. Cell passability lives in `hazard`.
///
/// ### Bomb placement
/// ┌──────────────────────────────┬────────┐
/// │ Condition (priority order)    │ Place? │
/// ├──────────────────────────────┼────────┤
/// │ agent dead                    │ NO     │
/// │ active_bombs ≥ max_bombs      │ NO     │
/// │ cell is wall / block          │ NO     │
/// │ cell already holds a bomb     │ NO     │
/// │ otherwise                     │ YES    │
/// └──────────────────────────────┴────────┘
///
/// Power-up cells accept a bomb; the power-up is collected first in the
/// tick order, so in practice the cell is already empty.
///
/// ### Power-ups
/// ┌─────────┬─────────────────┐
/// │ Kind     │ Effect          │
/// ├─────────┼─────────────────┤
/// │ Bomb     │ max_bombs += 1  │
/// │ Flame    │ power += 1      │
/// │ Speed    │ speed += 1      │
/// └─────────┴─────────────────┘

use super::entity::{Agent, Bomb};
use super::grid::{Dir, Grid};
use super::hazard::HazardView;
use super::tile::PowerUp;

pub const BLOCK_POINTS: u32 = 100;
pub const POWER_UP_POINTS: u32 = 250;
pub const KILL_POINTS: u32 = 5000;
/// Survival points per full second alive.
pub const SURVIVAL_POINTS: u32 = 1;

// ── Bomb placement ──

pub fn can_place_bomb(grid: &Grid, bombs: &[Bomb], agent: &Agent) -> bool {
    if !agent.alive { return false; }
    if !agent.has_bomb_available() { return false; }
    let cell = grid.get(agent.pos);
    if cell.is_obstacle() || cell.is_bomb() { return false; }
    !bombs.iter().any(|b| b.pos == agent.pos)
}

// ── Movement ──

/// Can `agent` take one cell step in `dir`? See `HazardView::is_cell_passable`.
pub fn can_step(view: &HazardView, agent: &Agent, dir: Dir) -> bool {
    agent.alive && view.is_cell_passable(agent.pos.step(dir), agent)
}

// ── Power-ups ──

pub fn apply_power_up(agent: &mut Agent, kind: PowerUp) {
    match kind {
        PowerUp::Bomb => agent.max_bombs += 1,
        PowerUp::Flame => agent.power += 1,
        PowerUp::Speed => agent.speed += 1,
    }
    agent.stats.powerups_collected += 1;
    agent.stats.score += POWER_UP_POINTS;
}

// ── Scoring ──

pub fn credit_block(agent: &mut Agent) {
    agent.stats.blocks_destroyed += 1;
    agent.stats.score += BLOCK_POINTS;
}

pub fn credit_kill(agent: &mut Agent) {
    agent.stats.kills += 1;
    agent.stats.score += KILL_POINTS;
}

/// One tick of survival. Points are granted on whole-second boundaries
/// of the match clock, matching `tick % fps == 0`.
pub fn credit_survival(agent: &mut Agent, tick: u64, fps: u32) {
    agent.stats.survival_ticks += 1;
    if fps > 0 && tick % u64::from(fps) == 0 {
        agent.stats.score += SURVIVAL_POINTS;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
