/// Hazard queries over a read-only snapshot of grid + bombs + explosions.
///
/// Two notions of "unsafe":
///   - **lethal**: a live bomb's blast line covers the cell, or a flame is
///     burning on it right now. Binary.
///   - **danger level**: a 0..=10 heuristic. 10 means lethal; anything
///     else is a clamped (≤ 9) mix of lethal neighbours and bomb proximity.
///
/// Blast lines stop at the first wall or block (see `Grid::line_of_sight`),
/// which is the same obstruction rule the blast simulator uses.

use super::entity::{Agent, AgentId, Bomb, Explosion};
use super::grid::{Grid, Pos};

/// Danger reported for a directly lethal cell.
pub const LETHAL_DANGER: f32 = 10.0;
/// Cap for everything that is not directly lethal.
pub const MAX_INDIRECT_DANGER: f32 = 9.0;
/// Contribution of each lethal orthogonal neighbour.
const ADJACENT_LETHAL_WEIGHT: f32 = 2.5;
/// Proximity contribution is `BOMB_PROXIMITY_BASE - distance`, floored at 0.
const BOMB_PROXIMITY_BASE: f32 = 6.0;

#[derive(Clone, Copy)]
pub struct HazardView<'a> {
    pub grid: &'a Grid,
    pub bombs: &'a [Bomb],
    pub explosions: &'a [Explosion],
}

impl<'a> HazardView<'a> {
    pub fn new(grid: &'a Grid, bombs: &'a [Bomb], explosions: &'a [Explosion]) -> Self {
        HazardView { grid, bombs, explosions }
    }

    pub fn bomb_at(&self, pos: Pos) -> Option<&'a Bomb> {
        self.bombs.iter().find(|b| b.pos == pos)
    }

    pub fn flame_at(&self, pos: Pos) -> bool {
        self.explosions.iter().any(|e| e.pos == pos)
    }

    /// Inside the blast footprint of any live bomb (flames ignored).
    pub fn in_bomb_footprint(&self, pos: Pos) -> bool {
        self.bombs.iter().any(|b| b.threatens(self.grid, pos))
    }

    /// Standing here now, or when any live bomb goes off, kills.
    /// Out-of-grid positions are lethal (fail-closed).
    pub fn is_cell_lethal(&self, pos: Pos) -> bool {
        if !self.grid.in_bounds(pos) {
            return true;
        }
        self.in_bomb_footprint(pos) || self.flame_at(pos)
    }

    /// Number of in-grid orthogonal neighbours that are lethal.
    pub fn lethal_neighbors(&self, pos: Pos) -> usize {
        pos.neighbors()
            .iter()
            .filter(|n| self.grid.in_bounds(**n) && self.is_cell_lethal(**n))
            .count()
    }

    /// Heuristic danger in 0..=10. See module docs.
    pub fn danger_level(&self, pos: Pos) -> f32 {
        if self.is_cell_lethal(pos) {
            return LETHAL_DANGER;
        }
        let mut danger = self.lethal_neighbors(pos) as f32 * ADJACENT_LETHAL_WEIGHT;
        for bomb in self.bombs {
            let distance = bomb.pos.manhattan(pos);
            if distance <= bomb.power + 1 {
                danger += (BOMB_PROXIMITY_BASE - distance as f32).max(0.0);
            }
        }
        danger.min(MAX_INDIRECT_DANGER)
    }

    /// Can `agent` enter `pos`?
    ///
    /// ┌──────────────────────────────────────┬────────┐
    /// │ Condition (priority order)            │ Enter? │
    /// ├──────────────────────────────────────┼────────┤
    /// │ outside grid                          │ NO     │
    /// │ wall / block                          │ NO     │
    /// │ bomb, agent already stands on a bomb  │ YES    │
    /// │ bomb, own bomb still just placed      │ YES    │
    /// │ bomb, otherwise                       │ NO     │
    /// │ empty / power-up                      │ YES    │
    /// └──────────────────────────────────────┴────────┘
    pub fn is_cell_passable(&self, pos: Pos, agent: &Agent) -> bool {
        self.is_passable_for(pos, agent.id, agent.pos)
    }

    /// Passability for an agent identified by id, standing at `standing`.
    /// Used by searches that reason about cells the agent is not on yet.
    pub fn is_passable_for(&self, pos: Pos, id: AgentId, standing: Pos) -> bool {
        if !self.grid.in_bounds(pos) {
            return false;
        }
        let cell = self.grid.get(pos);
        if cell.is_obstacle() {
            return false;
        }
        if cell.is_bomb() {
            if self.grid.get(standing).is_bomb() {
                return true;
            }
            return self
                .bomb_at(pos)
                .map_or(false, |b| b.owner == Some(id) && b.just_placed);
        }
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
