/// Hunt: close in on the target and bomb it when it stands in the blast line.
///
///   - target aligned, within power + 1, clear line: bomb (when the
///     cooldown allows) and back away,
///   - otherwise, with no shot: ambush, head for the calmest empty cell
///     next to the target,
///   - otherwise walk a personality-styled route to the target,
///   - no route at all: mostly step toward it, sometimes go collecting.

use rand::Rng;

use super::arbiter::select_target;
use super::{AiBrain, TickContext};
use crate::domain::entity::Agent;
use crate::domain::grid::Pos;
use crate::domain::tile::Cell;

/// Chance of stepping blindly toward an unreachable target.
const BLIND_APPROACH_CHANCE: f64 = 0.7;

impl AiBrain {
    pub(super) fn run_hunt(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;
        let grid = view.grid;
        let Some(target) = select_target(me, ctx.agents, grid) else {
            self.run_collect(me, ctx);
            return;
        };
        let target_pos = target.pos;

        let distance = me.pos.manhattan(target_pos);
        let can_attack =
            me.pos.is_aligned(target_pos) && distance <= me.power + 1 && grid.line_of_sight(me.pos, target_pos);

        if can_attack && self.cooldowns.bomb == 0 {
            let reckless = self.personality.aggression as f64 * 0.3;
            if self.consider_bomb(me, ctx, reckless) && self.follow_escape_path(me) {
                return;
            }
            if let Some(away) = me.pos.toward(target_pos).map(|d| d.opposite()) {
                if view.is_cell_passable(me.pos.step(away), me) {
                    self.direction = Some(away);
                    return;
                }
            }
        }

        if !can_attack || self.cooldowns.bomb > 0 {
            if let Some(spot) = self.ambush_spot(me, ctx, target_pos) {
                if let Some(path) = self.styled_path_to(me, view, spot) {
                    if self.steer(&path) {
                        return;
                    }
                }
            }
        }

        if let Some(path) = self.styled_path_to(me, view, target_pos) {
            if self.steer(&path) {
                return;
            }
        }

        if self.rng.gen_bool(BLIND_APPROACH_CHANCE) {
            if let Some(dir) = me.pos.toward(target_pos) {
                self.direction = Some(dir);
            }
        } else {
            self.run_collect(me, ctx);
        }
    }

    /// Empty cell next to the target with the least danger.
    fn ambush_spot(&self, me: &Agent, ctx: &TickContext, target: Pos) -> Option<Pos> {
        let view = ctx.view;
        let mut best: Option<(f32, Pos)> = None;
        for n in target.neighbors() {
            if view.grid.get(n) != Cell::Empty || n == me.pos {
                continue;
            }
            let score = 20.0 - 5.0 * self.danger_at(view, n);
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, n));
            }
        }
        best.map(|(_, p)| p)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
