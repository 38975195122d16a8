/// Trap: drop bombs where the target is about to be, not where it is.
///
/// Trap spots around the target:
///
/// ┌─────────────────────────────────────┬──────────────┬──────────────┐
/// │ Spot                                 │ Score        │ Needs        │
/// ├─────────────────────────────────────┼──────────────┼──────────────┤
/// │ narrow cell (≥ 2 closed sides),      │ 60           │ d(me) ≤ 5    │
/// │ window radius 6 around the target    │              │              │
/// │ predicted cell i = 1..=3 ahead       │ 70 − 10·i    │ d(me) ≤ 6    │
/// │ empty cell next to the target        │ 50, +30 when │              │
/// │                                      │ ≤ 2 of them  │              │
/// └─────────────────────────────────────┴──────────────┴──────────────┘
///
/// The best spot is approached on a weighted path; on arrival the bomb is
/// placed and further traps wait out `Personality::trap_cooldown`. No
/// usable spot, an active cooldown or an empty bomb budget falls back to
/// hunting.

use std::cmp::Ordering;

use super::arbiter::select_target;
use super::{AiBrain, TickContext};
use crate::domain::entity::Agent;
use crate::domain::grid::{Dir, Grid, Pos};
use crate::domain::tile::Cell;

const NARROW_RADIUS: i32 = 6;
const NARROW_REACH: i32 = 5;
const PREDICT_STEPS: i32 = 3;
const PREDICT_REACH: i32 = 6;

impl AiBrain {
    pub(super) fn run_trap(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;
        if self.cooldowns.trap > 0 || !me.has_bomb_available() {
            self.run_hunt(me, ctx);
            return;
        }
        let Some(target) = select_target(me, ctx.agents, view.grid) else {
            self.run_collect(me, ctx);
            return;
        };

        let mut spots = trap_spots(view.grid, me.pos, target);
        spots.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        if let Some(&(_, spot)) = spots.first() {
            let policy = self.weighted();
            if let Some(path) = self.path_to(me, view, spot, policy) {
                if path.len() > 1 {
                    self.steer(&path);
                } else if path.first() == Some(&me.pos) {
                    let reckless = self.personality.aggression as f64 * 0.4;
                    if self.consider_bomb(me, ctx, reckless) {
                        self.cooldowns.trap = self.personality.trap_cooldown();
                        self.follow_escape_path(me);
                    }
                }
                return;
            }
        }

        self.run_hunt(me, ctx);
    }
}

/// Scored trap spots for `target`, unsorted. A cell may appear more than
/// once under different rules.
fn trap_spots(grid: &Grid, me: Pos, target: &Agent) -> Vec<(f32, Pos)> {
    let mut spots = Vec::new();

    for p in grid.window(target.pos, NARROW_RADIUS) {
        if grid.get(p) != Cell::Empty || me.manhattan(p) > NARROW_REACH {
            continue;
        }
        let closed = p
            .neighbors()
            .iter()
            .filter(|n| matches!(grid.get(**n), Cell::Wall | Cell::Block))
            .count();
        if closed >= 2 {
            spots.push((60.0, p));
        }
    }

    if let Some(dir) = predicted_heading(target) {
        let mut p = target.pos;
        for i in 1..=PREDICT_STEPS {
            p = p.step(dir);
            if grid.get(p) != Cell::Empty {
                break;
            }
            if me.manhattan(p) <= PREDICT_REACH {
                spots.push((70.0 - 10.0 * i as f32, p));
            }
        }
    }

    let adjacent: Vec<Pos> = target.pos.neighbors().into_iter().filter(|n| grid.get(*n) == Cell::Empty).collect();
    let bonus = if adjacent.len() <= 2 { 30.0 } else { 0.0 };
    spots.extend(adjacent.into_iter().map(|p| (50.0 + bonus, p)));

    spots
}

/// Where the target is going: its heading, else the dominant axis of its
/// sub-cell offset. None for a target standing still at a cell centre.
fn predicted_heading(target: &Agent) -> Option<Dir> {
    if target.heading.is_some() {
        return target.heading;
    }
    let (ox, oy) = target.offset;
    Pos::new(0, 0).toward(Pos::new(ox, oy))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
