/// Collect: gather power-ups, open blocks, explore.
///
/// Candidates and scores (`d` = Manhattan distance from the bot):
///
/// ┌──────────────────────────┬─────────────────────────────────────────┐
/// │ Candidate                 │ Score                                  │
/// ├──────────────────────────┼─────────────────────────────────────────┤
/// │ known power-up            │ 100 − 10d, +40 preferred kind,         │
/// │                           │ +50/+40/+30 when the matching stat is  │
/// │                           │ low (bombs < 2, power < 3, speed < 4)  │
/// │                           │ no path −80, else −8·danger(step 1)    │
/// │ empty cell next to a block│ 80 − 8d, +10 per block around it       │
/// │ (window radius 5)         │ no path −60, else −6·danger(step 1)    │
/// └──────────────────────────┴─────────────────────────────────────────┘
///
/// The best positive candidate wins. Standing on a block spot bombs it.
/// Nothing positive: explore an unseen cell at distance 3..=7 (random
/// among the best three), else drift toward one of the two calmest cells.

use std::cmp::Ordering;

use rand::Rng;

use super::path::Path;
use super::{AiBrain, TickContext};
use crate::domain::blast;
use crate::domain::entity::Agent;
use crate::domain::grid::Pos;
use crate::domain::tile::{Cell, PowerUp};

const BLOCK_SEARCH_RADIUS: i32 = 5;
const FRONTIER_MIN: i32 = 3;
const FRONTIER_MAX: i32 = 7;

struct Candidate {
    score: f32,
    path: Option<Path>,
    /// Reaching this cell means bombing the blocks around it.
    bomb_spot: bool,
}

impl AiBrain {
    pub(super) fn run_collect(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;
        let mut candidates = self.power_up_candidates(me, ctx);
        candidates.extend(self.block_candidates(me, ctx));

        let best = candidates
            .into_iter()
            .filter(|c| c.score > 0.0)
            .fold(None, |best: Option<Candidate>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            });

        if let Some(best) = best {
            if let Some(path) = best.path {
                if path.len() > 1 {
                    self.steer(&path);
                    return;
                }
                if best.bomb_spot && path.first() == Some(&me.pos) {
                    let reckless = 0.3 + self.personality.risk_tolerance as f64 * 0.2;
                    if self.consider_bomb(me, ctx, reckless) {
                        self.follow_escape_path(me);
                    }
                    return;
                }
            }
        }

        if self.explore(me, ctx) {
            return;
        }
        self.wander(me, view, 2);
    }

    fn power_up_candidates(&mut self, me: &Agent, ctx: &TickContext) -> Vec<Candidate> {
        let view = ctx.view;
        let policy = self.weighted();
        let targets: Vec<(Pos, PowerUp)> = self
            .memory
            .known_power_ups()
            .iter()
            .filter_map(|p| view.grid.get(*p).power_up().map(|k| (*p, k)))
            .collect();

        let mut out = Vec::with_capacity(targets.len());
        for (pos, kind) in targets {
            let mut score = 100.0 - 10.0 * me.pos.manhattan(pos) as f32;
            if kind == self.personality.preferred {
                score += 40.0;
            }
            score += match kind {
                PowerUp::Bomb if me.max_bombs < 2 => 50.0,
                PowerUp::Flame if me.power < 3 => 40.0,
                PowerUp::Speed if me.speed < 4 => 30.0,
                _ => 0.0,
            };
            let path = self.path_to(me, view, pos, policy);
            score += self.first_step_penalty(ctx, path.as_deref(), 80.0, 8.0);
            out.push(Candidate { score, path, bomb_spot: false });
        }
        out
    }

    fn block_candidates(&mut self, me: &Agent, ctx: &TickContext) -> Vec<Candidate> {
        let view = ctx.view;
        let grid = view.grid;
        let policy = self.weighted();

        let mut spots: Vec<Pos> = Vec::new();
        for block in grid.window(me.pos, BLOCK_SEARCH_RADIUS) {
            if grid.get(block) != Cell::Block {
                continue;
            }
            for n in block.neighbors() {
                if grid.get(n) == Cell::Empty && !spots.contains(&n) {
                    spots.push(n);
                }
            }
        }

        let mut out = Vec::with_capacity(spots.len());
        for spot in spots {
            let blocks = blast::blocks_hit(grid, spot, me.power);
            let mut score = 80.0 - 8.0 * me.pos.manhattan(spot) as f32 + 10.0 * blocks as f32;
            let path = self.path_to(me, view, spot, policy);
            score += self.first_step_penalty(ctx, path.as_deref(), 60.0, 6.0);
            out.push(Candidate { score, path, bomb_spot: true });
        }
        out
    }

    /// `-unreachable` without a path, else `-per_danger` times the danger
    /// of the first step.
    fn first_step_penalty(&self, ctx: &TickContext, path: Option<&[Pos]>, unreachable: f32, per_danger: f32) -> f32 {
        match path {
            None => -unreachable,
            Some([_, next, ..]) => -per_danger * self.danger_at(ctx.view, *next),
            Some(_) => 0.0,
        }
    }

    /// Head for an unseen reachable cell. Returns false when there is none.
    fn explore(&mut self, me: &Agent, ctx: &TickContext) -> bool {
        let view = ctx.view;
        let grid = view.grid;
        let policy = self.weighted();

        let mut frontier: Vec<(f32, Path)> = Vec::new();
        for distance in FRONTIER_MIN..=FRONTIER_MAX {
            for p in grid.ring(me.pos, distance) {
                if self.memory.has_seen(p) {
                    continue;
                }
                if let Some(path) = self.path_to(me, view, p, policy) {
                    frontier.push((60.0 - 5.0 * distance as f32, path));
                }
            }
        }
        if frontier.is_empty() {
            return false;
        }
        frontier.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        let top = frontier.len().min(3);
        let pick = self.rng.gen_range(0..top);
        let path = frontier.swap_remove(pick).1;
        self.steer(&path)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::super::tests::{bot, brain};
    use super::*;
    use crate::domain::ai::personality::PersonalityKind;
    use crate::domain::grid::{Dir, Grid};
    use crate::domain::hazard::HazardView;
    use crate::sim::level::parse_layout;

    #[test]
    fn heads_for_the_nearest_power_up() {
        let mut g = Grid::bordered(11, 11);
        g.set(Pos::new(5, 3), Cell::PowerUp(PowerUp::Bomb));
        g.set(Pos::new(5, 9), Cell::PowerUp(PowerUp::Speed));
        let me = bot(0, 5, 5);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Collector, 2);
        b.memory.observe(&g, me.pos, 6);
        b.run_collect(&me, &ctx);
        assert_eq!(b.direction, Some(Dir::Up));
    }

    #[test]
    fn bombs_blocks_when_standing_next_to_them() {
        let g = parse_layout(&[
            "#######",
            "#..+..#",
            "#.....#",
            "#.....#",
            "#######",
        ])
        .unwrap();
        let me = bot(0, 3, 2);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Collector, 9);
        b.cooldowns.bomb = 0;
        b.run_collect(&me, &ctx);
        assert!(b.pending_bomb);
        assert!(b.escape_path.is_some());
    }

    #[test]
    fn explores_when_nothing_is_known() {
        let g = Grid::bordered(21, 9);
        let me = bot(0, 2, 4);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Survivor, 5);
        b.memory.observe(&g, me.pos, 3);
        b.run_collect(&me, &ctx);
        assert!(b.direction.is_some());
        let dir = b.direction.unwrap();
        assert_ne!(dir, Dir::Left, "the left side is already explored");
    }
}
