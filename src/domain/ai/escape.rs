/// Escape: get out of lethal cells.
///
/// Tried in order, the first that yields a move wins:
///   1. cornered: the least dangerous open neighbour (bomb cells +5),
///   2. route to the safest reachable position,
///   3. direction scores: danger, distance from bombs, dead ends,
///      heading toward the last known safe cell,
///   4. any passable direction.
///
/// Safest position search, candidates in order: last safe cell, the safe
/// history, rings 1..=3, rings 4..=8, then the whole arena if nothing was
/// found yet. Score = danger + 0.1·distance, lower wins; a danger-free
/// cell within 3 steps ends the search at once.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use super::path::DangerPolicy;
use super::{is_corner_trapped, AiBrain, TickContext};
use crate::domain::entity::Agent;
use crate::domain::grid::{Dir, Pos};
use crate::domain::hazard::LETHAL_DANGER;
use crate::domain::tile::Cell;

const NEAR_RINGS: i32 = 3;
const FAR_RINGS: i32 = 8;
const DISTANCE_WEIGHT: f32 = 0.1;

impl AiBrain {
    /// Returns false only when no direction at all is passable.
    pub(super) fn run_escape(&mut self, me: &Agent, ctx: &TickContext) -> bool {
        let view = ctx.view;
        let grid = view.grid;

        if is_corner_trapped(&view, me.pos) {
            let exit = Dir::ALL
                .into_iter()
                .filter(|d| view.is_cell_passable(me.pos.step(*d), me))
                .map(|d| {
                    let n = me.pos.step(d);
                    let bomb = if grid.get(n).is_bomb() { 5.0 } else { 0.0 };
                    (d, self.danger_at(view, n) + bomb)
                })
                .fold(None, |best: Option<(Dir, f32)>, (d, s)| match best {
                    Some((_, b)) if b <= s => best,
                    _ => Some((d, s)),
                });
            if let Some((dir, _)) = exit {
                self.direction = Some(dir);
                return true;
            }
        }

        if let Some(safe) = self.find_safest_position(me, ctx) {
            if let Some(path) = self.path_to(me, view, safe, DangerPolicy::Ignore) {
                if self.steer(&path) {
                    return true;
                }
            }
        }

        let mut best: Option<(f32, Dir)> = None;
        for dir in Dir::ALL {
            let next = me.pos.step(dir);
            if !view.is_cell_passable(next, me) {
                continue;
            }
            let mut score = if grid.get(next).is_bomb() { -30.0 } else { 0.0 };
            score -= 15.0 * self.danger_at(view, next);
            for bomb in view.bombs {
                score += (4 * next.manhattan(bomb.pos)).min(30) as f32;
            }
            let exits = next.neighbors().iter().filter(|n| grid.get(**n) == Cell::Empty).count();
            if exits <= 1 {
                score -= 40.0;
            }
            if let Some(safe) = self.memory.last_safe {
                if heads_toward(me.pos, safe, dir) {
                    score += 30.0;
                }
            }
            if best.map_or(true, |(b, _)| score > b) {
                best = Some((score, dir));
            }
        }
        if let Some((_, dir)) = best {
            self.direction = Some(dir);
            return true;
        }

        let open: Vec<Dir> = Dir::ALL.into_iter().filter(|d| view.is_cell_passable(me.pos.step(*d), me)).collect();
        match open.choose(&mut self.rng) {
            Some(dir) => {
                self.direction = Some(*dir);
                true
            }
            None => false,
        }
    }

    /// Lowest `danger + 0.1·distance` cell that can be reached at all.
    /// Reachability ignores danger: the way out of a blast runs through it.
    pub(super) fn find_safest_position(&mut self, me: &Agent, ctx: &TickContext) -> Option<Pos> {
        let view = ctx.view;
        let grid = view.grid;
        let reach = self.tuning.max_path_steps as i32;

        let mut stages: Vec<Vec<Pos>> = Vec::with_capacity(4);
        stages.push(self.memory.last_safe.into_iter().chain(self.memory.safe_history()).collect());
        stages.push((1..=NEAR_RINGS).flat_map(|d| grid.ring(me.pos, d)).collect());
        stages.push((NEAR_RINGS + 1..=FAR_RINGS).flat_map(|d| grid.ring(me.pos, d)).collect());

        let mut seen: HashSet<Pos> = HashSet::new();
        let mut best: Option<(f32, Pos)> = None;
        let mut stage_index = 0;
        loop {
            let candidates = match stages.get(stage_index) {
                Some(stage) => stage.clone(),
                // Whole-arena sweep, only while nothing has been found.
                None if stage_index == stages.len() && best.is_none() => grid.positions().collect(),
                None => break,
            };
            stage_index += 1;

            for p in candidates {
                if p == me.pos || !seen.insert(p) || !grid.get(p).is_open() {
                    continue;
                }
                let distance = me.pos.manhattan(p);
                if distance > reach {
                    continue;
                }
                let danger = self.danger_at(view, p);
                if danger >= LETHAL_DANGER {
                    continue;
                }
                if self.path_to(me, view, p, DangerPolicy::Ignore).is_none() {
                    continue;
                }
                if danger == 0.0 && distance <= NEAR_RINGS {
                    self.memory.last_safe = Some(p);
                    return Some(p);
                }
                let score = danger + DISTANCE_WEIGHT * distance as f32;
                if best.map_or(true, |(b, _)| score < b) {
                    best = Some((score, p));
                }
            }
        }

        let (_, pos) = best?;
        if self.danger_at(view, pos) == 0.0 {
            self.memory.last_safe = Some(pos);
        }
        Some(pos)
    }
}

/// Does stepping `dir` from `from` reduce the distance to `goal` on the
/// step's own axis?
fn heads_toward(from: Pos, goal: Pos, dir: Dir) -> bool {
    let (dx, dy) = dir.delta();
    if dir.is_horizontal() {
        (goal.x - from.x).signum() == dx
    } else {
        (goal.y - from.y).signum() == dy
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
    use crate::domain::entity::{AgentId, Bomb};
    use crate::domain::grid::Grid;
    use crate::domain::hazard::HazardView;
    use crate::sim::level::parse_layout;

    #[test]
    fn heading_toward_goal() {
        let from = Pos::new(3, 3);
        assert!(heads_toward(from, Pos::new(6, 1), Dir::Right));
        assert!(heads_toward(from, Pos::new(6, 1), Dir::Up));
        assert!(!heads_toward(from, Pos::new(6, 1), Dir::Left));
        assert!(!heads_toward(from, Pos::new(3, 1), Dir::Right));
    }

    #[test]
    fn safest_position_is_outside_the_blast() {
        let mut g = Grid::bordered(11, 11);
        g.set(Pos::new(5, 5), Cell::Bomb);
        let bombs = vec![Bomb::new(Pos::new(5, 5), 2, Some(AgentId(0)), 180)];
        let me = bot(0, 5, 5);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &bombs, &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Survivor, 7);
        b.danger.refresh(&ctx.view, me.pos, 8);
        let safe = b.find_safest_position(&me, &ctx).unwrap();
        assert!(!ctx.view.is_cell_lethal(safe));
        assert!(b.run_escape(&me, &ctx));
        assert!(b.direction.is_some());
    }

    #[test]
    fn dead_end_corridor_runs_for_the_exit() {
        let mut g = parse_layout(&[
            "#########",
            "#.......#",
            "#.#######",
            "#########",
        ])
        .unwrap();
        g.set(Pos::new(7, 1), Cell::Bomb);
        let bombs = vec![Bomb::new(Pos::new(7, 1), 3, Some(AgentId(1)), 180)];
        let me = bot(0, 5, 1);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &bombs, &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Collector, 3);
        b.danger.refresh(&ctx.view, me.pos, 8);
        assert!(b.run_escape(&me, &ctx));
        assert_eq!(b.direction, Some(Dir::Left));
    }

    #[test]
    fn boxed_in_bot_reports_failure() {
        let g = parse_layout(&["###", "#.#", "###"]).unwrap();
        let me = bot(0, 1, 1);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Hunter, 1);
        b.direction = None;
        assert!(!b.run_escape(&me, &ctx));
        assert_eq!(b.direction, None);
    }
}
