/// Bomb placement: the escape-route veto and the opportunistic triggers.
///
/// Every placement a bot makes goes through `consider_bomb`, which:
///   1. checks the brain's own gates (cooldown, recovery, one per tick,
///      bomb budget) and the world rule (`rules::can_place_bomb`),
///   2. plans a route out of the bomb's own blast,
///   3. commits (route kept as the escape path) or vetoes.
///
/// Three vetoes in a row put the bot into a 30-tick recovery.
///
/// Escape route: ring cells at distance 1..=power+2 outside the blast,
/// least enclosed first, reached by a path that avoids lethal cells. A
/// cell that would be cornered once the bomb is down is never a
/// destination: the cornered override would walk the bot back into its
/// own blast.

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use tracing::debug;

use super::path::{find_safe_path, Path, PathCtx};
use super::{corner_trapped, AiBrain, TickContext};
use crate::domain::blast::affected_cells;
use crate::domain::entity::Agent;
use crate::domain::grid::{Dir, Pos};
use crate::domain::hazard::HazardView;
use crate::domain::rules;
use crate::domain::tile::Cell;

const MAX_FAILED_ATTEMPTS: u32 = 3;
const RECOVERY_TICKS: u32 = 30;
/// Opportunistic bombing is skipped at this danger or above.
const BOMBING_DANGER_LIMIT: f32 = 8.0;
/// Adjacent blocks are only bombed when their danger stays at or below this.
const BLOCK_DANGER_LIMIT: f32 = 5.0;

// ── Escape route ──

/// Route from `me.pos` to a cell outside the blast of a bomb placed there.
pub(super) fn escape_route(paths: &PathCtx, me: &Agent) -> Option<Path> {
    let view = paths.view;
    let grid = view.grid;
    let blast = affected_cells(grid, me.pos, me.power);
    let max_depth = (me.power + 5).max(1);

    let exclusion: BTreeSet<Pos> = grid
        .window(me.pos, max_depth)
        .filter(|p| *p != me.pos && view.is_cell_lethal(*p))
        .collect();
    let usable = |p: Pos| {
        grid.get(p).is_open()
            && !blast.contains(&p)
            && !exclusion.contains(&p)
            && !corner_trapped(grid, p, Some(me.pos))
    };

    for distance in 1..=me.power + 2 {
        let mut ring: Vec<Pos> = grid.ring(me.pos, distance).into_iter().filter(|p| usable(*p)).collect();
        ring.sort_by_key(|p| corner_risk(&view, *p));
        for candidate in ring {
            if let Some(path) = find_safe_path(paths, me.pos, candidate, max_depth as usize, &exclusion) {
                if path.len() > 1 {
                    return Some(path);
                }
            }
        }
    }
    None
}

/// Walls, blocks, bombs and off-grid cells around `pos`.
fn corner_risk(view: &HazardView, pos: Pos) -> usize {
    pos.neighbors()
        .iter()
        .filter(|n| {
            let c = view.grid.get(**n);
            c.is_obstacle() || c.is_bomb()
        })
        .count()
}

// ── Placement ──

impl AiBrain {
    /// Brain-side gates plus the world placement rule.
    fn can_attempt_bomb(&self, me: &Agent, view: &HazardView) -> bool {
        self.cooldowns.bomb == 0
            && self.cooldowns.recovery == 0
            && !self.pending_bomb
            && rules::can_place_bomb(view.grid, view.bombs, me)
    }

    /// Try to place a bomb on `me.pos` this tick.
    ///
    /// Without an escape route the bot still attempts with probability
    /// `reckless`; such an attempt is vetoed and counted as a failure.
    /// 0.0 means "only when safe", 1.0 means "always try".
    pub(super) fn consider_bomb(&mut self, me: &Agent, ctx: &TickContext, reckless: f64) -> bool {
        if !self.can_attempt_bomb(me, &ctx.view) {
            return false;
        }
        let paths = PathCtx { view: ctx.view, danger: &self.danger, agent: me.id, standing: me.pos };
        let route = escape_route(&paths, me);
        if route.is_none() && !self.rng.gen_bool(reckless.clamp(0.0, 1.0)) {
            return false;
        }
        self.commit_bomb(me, route)
    }

    /// Placement that only happens when an escape route exists, and then
    /// only with probability `chance`.
    pub(super) fn bomb_if_safe(&mut self, me: &Agent, ctx: &TickContext, chance: f64) -> bool {
        if !self.can_attempt_bomb(me, &ctx.view) {
            return false;
        }
        let paths = PathCtx { view: ctx.view, danger: &self.danger, agent: me.id, standing: me.pos };
        match escape_route(&paths, me) {
            Some(route) if self.rng.gen_bool(chance.clamp(0.0, 1.0)) => self.commit_bomb(me, Some(route)),
            _ => false,
        }
    }

    /// Final veto. Without a route the placement is refused and counted.
    fn commit_bomb(&mut self, me: &Agent, route: Option<Path>) -> bool {
        match route {
            None => {
                self.failed_attempts += 1;
                if self.failed_attempts >= MAX_FAILED_ATTEMPTS {
                    self.cooldowns.recovery = RECOVERY_TICKS;
                    self.failed_attempts = 0;
                    debug!(agent = me.id.0, "too many unsafe bomb attempts, recovering");
                }
                debug!(agent = me.id.0, pos = ?me.pos, "bomb vetoed: no escape route");
                false
            }
            Some(route) => {
                debug!(agent = me.id.0, pos = ?me.pos, steps = route.len() - 1, "bomb placed");
                self.pending_bomb = true;
                self.escape_path = Some(VecDeque::from(route));
                self.cooldowns.bomb = self.rng.gen_range(10..=20);
                self.failed_attempts = 0;
                true
            }
        }
    }

    /// Opportunistic bombing after the mode executor has run.
    pub(super) fn manage_bombs(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;
        let grid = view.grid;
        if self.cooldowns.bomb > 0 || self.cooldowns.recovery > 0 || self.pending_bomb {
            return;
        }
        if !me.has_bomb_available() || self.danger_at(view, me.pos) >= BOMBING_DANGER_LIMIT {
            return;
        }

        // Target in the blast line.
        if let Some(target) = super::arbiter::select_target(me, ctx.agents, grid) {
            let d = me.pos.manhattan(target.pos);
            if me.pos.is_aligned(target.pos) && d <= me.power + 1 && grid.line_of_sight(me.pos, target.pos) {
                let chance = 0.7 + 0.3 * self.personality.aggression as f64;
                if self.rng.gen::<f64>() < chance {
                    self.consider_bomb(me, ctx, 1.0);
                    return;
                }
            }
        }

        // Blocks next to us.
        let blocks: Vec<Dir> = Dir::ALL
            .into_iter()
            .filter(|d| {
                let n = me.pos.step(*d);
                grid.get(n) == Cell::Block && self.danger_at(view, n) <= BLOCK_DANGER_LIMIT
            })
            .collect();
        if !blocks.is_empty() {
            let mut chance = 0.8;
            let loot_behind = blocks.iter().any(|d| {
                (2..=me.power + 1).any(|k| {
                    let p = me.pos.offset(d.delta().0 * k, d.delta().1 * k);
                    grid.get(p).power_up().is_some()
                })
            });
            if loot_behind {
                chance += 0.2;
            }
            if blocks.len() >= 2 {
                chance += 0.1;
            }
            if me.max_bombs < 2 || me.power < 3 {
                chance += 0.1;
            }
            if self.rng.gen::<f64>() < 0.2 {
                chance += 0.1;
            }
            if self.rng.gen::<f64>() < chance {
                self.consider_bomb(me, ctx, 1.0);
                return;
            }
        }

        // Nothing of ours on the board: the occasional speculative bomb.
        if me.active_bombs == 0 && self.rng.gen::<f64>() < 0.1 * self.personality.aggression as f64 {
            self.consider_bomb(me, ctx, 1.0);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::super::tests::{bot, brain};
    use super::*;
    use crate::domain::ai::danger::DangerMap;
    use crate::domain::ai::personality::PersonalityKind;
    use crate::domain::entity::Bomb;
    use crate::config::GameConfig;
    use crate::domain::grid::Grid;
    use crate::sim::event::GameEvent;
    use crate::sim::level::parse_layout;
    use crate::sim::step::step;
    use crate::sim::world::WorldState;

    /// (4,2) is a pocket whose only way out is (3,2), on the up arm of a
    /// bomb at (3,3). The left arm leads to (1,4), which has two exits.
    const POCKET: [&str; 7] = [
        "#######",
        "###.###",
        "###..##",
        "#...###",
        "#.#####",
        "#.#####",
        "#######",
    ];

    fn route(g: &Grid, bombs: &[Bomb], me: &Agent) -> Option<Path> {
        let view = HazardView::new(g, bombs, &[]);
        let danger = DangerMap::new();
        let paths = PathCtx { view, danger: &danger, agent: me.id, standing: me.pos };
        escape_route(&paths, me)
    }

    fn assert_leaves_blast(g: &Grid, me: &Agent, path: &[Pos]) {
        let blast = affected_cells(g, me.pos, me.power);
        assert_eq!(path[0], me.pos);
        let end = path[path.len() - 1];
        assert!(!blast.contains(&end), "{end:?} is inside the blast");
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1);
        }
    }

    #[test]
    fn open_field_escapes_to_a_neighbour_off_the_cross() {
        let g = Grid::bordered(11, 11);
        let me = bot(0, 5, 5);
        let path = route(&g, &[], &me).unwrap();
        assert_leaves_blast(&g, &me, &path);
        assert!(path.len() >= 2);
    }

    #[test]
    fn corridor_escape_turns_the_corner() {
        let g = parse_layout(&[
            "#######",
            "#.....#",
            "#.#####",
            "#.#####",
            "#######",
        ])
        .unwrap();
        let me = bot(0, 3, 1);
        let path = route(&g, &[], &me).unwrap();
        assert_leaves_blast(&g, &me, &path);
        assert_eq!(path.last(), Some(&Pos::new(1, 2)));
    }

    #[test]
    fn dead_end_has_no_route() {
        let g = parse_layout(&["#####", "#...#", "#####"]).unwrap();
        let me = bot(0, 1, 1);
        assert!(route(&g, &[], &me).is_none());
    }

    #[test]
    fn route_avoids_cells_under_another_bomb() {
        let mut g = parse_layout(&[
            "#######",
            "#.....#",
            "#.###.#",
            "#.....#",
            "#######",
        ])
        .unwrap();
        g.set(Pos::new(5, 3), Cell::Bomb);
        let bombs = vec![Bomb::new(Pos::new(5, 3), 3, None, 180)];
        let me = bot(0, 3, 1);
        let path = route(&g, &bombs, &me).unwrap();
        let view = HazardView::new(&g, &bombs, &[]);
        assert!(path[1..].iter().all(|p| !view.is_cell_lethal(*p)), "{path:?}");
    }

    #[test]
    fn vetoes_pile_up_into_recovery() {
        let g = parse_layout(&["#####", "#...#", "#####"]).unwrap();
        let me = bot(0, 1, 1);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Hunter, 2);
        b.cooldowns.bomb = 0;
        assert!(!b.consider_bomb(&me, &ctx, 0.0));
        assert_eq!(b.failed_attempts, 0);
        for _ in 0..3 {
            assert!(!b.consider_bomb(&me, &ctx, 1.0));
        }
        assert_eq!(b.cooldowns.recovery, RECOVERY_TICKS);
        assert_eq!(b.failed_attempts, 0);
        assert!(!b.pending_bomb);
    }

    #[test]
    fn committed_bomb_sets_escape_path_and_cooldown() {
        let g = Grid::bordered(9, 9);
        let me = bot(0, 4, 4);
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Collector, 8);
        b.cooldowns.bomb = 0;
        assert!(b.consider_bomb(&me, &ctx, 0.0));
        assert!(b.pending_bomb);
        assert!((10..=20).contains(&b.cooldowns.bomb));
        assert_eq!(b.escape_path.as_ref().map(|p| p[0]), Some(me.pos));
        // One placement per tick.
        assert!(!b.consider_bomb(&me, &ctx, 1.0));
    }

    #[test]
    fn exhausted_budget_never_attempts() {
        let g = Grid::bordered(9, 9);
        let mut me = bot(0, 4, 4);
        me.active_bombs = me.max_bombs;
        let agents = vec![me.clone()];
        let ctx = TickContext { view: HazardView::new(&g, &[], &[]), agents: &agents, tick: 0 };
        let mut b = brain(PersonalityKind::Hunter, 1);
        b.cooldowns.bomb = 0;
        assert!(!b.consider_bomb(&me, &ctx, 1.0));
        assert!(!b.bomb_if_safe(&me, &ctx, 1.0));
        assert_eq!(b.failed_attempts, 0);
        assert_eq!(b.cooldowns.bomb, 0);
        assert_eq!(b.cooldowns.recovery, 0);
        assert!(!b.pending_bomb);
        assert!(b.escape_path.is_none());
    }

    #[test]
    fn route_skips_a_pocket_that_only_opens_into_the_blast() {
        let g = parse_layout(&POCKET).unwrap();
        let mut me = bot(0, 3, 3);
        me.power = 2;
        let path = route(&g, &[], &me).unwrap();
        assert_leaves_blast(&g, &me, &path);
        assert_eq!(path.last(), Some(&Pos::new(1, 4)));
        assert!(!path.contains(&Pos::new(4, 2)));
    }

    #[test]
    fn only_pockets_left_means_no_route() {
        let g = parse_layout(&["#######", "###.###", "###..##", "#...###", "#######"]).unwrap();
        let mut me = bot(0, 3, 3);
        me.power = 2;
        assert!(route(&g, &[], &me).is_none());
    }

    #[test]
    fn bot_outlives_its_own_bomb_beside_a_pocket() {
        let mut cfg = GameConfig::default();
        cfg.roster.humans = 0;
        cfg.roster.bots = 1;
        cfg.agent.power = 2;
        let grid = parse_layout(&POCKET).unwrap();
        for seed in 0..4 {
            let mut w = WorldState::from_grid(&cfg, grid.clone(), seed);
            w.agents[0].pos = Pos::new(3, 3);
            let me = w.agents[0].clone();

            let mut b = brain(PersonalityKind::Hunter, seed);
            b.cooldowns.bomb = 0;
            let agents = w.agents.clone();
            let ctx = TickContext { view: HazardView::new(&w.grid, &[], &[]), agents: &agents, tick: 0 };
            assert!(b.consider_bomb(&me, &ctx, 0.0), "seed {seed}");
            w.bombs.push(Bomb::new(me.pos, me.power, Some(me.id), cfg.timing.bomb_fuse_ticks));
            w.grid.set(me.pos, Cell::Bomb);
            w.agents[0].active_bombs = 1;
            w.brains[0] = Some(b);

            let mut events = Vec::new();
            while !w.bombs.is_empty() {
                events.extend(step(&mut w, &[]));
            }
            assert!(events.contains(&GameEvent::BombDetonated { owner: Some(me.id), pos: me.pos }));
            assert!(
                !events.iter().any(|e| matches!(e, GameEvent::AgentKilled { .. })),
                "seed {seed}: died at {:?}",
                w.agents[0].pos
            );
            assert!(w.agents[0].alive);
        }
    }
}
