/// Bot controller: one `AiBrain` per bot, one `decide` call per tick.
///
/// ## Per-tick flow
///
///   1. **Update**: remember the position, observe the vision window,
///      rebuild the danger map, run stuck detection, tick cooldowns,
///      note safe cells, re-run the arbiter every `strategy_interval_ticks`.
///   2. **Cornered** (≥ 2 obstacles next to a bomb, or ≥ 3 anywhere):
///      take the least dangerous open neighbour and stop there.
///   3. **Escape path**: after placing a bomb, follow the planned route
///      cell by cell until it runs out.
///   4. **Lethal cell**: switch to Escape and run it right away.
///   5. **Mode executor** every 3..=8 ticks; between runs the last
///      direction is kept.
///   6. **Opportunistic bombing** (`bombing::manage_bombs`).
///   7. **Blocked move**: if the kept direction is not passable, score
///      the four directions and take one of the best two.
///
/// The brain never mutates the world. It answers with a `Decision`; the
/// simulation applies it.

pub mod arbiter;
mod bombing;
mod collect;
pub mod danger;
mod escape;
mod hunt;
pub mod memory;
pub mod path;
pub mod personality;
mod trap;

use std::collections::VecDeque;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use self::arbiter::{evaluate, select_target, ArbiterInput, Mode};
use self::danger::DangerMap;
use self::memory::Memory;
use self::path::{find_path, styled_path, DangerPolicy, Path, PathCtx};
use self::personality::Personality;
use crate::config::AiConfig;
use crate::domain::entity::{Agent, AgentId, Decision};
use crate::domain::grid::{Dir, Grid, Pos};
use crate::domain::hazard::HazardView;
use crate::domain::rules;
use crate::domain::tile::Cell;

/// Read-only world snapshot handed to every brain for one tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub view: HazardView<'a>,
    pub agents: &'a [Agent],
    pub tick: u64,
}

impl<'a> TickContext<'a> {
    pub fn agent(&self, id: AgentId) -> Option<&'a Agent> {
        self.agents.iter().find(|a| a.id == id)
    }
}

/// Per-brain countdowns, all in ticks.
#[derive(Clone, Copy, Debug, Default)]
struct Cooldowns {
    bomb: u32,
    trap: u32,
    recovery: u32,
    decision: u32,
}

#[derive(Clone, Debug)]
pub struct AiBrain {
    id: AgentId,
    personality: Personality,
    mode: Mode,
    rng: ChaCha8Rng,
    memory: Memory,
    danger: DangerMap,
    tuning: AiConfig,

    direction: Option<Dir>,
    escape_path: Option<VecDeque<Pos>>,
    /// Set by the bombing helpers during `decide`, reported in the decision.
    pending_bomb: bool,

    cooldowns: Cooldowns,
    failed_attempts: u32,
    strategy_timer: u32,
    stuck_counter: u32,
}

impl AiBrain {
    /// `seed` should differ per bot; the simulation mixes the match seed
    /// with the agent index.
    pub fn new(id: AgentId, personality: Personality, tuning: AiConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mode = personality.initial_mode(&mut rng);
        let direction = Dir::ALL.choose(&mut rng).copied();
        let cooldowns = Cooldowns { bomb: rng.gen_range(20..=40), ..Cooldowns::default() };
        AiBrain {
            id,
            personality,
            mode,
            rng,
            memory: Memory::new(tuning.stuck_window),
            danger: DangerMap::new(),
            tuning,
            direction,
            escape_path: None,
            pending_bomb: false,
            cooldowns,
            failed_attempts: 0,
            strategy_timer: 0,
            stuck_counter: 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    /// One tick of thinking for `me`. See module docs for the order.
    pub fn decide(&mut self, me: &Agent, ctx: &TickContext) -> Decision {
        self.pending_bomb = false;
        if !me.alive {
            return Decision::idle();
        }
        self.update(me, ctx);
        self.act(me, ctx);
        trace!(agent = me.id.0, mode = self.mode.name(), dir = ?self.direction, bomb = self.pending_bomb, "decision");
        Decision { direction: self.direction, place_bomb: self.pending_bomb }
    }

    // ══════════════════════════════════════════════════════════════
    // Update
    // ══════════════════════════════════════════════════════════════

    fn update(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;
        self.memory.record_position(me.pos);
        self.memory.observe(view.grid, me.pos, self.tuning.vision_radius);
        self.danger.refresh(&view, me.pos, self.tuning.danger_radius);

        if self.memory.is_stuck() {
            self.stuck_counter += 1;
            if self.stuck_counter > self.tuning.stuck_threshold {
                self.stuck_counter = 0;
                self.direction = Dir::ALL.choose(&mut self.rng).copied();
                debug!(agent = me.id.0, "stuck, picking a new direction");
                self.bomb_if_safe(me, ctx, 0.7);
            }
        }

        let c = &mut self.cooldowns;
        c.trap = c.trap.saturating_sub(1);
        c.bomb = c.bomb.saturating_sub(1);
        c.recovery = c.recovery.saturating_sub(1);

        if self.danger_at(view, me.pos) == 0.0 {
            self.memory.note_safe(me.pos);
        }

        self.strategy_timer += 1;
        if self.strategy_timer >= self.tuning.strategy_interval_ticks {
            self.reevaluate(me, ctx);
            self.strategy_timer = 0;
        }
    }

    /// Re-run the arbiter and adopt its mode.
    fn reevaluate(&mut self, me: &Agent, ctx: &TickContext) {
        let target = select_target(me, ctx.agents, ctx.view.grid);
        let input = ArbiterInput {
            me,
            target,
            personality: &self.personality,
            known_power_ups: self.memory.known_power_ups(),
            paths: PathCtx { view: ctx.view, danger: &self.danger, agent: me.id, standing: me.pos },
            max_depth: self.tuning.max_path_steps,
        };
        let next = evaluate(&input).best();
        self.set_mode(me, next);
    }

    fn set_mode(&mut self, me: &Agent, next: Mode) {
        if next != self.mode {
            debug!(agent = me.id.0, from = self.mode.name(), to = next.name(), "strategy change");
            self.mode = next;
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Decision
    // ══════════════════════════════════════════════════════════════

    fn act(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;

        // ── Cornered ──
        if is_corner_trapped(&view, me.pos) {
            // From a safe cell, never step into a blast.
            let here_lethal = view.is_cell_lethal(me.pos);
            let exit = Dir::ALL
                .into_iter()
                .filter(|d| {
                    let n = me.pos.step(*d);
                    view.is_cell_passable(n, me)
                        && !view.grid.get(n).is_bomb()
                        && (here_lethal || !view.is_cell_lethal(n))
                })
                .map(|d| (d, self.danger_at(view, me.pos.step(d))))
                .fold(None, |best: Option<(Dir, f32)>, (d, danger)| match best {
                    Some((_, b)) if b <= danger => best,
                    _ => Some((d, danger)),
                });
            match exit {
                Some((dir, _)) => {
                    self.direction = Some(dir);
                    return;
                }
                None if !here_lethal => {
                    self.direction = None;
                    return;
                }
                None => {}
            }
        }

        // ── Escape path after a bomb ──
        if self.follow_escape_path(me) {
            return;
        }

        // ── Immediate danger ──
        let lethal = view.is_cell_lethal(me.pos);
        if lethal {
            self.set_mode(me, Mode::Escape);
            if self.run_escape(me, ctx) {
                return;
            }
        }

        // ── Mode executor ──
        if self.cooldowns.decision > 0 {
            self.cooldowns.decision -= 1;
        } else {
            self.cooldowns.decision = self.rng.gen_range(3..=8);
            match self.mode {
                Mode::Hunt => self.run_hunt(me, ctx),
                Mode::Collect => self.run_collect(me, ctx),
                Mode::Trap => self.run_trap(me, ctx),
                Mode::Escape => {
                    if lethal {
                        self.run_escape(me, ctx);
                    } else {
                        self.reevaluate(me, ctx);
                    }
                }
            }
        }

        // ── Opportunistic bombing ──
        self.manage_bombs(me, ctx);

        // ── Blocked move ──
        let blocked = match self.direction {
            Some(d) => {
                let next = me.pos.step(d);
                !view.is_cell_passable(next, me) || (!lethal && view.is_cell_lethal(next))
            }
            None => true,
        };
        if blocked {
            self.pick_unblocked_direction(me, ctx);
        }
    }

    /// Returns true while a planned escape route is steering.
    fn follow_escape_path(&mut self, me: &Agent) -> bool {
        let Some(path) = self.escape_path.as_mut() else { return false };
        match path.iter().position(|p| *p == me.pos) {
            Some(i) => {
                path.drain(..i);
            }
            None => {
                self.escape_path = None;
                return false;
            }
        }
        if path.len() <= 1 {
            self.escape_path = None;
            return false;
        }
        self.direction = path[0].dir_to(path[1]);
        true
    }

    fn pick_unblocked_direction(&mut self, me: &Agent, ctx: &TickContext) {
        let view = ctx.view;
        let grid = view.grid;
        let target = select_target(me, ctx.agents, grid);

        let here_lethal = view.is_cell_lethal(me.pos);
        let mut options: Vec<(f32, Dir)> = Vec::with_capacity(4);
        for dir in Dir::ALL {
            let next = me.pos.step(dir);
            if !rules::can_step(&view, me, dir) || (!here_lethal && view.is_cell_lethal(next)) {
                continue;
            }
            let mut score = if grid.get(next).is_bomb() { -50.0 } else { 0.0 };
            score -= self.danger_at(view, next) * 15.0;

            match self.mode {
                Mode::Hunt => {
                    if let Some(t) = target {
                        score += 25.0 - next.manhattan(t.pos).min(25) as f32;
                        if grid.line_of_sight(next, t.pos) {
                            score += 30.0;
                        }
                    }
                }
                Mode::Collect => {
                    for p in self.memory.known_power_ups() {
                        let Some(kind) = grid.get(*p).power_up() else { continue };
                        score += 40.0 - (next.manhattan(*p) * 2).min(40) as f32;
                        if kind == self.personality.preferred {
                            score += 15.0;
                        }
                    }
                }
                Mode::Trap => {
                    let blocks = next.neighbors().iter().filter(|n| grid.get(**n) == Cell::Block).count();
                    score += blocks as f32 * 10.0;
                    for other in ctx.agents.iter().filter(|a| a.alive && a.id != me.id) {
                        let d = next.manhattan(other.pos);
                        if d <= 3 {
                            score += (25 - d * 5) as f32;
                            if next.is_aligned(other.pos) {
                                score += 15.0;
                            }
                        }
                    }
                }
                Mode::Escape => {
                    for bomb in view.bombs {
                        score += (next.manhattan(bomb.pos) * 2).min(20) as f32;
                    }
                    if let Some(safe) = self.memory.last_safe {
                        score += 30.0 - (next.manhattan(safe) * 3).min(30) as f32;
                    }
                }
            }

            let risk = grid.obstacle_neighbors(next);
            if risk >= 2 {
                score -= 15.0 * (risk - 1) as f32;
            }
            options.push((score, dir));
        }

        if options.is_empty() {
            self.direction = None;
            self.bomb_if_safe(me, ctx, 1.0);
            return;
        }
        options.sort_by(|a, b| b.0.total_cmp(&a.0));
        self.direction = Some(self.pick_top_two(&options));
    }

    /// Best option 80 % of the time, runner-up otherwise.
    fn pick_top_two(&mut self, ranked: &[(f32, Dir)]) -> Dir {
        if ranked.len() < 2 {
            return ranked[0].1;
        }
        match WeightedIndex::new([0.8, 0.2]) {
            Ok(dist) => ranked[dist.sample(&mut self.rng)].1,
            Err(_) => ranked[0].1,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Shared helpers for the executors
    // ══════════════════════════════════════════════════════════════

    fn danger_at(&self, view: HazardView, pos: Pos) -> f32 {
        self.danger.level(&view, pos)
    }

    fn path_to(&mut self, me: &Agent, view: HazardView, target: Pos, policy: DangerPolicy) -> Option<Path> {
        let ctx = PathCtx { view, danger: &self.danger, agent: me.id, standing: me.pos };
        let path = find_path(&ctx, me.pos, target, self.tuning.max_path_steps, policy, &mut self.rng);
        trace!(agent = me.id.0, ?target, ?policy, steps = path.as_ref().map(|p| p.len() - 1), "path search");
        path
    }

    fn weighted(&self) -> DangerPolicy {
        DangerPolicy::Weighted { risk_tolerance: self.personality.risk_tolerance }
    }

    /// Personality-styled route, with a little more reach than plain paths.
    fn styled_path_to(&mut self, me: &Agent, view: HazardView, target: Pos) -> Option<Path> {
        let ctx = PathCtx { view, danger: &self.danger, agent: me.id, standing: me.pos };
        let p = &self.personality;
        styled_path(
            &ctx,
            me.pos,
            target,
            self.tuning.max_path_steps + 2,
            p.path_style,
            p.risk_tolerance,
            &mut self.rng,
        )
    }

    /// Point `direction` along the first step of `path`. False for
    /// paths that do not move.
    fn steer(&mut self, path: &[Pos]) -> bool {
        match path::first_step(path) {
            Some(dir) => {
                self.direction = Some(dir);
                true
            }
            None => false,
        }
    }

    /// Uniform pick among the `n` lowest-danger passable directions.
    fn wander(&mut self, me: &Agent, view: HazardView, n: usize) {
        let mut options: Vec<(f32, Dir)> = Dir::ALL
            .into_iter()
            .filter(|d| view.is_cell_passable(me.pos.step(*d), me))
            .map(|d| (self.danger_at(view, me.pos.step(d)), d))
            .collect();
        if options.is_empty() {
            return;
        }
        options.sort_by(|a, b| a.0.total_cmp(&b.0));
        let top = n.min(options.len());
        let pick = self.rng.gen_range(0..top);
        self.direction = Some(options[pick].1);
    }
}

/// Walls, blocks and bombs around `pos` (cells outside the grid do not
/// count). Cornered: ≥ 2 of them while on or next to a bomb, or ≥ 3.
fn is_corner_trapped(view: &HazardView, pos: Pos) -> bool {
    corner_trapped(view.grid, pos, None)
}

/// Corner test with an extra bomb assumed at `planned`.
fn corner_trapped(grid: &Grid, pos: Pos, planned: Option<Pos>) -> bool {
    let mut obstacles = 0;
    let mut bomb_adjacent = false;
    for n in pos.neighbors() {
        if !grid.in_bounds(n) {
            continue;
        }
        let cell = grid.get(n);
        if cell.is_obstacle() {
            obstacles += 1;
        } else if cell.is_bomb() || planned == Some(n) {
            obstacles += 1;
            bomb_adjacent = true;
        }
    }
    let on_bomb = grid.get(pos).is_bomb() || planned == Some(pos);
    (obstacles >= 2 && (on_bomb || bomb_adjacent)) || obstacles >= 3
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
