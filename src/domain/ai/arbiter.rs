/// Strategy arbitration: target selection and mode scoring.
///
/// Pure functions of their inputs. Reachability checks use the
/// deterministic `Cautious` search so the same situation always yields the
/// same mode.
///
/// ### Mode scores
/// ┌─────────┬────────────────────────────────────────────────────────────┐
/// │ Mode     │ Score                                                      │
/// ├─────────┼────────────────────────────────────────────────────────────┤
/// │ Hunt     │ 100/(d+1)·w_hunt                                           │
/// │          │ +20 more bombs or more power than the target               │
/// │          │ +50 aligned and d ≤ power+1                                │
/// │          │ +40 target has < 2 open neighbours                         │
/// │ Collect  │ 50/(d_nearest_power_up+1)·w_collect                        │
/// │          │ +50 bombs < 2 and a bomb power-up is reachable, else       │
/// │          │ +40 power < 3 and a flame power-up is reachable, else      │
/// │          │ +30 speed < 4 and a speed power-up is reachable            │
/// │ Trap     │ only with 0 active bombs and max_bombs > 1: 30·w_trap      │
/// │          │ +60 target within 4 and ≤ 2 open neighbours                │
/// │ Escape   │ 100 standing on a lethal cell, 80 with ≥ 2 lethal          │
/// │          │ neighbours, else 0                                         │
/// └─────────┴────────────────────────────────────────────────────────────┘
///
/// The first maximum wins, in the order Hunt, Collect, Trap, Escape.

use super::path::{find_cautious_path, PathCtx};
use super::personality::Personality;
use crate::domain::entity::Agent;
use crate::domain::grid::{Grid, Pos};
use crate::domain::tile::PowerUp;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Hunt,
    Collect,
    Trap,
    Escape,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Hunt => "hunt",
            Mode::Collect => "collect",
            Mode::Trap => "trap",
            Mode::Escape => "escape",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ModeScores {
    pub hunt: f32,
    pub collect: f32,
    pub trap: f32,
    pub escape: f32,
}

impl ModeScores {
    /// Highest score; ties go to the earliest mode.
    pub fn best(&self) -> Mode {
        let ranked = [
            (Mode::Hunt, self.hunt),
            (Mode::Collect, self.collect),
            (Mode::Trap, self.trap),
            (Mode::Escape, self.escape),
        ];
        let mut best = ranked[0];
        for entry in &ranked[1..] {
            if entry.1 > best.1 {
                best = *entry;
            }
        }
        best.0
    }
}

/// Fewer than two open orthogonal neighbours.
pub fn is_cornered(grid: &Grid, pos: Pos) -> bool {
    grid.open_neighbors(pos) < 2
}

// ══════════════════════════════════════════════════════════════
// Target selection
// ══════════════════════════════════════════════════════════════

/// Pick the opponent to focus on.
///
/// An explicitly assigned living target wins. Otherwise living humans are
/// ranked; when none is alive, living bots are ranked instead with
/// smaller bonuses and no alignment term.
pub fn select_target<'a>(me: &Agent, agents: &'a [Agent], grid: &Grid) -> Option<&'a Agent> {
    if let Some(id) = me.target {
        if let Some(t) = agents.iter().find(|a| a.id == id && a.alive && a.id != me.id) {
            return Some(t);
        }
    }

    let humans = agents.iter().filter(|a| a.alive && a.id != me.id && !a.is_bot());
    let best_human = first_max(humans, |t| {
        let mut score = 100.0 - 5.0 * me.pos.manhattan(t.pos) as f32;
        if t.max_bombs < me.max_bombs { score += 20.0; }
        if t.power < me.power { score += 20.0; }
        if t.speed < me.speed { score += 15.0; }
        if grid.open_neighbors(t.pos) <= 2 { score += 40.0; }
        if grid.line_of_sight(me.pos, t.pos) { score += 50.0; }
        score
    });
    if best_human.is_some() {
        return best_human;
    }

    let bots = agents.iter().filter(|a| a.alive && a.id != me.id && a.is_bot());
    first_max(bots, |t| {
        let mut score = 100.0 - 5.0 * me.pos.manhattan(t.pos) as f32;
        if t.max_bombs < me.max_bombs { score += 15.0; }
        if t.power < me.power { score += 15.0; }
        if t.speed < me.speed { score += 10.0; }
        if grid.open_neighbors(t.pos) <= 2 { score += 30.0; }
        score
    })
}

fn first_max<'a, I, F>(candidates: I, score: F) -> Option<&'a Agent>
where
    I: Iterator<Item = &'a Agent>,
    F: Fn(&Agent) -> f32,
{
    let mut best: Option<(&'a Agent, f32)> = None;
    for c in candidates {
        let s = score(c);
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((c, s));
        }
    }
    best.map(|(a, _)| a)
}

// ══════════════════════════════════════════════════════════════
// Mode scoring
// ══════════════════════════════════════════════════════════════

pub struct ArbiterInput<'a> {
    pub me: &'a Agent,
    pub target: Option<&'a Agent>,
    pub personality: &'a Personality,
    pub known_power_ups: &'a [Pos],
    pub paths: PathCtx<'a>,
    pub max_depth: usize,
}

impl<'a> ArbiterInput<'a> {
    fn grid(&self) -> &Grid {
        self.paths.view.grid
    }

    /// A known power-up of `kind` that a cautious search can reach.
    fn reachable_power_up(&self, kind: PowerUp) -> bool {
        self.known_power_ups
            .iter()
            .filter(|p| self.grid().get(**p).power_up() == Some(kind))
            .any(|p| find_cautious_path(&self.paths, self.me.pos, *p, self.max_depth).is_some())
    }
}

pub fn evaluate(input: &ArbiterInput) -> ModeScores {
    let me = input.me;
    let grid = input.grid();
    let weights = input.personality.weights;
    let mut scores = ModeScores::default();

    // ── Hunt ──
    if let Some(t) = input.target {
        let d = me.pos.manhattan(t.pos);
        scores.hunt = 100.0 / (d + 1) as f32 * weights.hunt;
        if me.max_bombs > t.max_bombs || me.power > t.power {
            scores.hunt += 20.0;
        }
        if me.pos.is_aligned(t.pos) && d <= me.power + 1 {
            scores.hunt += 50.0;
        }
        if is_cornered(grid, t.pos) {
            scores.hunt += 40.0;
        }
    }

    // ── Collect ──
    let nearest = input.known_power_ups.iter().map(|p| me.pos.manhattan(*p)).min();
    if let Some(d) = nearest {
        scores.collect = 50.0 / (d + 1) as f32 * weights.collect;
        if me.max_bombs < 2 {
            if input.reachable_power_up(PowerUp::Bomb) {
                scores.collect += 50.0;
            }
        } else if me.power < 3 {
            if input.reachable_power_up(PowerUp::Flame) {
                scores.collect += 40.0;
            }
        } else if me.speed < 4 && input.reachable_power_up(PowerUp::Speed) {
            scores.collect += 30.0;
        }
    }

    // ── Trap ──
    if me.active_bombs == 0 && me.max_bombs > 1 {
        scores.trap = 30.0 * weights.trap;
        if let Some(t) = input.target {
            if me.pos.manhattan(t.pos) <= 4 && grid.open_neighbors(t.pos) <= 2 {
                scores.trap += 60.0;
            }
        }
    }

    // ── Escape ──
    let view = input.paths.view;
    if view.is_cell_lethal(me.pos) {
        scores.escape = 100.0;
    } else if view.lethal_neighbors(me.pos) >= 2 {
        scores.escape = 80.0;
    }

    scores
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
