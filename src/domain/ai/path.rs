/// Best-first grid search shared by every planner.
///
/// One search, parameterized by an admission rule. Each candidate
/// neighbour must first be passable (`HazardView::is_passable_for`), then
/// the rule either rejects it or returns a cost penalty:
///
/// ┌────────────────────────┬──────────────────────────────────────────┐
/// │ Rule                    │ Neighbour                               │
/// ├────────────────────────┼──────────────────────────────────────────┤
/// │ Ignore                  │ always admitted, penalty 0              │
/// │ Weighted { risk }       │ penalty = 2·danger; if ≥ 8, admitted    │
/// │                         │ only when a roll lands within `risk`    │
/// │ Cautious                │ penalty = 2·danger; rejected if ≥ 8     │
/// │ safe path (exclusion)   │ rejected if excluded, else penalty 0    │
/// └────────────────────────┴──────────────────────────────────────────┘
///
/// Priority (lower first) = remaining Manhattan distance + penalty +
/// length of the path so far; equal priorities pop in insertion order.
/// A cell is marked visited when pushed; a rejected cell is not, so a
/// later expansion may still admit it. The goal test happens at pop, and
/// paths longer than `max_depth` cells are dropped there, which bounds
/// every search by `4^max_depth` pushes at worst and far fewer in practice.
///
/// Returned paths run from the start to the target, both inclusive.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use super::danger::DangerMap;
use super::personality::PathStyle;
use crate::domain::entity::AgentId;
use crate::domain::grid::{Dir, Pos};
use crate::domain::hazard::HazardView;
use crate::domain::tile::Cell;

pub type Path = Vec<Pos>;

/// Weighted danger at or above this is "maximum danger" for searches.
const HIGH_DANGER: f32 = 8.0;
const DANGER_WEIGHT: f32 = 2.0;

/// Chance a tricky router tries a waypoint detour.
const DETOUR_CHANCE: f64 = 0.4;
/// Chance tricky and balanced routers weigh danger.
const WEIGHTED_CHANCE: f64 = 0.7;
/// Waypoint box half-size and Manhattan cap.
const WAYPOINT_REACH: i32 = 4;
const WAYPOINT_MAX_DISTANCE: i32 = 5;
/// Extra length a detour may add over the direct Manhattan distance.
const WAYPOINT_SLACK: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DangerPolicy {
    Ignore,
    Weighted { risk_tolerance: f32 },
    /// Deterministic: high-danger cells are never entered.
    Cautious,
}

/// Everything a search reads. Borrowed for one tick.
#[derive(Clone, Copy)]
pub struct PathCtx<'a> {
    pub view: HazardView<'a>,
    pub danger: &'a DangerMap,
    pub agent: AgentId,
    /// Where the searching agent actually stands (for the bomb exit rule).
    pub standing: Pos,
}

impl<'a> PathCtx<'a> {
    fn passable(&self, pos: Pos) -> bool {
        self.view.is_passable_for(pos, self.agent, self.standing)
    }

    fn weighted_danger(&self, pos: Pos) -> f32 {
        self.danger.level(&self.view, pos) * DANGER_WEIGHT
    }
}

// ── Search core ──

struct Node {
    priority: f32,
    seq: u64,
    pos: Pos,
    depth: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    // Reversed: BinaryHeap is a max-heap and we want the smallest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn search<F>(ctx: &PathCtx, start: Pos, target: Pos, max_depth: usize, mut admit: F) -> Option<Path>
where
    F: FnMut(Pos) -> Option<f32>,
{
    let mut open = BinaryHeap::new();
    let mut visited: HashSet<Pos> = HashSet::new();
    let mut parent: HashMap<Pos, Pos> = HashMap::new();
    let mut seq = 0u64;

    visited.insert(start);
    open.push(Node { priority: 0.0, seq, pos: start, depth: 1 });

    while let Some(node) = open.pop() {
        if node.depth > max_depth {
            continue;
        }
        if node.pos == target {
            return Some(rebuild(&parent, start, target));
        }
        for dir in Dir::ALL {
            let next = node.pos.step(dir);
            if visited.contains(&next) || !ctx.passable(next) {
                continue;
            }
            let Some(penalty) = admit(next) else { continue };
            seq += 1;
            let priority = next.manhattan(target) as f32 + penalty + node.depth as f32;
            visited.insert(next);
            parent.insert(next, node.pos);
            open.push(Node { priority, seq, pos: next, depth: node.depth + 1 });
        }
    }
    None
}

fn rebuild(parent: &HashMap<Pos, Pos>, start: Pos, target: Pos) -> Path {
    let mut path = vec![target];
    let mut cur = target;
    while cur != start {
        match parent.get(&cur) {
            Some(p) => {
                cur = *p;
                path.push(cur);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

// ── Public searches ──

/// General path to `target`, danger handled per `policy`.
pub fn find_path<R: Rng>(
    ctx: &PathCtx,
    start: Pos,
    target: Pos,
    max_depth: usize,
    policy: DangerPolicy,
    rng: &mut R,
) -> Option<Path> {
    if start == target {
        return Some(vec![start]);
    }
    if !is_destination(ctx, target) {
        return None;
    }
    match policy {
        DangerPolicy::Ignore => search(ctx, start, target, max_depth, |_| Some(0.0)),
        DangerPolicy::Cautious => cautious(ctx, start, target, max_depth),
        DangerPolicy::Weighted { risk_tolerance } => search(ctx, start, target, max_depth, |p| {
            let w = ctx.weighted_danger(p);
            if w >= HIGH_DANGER && rng.gen::<f32>() > risk_tolerance {
                None
            } else {
                Some(w)
            }
        }),
    }
}

/// Deterministic reachability used for scoring: the `Cautious` rule,
/// no random draws.
pub fn find_cautious_path(ctx: &PathCtx, start: Pos, target: Pos, max_depth: usize) -> Option<Path> {
    if start == target {
        return Some(vec![start]);
    }
    if !is_destination(ctx, target) {
        return None;
    }
    cautious(ctx, start, target, max_depth)
}

fn is_destination(ctx: &PathCtx, target: Pos) -> bool {
    let grid = ctx.view.grid;
    grid.in_bounds(target) && !grid.get(target).is_obstacle()
}

fn cautious(ctx: &PathCtx, start: Pos, target: Pos, max_depth: usize) -> Option<Path> {
    search(ctx, start, target, max_depth, |p| {
        let w = ctx.weighted_danger(p);
        (w < HIGH_DANGER).then_some(w)
    })
}

/// Path that never enters a cell of `exclusion`. The start cell is exempt.
pub fn find_safe_path(
    ctx: &PathCtx,
    start: Pos,
    target: Pos,
    max_depth: usize,
    exclusion: &BTreeSet<Pos>,
) -> Option<Path> {
    if start == target {
        return Some(vec![start]);
    }
    search(ctx, start, target, max_depth, |p| (!exclusion.contains(&p)).then_some(0.0))
}

/// Personality-flavoured routing. See `PathStyle`.
pub fn styled_path<R: Rng>(
    ctx: &PathCtx,
    start: Pos,
    target: Pos,
    max_depth: usize,
    style: PathStyle,
    risk_tolerance: f32,
    rng: &mut R,
) -> Option<Path> {
    let weighted = DangerPolicy::Weighted { risk_tolerance };
    match style {
        PathStyle::Direct => find_path(ctx, start, target, max_depth, DangerPolicy::Ignore, rng),
        PathStyle::Safe => find_path(ctx, start, target, max_depth, weighted, rng),
        PathStyle::Tricky => {
            if rng.gen_bool(DETOUR_CHANCE) {
                if let Some(path) = detour(ctx, start, target, max_depth, weighted, rng) {
                    return Some(path);
                }
            }
            let policy = if rng.gen_bool(WEIGHTED_CHANCE) { weighted } else { DangerPolicy::Ignore };
            find_path(ctx, start, target, max_depth, policy, rng)
        }
        PathStyle::Balanced => {
            let policy = if rng.gen_bool(WEIGHTED_CHANCE) { weighted } else { DangerPolicy::Ignore };
            find_path(ctx, start, target, max_depth, policy, rng)
        }
    }
}

/// Route through a random nearby waypoint that costs at most
/// `WAYPOINT_SLACK` extra steps. Each leg gets half the depth budget.
fn detour<R: Rng>(
    ctx: &PathCtx,
    start: Pos,
    target: Pos,
    max_depth: usize,
    policy: DangerPolicy,
    rng: &mut R,
) -> Option<Path> {
    let grid = ctx.view.grid;
    let direct = start.manhattan(target);
    let mut waypoints = Vec::new();
    for dx in -WAYPOINT_REACH..=WAYPOINT_REACH {
        for dy in -WAYPOINT_REACH..=WAYPOINT_REACH {
            if dx.abs() + dy.abs() > WAYPOINT_MAX_DISTANCE {
                continue;
            }
            let p = start.offset(dx, dy);
            if !grid.in_bounds(p) || grid.get(p) != Cell::Empty {
                continue;
            }
            if start.manhattan(p) + p.manhattan(target) <= direct + WAYPOINT_SLACK {
                waypoints.push(p);
            }
        }
    }
    let waypoint = *waypoints.choose(rng)?;
    let half = max_depth / 2;
    let mut first = find_path(ctx, start, waypoint, half, policy, rng)?;
    let second = find_path(ctx, waypoint, target, half, policy, rng)?;
    if second.len() <= 1 {
        return None;
    }
    first.pop();
    first.extend(second);
    Some(first)
}

/// Direction of the first step of `path`, if it has one.
pub fn first_step(path: &[Pos]) -> Option<Dir> {
    match path {
        [from, to, ..] => from.dir_to(*to),
        _ => None,
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
