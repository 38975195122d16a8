/// Sub-cell movement, the single source of truth for where bodies are.
///
/// ## Model
///
/// An agent is a grid cell (`pos`) plus an offset of its centre from that
/// cell's centre, in sub-cell units (`cell_units` per cell). The body is an
/// axis-aligned square of half-extent `collision_radius · cell_units`.
///
/// Per tick an agent moving in `dir` spends `speed` units:
///   1. **Recentre** the perpendicular axis first (cornering). Turning at a
///      junction while off-centre costs the distance to the centre line.
///   2. **Advance** along `dir` with what is left.
///      - Cell ahead passable: advance freely. Crossing the half-cell line
///        moves `pos` into the next cell and rebases the offset.
///      - Cell ahead blocked: clamp so the body never overlaps it.
///
/// An agent with no movement order settles back toward its cell centre at
/// `speed` units per tick, so standing still never leaves it poking into a
/// neighbour.
///
/// Passability is `HazardView::is_cell_passable`, so the bomb grace
/// window and "leave the bomb you stand on" apply to movement too.

use super::entity::Agent;
use super::grid::{Dir, Pos};
use super::hazard::HazardView;

/// Body geometry in sub-cell units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Body {
    pub cell_units: i32,
    pub half_extent: i32,
}

impl Body {
    pub fn new(cell_units: i32, collision_radius: f32) -> Self {
        let cell_units = cell_units.max(4);
        let half_extent = (cell_units as f32 * collision_radius).round() as i32;
        Body { cell_units, half_extent: half_extent.clamp(1, cell_units / 2 - 1) }
    }

    fn half(&self) -> i32 {
        self.cell_units / 2
    }

    /// Largest offset toward a blocked neighbour before the body touches it.
    fn clearance(&self) -> i32 {
        self.half() - self.half_extent
    }
}

/// Outcome of one movement tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    /// No progress at all.
    Blocked,
    /// Progress within the current cell.
    Moved,
    /// The centre crossed into a new cell.
    Entered(Pos),
}

/// Move `agent` one tick in `dir`. See module docs.
pub fn advance(view: &HazardView, agent: &mut Agent, dir: Dir, body: &Body) -> Motion {
    if !agent.alive {
        return Motion::Blocked;
    }
    let horizontal = dir.is_horizontal();
    let (dx, dy) = dir.delta();
    let sign = dx + dy;
    let (ox, oy) = agent.offset;
    let (along, mut perp) = if horizontal { (ox, oy) } else { (oy, ox) };
    let mut budget = agent.speed.max(0);
    let mut progressed = false;

    // ── 1. Recentre the perpendicular axis ──
    if perp != 0 {
        let shift = budget.min(perp.abs());
        perp -= perp.signum() * shift;
        budget -= shift;
        progressed = shift > 0;
    }

    // ── 2. Advance along the axis ──
    let ahead = agent.pos.step(dir);
    let mut progress = along * sign;
    let mut entered = None;
    if budget > 0 && perp == 0 {
        if view.is_cell_passable(ahead, agent) {
            progress += budget;
            if progress > body.half() {
                progress -= body.cell_units;
                entered = Some(ahead);
            }
            progressed = true;
        } else if progress < body.clearance() {
            progress = (progress + budget).min(body.clearance());
            progressed = true;
        }
    }

    let along = progress * sign;
    agent.offset = if horizontal { (along, perp) } else { (perp, along) };
    if let Some(cell) = entered {
        agent.pos = cell;
    }
    if !progressed {
        return Motion::Blocked;
    }
    agent.heading = Some(dir);
    match entered {
        Some(cell) => Motion::Entered(cell),
        None => Motion::Moved,
    }
}

/// No movement order this tick: drift back toward the cell centre.
pub fn settle(agent: &mut Agent) {
    let pull = agent.speed.max(0);
    let toward_centre = |o: i32| o - o.signum() * pull.min(o.abs());
    agent.offset = (toward_centre(agent.offset.0), toward_centre(agent.offset.1));
    agent.heading = None;
}

/// Cells the body currently overlaps: its own cell plus, per axis, the
/// neighbour its edge pokes into.
pub fn footprint(agent: &Agent, body: &Body) -> Vec<Pos> {
    let mut cells = vec![agent.pos];
    let (ox, oy) = agent.offset;
    if ox.abs() + body.half_extent > body.half() {
        cells.push(agent.pos.offset(ox.signum(), 0));
    }
    if oy.abs() + body.half_extent > body.half() {
        cells.push(agent.pos.offset(0, oy.signum()));
    }
    cells
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{AgentId, Bomb, Loadout, Pilot};
    use crate::domain::grid::Grid;
    use crate::domain::tile::Cell;

    fn body() -> Body {
        Body::new(48, 0.35)
    }

    fn agent_at(x: i32, y: i32) -> Agent {
        Agent::new(AgentId(0), Pilot::Bot, Pos::new(x, y), Loadout::default())
    }

    #[test]
    fn body_geometry() {
        let b = body();
        assert_eq!(b.half_extent, 17);
        assert_eq!(b.clearance(), 7);
    }

    #[test]
    fn walks_into_next_cell() {
        let g = Grid::bordered(9, 9);
        let view = HazardView::new(&g, &[], &[]);
        let mut a = agent_at(2, 2);
        let mut entered = None;
        for _ in 0..20 {
            if let Motion::Entered(p) = advance(&view, &mut a, Dir::Right, &body()) {
                entered = Some(p);
                break;
            }
        }
        assert_eq!(entered, Some(Pos::new(3, 2)));
        assert_eq!(a.pos, Pos::new(3, 2));
        assert!(a.offset.0 < 0);
        assert_eq!(a.heading, Some(Dir::Right));
    }

    #[test]
    fn wall_clamps_offset() {
        let g = Grid::bordered(9, 9);
        let view = HazardView::new(&g, &[], &[]);
        let mut a = agent_at(1, 1);
        for _ in 0..10 {
            advance(&view, &mut a, Dir::Left, &body());
        }
        assert_eq!(a.pos, Pos::new(1, 1));
        assert_eq!(a.offset, (-7, 0));
        assert_eq!(advance(&view, &mut a, Dir::Left, &body()), Motion::Blocked);
    }

    #[test]
    fn turning_recentres_first() {
        let g = Grid::bordered(9, 9);
        let view = HazardView::new(&g, &[], &[]);
        let mut a = agent_at(3, 3);
        a.offset = (5, 0);
        advance(&view, &mut a, Dir::Down, &body());
        assert_eq!(a.offset, (2, 0));
        advance(&view, &mut a, Dir::Down, &body());
        assert_eq!(a.offset, (0, 1));
        advance(&view, &mut a, Dir::Down, &body());
        assert_eq!(a.offset, (0, 4));
    }

    #[test]
    fn idle_agent_settles_to_the_centre() {
        let mut a = agent_at(3, 3);
        a.speed = 3;
        a.offset = (-23, 2);
        a.heading = Some(Dir::Right);
        settle(&mut a);
        assert_eq!(a.offset, (-20, 0));
        assert_eq!(a.heading, None);
        for _ in 0..10 {
            settle(&mut a);
        }
        assert_eq!(a.offset, (0, 0));
        assert_eq!(footprint(&a, &body()), vec![Pos::new(3, 3)]);
    }

    #[test]
    fn foreign_bomb_blocks() {
        let mut g = Grid::bordered(9, 9);
        g.set(Pos::new(4, 3), Cell::Bomb);
        let bombs = vec![Bomb::new(Pos::new(4, 3), 2, Some(AgentId(7)), 180)];
        let view = HazardView::new(&g, &bombs, &[]);
        let mut a = agent_at(3, 3);
        for _ in 0..10 {
            advance(&view, &mut a, Dir::Right, &body());
        }
        assert_eq!(a.pos, Pos::new(3, 3));
        assert_eq!(a.offset.0, 7);
    }

    #[test]
    fn own_fresh_bomb_is_crossable() {
        let mut g = Grid::bordered(9, 9);
        g.set(Pos::new(4, 3), Cell::Bomb);
        let bombs = vec![Bomb::new(Pos::new(4, 3), 2, Some(AgentId(0)), 180)];
        let view = HazardView::new(&g, &bombs, &[]);
        let mut a = agent_at(3, 3);
        for _ in 0..10 {
            advance(&view, &mut a, Dir::Right, &body());
        }
        assert_eq!(a.pos, Pos::new(4, 3));
    }

    #[test]
    fn footprint_includes_poked_neighbour() {
        let mut a = agent_at(3, 3);
        assert_eq!(footprint(&a, &body()), vec![Pos::new(3, 3)]);
        a.offset = (10, 0);
        assert_eq!(footprint(&a, &body()), vec![Pos::new(3, 3), Pos::new(4, 3)]);
    }
}
