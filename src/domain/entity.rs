/// Entities: Agent (human or bot), Bomb, Explosion.
/// Plus the per-tick action types exchanged with the game loop.

use super::grid::{Dir, Grid, Pos};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct AgentId(pub usize);

/// Who drives an agent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pilot {
    Human,
    Bot,
}

/// Score and statistics accumulated over a match.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Stats {
    pub score: u32,
    pub blocks_destroyed: u32,
    pub powerups_collected: u32,
    pub survival_ticks: u32,
    pub kills: u32,
}

/// Starting loadout for a freshly spawned agent.
#[derive(Clone, Copy, Debug)]
pub struct Loadout {
    pub speed: i32,
    pub max_bombs: u32,
    pub power: i32,
}

impl Default for Loadout {
    fn default() -> Self {
        Loadout { speed: 3, max_bombs: 1, power: 2 }
    }
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub pilot: Pilot,
    /// Grid cell the agent's centre is in.
    pub pos: Pos,
    /// Sub-cell offset of the centre from the cell centre, in cell units.
    pub offset: (i32, i32),
    /// Last direction actually moved in; None while standing.
    pub heading: Option<Dir>,
    pub speed: i32,
    pub max_bombs: u32,
    pub power: i32,
    pub active_bombs: u32,
    pub alive: bool,
    /// Explicitly assigned target (bots only), refreshed by the game loop.
    pub target: Option<AgentId>,
    pub stats: Stats,
}

impl Agent {
    pub fn new(id: AgentId, pilot: Pilot, pos: Pos, loadout: Loadout) -> Self {
        Agent {
            id,
            pilot,
            pos,
            offset: (0, 0),
            heading: None,
            speed: loadout.speed,
            max_bombs: loadout.max_bombs,
            power: loadout.power,
            active_bombs: 0,
            alive: true,
            target: None,
            stats: Stats::default(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.pilot == Pilot::Bot
    }

    /// Bomb budget not yet exhausted.
    pub fn has_bomb_available(&self) -> bool {
        self.active_bombs < self.max_bombs
    }
}

#[derive(Clone, Debug)]
pub struct Bomb {
    pub pos: Pos,
    pub power: i32,
    pub owner: Option<AgentId>,
    /// Ticks until detonation.
    pub timer: u32,
    fuse: u32,
    /// Grace window: the owner may still stand on / cross this cell.
    pub just_placed: bool,
}

impl Bomb {
    pub fn new(pos: Pos, power: i32, owner: Option<AgentId>, fuse: u32) -> Self {
        Bomb { pos, power, owner, timer: fuse, fuse, just_placed: true }
    }

    /// Advance the fuse one tick. Returns true when the bomb is due.
    pub fn tick(&mut self, grace: u32) -> bool {
        self.timer = self.timer.saturating_sub(1);
        if self.timer < self.fuse.saturating_sub(grace) {
            self.just_placed = false;
        }
        self.timer == 0
    }

    /// Would this bomb's blast reach `pos`?
    /// Same row or column, within `power`, no wall/block strictly between.
    pub fn threatens(&self, grid: &Grid, pos: Pos) -> bool {
        if !self.pos.is_aligned(pos) {
            return false;
        }
        if self.pos.manhattan(pos) > self.power {
            return false;
        }
        grid.line_of_sight(self.pos, pos)
    }
}

#[derive(Clone, Debug)]
pub struct Explosion {
    pub pos: Pos,
    /// Ticks until the flame burns out.
    pub remaining: u32,
    /// Owner of the bomb that produced this flame.
    pub owner: Option<AgentId>,
}

impl Explosion {
    pub fn new(pos: Pos, duration: u32, owner: Option<AgentId>) -> Self {
        Explosion { pos, remaining: duration, owner }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

/// What an agent wants to do this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Decision {
    pub direction: Option<Dir>,
    pub place_bomb: bool,
}

impl Decision {
    pub fn idle() -> Self {
        Decision::default()
    }
}

/// Frame input for a human-driven agent, supplied by the excluded input layer.
#[derive(Clone, Copy, Debug)]
pub struct HumanInput {
    pub agent: AgentId,
    pub movement: Option<Dir>,
    pub place_bomb: bool,
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Cell;

    #[test]
    fn grace_window_expires() {
        let mut b = Bomb::new(Pos::new(1, 1), 2, Some(AgentId(0)), 180);
        for _ in 0..10 {
            assert!(!b.tick(10));
        }
        assert!(b.just_placed);
        b.tick(10);
        assert!(!b.just_placed);
    }

    #[test]
    fn bomb_is_due_when_timer_hits_zero() {
        let mut b = Bomb::new(Pos::new(1, 1), 2, None, 3);
        assert!(!b.tick(1));
        assert!(!b.tick(1));
        assert!(b.tick(1));
    }

    #[test]
    fn threat_respects_power() {
        let grid = Grid::bordered(21, 17);
        let target = Pos::new(8, 5);
        let weak = Bomb::new(Pos::new(5, 5), 2, None, 180);
        let strong = Bomb::new(Pos::new(5, 5), 3, None, 180);
        assert!(!weak.threatens(&grid, target));
        assert!(strong.threatens(&grid, target));
    }

    #[test]
    fn threat_blocked_by_block() {
        let mut grid = Grid::bordered(9, 3);
        grid.set(Pos::new(3, 1), Cell::Block);
        let b = Bomb::new(Pos::new(1, 1), 5, None, 180);
        assert!(b.threatens(&grid, Pos::new(3, 1)));
        assert!(!b.threatens(&grid, Pos::new(4, 1)));
    }
}
