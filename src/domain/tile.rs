/// Cell states and their properties.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

use serde::Deserialize;

/// Power-up kinds dropped by destroyed blocks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUp {
    Bomb,  // +1 simultaneous bomb
    Flame, // +1 blast radius
    Speed, // +1 movement speed
}

impl PowerUp {
    pub const ALL: [PowerUp; 3] = [PowerUp::Bomb, PowerUp::Flame, PowerUp::Speed];
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cell {
    Empty,
    Wall,  // Indestructible, stops blasts
    Block, // Destructible, stops blasts after being destroyed
    Bomb,  // Transient, mirrors a live bomb
    PowerUp(PowerUp),
}

impl Cell {
    /// Wall or block: nothing walks through it and blasts stop at it.
    pub fn is_obstacle(self) -> bool {
        matches!(self, Cell::Wall | Cell::Block)
    }

    /// Can a blast ray continue past this cell?
    pub fn stops_blast(self) -> bool {
        self.is_obstacle()
    }

    /// Is this cell destroyed (and included) by a blast that reaches it?
    pub fn is_destructible(self) -> bool {
        matches!(self, Cell::Block)
    }

    /// Walkable terrain with nothing on it worth avoiding.
    /// Power-ups count as open: stepping on them collects them.
    pub fn is_open(self) -> bool {
        matches!(self, Cell::Empty | Cell::PowerUp(_))
    }

    pub fn power_up(self) -> Option<PowerUp> {
        match self {
            Cell::PowerUp(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_bomb(self) -> bool {
        matches!(self, Cell::Bomb)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Empty
    }
}
