/// Events emitted during a simulation step.
/// Consumers (match log, replay checks, a future front end) read these
/// instead of diffing world state.

use crate::domain::entity::AgentId;
use crate::domain::grid::Pos;
use crate::domain::tile::PowerUp;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    BombPlaced { owner: AgentId, pos: Pos },
    BombDetonated { owner: Option<AgentId>, pos: Pos },
    BlockDestroyed { pos: Pos },
    PowerUpSpawned { pos: Pos, kind: PowerUp },
    PowerUpCollected { agent: AgentId, pos: Pos, kind: PowerUp },
    AgentKilled { agent: AgentId, by: Option<AgentId>, pos: Pos },
    GameOver { winner: Option<AgentId> },
}
