/// Game-loop layer: authoritative state, the fixed tick, events, arenas.

pub mod event;
pub mod level;
pub mod step;
pub mod world;
