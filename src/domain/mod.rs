/// Pure game rules and the bot decision core. Nothing in here owns the
/// world; it reads snapshots and answers with values.

pub mod ai;
pub mod blast;
pub mod entity;
pub mod grid;
pub mod hazard;
pub mod physics;
pub mod rules;
pub mod tile;
