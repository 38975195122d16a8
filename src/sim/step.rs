/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Tick counter, periodic target refresh for bots
///   2. Agents in index order: decide (bot) or read input (human),
///      place bomb, move, collect power-up, accrue survival
///   3. Bomb fuses, detonation and chain reactions
///   4. Explosion decay
///   5. Lethal contact
///   6. Game-over check
///
/// Removal is staged: due bombs and burnt-out explosions are collected
/// first and removed afterwards, never while iterating the live list.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use super::event::GameEvent;
use super::world::WorldState;
use crate::domain::ai::TickContext;
use crate::domain::blast::affected_cells;
use crate::domain::entity::{AgentId, Decision, Explosion, HumanInput};
use crate::domain::grid::Pos;
use crate::domain::hazard::HazardView;
use crate::domain::physics;
use crate::domain::rules;
use crate::domain::tile::Cell;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// Advance one tick. `inputs` carries this tick's human input; agents
/// without an entry stand still.
pub fn step(world: &mut WorldState, inputs: &[HumanInput]) -> Vec<GameEvent> {
    if world.game_over {
        return vec![];
    }
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    refresh_targets(world);
    for idx in 0..world.agents.len() {
        resolve_agent(world, idx, inputs, &mut events);
    }
    resolve_bombs(world, &mut events);
    resolve_explosions(world);
    resolve_lethal_contact(world, &mut events);
    resolve_game_over(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Targets
// ══════════════════════════════════════════════════════════════

/// Every `target_refresh_ticks`, point each bot at a random living human.
fn refresh_targets(world: &mut WorldState) {
    let every = world.config.timing.target_refresh_ticks;
    if every == 0 || world.tick % every != 0 {
        return;
    }
    let humans: Vec<AgentId> = world.agents.iter().filter(|a| a.alive && !a.is_bot()).map(|a| a.id).collect();
    if humans.is_empty() {
        return;
    }
    for agent in world.agents.iter_mut().filter(|a| a.alive && a.is_bot()) {
        agent.target = humans.choose(&mut world.rng).copied();
    }
}

// ══════════════════════════════════════════════════════════════
// Agents
// ══════════════════════════════════════════════════════════════

fn resolve_agent(world: &mut WorldState, idx: usize, inputs: &[HumanInput], events: &mut Vec<GameEvent>) {
    if !world.agents[idx].alive {
        return;
    }
    let tick = world.tick;

    let decision = match world.brains[idx].as_mut() {
        Some(brain) => {
            let ctx = TickContext {
                view: HazardView::new(&world.grid, &world.bombs, &world.explosions),
                agents: &world.agents,
                tick,
            };
            brain.decide(&world.agents[idx], &ctx)
        }
        None => {
            let id = world.agents[idx].id;
            inputs
                .iter()
                .find(|i| i.agent == id)
                .map(|i| Decision { direction: i.movement, place_bomb: i.place_bomb })
                .unwrap_or_default()
        }
    };

    if decision.place_bomb {
        world.place_bomb(idx, events);
    }

    if let Some(dir) = decision.direction {
        let view = HazardView::new(&world.grid, &world.bombs, &world.explosions);
        physics::advance(&view, &mut world.agents[idx], dir, &world.body);
    } else {
        physics::settle(&mut world.agents[idx]);
    }

    world.collect_power_up(idx, events);
    rules::credit_survival(&mut world.agents[idx], tick, world.config.timing.fps);
}

// ══════════════════════════════════════════════════════════════
// Bombs
// ══════════════════════════════════════════════════════════════

fn resolve_bombs(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let grace = world.config.timing.bomb_grace_ticks;
    let mut pending: VecDeque<Pos> = VecDeque::new();
    for bomb in world.bombs.iter_mut() {
        if bomb.tick(grace) {
            pending.push_back(bomb.pos);
        }
    }

    while let Some(pos) = pending.pop_front() {
        // Already gone: chained earlier in this pass.
        let Some(i) = world.bombs.iter().position(|b| b.pos == pos) else { continue };
        let bomb = world.remove_bomb(i);
        let owner = bomb.owner;
        let cells = affected_cells(&world.grid, bomb.pos, bomb.power);
        debug!(?pos, ?owner, cells = cells.len(), "bomb detonated");
        events.push(GameEvent::BombDetonated { owner, pos });

        for cell in cells {
            match world.grid.get(cell) {
                Cell::Block => {
                    world.destroy_block(cell, events);
                    if let Some(agent) = owner.and_then(|id| world.agents.get_mut(id.0)) {
                        rules::credit_block(agent);
                    }
                }
                Cell::Bomb => pending.push_back(cell),
                _ => {}
            }
            ignite(world, cell, owner);
        }
    }
}

/// Flame on `cell`; an existing flame is rekindled to full duration.
fn ignite(world: &mut WorldState, cell: Pos, owner: Option<AgentId>) {
    let duration = world.config.timing.explosion_ticks;
    match world.explosions.iter_mut().find(|e| e.pos == cell) {
        Some(e) => {
            e.remaining = duration;
            e.owner = owner;
        }
        None => world.explosions.push(Explosion::new(cell, duration, owner)),
    }
}

// ══════════════════════════════════════════════════════════════
// Explosions
// ══════════════════════════════════════════════════════════════

fn resolve_explosions(world: &mut WorldState) {
    for e in world.explosions.iter_mut() {
        e.remaining = e.remaining.saturating_sub(1);
    }
    world.explosions.retain(|e| !e.is_finished());
}

// ══════════════════════════════════════════════════════════════
// Lethal contact
// ══════════════════════════════════════════════════════════════

fn resolve_lethal_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let mut killed: Vec<(usize, Option<AgentId>)> = Vec::new();
    for (idx, agent) in world.agents.iter().enumerate() {
        if !agent.alive {
            continue;
        }
        let body = physics::footprint(agent, &world.body);
        if let Some(flame) = world.explosions.iter().find(|e| body.contains(&e.pos)) {
            killed.push((idx, flame.owner));
        }
    }

    for (idx, by) in killed {
        let victim = world.agents[idx].id;
        let pos = world.agents[idx].pos;
        world.agents[idx].alive = false;
        world.agents[idx].heading = None;
        if let Some(killer) = by.filter(|k| *k != victim).and_then(|k| world.agents.get_mut(k.0)) {
            rules::credit_kill(killer);
        }
        info!(agent = victim.0, ?by, ?pos, tick = world.tick, "agent killed");
        events.push(GameEvent::AgentKilled { agent: victim, by, pos });
    }
}

// ══════════════════════════════════════════════════════════════
// Game over
// ══════════════════════════════════════════════════════════════

fn resolve_game_over(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let alive: Vec<AgentId> = world.agents.iter().filter(|a| a.alive).map(|a| a.id).collect();
    let humans_out = world.had_humans && !world.agents.iter().any(|a| a.alive && !a.is_bot());
    let last_standing = world.agents.len() > 1 && alive.len() <= 1;
    let timed_out = world.tick >= world.config.timing.max_ticks;
    if !(humans_out || last_standing || timed_out) {
        return;
    }

    world.game_over = true;
    world.winner = match alive.as_slice() {
        [only] => Some(*only),
        _ => None,
    };
    info!(tick = world.tick, winner = ?world.winner, "game over");
    events.push(GameEvent::GameOver { winner: world.winner });
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::Bomb;
    use crate::domain::grid::{Dir, Grid};
    use crate::domain::tile::PowerUp;
    use crate::sim::level::parse_layout;

    /// Human-only match: nothing moves unless told to.
    fn world(grid: Grid, humans: usize) -> WorldState {
        let mut cfg = GameConfig::default();
        cfg.roster.humans = humans;
        cfg.roster.bots = 0;
        cfg.arena.power_up_chance = 0.0;
        WorldState::from_grid(&cfg, grid, 3)
    }

    fn arm(w: &mut WorldState, pos: Pos, power: i32, owner: Option<AgentId>, fuse: u32) {
        w.bombs.push(Bomb::new(pos, power, owner, fuse));
        w.grid.set(pos, Cell::Bomb);
        if let Some(agent) = owner.and_then(|id| w.agents.get_mut(id.0)) {
            agent.active_bombs += 1;
        }
    }

    #[test]
    fn placed_bomb_detonates_after_its_fuse() {
        let grid = parse_layout(&[
            "#########",
            "#...+...#",
            "#.#.#.#.#",
            "#.......#",
            "#.#.#.#.#",
            "#.......#",
            "#.#.#.#.#",
            "#.......#",
            "#########",
        ])
        .unwrap();
        let mut w = world(grid, 2);
        let me = AgentId(0);
        let fuse = w.config.timing.bomb_fuse_ticks;
        let place = HumanInput { agent: me, movement: None, place_bomb: true };
        let events = step(&mut w, &[place]);
        assert_eq!(events, vec![GameEvent::BombPlaced { owner: me, pos: Pos::new(1, 1) }]);

        // Walk away down the left column, out of the blast.
        let down = HumanInput { agent: me, movement: Some(Dir::Down), place_bomb: false };
        let mut all = Vec::new();
        for _ in 1..fuse {
            all.extend(step(&mut w, &[down]));
        }
        assert!(all.contains(&GameEvent::BombDetonated { owner: Some(me), pos: Pos::new(1, 1) }));
        assert!(w.bombs.is_empty());
        assert_eq!(w.agents[0].active_bombs, 0);
        assert!(w.agents[0].alive);
        assert_eq!(w.grid.get(Pos::new(1, 1)), Cell::Empty);
        assert!(w.explosions.iter().any(|e| e.pos == Pos::new(3, 1)));
    }

    #[test]
    fn blast_destroys_block_and_credits_owner() {
        let grid = parse_layout(&["#######", "#.....#", "#..+..#", "#.....#", "#######"]).unwrap();
        let mut w = world(grid, 2);
        w.agents[0].pos = Pos::new(1, 3);
        w.agents[1].pos = Pos::new(5, 1);
        arm(&mut w, Pos::new(3, 1), 2, Some(AgentId(0)), 1);
        let events = step(&mut w, &[]);
        assert!(events.contains(&GameEvent::BlockDestroyed { pos: Pos::new(3, 2) }));
        assert_eq!(w.grid.get(Pos::new(3, 2)), Cell::Empty);
        assert_eq!(w.agents[0].stats.blocks_destroyed, 1);
        assert_eq!(w.agents[0].stats.score, rules::BLOCK_POINTS + rules::KILL_POINTS);
        // The agent on the blast line dies, and the owner gets the kill.
        assert!(!w.agents[1].alive);
        assert_eq!(w.agents[0].stats.kills, 1);
    }

    #[test]
    fn chain_reaction_in_one_pass() {
        let mut w = world(Grid::bordered(11, 7), 2);
        w.agents[0].pos = Pos::new(1, 5);
        w.agents[1].pos = Pos::new(9, 5);
        arm(&mut w, Pos::new(2, 1), 2, None, 1);
        arm(&mut w, Pos::new(4, 1), 2, None, 500);
        arm(&mut w, Pos::new(6, 1), 2, None, 500);
        let events = step(&mut w, &[]);
        let detonations = events.iter().filter(|e| matches!(e, GameEvent::BombDetonated { .. })).count();
        assert_eq!(detonations, 3);
        assert!(w.bombs.is_empty());
        assert!(w.explosions.iter().any(|e| e.pos == Pos::new(8, 1)));
    }

    #[test]
    fn explosions_burn_out() {
        let mut w = world(Grid::bordered(9, 9), 2);
        w.agents[0].pos = Pos::new(1, 7);
        w.agents[1].pos = Pos::new(7, 7);
        w.explosions.push(Explosion::new(Pos::new(4, 4), 2, None));
        step(&mut w, &[]);
        assert_eq!(w.explosions.len(), 1);
        step(&mut w, &[]);
        assert!(w.explosions.is_empty());
    }

    #[test]
    fn self_kill_scores_nothing() {
        let mut w = world(Grid::bordered(9, 9), 2);
        w.agents[1].pos = Pos::new(7, 7);
        arm(&mut w, Pos::new(1, 1), 2, Some(AgentId(0)), 1);
        let events = step(&mut w, &[]);
        assert!(!w.agents[0].alive);
        assert_eq!(w.agents[0].stats.kills, 0);
        assert!(events.contains(&GameEvent::AgentKilled { agent: AgentId(0), by: Some(AgentId(0)), pos: Pos::new(1, 1) }));
        // Humans took part and one still lives: last standing ends it.
        assert!(w.game_over);
        assert_eq!(w.winner, Some(AgentId(1)));
        assert_eq!(events.last(), Some(&GameEvent::GameOver { winner: Some(AgentId(1)) }));
    }

    #[test]
    fn power_up_picked_up_on_arrival() {
        let grid = parse_layout(&["#####", "#.s.#", "#...#", "#...#", "#####"]).unwrap();
        let mut w = world(grid, 2);
        w.agents[1].pos = Pos::new(3, 3);
        let right = HumanInput { agent: AgentId(0), movement: Some(Dir::Right), place_bomb: false };
        let mut events = Vec::new();
        for _ in 0..40 {
            events.extend(step(&mut w, &[right]));
            if w.agents[0].pos == Pos::new(2, 1) {
                break;
            }
        }
        assert_eq!(w.agents[0].speed, w.config.agent.speed + 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::PowerUpCollected { kind: PowerUp::Speed, .. })));
    }

    #[test]
    fn match_ends_at_max_ticks() {
        let mut w = world(Grid::bordered(9, 9), 2);
        w.config.timing.max_ticks = 3;
        for _ in 0..3 {
            step(&mut w, &[]);
        }
        assert!(w.game_over);
        assert_eq!(w.winner, None);
        assert!(step(&mut w, &[]).is_empty());
    }

    #[test]
    fn bots_are_pointed_at_living_humans() {
        let mut cfg = GameConfig::default();
        cfg.roster.humans = 1;
        cfg.roster.bots = 2;
        cfg.timing.target_refresh_ticks = 1;
        let mut w = WorldState::from_grid(&cfg, Grid::bordered(15, 13), 8);
        w.tick = 1;
        refresh_targets(&mut w);
        assert_eq!(w.agents[0].target, None);
        assert_eq!(w.agents[1].target, Some(AgentId(0)));
        assert_eq!(w.agents[2].target, Some(AgentId(0)));

        w.agents[0].alive = false;
        w.agents[1].target = None;
        refresh_targets(&mut w);
        assert_eq!(w.agents[1].target, None);
    }
}
