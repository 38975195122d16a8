/// WorldState: the complete snapshot of a running match.
///
/// ## Ownership
///
/// The world owns everything mutable: the grid, bombs, explosions, agents,
/// one `AiBrain` per bot, and the match RNG. Brains only ever see a
/// read-only `TickContext`; every change goes through the hooks below.
///
/// ## Grid mirror
///
/// A live bomb is both an entry in `bombs` and a `Cell::Bomb` on the grid.
/// `place_bomb` and `remove_bomb` keep the two in step; nothing else
/// writes `Cell::Bomb`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::event::GameEvent;
use super::level;
use crate::config::GameConfig;
use crate::domain::ai::personality::Personality;
use crate::domain::ai::AiBrain;
use crate::domain::entity::{Agent, AgentId, Bomb, Explosion, Loadout, Pilot};
use crate::domain::grid::{Grid, Pos};
use crate::domain::physics::Body;
use crate::domain::rules;
use crate::domain::tile::{Cell, PowerUp};
use crate::error::LevelError;

pub struct WorldState {
    // ── Arena ──
    pub grid: Grid,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<Explosion>,

    // ── Agents ──
    /// Index = `AgentId.0`. Humans first, then bots.
    pub agents: Vec<Agent>,
    /// `brains[i]` drives `agents[i]`; None for humans.
    pub brains: Vec<Option<AiBrain>>,

    // ── Match ──
    pub config: GameConfig,
    pub body: Body,
    pub seed: u64,
    pub rng: ChaCha8Rng,
    pub tick: u64,
    pub game_over: bool,
    pub winner: Option<AgentId>,
    /// Humans took part in this match (changes the game-over rule).
    pub had_humans: bool,
}

// ── Construction ──

impl WorldState {
    /// Fresh match on a generated arena.
    pub fn new_match(config: &GameConfig, seed: u64) -> Result<Self, LevelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = level::generate_arena(config.arena.width, config.arena.height, config.arena.block_density, &mut rng)?;
        Ok(Self::with_grid(config, grid, seed, rng))
    }

    /// Fresh match on a given arena (custom layouts, tests).
    pub fn from_grid(config: &GameConfig, grid: Grid, seed: u64) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::with_grid(config, grid, seed, rng)
    }

    fn with_grid(config: &GameConfig, grid: Grid, seed: u64, mut rng: ChaCha8Rng) -> Self {
        let loadout = Loadout {
            speed: config.agent.speed,
            max_bombs: config.agent.max_bombs,
            power: config.agent.power,
        };
        let spawns = level::spawn_points(&grid);
        let roster = &config.roster;

        let mut agents = Vec::new();
        let mut brains = Vec::new();
        for (i, spawn) in spawns.iter().enumerate().take(roster.humans + roster.bots) {
            let id = AgentId(i);
            if i < roster.humans {
                agents.push(Agent::new(id, Pilot::Human, *spawn, loadout));
                brains.push(None);
                continue;
            }
            let personality = match roster.personalities.get(i - roster.humans) {
                Some(kind) => Personality::preset(*kind, &mut rng),
                None => Personality::random(&mut rng),
            };
            let brain_seed = brain_seed(seed, i);
            info!(agent = i, personality = personality.kind.name(), "bot joins");
            agents.push(Agent::new(id, Pilot::Bot, *spawn, loadout));
            brains.push(Some(AiBrain::new(id, personality, config.ai.clone(), brain_seed)));
        }

        WorldState {
            grid,
            bombs: Vec::new(),
            explosions: Vec::new(),
            had_humans: roster.humans > 0,
            agents,
            brains,
            config: config.clone(),
            body: Body::new(config.timing.cell_units, config.agent.collision_radius),
            seed,
            rng,
            tick: 0,
            game_over: false,
            winner: None,
        }
    }
}

/// Per-bot RNG seed: the match seed mixed with the agent index.
pub fn brain_seed(match_seed: u64, index: usize) -> u64 {
    match_seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

// ── Queries ──

impl WorldState {
    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0)
    }
}

// ── Mutation hooks ──

impl WorldState {
    /// Put a bomb under agent `idx` if the rules allow it.
    pub fn place_bomb(&mut self, idx: usize, events: &mut Vec<GameEvent>) -> bool {
        let Some(agent) = self.agents.get(idx) else { return false };
        if !rules::can_place_bomb(&self.grid, &self.bombs, agent) {
            return false;
        }
        let pos = agent.pos;
        let bomb = Bomb::new(pos, agent.power, Some(agent.id), self.config.timing.bomb_fuse_ticks);
        self.bombs.push(bomb);
        self.grid.set(pos, Cell::Bomb);
        self.agents[idx].active_bombs += 1;
        debug!(agent = idx, ?pos, "bomb placed");
        events.push(GameEvent::BombPlaced { owner: AgentId(idx), pos });
        true
    }

    /// Take the bomb at `i` off the board and return it to its owner.
    pub fn remove_bomb(&mut self, i: usize) -> Bomb {
        let bomb = self.bombs.remove(i);
        if self.grid.get(bomb.pos) == Cell::Bomb {
            self.grid.set(bomb.pos, Cell::Empty);
        }
        if let Some(owner) = bomb.owner.and_then(|id| self.agents.get_mut(id.0)) {
            owner.active_bombs = owner.active_bombs.saturating_sub(1);
        }
        bomb
    }

    /// Pick up whatever power-up lies under agent `idx`.
    pub fn collect_power_up(&mut self, idx: usize, events: &mut Vec<GameEvent>) {
        let Some(agent) = self.agents.get_mut(idx) else { return };
        if !agent.alive {
            return;
        }
        let pos = agent.pos;
        if let Some(kind) = self.grid.get(pos).power_up() {
            rules::apply_power_up(agent, kind);
            self.grid.set(pos, Cell::Empty);
            debug!(agent = idx, ?kind, ?pos, "power-up collected");
            events.push(GameEvent::PowerUpCollected { agent: AgentId(idx), pos, kind });
        }
    }

    /// Destroyed block: empty, or a random power-up with `power_up_chance`.
    pub fn destroy_block(&mut self, pos: Pos, events: &mut Vec<GameEvent>) {
        self.grid.set(pos, Cell::Empty);
        events.push(GameEvent::BlockDestroyed { pos });
        if self.rng.gen_bool(self.config.arena.power_up_chance.clamp(0.0, 1.0)) {
            let kind = PowerUp::ALL[self.rng.gen_range(0..PowerUp::ALL.len())];
            self.grid.set(pos, Cell::PowerUp(kind));
            events.push(GameEvent::PowerUpSpawned { pos, kind });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ai::personality::PersonalityKind;

    fn config(humans: usize, bots: usize) -> GameConfig {
        let mut cfg = GameConfig::default();
        cfg.roster.humans = humans;
        cfg.roster.bots = bots;
        cfg
    }

    #[test]
    fn roster_fills_corners_humans_first() {
        let mut cfg = config(1, 2);
        cfg.roster.personalities = vec![PersonalityKind::Trapper];
        let w = WorldState::new_match(&cfg, 5).unwrap();
        assert_eq!(w.agents.len(), 3);
        assert!(!w.agents[0].is_bot());
        assert!(w.brains[0].is_none());
        assert_eq!(w.brains[1].as_ref().map(|b| b.personality().kind), Some(PersonalityKind::Trapper));
        assert!(w.brains[2].is_some());
        let spawns = level::spawn_points(&w.grid);
        for (a, s) in w.agents.iter().zip(spawns) {
            assert_eq!(a.pos, s);
        }
        assert!(w.had_humans);
    }

    #[test]
    fn bomb_mirror_stays_in_step() {
        let cfg = config(0, 1);
        let mut w = WorldState::from_grid(&cfg, Grid::bordered(9, 9), 1);
        let mut events = Vec::new();
        assert!(w.place_bomb(0, &mut events));
        assert_eq!(w.grid.get(Pos::new(1, 1)), Cell::Bomb);
        assert_eq!(w.agents[0].active_bombs, 1);
        // Budget of one: the second placement is refused.
        assert!(!w.place_bomb(0, &mut events));
        assert_eq!(events.len(), 1);

        let bomb = w.remove_bomb(0);
        assert_eq!(bomb.pos, Pos::new(1, 1));
        assert_eq!(w.grid.get(Pos::new(1, 1)), Cell::Empty);
        assert_eq!(w.agents[0].active_bombs, 0);
    }

    #[test]
    fn power_up_pickup_applies_and_clears() {
        let cfg = config(0, 1);
        let mut grid = Grid::bordered(9, 9);
        grid.set(Pos::new(1, 1), Cell::PowerUp(PowerUp::Flame));
        let mut w = WorldState::from_grid(&cfg, grid, 1);
        let mut events = Vec::new();
        w.collect_power_up(0, &mut events);
        assert_eq!(w.agents[0].power, cfg.agent.power + 1);
        assert_eq!(w.agents[0].stats.score, rules::POWER_UP_POINTS);
        assert_eq!(w.grid.get(Pos::new(1, 1)), Cell::Empty);
        assert!(matches!(events[0], GameEvent::PowerUpCollected { kind: PowerUp::Flame, .. }));
    }

    #[test]
    fn brain_seeds_differ_per_agent() {
        assert_ne!(brain_seed(9, 0), brain_seed(9, 1));
        assert_eq!(brain_seed(9, 2), brain_seed(9, 2));
    }
}
