/// Entry point: headless bot matches.
///
/// Usage: `bomberman [--config PATH] [--seed N] [--matches N] [--render]`
///
/// Humans listed in the roster stand still (there is no input layer).
/// Diagnostics go to stderr through `tracing` (`RUST_LOG`, default
/// `info`); the match summary goes to stdout.

use std::error::Error;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bomberman::config::GameConfig;
use bomberman::sim::event::GameEvent;
use bomberman::sim::level::render_layout;
use bomberman::sim::step;
use bomberman::sim::world::WorldState;

/// Headless bot matches on a generated arena.
#[derive(Debug, Parser)]
#[command(name = "bomberman", version, about, long_about = None)]
struct Args {
    /// Config file (defaults to config.toml next to the binary or in the CWD)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Match seed (defaults to the config seed, then the clock)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of matches; match N uses seed + N
    #[arg(short, long, default_value_t = 1)]
    matches: u32,

    /// Print the arena before and after each match
    #[arg(short, long)]
    render: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => GameConfig::from_file(path)?,
        None => GameConfig::load(),
    };

    let base_seed = args.seed.or(config.arena.seed).unwrap_or_else(clock_seed);
    for round in 0..args.matches {
        let seed = base_seed.wrapping_add(u64::from(round));
        run_match(&config, seed, args.render)?;
    }
    Ok(())
}

fn run_match(config: &GameConfig, seed: u64, render: bool) -> Result<(), Box<dyn Error>> {
    let mut world = WorldState::new_match(config, seed)?;
    info!(seed, agents = world.agents.len(), "match start");
    if render {
        print!("{}", render_layout(&world.grid));
    }

    let mut blocks = 0usize;
    let mut kills = 0usize;
    while !world.game_over {
        for event in step::step(&mut world, &[]) {
            match event {
                GameEvent::BlockDestroyed { .. } => blocks += 1,
                GameEvent::AgentKilled { .. } => kills += 1,
                _ => {}
            }
        }
    }

    println!();
    println!("Match seed {seed}: {} ticks, {blocks} blocks, {kills} deaths", world.tick);
    match world.winner {
        Some(id) => println!("Winner: agent {}", id.0),
        None => println!("No winner"),
    }
    for (agent, brain) in world.agents.iter().zip(&world.brains) {
        let who = match brain {
            Some(b) => b.personality().kind.name(),
            None => "human",
        };
        let s = &agent.stats;
        println!(
            "  agent {} ({who:<9}) {:>6} pts  blocks {:>3}  power-ups {:>2}  kills {}  {}",
            agent.id.0,
            s.score,
            s.blocks_destroyed,
            s.powerups_collected,
            s.kills,
            if agent.alive { "alive" } else { "dead" },
        );
    }
    if render {
        print!("{}", render_layout(&world.grid));
    }
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
