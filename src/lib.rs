/// Grid arena bomber with autonomous agents.
///
/// `domain` holds the rules and the bot decision core, `sim` drives a
/// match tick by tick. The binary in `main.rs` runs headless bot matches.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
