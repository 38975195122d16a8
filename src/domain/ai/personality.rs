/// Personality presets: a fixed bundle of weights injected at creation.
///
/// ┌───────────┬──────┬─────────┬──────┬───────────┬──────┬──────┬──────────┐
/// │ Kind       │ hunt │ collect │ trap │ preferred  │ aggr │ risk │ paths    │
/// ├───────────┼──────┼─────────┼──────┼───────────┼──────┼──────┼──────────┤
/// │ Hunter     │ 0.6  │ 0.2     │ 0.2  │ flame      │ 0.9  │ 0.40 │ direct   │
/// │ Collector  │ 0.3  │ 0.6     │ 0.1  │ bomb       │ 0.6  │ 0.20 │ safe     │
/// │ Trapper    │ 0.2  │ 0.2     │ 0.6  │ speed      │ 0.8  │ 0.30 │ tricky   │
/// │ Survivor   │ 0.4  │ 0.4     │ 0.2  │ random     │ 0.7  │ 0.25 │ balanced │
/// └───────────┴──────┴─────────┴──────┴───────────┴──────┴──────┴──────────┘

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use super::arbiter::Mode;
use crate::domain::tile::PowerUp;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityKind {
    Hunter,
    Collector,
    Trapper,
    Survivor,
}

impl PersonalityKind {
    pub const ALL: [PersonalityKind; 4] = [
        PersonalityKind::Hunter,
        PersonalityKind::Collector,
        PersonalityKind::Trapper,
        PersonalityKind::Survivor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PersonalityKind::Hunter => "hunter",
            PersonalityKind::Collector => "collector",
            PersonalityKind::Trapper => "trapper",
            PersonalityKind::Survivor => "survivor",
        }
    }
}

/// How a personality routes toward its goals.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PathStyle {
    /// Shortest route, danger ignored.
    Direct,
    /// Always danger-weighted.
    Safe,
    /// Sometimes detours through a random waypoint.
    Tricky,
    /// Danger-weighted most of the time.
    Balanced,
}

/// Strategy-mode preference. Escape has no weight: it is forced by danger.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ModeWeights {
    pub hunt: f32,
    pub collect: f32,
    pub trap: f32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Personality {
    pub kind: PersonalityKind,
    pub weights: ModeWeights,
    pub preferred: PowerUp,
    pub aggression: f32,
    pub risk_tolerance: f32,
    pub path_style: PathStyle,
}

impl Personality {
    /// Build a preset. Survivors draw their preferred power-up from `rng`.
    pub fn preset<R: Rng>(kind: PersonalityKind, rng: &mut R) -> Self {
        let (weights, preferred, aggression, risk_tolerance, path_style) = match kind {
            PersonalityKind::Hunter => ((0.6, 0.2, 0.2), PowerUp::Flame, 0.9, 0.4, PathStyle::Direct),
            PersonalityKind::Collector => ((0.3, 0.6, 0.1), PowerUp::Bomb, 0.6, 0.2, PathStyle::Safe),
            PersonalityKind::Trapper => ((0.2, 0.2, 0.6), PowerUp::Speed, 0.8, 0.3, PathStyle::Tricky),
            PersonalityKind::Survivor => {
                let preferred = *PowerUp::ALL.choose(rng).unwrap_or(&PowerUp::Bomb);
                ((0.4, 0.4, 0.2), preferred, 0.7, 0.25, PathStyle::Balanced)
            }
        };
        let (hunt, collect, trap) = weights;
        Personality {
            kind,
            weights: ModeWeights { hunt, collect, trap },
            preferred,
            aggression,
            risk_tolerance,
            path_style,
        }
    }

    /// Uniformly random preset.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let kind = *PersonalityKind::ALL.choose(rng).unwrap_or(&PersonalityKind::Survivor);
        Personality::preset(kind, rng)
    }

    /// Opening mode, drawn from the hunt/collect/trap weights.
    pub fn initial_mode<R: Rng>(&self, rng: &mut R) -> Mode {
        let modes = [Mode::Hunt, Mode::Collect, Mode::Trap];
        let w = self.weights;
        match WeightedIndex::new([w.hunt, w.collect, w.trap]) {
            Ok(dist) => modes[dist.sample(rng)],
            Err(_) => Mode::Hunt,
        }
    }

    /// Ticks a trap bomb blocks the next trap attempt.
    pub fn trap_cooldown(&self) -> u32 {
        (20 - (self.aggression * 10.0) as i32).max(10) as u32
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn presets_match_table() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let h = Personality::preset(PersonalityKind::Hunter, &mut rng);
        assert_eq!(h.preferred, PowerUp::Flame);
        assert_eq!(h.path_style, PathStyle::Direct);
        assert_eq!(h.weights.hunt, 0.6);
        let c = Personality::preset(PersonalityKind::Collector, &mut rng);
        assert_eq!(c.risk_tolerance, 0.2);
        assert_eq!(c.path_style, PathStyle::Safe);
    }

    #[test]
    fn trap_cooldown_shrinks_with_aggression() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let hunter = Personality::preset(PersonalityKind::Hunter, &mut rng);
        let collector = Personality::preset(PersonalityKind::Collector, &mut rng);
        assert_eq!(hunter.trap_cooldown(), 11);
        assert_eq!(collector.trap_cooldown(), 14);
    }

    #[test]
    fn initial_mode_never_escape() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let p = Personality::random(&mut rng);
            assert_ne!(p.initial_mode(&mut rng), Mode::Escape);
        }
    }

    #[test]
    fn personality_names_deserialize() {
        #[derive(Deserialize)]
        struct Roster {
            kinds: Vec<PersonalityKind>,
        }
        let r: Roster = toml::from_str(r#"kinds = ["hunter", "survivor"]"#).unwrap();
        assert_eq!(r.kinds, vec![PersonalityKind::Hunter, PersonalityKind::Survivor]);
    }
}
