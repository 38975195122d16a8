/// Short-term memory of one bot: where it has been, what it has seen,
/// and where it last stood safely.

use std::collections::{HashMap, VecDeque};

use crate::domain::grid::{Grid, Pos};
use crate::domain::tile::Cell;

/// Confirmed-safe cells kept for escape planning.
const SAFE_HISTORY_CAP: usize = 20;

#[derive(Clone, Debug)]
pub struct Memory {
    recent: VecDeque<Pos>,
    window: usize,
    seen: HashMap<Pos, Cell>,
    known_power_ups: Vec<Pos>,
    safe_history: VecDeque<Pos>,
    pub last_safe: Option<Pos>,
}

impl Memory {
    pub fn new(window: usize) -> Self {
        Memory {
            recent: VecDeque::with_capacity(window + 1),
            window: window.max(1),
            seen: HashMap::new(),
            known_power_ups: Vec::new(),
            safe_history: VecDeque::with_capacity(SAFE_HISTORY_CAP + 1),
            last_safe: None,
        }
    }

    // ── Position history ──

    pub fn record_position(&mut self, pos: Pos) {
        self.recent.push_back(pos);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }

    /// Full window and at most two distinct cells in it.
    pub fn is_stuck(&self) -> bool {
        if self.recent.len() < self.window {
            return false;
        }
        let mut distinct: Vec<Pos> = Vec::with_capacity(3);
        for p in &self.recent {
            if !distinct.contains(p) {
                distinct.push(*p);
                if distinct.len() > 2 {
                    return false;
                }
            }
        }
        true
    }

    // ── Map knowledge ──

    /// Record every cell of the square window around `center` and keep the
    /// power-up list in step with the grid.
    pub fn observe(&mut self, grid: &Grid, center: Pos, radius: i32) {
        for p in grid.window(center, radius) {
            let cell = grid.get(p);
            self.seen.insert(p, cell);
            if cell.power_up().is_some() && !self.known_power_ups.contains(&p) {
                self.known_power_ups.push(p);
            }
        }
        self.known_power_ups.retain(|p| grid.get(*p).power_up().is_some());
    }

    pub fn has_seen(&self, pos: Pos) -> bool {
        self.seen.contains_key(&pos)
    }

    pub fn known_power_ups(&self) -> &[Pos] {
        &self.known_power_ups
    }

    pub fn forget_power_up(&mut self, pos: Pos) {
        self.known_power_ups.retain(|p| *p != pos);
    }

    // ── Safety ──

    pub fn note_safe(&mut self, pos: Pos) {
        self.last_safe = Some(pos);
        self.safe_history.push_back(pos);
        while self.safe_history.len() > SAFE_HISTORY_CAP {
            self.safe_history.pop_front();
        }
    }

    pub fn safe_history(&self) -> impl Iterator<Item = Pos> + '_ {
        self.safe_history.iter().copied()
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::PowerUp;

    #[test]
    fn stuck_needs_a_full_window() {
        let mut m = Memory::new(10);
        for _ in 0..9 {
            m.record_position(Pos::new(1, 1));
        }
        assert!(!m.is_stuck());
        m.record_position(Pos::new(2, 1));
        assert!(m.is_stuck());
    }

    #[test]
    fn wandering_is_not_stuck() {
        let mut m = Memory::new(10);
        for x in 0..10 {
            m.record_position(Pos::new(x % 3, 1));
        }
        assert!(!m.is_stuck());
    }

    #[test]
    fn observe_tracks_power_ups_and_drops_collected_ones() {
        let mut g = Grid::bordered(15, 15);
        g.set(Pos::new(3, 3), Cell::PowerUp(PowerUp::Bomb));
        g.set(Pos::new(13, 13), Cell::PowerUp(PowerUp::Speed));
        let mut m = Memory::new(10);
        m.observe(&g, Pos::new(2, 2), 6);
        assert_eq!(m.known_power_ups(), &[Pos::new(3, 3)]);
        assert!(m.has_seen(Pos::new(8, 8)));
        assert!(!m.has_seen(Pos::new(9, 9)));

        g.set(Pos::new(3, 3), Cell::Empty);
        m.observe(&g, Pos::new(2, 2), 6);
        assert!(m.known_power_ups().is_empty());
    }

    #[test]
    fn safe_history_is_bounded() {
        let mut m = Memory::new(10);
        for x in 0..30 {
            m.note_safe(Pos::new(x, 0));
        }
        assert_eq!(m.safe_history().count(), SAFE_HISTORY_CAP);
        assert_eq!(m.last_safe, Some(Pos::new(29, 0)));
        assert_eq!(m.safe_history().next(), Some(Pos::new(10, 0)));
    }
}
