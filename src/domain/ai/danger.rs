/// Per-bot danger cache over a square window around the bot.
///
/// Rebuilt once per tick from `HazardView::danger_level`; every planner in
/// the same tick reads it instead of recomputing. Two layers:
///   - `level`: the 0..=10 heuristic.
///   - `in_footprint`: inside some live bomb's blast lines, whatever the
///     level says. Used for longer-horizon planning (trap spots).
///
/// Cells outside the window are answered directly from the hazard view,
/// so a stale or tiny window only costs time, never correctness.

use crate::domain::grid::Pos;
use crate::domain::hazard::HazardView;

#[derive(Clone, Debug, Default)]
pub struct DangerMap {
    x0: i32,
    y0: i32,
    width: i32,
    height: i32,
    levels: Vec<f32>,
    footprint: Vec<bool>,
}

impl DangerMap {
    pub fn new() -> Self {
        DangerMap::default()
    }

    /// Recompute the window of `radius` around `center`.
    pub fn refresh(&mut self, view: &HazardView, center: Pos, radius: i32) {
        let grid = view.grid;
        self.x0 = (center.x - radius).max(0);
        self.y0 = (center.y - radius).max(0);
        let x1 = (center.x + radius).min(grid.width() as i32 - 1);
        let y1 = (center.y + radius).min(grid.height() as i32 - 1);
        self.width = (x1 - self.x0 + 1).max(0);
        self.height = (y1 - self.y0 + 1).max(0);

        self.levels.clear();
        self.footprint.clear();
        for p in grid.window(center, radius) {
            self.levels.push(view.danger_level(p));
            self.footprint.push(view.in_bomb_footprint(p));
        }
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        let lx = pos.x - self.x0;
        let ly = pos.y - self.y0;
        if lx < 0 || ly < 0 || lx >= self.width || ly >= self.height {
            return None;
        }
        Some((ly * self.width + lx) as usize)
    }

    /// Danger at `pos`: cached inside the window, computed outside it.
    pub fn level(&self, view: &HazardView, pos: Pos) -> f32 {
        match self.index(pos).and_then(|i| self.levels.get(i)) {
            Some(d) => *d,
            None => view.danger_level(pos),
        }
    }

    pub fn in_footprint(&self, view: &HazardView, pos: Pos) -> bool {
        match self.index(pos).and_then(|i| self.footprint.get(i)) {
            Some(f) => *f,
            None => view.in_bomb_footprint(pos),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
