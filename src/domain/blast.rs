/// Blast footprint of a bomb.
///
/// A blast is a plus shape: the origin, then up to `power` cells along each
/// cardinal ray. Per ray:
///
/// ┌────────────────────┬──────────┬─────────────┐
/// │ Cell reached        │ Included │ Ray         │
/// ├────────────────────┼──────────┼─────────────┤
/// │ outside grid        │ NO       │ stops       │
/// │ wall                │ NO       │ stops       │
/// │ block               │ YES      │ stops       │
/// │ bomb                │ YES      │ continues   │
/// │ empty / power-up    │ YES      │ continues   │
/// └────────────────────┴──────────┴─────────────┘
///
/// A bomb inside the footprint is chain-detonated by the simulation.

use std::collections::BTreeSet;

use super::grid::{Dir, Grid, Pos};
use super::tile::Cell;

pub fn affected_cells(grid: &Grid, origin: Pos, power: i32) -> BTreeSet<Pos> {
    let mut cells = BTreeSet::new();
    cells.insert(origin);
    for dir in Dir::ALL {
        let mut p = origin;
        for _ in 0..power.max(0) {
            p = p.step(dir);
            match grid.get(p) {
                Cell::Wall => break,
                Cell::Block => {
                    cells.insert(p);
                    break;
                }
                _ => {
                    cells.insert(p);
                }
            }
        }
    }
    cells
}

/// Blocks a blast from `origin` would destroy.
pub fn blocks_hit(grid: &Grid, origin: Pos, power: i32) -> usize {
    affected_cells(grid, origin, power)
        .into_iter()
        .filter(|p| grid.get(*p).is_destructible())
        .count()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
