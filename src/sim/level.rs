/// Arena construction: random generation and text layouts.
///
/// ## Generated arenas
///   1. Ring of walls around the border.
///   2. Indestructible pillar on every cell with both coordinates even.
///   3. Each remaining empty cell becomes a block with `block_density`.
///   4. The four spawn corners and their orthogonal neighbours are
///      cleared of blocks, so every agent starts with room to bomb.
///
/// ## Text layouts
///
/// One string per row, all rows the same length:
///   '#' = Wall              '+' = Block
///   '.' or ' ' = Empty      'b' / 'f' / 's' = Bomb / Flame / Speed power-up

use rand::Rng;

use crate::domain::grid::{Grid, Pos};
use crate::domain::tile::{Cell, PowerUp};
use crate::error::LevelError;

/// Smallest arena with four distinct spawn corners.
pub const MIN_SIDE: usize = 5;

// ══════════════════════════════════════════════════════════════
// Generation
// ══════════════════════════════════════════════════════════════

pub fn generate_arena<R: Rng>(width: usize, height: usize, block_density: f64, rng: &mut R) -> Result<Grid, LevelError> {
    if width < MIN_SIDE || height < MIN_SIDE {
        return Err(LevelError::TooSmall { width, height });
    }
    let mut grid = Grid::bordered(width, height);
    let density = block_density.clamp(0.0, 1.0);

    for y in 1..height as i32 - 1 {
        for x in 1..width as i32 - 1 {
            let pos = Pos::new(x, y);
            if x % 2 == 0 && y % 2 == 0 {
                grid.set(pos, Cell::Wall);
            } else if rng.gen_bool(density) {
                grid.set(pos, Cell::Block);
            }
        }
    }

    for corner in spawn_points(&grid) {
        for p in std::iter::once(corner).chain(corner.neighbors()) {
            if grid.get(p) == Cell::Block {
                grid.set(p, Cell::Empty);
            }
        }
    }
    Ok(grid)
}

/// Spawn cells, one per corner: top-left, top-right, bottom-left,
/// bottom-right.
pub fn spawn_points(grid: &Grid) -> [Pos; 4] {
    let right = grid.width() as i32 - 2;
    let bottom = grid.height() as i32 - 2;
    [Pos::new(1, 1), Pos::new(right, 1), Pos::new(1, bottom), Pos::new(right, bottom)]
}

// ══════════════════════════════════════════════════════════════
// Text layouts
// ══════════════════════════════════════════════════════════════

pub fn parse_layout(rows: &[&str]) -> Result<Grid, LevelError> {
    let Some(first) = rows.first() else {
        return Err(LevelError::Empty);
    };
    let width = first.chars().count();
    if width == 0 {
        return Err(LevelError::Empty);
    }

    let mut grid = Grid::new(width, rows.len());
    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(LevelError::Ragged { row: y, expected: width, found });
        }
        for (x, glyph) in row.chars().enumerate() {
            let cell = match glyph {
                '#' => Cell::Wall,
                '+' => Cell::Block,
                '.' | ' ' => Cell::Empty,
                'b' => Cell::PowerUp(PowerUp::Bomb),
                'f' => Cell::PowerUp(PowerUp::Flame),
                's' => Cell::PowerUp(PowerUp::Speed),
                _ => return Err(LevelError::UnknownGlyph { glyph, x, y }),
            };
            grid.set(Pos::new(x as i32, y as i32), cell);
        }
    }
    Ok(grid)
}

/// `parse_layout` over a multi-line string. Blank lines are skipped.
pub fn parse_layout_text(text: &str) -> Result<Grid, LevelError> {
    let rows: Vec<&str> = text.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
    parse_layout(&rows)
}

/// Inverse of `parse_layout`, for logs and test failure messages.
pub fn render_layout(grid: &Grid) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            out.push(match grid.get(Pos::new(x, y)) {
                Cell::Wall => '#',
                Cell::Block => '+',
                Cell::Empty => '.',
                Cell::Bomb => 'o',
                Cell::PowerUp(PowerUp::Bomb) => 'b',
                Cell::PowerUp(PowerUp::Flame) => 'f',
                Cell::PowerUp(PowerUp::Speed) => 's',
            });
        }
        out.push('\n');
    }
    out
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
    fn layout_glyphs() {
        let g = parse_layout(&["#####", "#+.b#", "#f s#", "#####"]).unwrap();
        assert_eq!(g.width(), 5);
        assert_eq!(g.height(), 4);
        assert_eq!(g.get(Pos::new(1, 1)), Cell::Block);
        assert_eq!(g.get(Pos::new(2, 1)), Cell::Empty);
        assert_eq!(g.get(Pos::new(3, 1)), Cell::PowerUp(PowerUp::Bomb));
        assert_eq!(g.get(Pos::new(1, 2)), Cell::PowerUp(PowerUp::Flame));
        assert_eq!(g.get(Pos::new(2, 2)), Cell::Empty);
        assert_eq!(g.get(Pos::new(3, 2)), Cell::PowerUp(PowerUp::Speed));
    }

    #[test]
    fn layout_errors() {
        assert_eq!(parse_layout(&[]), Err(LevelError::Empty));
        assert_eq!(
            parse_layout(&["###", "##"]),
            Err(LevelError::Ragged { row: 1, expected: 3, found: 2 })
        );
        assert_eq!(
            parse_layout(&["#?#"]),
            Err(LevelError::UnknownGlyph { glyph: '?', x: 1, y: 0 })
        );
    }

    #[test]
    fn text_layout_round_trips_through_render() {
        let text = "#####\n#+.b#\n#...#\n#####\n";
        let g = parse_layout_text(text).unwrap();
        assert_eq!(render_layout(&g), text);
    }

    #[test]
    fn generated_arena_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let g = generate_arena(21, 17, 0.4, &mut rng).unwrap();
        for p in g.positions() {
            let border = p.x == 0 || p.y == 0 || p.x == 20 || p.y == 16;
            let pillar = p.x % 2 == 0 && p.y % 2 == 0;
            if border || pillar {
                assert_eq!(g.get(p), Cell::Wall, "{p:?}");
            } else {
                assert!(matches!(g.get(p), Cell::Empty | Cell::Block), "{p:?}");
            }
        }
        for corner in spawn_points(&g) {
            assert_eq!(g.get(corner), Cell::Empty);
            for n in corner.neighbors() {
                assert_ne!(g.get(n), Cell::Block);
            }
        }
    }

    #[test]
    fn generation_is_seeded() {
        let a = generate_arena(15, 13, 0.5, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = generate_arena(15, 13, 0.5, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_arena_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            generate_arena(4, 9, 0.4, &mut rng),
            Err(LevelError::TooSmall { width: 4, height: 9 })
        );
    }
}
