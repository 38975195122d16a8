/// Grid container, positions and cardinal directions.
///
/// Coordinates are signed so that neighbour arithmetic at the border never
/// wraps. Every query outside the grid answers as if the cell were a wall,
/// which lets searches prune at the edges without special cases.

use super::tile::Cell;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }

    pub fn step(self, dir: Dir) -> Pos {
        let (dx, dy) = dir.delta();
        Pos { x: self.x + dx, y: self.y + dy }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Pos {
        Pos { x: self.x + dx, y: self.y + dy }
    }

    pub fn manhattan(self, other: Pos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Same row or same column.
    pub fn is_aligned(self, other: Pos) -> bool {
        self.x == other.x || self.y == other.y
    }

    pub fn neighbors(self) -> [Pos; 4] {
        Dir::ALL.map(|d| self.step(d))
    }

    /// Direction of a single orthogonal step from `self` to `next`.
    pub fn dir_to(self, next: Pos) -> Option<Dir> {
        match (next.x - self.x, next.y - self.y) {
            (0, -1) => Some(Dir::Up),
            (1, 0) => Some(Dir::Right),
            (0, 1) => Some(Dir::Down),
            (-1, 0) => Some(Dir::Left),
            _ => None,
        }
    }

    /// Dominant-axis direction towards `target` (horizontal wins ties on
    /// strictly larger dx, vertical otherwise).
    pub fn toward(self, target: Pos) -> Option<Dir> {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.abs() > dy.abs() {
            Some(if dx > 0 { Dir::Right } else { Dir::Left })
        } else {
            Some(if dy > 0 { Dir::Down } else { Dir::Up })
        }
    }
}

/// Movement direction (one of the four cardinal unit vectors).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dir {
    Up,
    Right,
    Down,
    Left,
}

impl Dir {
    /// Canonical expansion order used by every search.
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Right => Dir::Left,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }
}

/// The authoritative cell array. One instance per match, owned by the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Grid { width, height, cells: vec![Cell::Empty; width * height] }
    }

    /// Empty arena enclosed by a ring of walls.
    pub fn bordered(width: usize, height: usize) -> Self {
        let mut grid = Grid::new(width, height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let pos = Pos::new(x, y);
                if x == 0 || y == 0 || x == width as i32 - 1 || y == height as i32 - 1 {
                    grid.set(pos, Cell::Wall);
                }
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    #[inline]
    fn index(&self, pos: Pos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width + pos.x as usize)
        } else {
            None
        }
    }

    /// Cell at `pos`. Out of bounds = wall.
    #[inline]
    pub fn get(&self, pos: Pos) -> Cell {
        match self.index(pos) {
            Some(i) => self.cells[i],
            None => Cell::Wall,
        }
    }

    /// Write a cell. Writes outside the grid are ignored.
    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = cell;
        }
    }

    /// Row-major iteration over every position.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| Pos::new(x, y)))
    }

    /// In-bounds positions of the square window of `radius` around `center`.
    pub fn window(&self, center: Pos, radius: i32) -> impl Iterator<Item = Pos> + '_ {
        let y0 = (center.y - radius).max(0);
        let y1 = (center.y + radius).min(self.height as i32 - 1);
        let x0 = (center.x - radius).max(0);
        let x1 = (center.x + radius).min(self.width as i32 - 1);
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| Pos::new(x, y)))
    }

    /// Positions at exactly `distance` (Manhattan) from `center`, in bounds.
    pub fn ring(&self, center: Pos, distance: i32) -> Vec<Pos> {
        let mut out = Vec::new();
        for dx in -distance..=distance {
            for dy in -distance..=distance {
                if dx.abs() + dy.abs() == distance {
                    let p = center.offset(dx, dy);
                    if self.in_bounds(p) {
                        out.push(p);
                    }
                }
            }
        }
        out
    }

    /// Number of orthogonal neighbours that are open terrain.
    pub fn open_neighbors(&self, pos: Pos) -> usize {
        pos.neighbors().iter().filter(|n| self.get(**n).is_open()).count()
    }

    /// Number of orthogonal neighbours that are walls, blocks or outside.
    pub fn obstacle_neighbors(&self, pos: Pos) -> usize {
        pos.neighbors().iter().filter(|n| self.get(**n).is_obstacle()).count()
    }

    /// Unobstructed straight line between two aligned cells.
    /// Endpoints are not checked. Unaligned cells never see each other.
    pub fn line_of_sight(&self, a: Pos, b: Pos) -> bool {
        if !a.is_aligned(b) {
            return false;
        }
        let step_x = (b.x - a.x).signum();
        let step_y = (b.y - a.y).signum();
        let mut p = a.offset(step_x, step_y);
        while p != b {
            if self.get(p).stops_blast() {
                return false;
            }
            p = p.offset(step_x, step_y);
        }
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
