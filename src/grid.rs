use crate::algorithms::common::Cost;
use crate::error::GridError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Obstacle,
}

/// Which cells count as adjacent. Every step costs 1 in both models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Up, right, down, left. Distances follow the Manhattan metric.
    #[default]
    Four,
    /// The four orthogonal steps followed by the four diagonals.
    /// Distances follow the Chebyshev metric.
    Eight,
}

static ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
static DIAGONAL: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

impl Connectivity {
    /// Neighbor offsets in enumeration order.
    pub fn offsets(self) -> impl Iterator<Item = (i32, i32)> {
        let diagonals: &'static [(i32, i32)] = match self {
            Connectivity::Four => &[],
            Connectivity::Eight => &DIAGONAL,
        };
        ORTHOGONAL.iter().chain(diagonals.iter()).copied()
    }

    /// Shortest path length between two cells on an empty grid.
    pub fn distance(self, a: Position, b: Position) -> u32 {
        match self {
            Connectivity::Four => a.manhattan(b),
            Connectivity::Eight => a.chebyshev(b),
        }
    }
}

/// Topology source consumed by the pathfinder.
///
/// A node is a cell currently present in the graph. Blocked cells are
/// absent and have no edges.
pub trait GridGraph {
    /// Whether `pos` is a node of the graph.
    fn contains(&self, pos: Position) -> bool;

    /// Whether `pos` lies inside the graph's extent, present or not.
    fn in_bounds(&self, pos: Position) -> bool;

    /// Present nodes adjacent to `pos` with their edge weight, in a stable
    /// order. `pos` itself does not need to be present.
    fn neighbors(&self, pos: Position) -> Vec<(Position, Cost)>;

    /// Removes the node at `pos`. Returns `false` if it was not present.
    fn remove_node(&mut self, pos: Position) -> bool;

    /// Inserts a node at `pos`, connected to every present adjacent node.
    /// Returns `false` if it was already present or out of bounds.
    fn insert_node(&mut self, pos: Position) -> bool;

    /// Number of present nodes.
    fn node_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    pub connectivity: Connectivity,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// An open grid with every cell present.
    pub fn new(width: i32, height: i32, connectivity: Connectivity) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Grid {
            width,
            height,
            connectivity,
            cells: vec![vec![Cell::Empty; height as usize]; width as usize],
        }
    }

    /// Parses a text map: `.` open, `#` wall, `O` obstacle. Rows run along y.
    pub fn parse(text: &str, connectivity: Connectivity) -> Result<Self, GridError> {
        let rows: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();

        let Some(&(_, first)) = rows.first() else {
            return Err(GridError::Empty);
        };
        let width = first.chars().count();

        let mut grid = Grid::new(width as i32, rows.len() as i32, connectivity);
        for (y, &(line, row)) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(GridError::RaggedRow {
                    line,
                    expected: width,
                    found,
                });
            }
            for (x, ch) in row.chars().enumerate() {
                let cell = match ch {
                    '.' => Cell::Empty,
                    '#' => Cell::Wall,
                    'O' => Cell::Obstacle,
                    _ => {
                        return Err(GridError::UnknownCell {
                            line,
                            column: x + 1,
                            ch,
                        })
                    }
                };
                grid.cells[x][y] = cell;
            }
        }
        Ok(grid)
    }

    pub fn cell(&self, pos: Position) -> Option<Cell> {
        if self.in_bounds(pos) {
            Some(self.cells[pos.x as usize][pos.y as usize])
        } else {
            None
        }
    }

    /// Marks a cell as a permanent wall.
    pub fn set_wall(&mut self, pos: Position) -> bool {
        self.set_cell(pos, Cell::Wall)
    }

    fn set_cell(&mut self, pos: Position, cell: Cell) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.cells[pos.x as usize][pos.y as usize] = cell;
        true
    }

    /// Blocks every cell that is present in `other`. Both grids must have
    /// the same extent.
    pub fn add_obstacles_from(&mut self, other: &Grid) -> Result<usize, GridError> {
        if other.width != self.width || other.height != self.height {
            return Err(GridError::DimensionMismatch {
                width: self.width,
                height: self.height,
                found_width: other.width,
                found_height: other.height,
            });
        }
        let blocked: Vec<Position> = self
            .positions()
            .filter(|&pos| other.contains(pos))
            .collect();
        Ok(self.add_obstacles_from_mask(blocked))
    }

    /// Blocks every listed cell. Returns how many nodes were removed.
    pub fn add_obstacles_from_mask<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = Position>,
    {
        positions
            .into_iter()
            .filter(|&pos| self.remove_node(pos))
            .count()
    }

    /// Every cell position, column by column.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Position { x, y }))
    }

    /// Present cells, column by column.
    pub fn open_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |&pos| self.contains(pos))
    }

    /// Print the grid with optional markers, the way the simulation shows it.
    pub fn print_grid(&self, target: Option<Position>, agents: &[Position]) {
        println!("Legend: T=Target, A=Agent, #=Wall, O=Obstacle, .=Empty");

        print!("   ");
        for x in 0..self.width {
            print!("{:2}", x % 10);
        }
        println!();

        for y in 0..self.height {
            print!("{:2} ", y);
            for x in 0..self.width {
                let pos = Position { x, y };
                let ch = if Some(pos) == target {
                    'T'
                } else if agents.contains(&pos) {
                    'A'
                } else {
                    cell_char(self.cells[x as usize][y as usize])
                };
                print!("{} ", ch);
            }
            println!();
        }
        println!();
    }
}

fn cell_char(cell: Cell) -> char {
    match cell {
        Cell::Empty => '.',
        Cell::Wall => '#',
        Cell::Obstacle => 'O',
    }
}

impl GridGraph for Grid {
    fn contains(&self, pos: Position) -> bool {
        self.cell(pos) == Some(Cell::Empty)
    }

    fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    fn neighbors(&self, pos: Position) -> Vec<(Position, Cost)> {
        self.connectivity
            .offsets()
            .map(|(dx, dy)| pos.offset(dx, dy))
            .filter(|&next| self.contains(next))
            .map(|next| (next, 1))
            .collect()
    }

    fn remove_node(&mut self, pos: Position) -> bool {
        self.contains(pos) && self.set_cell(pos, Cell::Obstacle)
    }

    fn insert_node(&mut self, pos: Position) -> bool {
        match self.cell(pos) {
            Some(Cell::Wall) | Some(Cell::Obstacle) => self.set_cell(pos, Cell::Empty),
            _ => false,
        }
    }

    fn node_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == Cell::Empty)
            .count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                write!(f, "{}", cell_char(self.cells[x as usize][y as usize]))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
