use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{IndexError, Torus};

/// Largest `width × width` a grid may hold.
pub const MAX_CELLS: usize = 1 << 20;

/// One square partition of the world: the agents and free pucks located inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cell<A: Ord, P: Ord> {
    agents: BTreeSet<A>,
    pucks: BTreeSet<P>,
}

impl<A: Ord, P: Ord> Default for Cell<A, P> {
    fn default() -> Self {
        Self {
            agents: BTreeSet::new(),
            pucks: BTreeSet::new(),
        }
    }
}

impl<A: Ord, P: Ord> Cell<A, P> {
    /// Agents registered in this cell.
    pub fn agents(&self) -> &BTreeSet<A> {
        &self.agents
    }

    /// Free pucks registered in this cell.
    pub fn pucks(&self) -> &BTreeSet<P> {
        &self.pucks
    }

    /// True when no agent and no free puck is registered here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.pucks.is_empty()
    }
}

/// Uniform `width × width` grid tiling a [`Torus`] in row-major order.
///
/// The grid only knows identifiers and cell indices. Callers keep positions
/// themselves and must route every agent move through [`CellGrid::relocate_agent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellGrid<A: Ord, P: Ord> {
    torus: Torus,
    width: usize,
    side: f64,
    cells: Vec<Cell<A, P>>,
}

impl<A: Copy + Ord, P: Copy + Ord> CellGrid<A, P> {
    /// Create an empty grid with `width` cells along each axis.
    pub fn new(torus: Torus, width: usize) -> Result<Self, IndexError> {
        if width == 0 {
            return Err(IndexError::InvalidConfig("matrix width must be non-zero"));
        }
        let count = width
            .checked_mul(width)
            .filter(|&count| count <= MAX_CELLS)
            .ok_or(IndexError::InvalidConfig("matrix width is too large"))?;
        let mut cells = Vec::with_capacity(count);
        cells.resize_with(count, Cell::default);
        Ok(Self {
            torus,
            width,
            side: torus.size() / width as f64,
            cells,
        })
    }

    /// Geometry the grid tiles.
    #[must_use]
    pub const fn torus(&self) -> &Torus {
        &self.torus
    }

    /// Cells along one axis.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Side length of one cell in world units.
    #[must_use]
    pub const fn cell_side(&self) -> f64 {
        self.side
    }

    /// Total number of cells, `width²`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell column (or row) holding the continuous coordinate `x`.
    #[must_use]
    pub fn cell_of(&self, x: f64) -> usize {
        let x = self.torus.distance_normalize(x);
        let column = (x / self.side).floor() as usize;
        column.min(self.width - 1)
    }

    /// Wrap an integer cell coordinate into `[0, width)`.
    #[must_use]
    pub fn cell_wrap(&self, coord: i64) -> usize {
        coord.rem_euclid(self.width as i64) as usize
    }

    /// Row-major index of the cell containing `(x, y)`.
    #[must_use]
    pub fn cell_index(&self, x: f64, y: f64) -> usize {
        self.cell_of(x) + self.width * self.cell_of(y)
    }

    /// Inverse of the row-major combination: `(column, row)`.
    #[must_use]
    pub fn cell_coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Cell at a row-major index, if it exists.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&Cell<A, P>> {
        self.cells.get(index)
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> &[Cell<A, P>] {
        &self.cells
    }

    /// Register an agent in `cell`.
    pub fn insert_agent(&mut self, id: A, cell: usize) {
        let inserted = self.cells[cell].agents.insert(id);
        debug_assert!(inserted, "agent registered twice in cell {cell}");
    }

    /// Remove an agent from `cell`, returning whether it was present.
    pub fn remove_agent(&mut self, id: A, cell: usize) -> bool {
        let removed = self.cells[cell].agents.remove(&id);
        debug_assert!(removed, "agent missing from cell {cell}");
        removed
    }

    /// Register a free puck in `cell`.
    pub fn insert_puck(&mut self, id: P, cell: usize) {
        let inserted = self.cells[cell].pucks.insert(id);
        debug_assert!(inserted, "puck registered twice in cell {cell}");
    }

    /// Remove a free puck from `cell`, returning whether it was present.
    pub fn remove_puck(&mut self, id: P, cell: usize) -> bool {
        let removed = self.cells[cell].pucks.remove(&id);
        debug_assert!(removed, "puck missing from cell {cell}");
        removed
    }

    /// Move an agent's membership from the cell of `old` to the cell of `new`,
    /// touching the sets only when the cell changes. Returns the new cell index.
    pub fn relocate_agent(&mut self, id: A, old: (f64, f64), new: (f64, f64)) -> usize {
        let from = self.cell_index(old.0, old.1);
        let to = self.cell_index(new.0, new.1);
        if from != to {
            self.remove_agent(id, from);
            self.insert_agent(id, to);
        }
        to
    }

    /// The minimal block of cells guaranteed to contain every point within
    /// `range` of `(x, y)`, each axis wrapped independently.
    #[must_use]
    pub fn neighbor_cells(&self, x: f64, y: f64, range: f64) -> NeighborCells {
        let reach = if range > 0.0 {
            (range / self.side).ceil() as usize
        } else {
            0
        };
        let (start_x, span_x) = self.axis_span(self.cell_of(x), reach);
        let (start_y, span_y) = self.axis_span(self.cell_of(y), reach);
        NeighborCells {
            width: self.width,
            start_x,
            start_y,
            span_x,
            span_y,
            step: 0,
        }
    }

    fn axis_span(&self, center: usize, reach: usize) -> (usize, usize) {
        let span = reach.saturating_mul(2).saturating_add(1);
        if span >= self.width {
            // the block covers the whole axis; visit each cell once
            return (0, self.width);
        }
        (self.cell_wrap(center as i64 - reach as i64), span)
    }

    /// Every cell currently holding `id`. Full scan, for audits only.
    pub fn locate_agent(&self, id: A) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.agents.contains(&id))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Every cell currently holding `id` as a free puck. Full scan, for audits only.
    pub fn locate_puck(&self, id: P) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.pucks.contains(&id))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Total registered agents across all cells.
    pub fn agent_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.agents.len()).sum()
    }

    /// Total registered free pucks across all cells.
    pub fn puck_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.pucks.len()).sum()
    }
}

/// Row-major walk over a wrapped block of cell indices.
#[derive(Debug, Clone)]
pub struct NeighborCells {
    width: usize,
    start_x: usize,
    start_y: usize,
    span_x: usize,
    span_y: usize,
    step: usize,
}

impl Iterator for NeighborCells {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.step >= self.span_x * self.span_y {
            return None;
        }
        let dx = self.step % self.span_x;
        let dy = self.step / self.span_x;
        self.step += 1;
        let x = (self.start_x + dx) % self.width;
        let y = (self.start_y + dy) % self.width;
        Some(x + self.width * y)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.span_x * self.span_y).saturating_sub(self.step);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NeighborCells {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid(size: f64, width: usize) -> CellGrid<u32, u32> {
        CellGrid::new(Torus::new(size).expect("torus"), width).expect("grid")
    }

    #[test]
    fn rejects_zero_width() {
        let torus = Torus::new(1.0).expect("torus");
        assert!(CellGrid::<u32, u32>::new(torus, 0).is_err());
    }

    #[test]
    fn rejects_widths_beyond_the_cell_limit() {
        let torus = Torus::new(1.0).expect("torus");
        assert_eq!(
            CellGrid::<u32, u32>::new(torus, usize::MAX).err(),
            Some(IndexError::InvalidConfig("matrix width is too large"))
        );
        // 1025² is just past the limit
        assert!(CellGrid::<u32, u32>::new(torus, 1025).is_err());
    }

    #[test]
    fn cell_index_is_row_major() {
        let grid = grid(1.0, 10);
        assert_eq!(grid.len(), 100);
        assert_eq!(grid.cell_index(0.05, 0.05), 0);
        assert_eq!(grid.cell_index(0.95, 0.95), 99);
        assert_eq!(grid.cell_index(0.15, 0.05), 1);
        assert_eq!(grid.cell_index(0.05, 0.15), 10);
        assert_eq!(grid.cell_coords(37), (7, 3));
    }

    #[test]
    fn cell_index_wraps_out_of_range_positions() {
        let grid = grid(1.0, 10);
        assert_eq!(grid.cell_index(1.05, -0.05), grid.cell_index(0.05, 0.95));
        assert_eq!(grid.cell_of(0.999_999_999_999_999_9), 9);
    }

    #[test]
    fn cell_wrap_handles_negative_and_overflowing_coords() {
        let grid = grid(1.0, 10);
        assert_eq!(grid.cell_wrap(-1), 9);
        assert_eq!(grid.cell_wrap(10), 0);
        assert_eq!(grid.cell_wrap(-11), 9);
        assert_eq!(grid.cell_wrap(4), 4);
    }

    #[test]
    fn relocate_moves_membership_only_across_cells() {
        let mut grid = grid(1.0, 10);
        let start = grid.cell_index(0.05, 0.05);
        grid.insert_agent(7, start);

        let same = grid.relocate_agent(7, (0.05, 0.05), (0.06, 0.07));
        assert_eq!(same, start);
        assert!(grid.cell(start).expect("cell").agents().contains(&7));

        let moved = grid.relocate_agent(7, (0.06, 0.07), (0.55, 0.95));
        assert_eq!(moved, 95);
        assert!(grid.cell(start).expect("cell").agents().is_empty());
        assert_eq!(grid.locate_agent(7), vec![95]);
        assert_eq!(grid.agent_count(), 1);
    }

    #[test]
    fn puck_membership_round_trips() {
        let mut grid = grid(1.0, 4);
        grid.insert_puck(3, 5);
        assert_eq!(grid.locate_puck(3), vec![5]);
        assert!(grid.remove_puck(3, 5));
        assert!(grid.locate_puck(3).is_empty());
        assert_eq!(grid.puck_count(), 0);
    }

    #[test]
    fn neighbor_block_wraps_at_the_corner() {
        let grid = grid(1.0, 10);
        let cells: Vec<usize> = grid.neighbor_cells(0.05, 0.05, 0.1).collect();
        assert_eq!(cells.len(), 9);
        let expected: HashSet<usize> = [99, 90, 91, 9, 0, 1, 19, 10, 11].into_iter().collect();
        assert_eq!(cells.iter().copied().collect::<HashSet<_>>(), expected);
        // row-major starting from the wrapped top-left corner
        assert_eq!(cells[0], 99);
    }

    #[test]
    fn neighbor_block_grows_with_range() {
        let grid = grid(1.0, 10);
        assert_eq!(grid.neighbor_cells(0.5, 0.5, 0.15).len(), 25);
        assert_eq!(grid.neighbor_cells(0.5, 0.5, 0.0).len(), 1);
    }

    #[test]
    fn oversized_range_visits_each_cell_once() {
        let grid = grid(1.0, 4);
        let cells: Vec<usize> = grid.neighbor_cells(0.1, 0.9, 2.0).collect();
        assert_eq!(cells.len(), 16);
        assert_eq!(cells.iter().copied().collect::<HashSet<_>>().len(), 16);
    }

    #[test]
    fn neighbor_block_covers_every_point_in_range() {
        let grid = grid(1.0, 10);
        let torus = *grid.torus();
        let range = 0.12;
        let center = (0.03, 0.97);
        let block: HashSet<usize> = grid.neighbor_cells(center.0, center.1, range).collect();
        for i in 0..100 {
            for j in 0..100 {
                let p = (i as f64 / 100.0, j as f64 / 100.0);
                if torus.distance(center, p) <= range {
                    assert!(block.contains(&grid.cell_index(p.0, p.1)), "{p:?} not covered");
                }
            }
        }
    }
}
