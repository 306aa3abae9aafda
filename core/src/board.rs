use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// The playing field: a rectangular grid of [`Cell`]s plus the invariant
/// bomb total.
///
/// Revealed and flagged counts are always recomputed from the cells rather
/// than tracked separately, so a snapshot restore can never leave a counter
/// out of sync with the grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
    bombs: CellCount,
}

impl Board {
    /// Board from a fixed bomb layout.
    ///
    /// Fails with [`GameError::InvalidBombCount`] when the layout is empty
    /// or leaves no safe cell.
    pub fn new(layout: &BombLayout) -> Result<Self> {
        let bombs = layout.count();
        let cells = layout.total_cells();
        if bombs == 0 || bombs >= cells {
            return Err(GameError::InvalidBombCount { bombs, cells });
        }

        let mut board = Self {
            cells: Array2::default(layout.size().to_nd_index()),
            bombs,
        };
        board.apply_layout(layout);
        Ok(board)
    }

    /// Board with freshly placed bombs.
    pub fn generate(size: Coord2, bombs: CellCount, placer: impl BombPlacer) -> Result<Self> {
        Self::new(&placer.place(size, bombs)?)
    }

    /// Clears every cell and places a fresh set of bombs, keeping the shape
    /// and bomb total.
    pub(crate) fn regenerate(&mut self, placer: impl BombPlacer) -> Result<()> {
        let layout = placer.place(self.size(), self.bombs)?;
        self.reset();
        self.apply_layout(&layout);
        Ok(())
    }

    /// Resets all cells to defaults without touching the allocation.
    pub fn reset(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.reset();
        }
    }

    /// Marks the layout's bombs and bumps the adjacency count of each
    /// in-bounds neighbor. Only valid on a freshly reset grid; applying a
    /// second layout on top would double-count.
    fn apply_layout(&mut self, layout: &BombLayout) {
        debug_assert_eq!(layout.size(), self.size());
        for coords in layout.iter_bombs() {
            self.cells[coords.to_nd_index()].bomb = true;
            for neighbor in self.neighbors(coords) {
                self.cells[neighbor.to_nd_index()].adjacent_bombs += 1;
            }
        }
    }

    /// Shape as `(height, width)`.
    pub fn size(&self) -> Coord2 {
        let dim = self.cells.dim();
        (
            dim.0.try_into().expect("height fits in Coord"),
            dim.1.try_into().expect("width fits in Coord"),
        )
    }

    pub fn height(&self) -> Coord {
        self.size().0
    }

    pub fn width(&self) -> Coord {
        self.size().1
    }

    pub fn bombs_total(&self) -> CellCount {
        self.bombs
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells
            .len()
            .try_into()
            .expect("cell count fits in CellCount")
    }

    pub fn safe_cells(&self) -> CellCount {
        self.total_cells() - self.bombs
    }

    pub fn neighbors(&self, coords: Coord2) -> impl Iterator<Item = Coord2> + use<> {
        neighbors(coords, self.size())
    }

    pub fn cell(&self, coords: Coord2) -> Result<&Cell> {
        self.validate_coords(coords)?;
        Ok(&self.cells[coords.to_nd_index()])
    }

    pub(crate) fn cell_mut(&mut self, coords: Coord2) -> Result<&mut Cell> {
        self.validate_coords(coords)?;
        Ok(&mut self.cells[coords.to_nd_index()])
    }

    fn validate_coords(&self, coords: Coord2) -> Result<()> {
        let size = self.size();
        if coords.0 < size.0 && coords.1 < size.1 {
            Ok(())
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    /// Count of revealed cells, recomputed on demand.
    pub fn squares_revealed(&self) -> CellCount {
        self.cells
            .iter()
            .filter(|cell| cell.state.is_revealed())
            .count()
            .try_into()
            .expect("cell count fits in CellCount")
    }

    /// Bomb total minus placed flags. The flag cap keeps this from going
    /// negative.
    pub fn bombs_left(&self) -> CellCount {
        let flagged: CellCount = self
            .cells
            .iter()
            .filter(|cell| cell.state.is_flagged())
            .count()
            .try_into()
            .expect("cell count fits in CellCount");
        self.bombs.saturating_sub(flagged)
    }

    /// Every cell with its coordinates, row-major.
    pub fn indexed_cells(&self) -> impl Iterator<Item = (Coord2, &Cell)> {
        self.cells.indexed_iter().map(|((row, col), cell)| {
            (
                (
                    row.try_into().expect("row fits in Coord"),
                    col.try_into().expect("col fits in Coord"),
                ),
                cell,
            )
        })
    }

    /// Coordinates of every bomb cell.
    pub fn iter_bomb_coords(&self) -> impl Iterator<Item = Coord2> + '_ {
        self.cells
            .indexed_iter()
            .filter(|&(_, cell)| cell.bomb)
            .map(|((row, col), _)| {
                (
                    row.try_into().expect("row fits in Coord"),
                    col.try_into().expect("col fits in Coord"),
                )
            })
    }

    /// Immutable capture of the player-visible state and the counters that
    /// go with it.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::new(
            self.cells.map(|cell| cell.state),
            self.squares_revealed(),
            self.bombs_left(),
        )
    }

    /// Applies a snapshot's cell states verbatim. Bomb placement and
    /// adjacency counts are untouched; they do not change mid-game.
    pub(crate) fn restore(&mut self, snapshot: &BoardSnapshot) {
        debug_assert_eq!(snapshot.states().dim(), self.cells.dim());
        for (cell, &state) in self.cells.iter_mut().zip(snapshot.states().iter()) {
            cell.state = state;
        }
    }
}
