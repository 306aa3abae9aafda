//! Game-state engine for a grid-revealing bomb-hunt game.
//!
//! The crate owns the board model, bomb placement, flood reveal, win/loss
//! detection, difficulty parameters, and a bounded snapshot-based undo. The
//! presentation layer drives it through [`GameSession`] commands and redraws
//! from the [`Directive`] values it gets back; nothing here touches a widget.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use board::*;
pub use cell::*;
pub use engine::*;
pub use error::*;
pub use generator::*;
pub use session::*;
pub use snapshot::*;
pub use types::*;

mod board;
mod cell;
mod engine;
mod error;
mod generator;
mod session;
mod snapshot;
mod types;

/// Undo uses permitted per game unless the session is built with another
/// budget.
pub const DEFAULT_UNDO_BUDGET: u32 = 3;

/// Smallest board side accepted for custom games.
pub const MIN_CUSTOM_SIDE: Coord = 5;
/// Largest board side accepted for custom games.
pub const MAX_CUSTOM_SIDE: Coord = 50;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Custom,
}

impl Difficulty {
    /// Fixed `(height, width, bombs)` triple of a preset, `None` for custom.
    pub const fn dimensions(self) -> Option<(Coord, Coord, CellCount)> {
        use Difficulty::*;
        match self {
            Easy => Some((8, 10, 10)),
            Medium => Some((14, 18, 40)),
            Hard => Some((20, 24, 99)),
            Custom => None,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Easy
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub height: Coord,
    pub width: Coord,
    pub bombs: CellCount,
}

impl GameConfig {
    /// Config for a preset difficulty. `Custom` has no fixed dimensions and
    /// falls back to the default preset.
    pub fn preset(difficulty: Difficulty) -> Self {
        match difficulty.dimensions() {
            Some((height, width, bombs)) => Self {
                difficulty,
                height,
                width,
                bombs,
            },
            None => Self::default(),
        }
    }

    /// Config from user-supplied dimensions.
    ///
    /// Sides must lie in `[MIN_CUSTOM_SIDE, MAX_CUSTOM_SIDE]` and the bomb
    /// count must be positive and strictly below the cell count.
    pub fn custom(height: Coord, width: Coord, bombs: CellCount) -> Result<Self> {
        let side_range = MIN_CUSTOM_SIDE..=MAX_CUSTOM_SIDE;
        if !side_range.contains(&height) || !side_range.contains(&width) {
            log::warn!(
                "rejecting custom board {}x{}: sides must be within {}..={}",
                height,
                width,
                MIN_CUSTOM_SIDE,
                MAX_CUSTOM_SIDE
            );
            return Err(GameError::InvalidParameters);
        }
        if bombs == 0 || bombs >= area(height, width) {
            log::warn!(
                "rejecting custom board {}x{} with {} bombs",
                height,
                width,
                bombs
            );
            return Err(GameError::InvalidParameters);
        }
        Ok(Self {
            difficulty: Difficulty::Custom,
            height,
            width,
            bombs,
        })
    }

    /// Board shape as `(height, width)`.
    pub const fn size(&self) -> Coord2 {
        (self.height, self.width)
    }

    pub const fn total_cells(&self) -> CellCount {
        area(self.height, self.width)
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells() - self.bombs
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::preset(Difficulty::Easy)
    }
}

/// Where the bombs are, independent of anything the player has done.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BombLayout {
    mask: Array2<bool>,
    count: CellCount,
}

impl BombLayout {
    pub fn from_mask(mask: Array2<bool>) -> Self {
        let count = mask
            .iter()
            .filter(|&&is_bomb| is_bomb)
            .count()
            .try_into()
            .expect("cell count fits in CellCount");
        Self { mask, count }
    }

    /// Layout from explicit bomb positions, the seam used by tests and
    /// replays. Rejects out-of-bounds positions.
    pub fn from_bomb_coords(size: Coord2, bomb_coords: &[Coord2]) -> Result<Self> {
        let mut mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in bomb_coords {
            if coords.0 >= size.0 || coords.1 >= size.1 {
                return Err(GameError::InvalidCoords);
            }
            mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mask(mask))
    }

    /// Shape as `(height, width)`.
    pub fn size(&self) -> Coord2 {
        let dim = self.mask.dim();
        (
            dim.0.try_into().expect("height fits in Coord"),
            dim.1.try_into().expect("width fits in Coord"),
        )
    }

    pub fn count(&self) -> CellCount {
        self.count
    }

    pub fn total_cells(&self) -> CellCount {
        self.mask
            .len()
            .try_into()
            .expect("cell count fits in CellCount")
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        self.mask[coords.to_nd_index()]
    }

    pub fn iter_bombs(&self) -> impl Iterator<Item = Coord2> + '_ {
        self.mask
            .indexed_iter()
            .filter(|&(_, &is_bomb)| is_bomb)
            .map(|((row, col), _)| {
                (
                    row.try_into().expect("row fits in Coord"),
                    col.try_into().expect("col fits in Coord"),
                )
            })
    }
}
