use thiserror::Error;

use crate::types::CellCount;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid bomb count: {bombs} bombs for {cells} cells")]
    InvalidBombCount { bombs: CellCount, cells: CellCount },
    #[error("Invalid game parameters")]
    InvalidParameters,
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("No undo available")]
    NoUndoAvailable,
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
}

pub type Result<T> = core::result::Result<T, GameError>;
