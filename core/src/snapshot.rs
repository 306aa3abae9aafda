use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Immutable capture of the player-visible board state.
///
/// Bomb placement and adjacency counts are deliberately absent: the layout
/// does not change between new games, so restoring one of these on top of
/// the live board brings back exactly the pre-click picture. The aggregate
/// counters are carried along so a caller can redraw its displays without
/// recounting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    states: Array2<CellState>,
    squares_revealed: CellCount,
    bombs_left: CellCount,
}

impl BoardSnapshot {
    pub(crate) fn new(
        states: Array2<CellState>,
        squares_revealed: CellCount,
        bombs_left: CellCount,
    ) -> Self {
        Self {
            states,
            squares_revealed,
            bombs_left,
        }
    }

    pub fn states(&self) -> &Array2<CellState> {
        &self.states
    }

    pub fn squares_revealed(&self) -> CellCount {
        self.squares_revealed
    }

    pub fn bombs_left(&self) -> CellCount {
        self.bombs_left
    }
}

/// LIFO stack of snapshots plus the per-game undo budget.
///
/// The stack grows by one on every checkpoint and is emptied on new game or
/// difficulty change. The budget only moves down, one per successful undo,
/// and never below zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UndoHistory {
    stack: Vec<BoardSnapshot>,
    saved_count: u32,
    remaining: u32,
}

impl UndoHistory {
    pub fn new(budget: u32) -> Self {
        Self {
            stack: Vec::new(),
            saved_count: 0,
            remaining: budget,
        }
    }

    pub fn push(&mut self, snapshot: BoardSnapshot) {
        self.stack.push(snapshot);
        self.saved_count += 1;
    }

    /// Pops the most recent snapshot, spending one undo.
    ///
    /// Fails with [`GameError::NoUndoAvailable`] when the budget is spent or
    /// nothing was ever saved; nothing changes in that case.
    pub fn pop(&mut self) -> Result<BoardSnapshot> {
        if self.remaining == 0 {
            return Err(GameError::NoUndoAvailable);
        }
        let snapshot = self.stack.pop().ok_or(GameError::NoUndoAvailable)?;
        self.remaining -= 1;
        Ok(snapshot)
    }

    /// Empties the stack and restores the budget, the new-game transition.
    pub fn clear(&mut self, budget: u32) {
        self.stack.clear();
        self.saved_count = 0;
        self.remaining = budget;
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Snapshots taken since the last clear, including ones already undone.
    pub fn saved_count(&self) -> u32 {
        self.saved_count
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
