use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::*;

/// The game model: one board plus the game-level state around it.
///
/// Owns the undo history and the elapsed-time origin, and exposes the
/// command/query surface the session layer drives. Counters are answered
/// from the board on demand; the engine never caches them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEngine {
    board: Board,
    config: GameConfig,
    history: UndoHistory,
    started_at: DateTime<Utc>,
    undo_budget: u32,
}

impl GameEngine {
    /// Engine with randomly placed bombs.
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_placer(config, RandomBombPlacer::from_entropy())
    }

    /// Engine with seed-deterministic bomb placement.
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self> {
        Self::with_placer(config, RandomBombPlacer::new(seed))
    }

    fn with_placer(config: GameConfig, placer: impl BombPlacer) -> Result<Self> {
        let board = Board::generate(config.size(), config.bombs, placer)?;
        Ok(Self::assemble(board, config))
    }

    /// Engine over a fixed layout, the seam tests and replays use.
    ///
    /// The layout must match the config's shape and bomb count.
    pub fn with_layout(config: GameConfig, layout: &BombLayout) -> Result<Self> {
        if layout.size() != config.size() || layout.count() != config.bombs {
            return Err(GameError::InvalidParameters);
        }
        let board = Board::new(layout)?;
        Ok(Self::assemble(board, config))
    }

    fn assemble(board: Board, config: GameConfig) -> Self {
        Self {
            board,
            config,
            history: UndoHistory::new(DEFAULT_UNDO_BUDGET),
            started_at: Utc::now(),
            undo_budget: DEFAULT_UNDO_BUDGET,
        }
    }

    /// Replaces the per-game undo budget, effective immediately.
    pub fn with_undo_budget(mut self, budget: u32) -> Self {
        self.undo_budget = budget;
        self.history.clear(budget);
        self
    }

    /// Stores new game parameters without touching the current board.
    ///
    /// Presets ignore any supplied triple; `Custom` requires one and
    /// validates it. On failure nothing changes and the caller keeps the
    /// previous parameters. Rebuilding for the new shape is the separate
    /// [`GameEngine::rebuild_board`] step.
    pub fn set_parameters(
        &mut self,
        difficulty: Difficulty,
        custom: Option<(Coord, Coord, CellCount)>,
    ) -> Result<()> {
        let config = match difficulty.dimensions() {
            Some(_) => GameConfig::preset(difficulty),
            None => {
                let (height, width, bombs) = custom.ok_or_else(|| {
                    log::warn!("custom difficulty requested without dimensions");
                    GameError::InvalidParameters
                })?;
                GameConfig::custom(height, width, bombs)?
            }
        };
        self.config = config;
        log::debug!(
            "parameters set: {:?} {}x{} with {} bombs",
            config.difficulty,
            config.height,
            config.width,
            config.bombs
        );
        Ok(())
    }

    /// Builds a fresh board for the stored parameters. The previous board
    /// stays in place if construction fails.
    pub fn rebuild_board(&mut self) -> Result<()> {
        self.rebuild_board_with(RandomBombPlacer::from_entropy())
    }

    pub fn rebuild_board_with(&mut self, placer: impl BombPlacer) -> Result<()> {
        self.board = Board::generate(self.config.size(), self.config.bombs, placer)?;
        Ok(())
    }

    /// Starts a new game on the current board shape: fresh bombs, empty
    /// undo history, full budget, elapsed origin now.
    pub fn new_game(&mut self) -> Result<()> {
        self.new_game_with(RandomBombPlacer::from_entropy())
    }

    pub fn new_game_with(&mut self, placer: impl BombPlacer) -> Result<()> {
        self.board.regenerate(placer)?;
        self.history.clear(self.undo_budget);
        self.started_at = Utc::now();
        log::debug!(
            "new game: {}x{} with {} bombs",
            self.board.height(),
            self.board.width(),
            self.board.bombs_total()
        );
        Ok(())
    }

    /// Pushes a snapshot of the board so the next undo lands on the state
    /// right before the mutation that follows.
    pub fn save_checkpoint(&mut self) {
        self.history.push(self.board.snapshot());
        log::debug!("checkpoint #{} saved", self.history.saved_count());
    }

    /// Restores the most recent checkpoint and spends one undo.
    pub fn undo(&mut self) -> Result<BoardSnapshot> {
        let snapshot = self.history.pop()?;
        self.board.restore(&snapshot);
        log::debug!("undo applied, {} left", self.history.remaining());
        Ok(snapshot)
    }

    /// Reveals the cell and reports `(bomb, adjacent_bombs)`.
    pub fn reveal_at(&mut self, coords: Coord2) -> Result<(bool, u8)> {
        Ok(self.board.cell_mut(coords)?.reveal())
    }

    /// Flags a hidden cell if flags are still available. `Ok(true)` when the
    /// cell changed; at the flag cap or on a non-hidden cell nothing happens.
    pub fn flag_at(&mut self, coords: Coord2) -> Result<bool> {
        if self.board.bombs_left() == 0 {
            return self.board.cell(coords).map(|_| false);
        }
        let cell = self.board.cell_mut(coords)?;
        if cell.state().is_hidden() {
            cell.state = CellState::Flagged;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Removes a flag. Unflagging is always allowed.
    pub fn unflag_at(&mut self, coords: Coord2) -> Result<bool> {
        let cell = self.board.cell_mut(coords)?;
        if cell.state().is_flagged() {
            cell.state = CellState::Hidden;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn difficulty(&self) -> Difficulty {
        self.config.difficulty
    }

    pub fn height(&self) -> Coord {
        self.board.height()
    }

    pub fn width(&self) -> Coord {
        self.board.width()
    }

    pub fn bombs_total(&self) -> CellCount {
        self.board.bombs_total()
    }

    pub fn bombs_left(&self) -> CellCount {
        self.board.bombs_left()
    }

    pub fn squares_revealed(&self) -> CellCount {
        self.board.squares_revealed()
    }

    pub fn is_revealed(&self, coords: Coord2) -> Result<bool> {
        Ok(self.board.cell(coords)?.state().is_revealed())
    }

    pub fn cell_state(&self, coords: Coord2) -> Result<CellState> {
        Ok(self.board.cell(coords)?.state())
    }

    pub fn adjacent_bombs(&self, coords: Coord2) -> Result<u8> {
        Ok(self.board.cell(coords)?.adjacent_bombs())
    }

    pub fn undos_remaining(&self) -> u32 {
        self.history.remaining()
    }

    pub fn checkpoints_taken(&self) -> u32 {
        self.history.saved_count()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds since the current game began.
    pub fn elapsed_secs(&self) -> u32 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u32
    }
}
