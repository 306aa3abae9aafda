use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::*;

/// Lifecycle of a single game.
///
/// `Won` and `Lost` are terminal until a new game starts, with one
/// exception: undoing after a loss rolls the session back to `Playing`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::Playing
    }
}

/// Actions worth offering the player when a game ends.
///
/// Picking `Undo` or `NewGame` comes back as the matching command;
/// quitting is the front end's own affair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndChoice {
    Undo,
    NewGame,
    Quit,
}

/// Display instruction handed back to the presentation layer.
///
/// The core never draws; it answers each inbound command with the sequence
/// of these the front end has to apply, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    CellRevealed { coords: Coord2, adjacent_bombs: u8 },
    CellRevealedBomb { coords: Coord2 },
    CellFlagged { coords: Coord2 },
    CellUnflagged { coords: Coord2 },
    CellReset { coords: Coord2 },
    BoardRebuilt { height: Coord, width: Coord },
    GameWon,
    GameLost { undos_remaining: u32 },
}

/// Click-driven orchestration over one [`GameEngine`].
///
/// Everything the surrounding window does lands here as a command:
/// left-click, right-click, new game, difficulty change, undo. The session
/// mutates the engine, tracks win/loss, and describes the resulting display
/// changes as [`Directive`]s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    engine: GameEngine,
    status: GameStatus,
}

impl GameSession {
    /// Session over a fresh randomly-placed board.
    pub fn new(config: GameConfig) -> Result<Self> {
        Ok(Self::with_engine(GameEngine::new(config)?))
    }

    /// Session with seed-deterministic placement.
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self> {
        Ok(Self::with_engine(GameEngine::with_seed(config, seed)?))
    }

    pub fn with_engine(engine: GameEngine) -> Self {
        Self {
            engine,
            status: GameStatus::Playing,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Reveals a cell.
    ///
    /// Checkpoints once before mutating, so a later undo rolls back this
    /// click in full, flood cascade included. Flagged and already-revealed
    /// cells are left alone; so is everything once the game is over.
    pub fn left_click(&mut self, coords: Coord2) -> Result<Vec<Directive>> {
        if self.status.is_final() {
            return Ok(Vec::new());
        }
        if !self.engine.board().cell(coords)?.state().is_hidden() {
            return Ok(Vec::new());
        }

        self.engine.save_checkpoint();

        let mut directives = Vec::new();
        let (bomb, adjacent_bombs) = self.engine.reveal_at(coords)?;
        if bomb {
            self.lose(coords, &mut directives);
            return Ok(directives);
        }

        directives.push(Directive::CellRevealed {
            coords,
            adjacent_bombs,
        });
        if adjacent_bombs == 0 {
            self.flood_reveal(coords, &mut directives)?;
        }

        if self.engine.squares_revealed() == self.engine.board().safe_cells() {
            self.status = GameStatus::Won;
            log::debug!("game won, {} squares revealed", self.engine.squares_revealed());
            directives.push(Directive::GameWon);
        }
        Ok(directives)
    }

    /// Toggles a flag.
    ///
    /// Flags are capped at the bomb total; at the cap the click does
    /// nothing. Unflagging always works. Revealed cells are ignored.
    pub fn right_click(&mut self, coords: Coord2) -> Result<Vec<Directive>> {
        if self.status.is_final() {
            return Ok(Vec::new());
        }

        let mut directives = Vec::new();
        match self.engine.board().cell(coords)?.state() {
            CellState::Revealed => {}
            CellState::Flagged => {
                if self.engine.unflag_at(coords)? {
                    directives.push(Directive::CellUnflagged { coords });
                }
            }
            CellState::Hidden => {
                if self.engine.flag_at(coords)? {
                    directives.push(Directive::CellFlagged { coords });
                }
            }
        }
        Ok(directives)
    }

    /// Starts a new game on the current parameters.
    pub fn new_game(&mut self) -> Result<Vec<Directive>> {
        self.engine.new_game()?;
        self.status = GameStatus::Playing;
        Ok(self.board_reset_directives())
    }

    /// Applies a difficulty change and starts a game on the new board.
    ///
    /// Validation failures mutate nothing; the caller keeps the previous
    /// game and may re-prompt or fall back to the default preset.
    pub fn set_difficulty(
        &mut self,
        difficulty: Difficulty,
        custom: Option<(Coord, Coord, CellCount)>,
    ) -> Result<Vec<Directive>> {
        self.engine.set_parameters(difficulty, custom)?;
        self.engine.rebuild_board()?;
        self.new_game()
    }

    /// Rolls back to the latest checkpoint.
    ///
    /// A loss rolls back to `Playing`; the bomb click and its cascade are
    /// gone. A won game stays won. The returned directives redraw the
    /// whole restored board.
    pub fn undo(&mut self) -> Result<Vec<Directive>> {
        if matches!(self.status, GameStatus::Won) {
            return Err(GameError::AlreadyEnded);
        }
        self.engine.undo()?;
        self.status = GameStatus::Playing;
        Ok(self.redraw_directives())
    }

    /// What to offer the player right now. Undo only shows up after a loss
    /// with budget left to spend.
    pub fn end_choices(&self) -> &'static [EndChoice] {
        use EndChoice::*;
        match self.status {
            GameStatus::Playing => &[],
            GameStatus::Won => &[NewGame, Quit],
            GameStatus::Lost if self.engine.undos_remaining() > 0 => &[Undo, NewGame, Quit],
            GameStatus::Lost => &[NewGame, Quit],
        }
    }

    // poll-style queries for the periodic display refresh
    pub fn bombs_left(&self) -> CellCount {
        self.engine.bombs_left()
    }

    pub fn squares_revealed(&self) -> CellCount {
        self.engine.squares_revealed()
    }

    pub fn undos_remaining(&self) -> u32 {
        self.engine.undos_remaining()
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.engine.elapsed_secs()
    }

    fn lose(&mut self, hit: Coord2, directives: &mut Vec<Directive>) {
        self.status = GameStatus::Lost;
        directives.push(Directive::CellRevealedBomb { coords: hit });
        // show the rest of the field, the classic end-of-game reveal
        for coords in self.engine.board().iter_bomb_coords() {
            if coords != hit {
                directives.push(Directive::CellRevealedBomb { coords });
            }
        }
        let undos_remaining = self.engine.undos_remaining();
        log::debug!("bomb hit at {:?}, {} undos remaining", hit, undos_remaining);
        directives.push(Directive::GameLost { undos_remaining });
    }

    /// Breadth-first reveal of the zero region around `start` and its
    /// numbered border.
    ///
    /// A cell can sit in the queue more than once; the state check at pop
    /// makes the second visit a no-op, so every cell is revealed at most
    /// once and the loop runs at most one iteration per enqueued cell.
    /// Neighbors of a zero cell are never bombs, so no bomb can be
    /// enqueued; flagged cells are filtered out and stay untouched.
    fn flood_reveal(&mut self, start: Coord2, directives: &mut Vec<Directive>) -> Result<()> {
        let mut to_visit: VecDeque<Coord2> = self.hidden_neighbors(start).collect();
        log::trace!("flood start at {:?}, frontier {:?}", start, to_visit);

        while let Some(visit) = to_visit.pop_front() {
            if !self.is_hidden(visit) {
                continue;
            }

            let (_, adjacent_bombs) = self.engine.reveal_at(visit)?;
            directives.push(Directive::CellRevealed {
                coords: visit,
                adjacent_bombs,
            });
            log::trace!("flood revealed {:?}, count {}", visit, adjacent_bombs);

            if adjacent_bombs == 0 {
                to_visit.extend(self.hidden_neighbors(visit));
            }
        }
        Ok(())
    }

    fn is_hidden(&self, coords: Coord2) -> bool {
        self.engine
            .board()
            .cell(coords)
            .is_ok_and(|cell| cell.state().is_hidden())
    }

    fn hidden_neighbors(&self, coords: Coord2) -> impl Iterator<Item = Coord2> + '_ {
        self.engine
            .board()
            .neighbors(coords)
            .filter(move |&pos| self.is_hidden(pos))
    }

    fn board_reset_directives(&self) -> Vec<Directive> {
        let board = self.engine.board();
        let (height, width) = board.size();
        let mut directives = Vec::with_capacity(usize::from(board.total_cells()) + 1);
        directives.push(Directive::BoardRebuilt { height, width });
        directives.extend(
            board
                .indexed_cells()
                .map(|(coords, _)| Directive::CellReset { coords }),
        );
        directives
    }

    fn redraw_directives(&self) -> Vec<Directive> {
        let board = self.engine.board();
        board
            .indexed_cells()
            .map(|(coords, cell)| match cell.state() {
                CellState::Hidden => Directive::CellReset { coords },
                CellState::Flagged => Directive::CellFlagged { coords },
                CellState::Revealed => Directive::CellRevealed {
                    coords,
                    adjacent_bombs: cell.adjacent_bombs(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(size: Coord2, bombs: &[Coord2]) -> GameSession {
        let layout = BombLayout::from_bomb_coords(size, bombs).unwrap();
        let config = GameConfig {
            difficulty: Difficulty::Custom,
            height: size.0,
            width: size.1,
            bombs: bombs.len() as CellCount,
        };
        GameSession::with_engine(GameEngine::with_layout(config, &layout).unwrap())
    }

    fn revealed_coords(directives: &[Directive]) -> Vec<Coord2> {
        directives
            .iter()
            .filter_map(|directive| match directive {
                Directive::CellRevealed { coords, .. } => Some(*coords),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn revealing_a_numbered_cell_does_not_cascade() {
        let mut session = session((5, 5), &[(0, 0)]);
        let directives = session.left_click((1, 1)).unwrap();
        assert_eq!(
            directives,
            vec![Directive::CellRevealed {
                coords: (1, 1),
                adjacent_bombs: 1
            }]
        );
        assert_eq!(session.status(), GameStatus::Playing);
    }

    #[test]
    fn corner_flood_reveals_everything_but_the_bomb_and_wins() {
        // 5x5, one bomb at (0,0): revealing the far corner floods the whole
        // board, the three bomb-adjacent cells come out numbered 1, and the
        // 24th reveal wins the game.
        let mut session = session((5, 5), &[(0, 0)]);
        let directives = session.left_click((4, 4)).unwrap();

        let revealed = revealed_coords(&directives);
        assert_eq!(revealed.len(), 24);
        assert!(!revealed.contains(&(0, 0)));

        for directive in &directives {
            if let Directive::CellRevealed {
                coords,
                adjacent_bombs,
            } = directive
            {
                let expected = match coords {
                    (0, 1) | (1, 0) | (1, 1) => 1,
                    _ => 0,
                };
                assert_eq!(*adjacent_bombs, expected, "wrong count at {coords:?}");
            }
        }

        assert_eq!(directives.last(), Some(&Directive::GameWon));
        assert_eq!(session.status(), GameStatus::Won);
        assert_eq!(session.squares_revealed(), 24);
    }

    #[test]
    fn flood_stops_at_flags_and_never_lifts_them() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.right_click((2, 2)).unwrap();

        let directives = session.left_click((4, 4)).unwrap();
        let revealed = revealed_coords(&directives);
        assert!(!revealed.contains(&(2, 2)));
        assert_eq!(revealed.len(), 23);

        // not a win: the flagged safe cell is still hidden
        assert_eq!(session.status(), GameStatus::Playing);
        assert!(
            session
                .engine()
                .board()
                .cell((2, 2))
                .unwrap()
                .state()
                .is_flagged()
        );

        // unflag and reveal it to finish
        session.right_click((2, 2)).unwrap();
        let directives = session.left_click((2, 2)).unwrap();
        assert_eq!(directives.last(), Some(&Directive::GameWon));
        assert_eq!(session.status(), GameStatus::Won);
    }

    #[test]
    fn flagged_cell_is_protected_from_left_click() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.right_click((3, 3)).unwrap();

        assert_eq!(session.left_click((3, 3)).unwrap(), Vec::new());
        assert_eq!(session.engine().checkpoints_taken(), 0);
        assert_eq!(session.squares_revealed(), 0);
    }

    #[test]
    fn repeat_left_click_is_a_no_op() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((1, 1)).unwrap();
        assert_eq!(session.left_click((1, 1)).unwrap(), Vec::new());
        assert_eq!(session.engine().checkpoints_taken(), 1);
    }

    #[test]
    fn bomb_click_loses_and_shows_the_field() {
        let mut session = session((5, 5), &[(0, 0), (2, 3)]);
        let directives = session.left_click((0, 0)).unwrap();

        assert_eq!(
            directives.first(),
            Some(&Directive::CellRevealedBomb { coords: (0, 0) })
        );
        assert!(directives.contains(&Directive::CellRevealedBomb { coords: (2, 3) }));
        assert_eq!(
            directives.last(),
            Some(&Directive::GameLost {
                undos_remaining: DEFAULT_UNDO_BUDGET
            })
        );
        assert_eq!(session.status(), GameStatus::Lost);
    }

    #[test]
    fn game_over_ignores_further_clicks() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((0, 0)).unwrap();
        assert_eq!(session.status(), GameStatus::Lost);

        assert_eq!(session.left_click((4, 4)).unwrap(), Vec::new());
        assert_eq!(session.right_click((4, 4)).unwrap(), Vec::new());
        assert_eq!(session.squares_revealed(), 1);
    }

    #[test]
    fn undo_after_loss_returns_to_play() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((1, 1)).unwrap();
        session.left_click((0, 0)).unwrap();
        assert_eq!(session.status(), GameStatus::Lost);

        let directives = session.undo().unwrap();
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.undos_remaining(), DEFAULT_UNDO_BUDGET - 1);

        // the bomb cell is hidden again, the earlier reveal survives
        assert!(directives.contains(&Directive::CellReset { coords: (0, 0) }));
        assert!(directives.contains(&Directive::CellRevealed {
            coords: (1, 1),
            adjacent_bombs: 1
        }));
        assert_eq!(session.squares_revealed(), 1);
    }

    #[test]
    fn one_undo_reverts_a_whole_cascade() {
        let mut session = session((5, 5), &[(0, 0), (0, 2)]);
        let directives = session.left_click((4, 4)).unwrap();
        assert!(revealed_coords(&directives).len() > 1);
        assert_eq!(session.engine().checkpoints_taken(), 1);

        session.undo().unwrap();
        assert_eq!(session.squares_revealed(), 0);
    }

    #[test]
    fn undo_after_win_is_rejected() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((4, 4)).unwrap();
        assert_eq!(session.status(), GameStatus::Won);
        assert_eq!(session.undo(), Err(GameError::AlreadyEnded));
        assert_eq!(session.status(), GameStatus::Won);
    }

    #[test]
    fn end_choices_follow_status_and_budget() {
        let mut lost = session((5, 5), &[(0, 0)]);
        assert_eq!(lost.end_choices(), &[] as &[EndChoice]);
        lost.left_click((0, 0)).unwrap();
        assert_eq!(
            lost.end_choices(),
            &[EndChoice::Undo, EndChoice::NewGame, EndChoice::Quit]
        );

        let mut won = session((5, 5), &[(0, 0)]);
        won.left_click((4, 4)).unwrap();
        assert_eq!(won.end_choices(), &[EndChoice::NewGame, EndChoice::Quit]);

        // without budget, undo drops out of the offer
        let engine = session((5, 5), &[(0, 0)]).engine().clone().with_undo_budget(0);
        let mut broke = GameSession::with_engine(engine);
        broke.left_click((0, 0)).unwrap();
        assert_eq!(broke.end_choices(), &[EndChoice::NewGame, EndChoice::Quit]);
    }

    #[test]
    fn undo_with_no_history_reports_no_undo() {
        let mut session = session((5, 5), &[(0, 0)]);
        assert_eq!(session.undo(), Err(GameError::NoUndoAvailable));
    }

    #[test]
    fn flag_cap_and_unflag_directives() {
        let mut session = session((5, 5), &[(0, 0)]);
        assert_eq!(
            session.right_click((1, 1)).unwrap(),
            vec![Directive::CellFlagged { coords: (1, 1) }]
        );
        assert_eq!(session.bombs_left(), 0);

        // at the cap, flagging a second cell does nothing
        assert_eq!(session.right_click((2, 2)).unwrap(), Vec::new());

        assert_eq!(
            session.right_click((1, 1)).unwrap(),
            vec![Directive::CellUnflagged { coords: (1, 1) }]
        );
        assert_eq!(session.bombs_left(), 1);
    }

    #[test]
    fn right_click_on_revealed_cell_is_ignored() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((1, 1)).unwrap();
        assert_eq!(session.right_click((1, 1)).unwrap(), Vec::new());
    }

    #[test]
    fn new_game_resets_board_and_status() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((0, 0)).unwrap();
        assert_eq!(session.status(), GameStatus::Lost);

        let directives = session.new_game().unwrap();
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.squares_revealed(), 0);
        assert_eq!(session.undos_remaining(), DEFAULT_UNDO_BUDGET);
        assert_eq!(
            directives.first(),
            Some(&Directive::BoardRebuilt {
                height: 5,
                width: 5
            })
        );
        assert_eq!(directives.len(), 26);
        assert_eq!(session.engine().board().iter_bomb_coords().count(), 1);
    }

    #[test]
    fn set_difficulty_rebuilds_for_the_preset() {
        let mut session = session((5, 5), &[(0, 0)]);
        let directives = session.set_difficulty(Difficulty::Medium, None).unwrap();
        assert_eq!(
            directives.first(),
            Some(&Directive::BoardRebuilt {
                height: 14,
                width: 18
            })
        );
        assert_eq!(session.engine().bombs_total(), 40);
        assert_eq!(session.engine().difficulty(), Difficulty::Medium);
    }

    #[test]
    fn rejected_custom_difficulty_keeps_the_current_game() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((1, 1)).unwrap();

        // height below the custom minimum
        assert_eq!(
            session.set_difficulty(Difficulty::Custom, Some((3, 10, 5))),
            Err(GameError::InvalidParameters)
        );
        assert_eq!(session.engine().board().size(), (5, 5));
        assert_eq!(session.engine().difficulty(), Difficulty::Custom);
        assert_eq!(session.squares_revealed(), 1);
    }

    #[test]
    fn accepted_custom_difficulty_applies_immediately() {
        let mut session = session((5, 5), &[(0, 0)]);
        session
            .set_difficulty(Difficulty::Custom, Some((6, 7, 10)))
            .unwrap();
        assert_eq!(session.engine().board().size(), (6, 7));
        assert_eq!(session.engine().bombs_total(), 10);
        assert_eq!(session.engine().board().iter_bomb_coords().count(), 10);
    }

    #[test]
    fn out_of_bounds_click_is_an_error() {
        let mut session = session((5, 5), &[(0, 0)]);
        assert_eq!(session.left_click((5, 0)), Err(GameError::InvalidCoords));
        assert_eq!(session.right_click((0, 5)), Err(GameError::InvalidCoords));
    }

    #[test]
    fn session_serde_round_trip() {
        let mut session = session((5, 5), &[(0, 0)]);
        session.left_click((1, 1)).unwrap();
        session.right_click((2, 2)).unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let back: GameSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
        assert_eq!(back.status(), GameStatus::Playing);
    }
}
