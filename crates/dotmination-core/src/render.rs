//! Presentation hooks.
//!
//! The engine never draws. A front end implements [`BoardRenderer`] to
//! receive boards and report clicks; the helpers here feed a move through
//! the game and hand every intermediate board to the renderer.

use crate::actions::GameEvent;
use crate::board::Board;
use crate::chain::Resolution;
use crate::game::{GameError, GameState};
use crate::player::Player;

/// A view of the board supplied by the presentation layer
pub trait BoardRenderer {
    /// Draw the given board
    fn render(&mut self, board: &Board);

    /// The cell the user last clicked, if any
    fn clicked_cell(&self) -> Option<usize>;
}

/// Apply the renderer's clicked cell for `player`, then redraw once.
///
/// Returns `Ok(None)` when nothing was clicked.
pub fn play_click<R>(game: &mut GameState, player: Player, renderer: &mut R) -> Result<Option<Resolution>, GameError>
where
    R: BoardRenderer + ?Sized,
{
    let Some(index) = renderer.clicked_cell() else {
        return Ok(None);
    };
    let resolution = game.apply_move(player, index)?;
    renderer.render(&game.board);
    Ok(Some(resolution))
}

/// Apply a move one chain step at a time, rendering after each step
pub fn animate_move<R>(
    game: &mut GameState,
    player: Player,
    index: usize,
    renderer: &mut R,
) -> Result<Vec<GameEvent>, GameError>
where
    R: BoardRenderer + ?Sized,
{
    let mut events = vec![game.begin_move(player, index)?];
    renderer.render(&game.board);
    while let Some(event) = game.step() {
        if !matches!(event, GameEvent::TurnPassed { .. } | GameEvent::GameWon { .. }) {
            renderer.render(&game.board);
        }
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameMode;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<String>,
        click: Option<usize>,
    }

    impl BoardRenderer for RecordingRenderer {
        fn render(&mut self, board: &Board) {
            self.frames.push(board.encode());
        }

        fn clicked_cell(&self) -> Option<usize> {
            self.click
        }
    }

    #[test]
    fn test_play_click_renders_result() {
        let mut game = GameState::new(GameMode::Multiplayer, 1, 4).unwrap();
        let mut renderer = RecordingRenderer {
            click: Some(2),
            ..Default::default()
        };

        let resolution = play_click(&mut game, Player::P1, &mut renderer).unwrap();
        assert!(resolution.is_some());
        assert_eq!(renderer.frames, vec!["0010".to_string()]);
        assert_eq!(game.current_player, Player::P2);
    }

    #[test]
    fn test_no_click_is_a_no_op() {
        let mut game = GameState::new(GameMode::Multiplayer, 1, 4).unwrap();
        let mut renderer = RecordingRenderer::default();
        assert_eq!(play_click(&mut game, Player::P1, &mut renderer).unwrap(), None);
        assert!(renderer.frames.is_empty());
    }

    #[test]
    fn test_rejected_click_does_not_render() {
        let mut game = GameState::new(GameMode::Multiplayer, 1, 4).unwrap();
        let mut renderer = RecordingRenderer {
            click: Some(1),
            ..Default::default()
        };
        assert_eq!(
            play_click(&mut game, Player::P2, &mut renderer),
            Err(GameError::NotYourTurn)
        );
        assert!(renderer.frames.is_empty());
    }

    #[test]
    fn test_animation_shows_each_chain_step() {
        let board = Board::decode(1, 4, "5500").unwrap();
        let mut game = GameState::with_board(GameMode::Multiplayer, board);
        let mut renderer = RecordingRenderer::default();

        let events = animate_move(&mut game, Player::P1, 0, &mut renderer).unwrap();

        assert_eq!(
            renderer.frames,
            vec![
                "0500".to_string(),
                "0000".to_string(),
                "1000".to_string(),
                "1010".to_string(),
            ]
        );
        assert!(matches!(events.last(), Some(GameEvent::TurnPassed { .. })));
    }
}
