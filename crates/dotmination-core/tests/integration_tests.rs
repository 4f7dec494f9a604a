//! Integration tests for the Dotmination game engine.
//!
//! These tests drive complete matches through the public API: bots against
//! bots, host and follower snapshots, and real-time play.

use dotmination_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

const MAX_MOVES: usize = 5_000;

/// Check the invariants every settled board must hold
fn assert_settled(board: &Board) {
    assert!(!board.is_resolving(), "Board should be unlocked between moves");
    for cell in board.cells() {
        assert!(cell.stage <= MAX_STAGE);
        assert_eq!(cell.pending_increments, 0);
        assert_eq!(cell.owner.is_some(), cell.stage >= 1, "cell {}", cell.index);
    }
}

/// Play bot against bot until the match ends or the move cap is hit
fn play_out(game: &mut GameState, bots: &mut [Bot; 2]) -> usize {
    let mut moves = 0;
    while !game.is_finished() && moves < MAX_MOVES {
        let bot = &mut bots[game.current_player.index()];
        let resolution = bot.play(game).unwrap();
        assert!(resolution.is_some(), "Bot to move should always find a cell");
        assert_settled(&game.board);
        moves += 1;
    }
    moves
}

#[test]
fn test_smart_against_random_on_random_map() {
    let mut rng = StdRng::seed_from_u64(7);
    let board = Board::random(9, 7, &mut rng).unwrap();
    let mut game = GameState::with_board(GameMode::Random, board);
    let mut bots = [
        Bot::with_seed(Player::P1, BotDifficulty::Smart, 1),
        Bot::with_seed(Player::P2, BotDifficulty::Random, 2),
    ];

    let moves = play_out(&mut game, &mut bots);
    // The winning move ends the match without being counted
    let counted = if game.is_finished() { moves - 1 } else { moves };
    assert_eq!(game.move_count as usize, counted);

    if let Some(winner) = game.winner() {
        assert!(game.board.piece_count(winner) > 0);
        assert_eq!(game.board.piece_count(winner.opponent()), 0);
        assert!(game.move_count >= 2);
    }
}

#[test]
fn test_bot_games_on_blank_board() {
    for seed in 0..5 {
        let mut game = GameState::new(GameMode::Multiplayer, 5, 5).unwrap();
        let mut bots = [
            Bot::with_seed(Player::P1, BotDifficulty::Smart, seed),
            Bot::with_seed(Player::P2, BotDifficulty::Smart, seed + 100),
        ];
        play_out(&mut game, &mut bots);
        assert_settled(&game.board);
    }
}

#[test]
fn test_regular_ladder_progression() {
    let mut game = GameState::new(GameMode::Regular, 9, 7).unwrap();
    assert_eq!(game.level, 1);
    assert_eq!(game.board, Board::for_level(9, 7, 1).unwrap());

    game.phase = MatchPhase::Terminal { winner: Player::P1 };
    let events = game.apply_action(Player::P1, GameAction::NextMatch).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::MatchStarted {
            starter: Player::P1,
            level: 2
        }]
    );
    assert_eq!(game.move_count, 0);
    assert!(!game.is_finished());
}

#[test]
fn test_follower_renders_host_snapshots() {
    // 16 rows of 3 and 2 cells alternate: 40 cells
    let mut host = GameState::new(GameMode::Multiplayer, 16, 3).unwrap();
    let mut follower = GameState::new(GameMode::Multiplayer, 16, 3).unwrap();
    assert_eq!(host.board.len(), 40);

    let first = host.snapshot();
    assert_eq!(first.map_string, "0".repeat(40));
    follower.apply_snapshot(&first).unwrap();
    assert!(follower.board.cells().iter().all(Cell::is_empty));
    assert_eq!(follower.current_player, Player::P1);

    let mut bots = [
        Bot::with_seed(Player::P1, BotDifficulty::Random, 11),
        Bot::with_seed(Player::P2, BotDifficulty::Smart, 12),
    ];
    for _ in 0..30 {
        if host.is_finished() {
            break;
        }
        bots[host.current_player.index()].play(&mut host).unwrap();
        follower.apply_snapshot(&host.snapshot()).unwrap();
        assert_eq!(follower.board, host.board);
        assert_eq!(follower.current_player, host.current_player);
        assert_eq!(follower.move_count, host.move_count);
    }
}

#[test]
fn test_optimistic_moves_match_host() {
    // Both sides run the same engine on the same move, so boards agree
    let map = "0".repeat(40);
    let mut host = GameState::with_board(GameMode::Multiplayer, Board::decode(16, 3, &map).unwrap());
    let mut follower = host.clone();

    for (player, index) in [(Player::P1, 0), (Player::P2, 39), (Player::P1, 0), (Player::P2, 39)] {
        host.apply_move(player, index).unwrap();
        follower.board.apply_move(index, player).unwrap();
        assert_eq!(follower.board.encode(), host.board.encode());
    }
}

#[test]
fn test_full_cell_spreads_to_every_neighbor() {
    let mut board = Board::new(9, 7).unwrap();
    let target = 30;
    let neighbors = board.neighbors_of(target).to_vec();
    board.set_cell(target, MAX_STAGE, Some(Player::P1));

    let resolution = board.apply_move(target, Player::P1).unwrap();
    assert!(resolution.exploded);
    assert!(board.cell(target).unwrap().is_empty());
    for index in neighbors {
        let cell = board.cell(index).unwrap();
        assert_eq!((cell.stage, cell.owner), (1, Some(Player::P1)));
    }
}

#[test]
fn test_map_string_survives_json() {
    let mut rng = StdRng::seed_from_u64(99);
    let board = Board::random(9, 7, &mut rng).unwrap();
    let json = serde_json::to_string(&board).unwrap();
    assert!(json.contains("\"map\""));
    let back: Board = serde_json::from_str(&json).unwrap();
    assert_eq!(back, board);
    assert_eq!(back.neighbors_of(10), board.neighbors_of(10));
}

#[test]
fn test_events_serialize_for_front_end() {
    let mut game = GameState::new(GameMode::Multiplayer, 3, 3).unwrap();
    let resolution = game.apply_move(Player::P1, 0).unwrap();
    let json = serde_json::to_value(&resolution.events).unwrap();
    assert_eq!(json[0]["CellClaimed"]["index"], 0);
    assert_eq!(json[0]["CellClaimed"]["player"], "P1");
}

#[test]
fn test_realtime_bot_against_idle_player() {
    let start = Instant::now();
    let mut board = Board::new(5, 5).unwrap();
    board.set_cell(0, 1, Some(Player::P1));
    board.set_cell(22, 1, Some(Player::P2));
    let mut game = RealTimeMatch::new(board, RealTimeConfig::default(), start);
    let mut bot = AggressiveBot::with_seed(Player::P2, 4);

    let mut accepted = 0;
    let mut now = start;
    for _ in 0..2_000 {
        if game.is_finished() {
            break;
        }
        game.tick(now);
        if bot.play(&mut game, now).unwrap().is_some() {
            accepted += 1;
            game.settle();
            assert_settled(game.board());
        }
        now += Duration::from_millis(100);
    }

    assert!(accepted > 0);
    // Moves are limited by regeneration, never faster than the cooldown
    let elapsed = now.duration_since(start);
    assert!(accepted as u128 <= elapsed.as_millis() / realtime::ACTION_COOLDOWN.as_millis() + 1);
    if let Some(winner) = game.winner() {
        assert_eq!(winner, Player::P2);
    }
}
