//! The Awalé rules engine: board state, move validation, sowing, capture,
//! end-of-game detection, and the two serialized forms a `Game` takes:
//! the human-readable INFO snapshot sent to clients, and the pipe-delimited
//! record written to `./games/game_<id>.dat`.
//!
//! Holes are 0-indexed everywhere in this module; the 1-indexed hole
//! numbers a player types at the prompt are converted to 0-indexed before
//! reaching `Game::make_move`.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Not;

/// Total number of holes on the board.
pub const NUM_HOLES: usize = 12;
/// Seeds placed in each hole when a game starts.
pub const INITIAL_SEEDS_PER_HOLE: u32 = 4;
/// Maximum number of spectators a single game may accumulate.
pub const MAX_WATCHERS: usize = 100;

/// Which of the two players a hole or a move belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    P0,
    P1,
}

impl Player {
    pub fn index(self) -> usize {
        match self {
            Player::P0 => 0,
            Player::P1 => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Player> {
        match index {
            0 => Some(Player::P0),
            1 => Some(Player::P1),
            _ => None,
        }
    }

    /// Holes 0..6 belong to P0, 6..12 to P1.
    fn owns(self, hole: usize) -> bool {
        match self {
            Player::P0 => hole < NUM_HOLES / 2,
            Player::P1 => hole >= NUM_HOLES / 2,
        }
    }
}

impl Not for Player {
    type Output = Player;

    fn not(self) -> Player {
        match self {
            Player::P0 => Player::P1,
            Player::P1 => Player::P0,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Whether a game is still being played and, if not, who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    P0Won,
    P1Won,
    Draw,
}

impl GameStatus {
    fn from_scores(scores: [u32; 2]) -> GameStatus {
        use std::cmp::Ordering;
        match scores[0].cmp(&scores[1]) {
            Ordering::Greater => GameStatus::P0Won,
            Ordering::Less => GameStatus::P1Won,
            Ordering::Equal => GameStatus::Draw,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Ongoing => "ongoing",
            GameStatus::P0Won => "p0 won",
            GameStatus::P1Won => "p1 won",
            GameStatus::Draw => "draw",
        }
    }
}

/// Whether a game can be watched by non-participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn from_flag(flag: u8) -> Option<Visibility> {
        match flag {
            0 => Some(Visibility::Private),
            1 => Some(Visibility::Public),
            _ => None,
        }
    }

    pub fn as_flag(self) -> u8 {
        match self {
            Visibility::Private => 0,
            Visibility::Public => 1,
        }
    }
}

/// The discriminated result of attempting a move, per the return-code
/// conventions design note: every small-integer result the original
/// overloads gets its own variant here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// The move was applied and the game continues.
    Continue,
    /// The move was applied and ended the game.
    GameOver,
    /// It is not this player's turn.
    NotYourTurn,
    /// The hole chosen is not on the caller's side of the board.
    WrongSide,
    /// The hole chosen has no seeds in it.
    EmptyHole,
}

/// One played move, recorded in the order it was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub player: Player,
    pub hole: usize,
}

/// An in-memory Awalé session.
#[derive(Debug, Clone)]
pub struct Game {
    pub game_id: u64,
    pub players: [String; 2],
    pub board: [u32; NUM_HOLES],
    pub scores: [u32; 2],
    pub turn: Player,
    pub status: GameStatus,
    pub visibility: Visibility,
    pub move_history: Vec<HistoryEntry>,
    pub watchers: BTreeSet<String>,
}

impl Game {
    /// Creates a new game with the standard opening board: 4 seeds per
    /// hole, zero scores, P0 to move, private visibility.
    pub fn new(game_id: u64, player0: impl Into<String>, player1: impl Into<String>) -> Game {
        Game {
            game_id,
            players: [player0.into(), player1.into()],
            board: [INITIAL_SEEDS_PER_HOLE; NUM_HOLES],
            scores: [0, 0],
            turn: Player::P0,
            status: GameStatus::Ongoing,
            visibility: Visibility::Private,
            move_history: Vec::new(),
            watchers: BTreeSet::new(),
        }
    }

    pub fn player_index(&self, username: &str) -> Option<Player> {
        if self.players[0] == username {
            Some(Player::P0)
        } else if self.players[1] == username {
            Some(Player::P1)
        } else {
            None
        }
    }

    pub fn is_participant(&self, username: &str) -> bool {
        self.player_index(username).is_some()
    }

    /// Validates and, if legal, executes a move: sowing, capture,
    /// end-of-game redistribution, and turn advancement.
    pub fn make_move(&mut self, player: Player, hole: usize) -> MoveResult {
        if self.turn != player {
            return MoveResult::NotYourTurn;
        }
        if hole >= NUM_HOLES || !player.owns(hole) {
            return MoveResult::WrongSide;
        }
        if self.board[hole] == 0 {
            return MoveResult::EmptyHole;
        }

        let seeds = self.board[hole];
        self.board[hole] = 0;
        let mut pos = hole;
        for _ in 0..seeds {
            pos = (pos + 1) % NUM_HOLES;
            self.board[pos] += 1;
        }

        let mut captured = 0u32;
        loop {
            let on_opponent_side = match player {
                Player::P0 => pos >= NUM_HOLES / 2,
                Player::P1 => pos < NUM_HOLES / 2,
            };
            if !on_opponent_side {
                break;
            }
            if self.board[pos] == 2 || self.board[pos] == 3 {
                captured += self.board[pos];
                self.board[pos] = 0;
                pos = (pos + NUM_HOLES - 1) % NUM_HOLES;
            } else {
                break;
            }
        }
        self.scores[player.index()] += captured;

        self.move_history.push(HistoryEntry { player, hole });

        if self.side_is_empty(Player::P0) || self.side_is_empty(Player::P1) {
            for i in 0..NUM_HOLES {
                let owner = if i < NUM_HOLES / 2 { 0 } else { 1 };
                self.scores[owner] += self.board[i];
                self.board[i] = 0;
            }
            self.status = GameStatus::from_scores(self.scores);
            return MoveResult::GameOver;
        }

        self.turn = !self.turn;
        MoveResult::Continue
    }

    fn side_is_empty(&self, player: Player) -> bool {
        let (start, end) = match player {
            Player::P0 => (0, NUM_HOLES / 2),
            Player::P1 => (NUM_HOLES / 2, NUM_HOLES),
        };
        self.board[start..end].iter().all(|&seeds| seeds == 0)
    }

    /// Sets the result a forfeit produces: the forfeiting player loses
    /// outright, regardless of score.
    pub fn forfeit(&mut self, forfeiting: Player) {
        self.status = match forfeiting {
            Player::P0 => GameStatus::P1Won,
            Player::P1 => GameStatus::P0Won,
        };
    }

    /// Human-readable multi-line INFO snapshot sent to clients, and
    /// parsed back by `Game::from_info_string` so a client can render
    /// the board locally without re-deriving it.
    pub fn to_info_string(&self) -> String {
        format!(
            "Game ID: {}\nPlayers: {} vs {}\nScores: {}: {}, {}: {}\nBoard: {}\nNext turn: {}\n",
            self.game_id,
            self.players[0],
            self.players[1],
            self.players[0],
            self.scores[0],
            self.players[1],
            self.scores[1],
            self.board
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            self.players[self.turn.index()],
        )
    }

    pub fn from_info_string(s: &str) -> Result<Game, ParseGameError> {
        let mut lines = s.lines();

        let game_id = lines
            .next()
            .and_then(|l| l.strip_prefix("Game ID: "))
            .and_then(|v| v.trim().parse().ok())
            .ok_or(ParseGameError)?;

        let (p0, p1) = lines
            .next()
            .and_then(|l| l.strip_prefix("Players: "))
            .and_then(|v| v.split_once(" vs "))
            .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
            .ok_or(ParseGameError)?;

        let scores_line = lines.next().ok_or(ParseGameError)?;
        let scores_body = scores_line.strip_prefix("Scores: ").ok_or(ParseGameError)?;
        let (s0, s1) = scores_body.split_once(", ").ok_or(ParseGameError)?;
        let score0: u32 = s0
            .split_once(": ")
            .and_then(|(_, v)| v.trim().parse().ok())
            .ok_or(ParseGameError)?;
        let score1: u32 = s1
            .split_once(": ")
            .and_then(|(_, v)| v.trim().parse().ok())
            .ok_or(ParseGameError)?;

        let board_line = lines
            .next()
            .and_then(|l| l.strip_prefix("Board: "))
            .ok_or(ParseGameError)?;
        let mut board = [0u32; NUM_HOLES];
        for (slot, piece) in board.iter_mut().zip(board_line.split(", ")) {
            *slot = piece.trim().parse().map_err(|_| ParseGameError)?;
        }

        let turn_name = lines
            .next()
            .and_then(|l| l.strip_prefix("Next turn: "))
            .map(|v| v.trim())
            .ok_or(ParseGameError)?;
        let turn = if turn_name == p0 {
            Player::P0
        } else {
            Player::P1
        };

        Ok(Game {
            game_id,
            players: [p0, p1],
            board,
            scores: [score0, score1],
            turn,
            status: GameStatus::Ongoing,
            visibility: Visibility::Private,
            move_history: Vec::new(),
            watchers: BTreeSet::new(),
        })
    }

    /// Pipe-delimited persistence record, per the schema:
    /// `id|p0|p1|score0|score1|turn|b0..b11|mover0|hole0|mover1|hole1|...`
    pub fn to_record(&self) -> String {
        let mut fields = vec![
            self.game_id.to_string(),
            self.players[0].clone(),
            self.players[1].clone(),
            self.scores[0].to_string(),
            self.scores[1].to_string(),
            self.turn.index().to_string(),
        ];
        fields.extend(self.board.iter().map(|s| s.to_string()));
        for entry in &self.move_history {
            fields.push(entry.player.index().to_string());
            fields.push(entry.hole.to_string());
        }
        fields.join("|")
    }

    /// Reconstitutes a `Game` from a persisted record.
    ///
    /// Reads each `(player, hole)` move-history pair into its own
    /// variables and appends to `move_history`. Board and turn are
    /// parsed once from their own dedicated fields above and are never
    /// touched while scanning history, unlike the reference loader this
    /// schema replaces, which aliased the scan cursor with `state.turn`
    /// and `state.board[0]`.
    pub fn from_record(record: &str) -> Result<Game, ParseGameError> {
        let mut fields = record.split('|');

        let game_id = fields.next().ok_or(ParseGameError)?.parse().map_err(|_| ParseGameError)?;
        let p0 = fields.next().ok_or(ParseGameError)?.to_string();
        let p1 = fields.next().ok_or(ParseGameError)?.to_string();
        let score0 = fields.next().ok_or(ParseGameError)?.parse().map_err(|_| ParseGameError)?;
        let score1 = fields.next().ok_or(ParseGameError)?.parse().map_err(|_| ParseGameError)?;
        let turn_index: usize = fields.next().ok_or(ParseGameError)?.parse().map_err(|_| ParseGameError)?;
        let turn = Player::from_index(turn_index).ok_or(ParseGameError)?;

        let mut board = [0u32; NUM_HOLES];
        for slot in board.iter_mut() {
            *slot = fields.next().ok_or(ParseGameError)?.parse().map_err(|_| ParseGameError)?;
        }

        let mut move_history = Vec::new();
        loop {
            let mover = match fields.next() {
                Some(v) => v,
                None => break,
            };
            let hole = fields.next().ok_or(ParseGameError)?;
            let mover: usize = mover.parse().map_err(|_| ParseGameError)?;
            let hole: usize = hole.parse().map_err(|_| ParseGameError)?;
            move_history.push(HistoryEntry {
                player: Player::from_index(mover).ok_or(ParseGameError)?,
                hole,
            });
        }

        let scores = [score0, score1];
        Ok(Game {
            game_id,
            players: [p0, p1],
            board,
            scores,
            turn,
            status: GameStatus::Ongoing,
            visibility: Visibility::Private,
            move_history,
            watchers: BTreeSet::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseGameError;

impl fmt::Display for ParseGameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed game record")
    }
}

impl std::error::Error for ParseGameError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_seeds(game: &Game) -> u32 {
        game.board.iter().sum::<u32>() + game.scores[0] + game.scores[1]
    }

    #[test]
    fn initial_board_matches_spec() {
        let game = Game::new(1, "alice", "bob");
        assert_eq!(game.board, [4; NUM_HOLES]);
        assert_eq!(game.scores, [0, 0]);
        assert_eq!(game.turn, Player::P0);
    }

    #[test]
    fn simple_sow_no_capture() {
        let mut game = Game::new(1, "alice", "bob");
        // 1-indexed hole 3 -> 0-indexed hole 2.
        let result = game.make_move(Player::P0, 2);
        assert_eq!(result, MoveResult::Continue);
        assert_eq!(game.board[2], 0);
        assert_eq!(&game.board[3..7], &[5, 5, 5, 5]);
        assert_eq!(game.scores, [0, 0]);
        assert_eq!(game.turn, Player::P1);
    }

    #[test]
    fn capture_walks_backward_on_opponent_side() {
        let mut game = Game::new(1, "alice", "bob");
        game.board = [0, 0, 0, 0, 0, 1, 1, 2, 0, 0, 0, 0];
        game.turn = Player::P0;

        // Hole 5 is P0's only non-empty hole, so this move also empties
        // P0's side: the capture takes hole 6's 2 seeds for P0, then
        // end-of-game redistribution hands hole 7's remaining 2 seeds
        // to P1, leaving a 2-2 draw.
        let result = game.make_move(Player::P0, 5);
        assert_eq!(result, MoveResult::GameOver);
        assert_eq!(game.board, [0; NUM_HOLES]);
        assert_eq!(game.scores, [2, 2]);
        assert_eq!(game.status, GameStatus::Draw);
    }

    #[test]
    fn seed_total_is_conserved_across_a_move() {
        let mut game = Game::new(1, "alice", "bob");
        let before = total_seeds(&game);
        game.make_move(Player::P0, 2);
        assert_eq!(total_seeds(&game), before);
    }

    #[test]
    fn rejected_move_does_not_toggle_turn() {
        let mut game = Game::new(1, "alice", "bob");
        let result = game.make_move(Player::P1, 0);
        assert_eq!(result, MoveResult::NotYourTurn);
        assert_eq!(game.turn, Player::P0);
    }

    #[test]
    fn wrong_side_hole_is_rejected() {
        let mut game = Game::new(1, "alice", "bob");
        let result = game.make_move(Player::P0, 6);
        assert_eq!(result, MoveResult::WrongSide);
    }

    #[test]
    fn empty_hole_is_rejected() {
        let mut game = Game::new(1, "alice", "bob");
        game.board[0] = 0;
        let result = game.make_move(Player::P0, 0);
        assert_eq!(result, MoveResult::EmptyHole);
    }

    #[test]
    fn game_over_redistributes_all_remaining_seeds() {
        let mut game = Game::new(1, "alice", "bob");
        // Hole 5 sows one seed into each of P1's six holes, turning every
        // one of them into a 2 and triggering a full backward capture
        // that empties both sides at once.
        game.board = [0, 0, 0, 0, 0, 6, 1, 1, 1, 1, 1, 1];
        game.scores = [18, 18];
        game.turn = Player::P0;

        let result = game.make_move(Player::P0, 5);
        assert_eq!(result, MoveResult::GameOver);
        assert_eq!(game.board.iter().sum::<u32>(), 0);
        assert_eq!(game.scores[0] + game.scores[1], 48);
        assert_ne!(game.status, GameStatus::Ongoing);
    }

    #[test]
    fn info_string_round_trips() {
        let mut game = Game::new(7, "alice", "bob");
        game.make_move(Player::P0, 1);
        let rendered = game.to_info_string();
        let parsed = Game::from_info_string(&rendered).unwrap();

        assert_eq!(parsed.game_id, game.game_id);
        assert_eq!(parsed.players, game.players);
        assert_eq!(parsed.scores, game.scores);
        assert_eq!(parsed.board, game.board);
        assert_eq!(parsed.turn, game.turn);
    }

    #[test]
    fn record_round_trips_including_history() {
        let mut game = Game::new(3, "alice", "bob");
        game.make_move(Player::P0, 1);
        game.make_move(Player::P1, 7);

        let record = game.to_record();
        let parsed = Game::from_record(&record).unwrap();

        assert_eq!(parsed.game_id, game.game_id);
        assert_eq!(parsed.players, game.players);
        assert_eq!(parsed.board, game.board);
        assert_eq!(parsed.scores, game.scores);
        assert_eq!(parsed.turn, game.turn);
        assert_eq!(parsed.move_history, game.move_history);
    }

    #[test]
    fn move_history_reload_does_not_alias_board_or_turn() {
        // Regression test for the known source defect: the reloader must
        // read each (player, hole) pair into its own variables rather
        // than aliasing the scan cursor with board/turn state.
        let mut game = Game::new(9, "alice", "bob");
        game.make_move(Player::P0, 0);
        game.make_move(Player::P1, 6);
        game.make_move(Player::P0, 1);

        let board_before = game.board;
        let turn_before = game.turn;
        let record = game.to_record();
        let parsed = Game::from_record(&record).unwrap();

        assert_eq!(parsed.board, board_before);
        assert_eq!(parsed.turn, turn_before);
        assert_eq!(parsed.move_history.len(), 3);
    }
}
