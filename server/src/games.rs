//! The active game table: in-memory games keyed by id, the `next_game_id`
//! allocator, and the on-disk persistence that backs both.
//!
//! On startup every `game_<id>.dat` file is read to reconstitute
//! `next_game_id` as `max(loaded ids) + 1` (or 1 if none exist). Per the
//! open question this spec resolves explicitly: completed games are left
//! on disk but excluded from the active in-memory table, so a finished
//! game stops showing up in `/listgames` etc. once play on it ends,
//! though its file is never deleted.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::game::{Game, GameStatus};

pub struct GameTable {
    dir: PathBuf,
    games: BTreeMap<u64, Game>,
    next_game_id: u64,
}

impl GameTable {
    pub fn load(dir: impl Into<PathBuf>) -> io::Result<GameTable> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut games = BTreeMap::new();
        let mut max_id = 0u64;

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_game_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("game_") && n.ends_with(".dat"))
                .unwrap_or(false);
            if !is_game_file {
                continue;
            }

            let contents = fs::read_to_string(&path)?;
            if let Ok(game) = Game::from_record(contents.trim()) {
                max_id = max_id.max(game.game_id);
                if game.status == GameStatus::Ongoing {
                    games.insert(game.game_id, game);
                }
            }
        }

        Ok(GameTable {
            dir,
            games,
            next_game_id: max_id + 1,
        })
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_game_id;
        self.next_game_id += 1;
        id
    }

    fn path_for(&self, game_id: u64) -> PathBuf {
        self.dir.join(format!("game_{}.dat", game_id))
    }

    /// Writes the current state of `game` to disk. Best-effort per the
    /// error handling design: a persistence failure is reported to the
    /// caller, but the in-memory state the caller already applied stands.
    pub fn persist(&self, game: &Game) -> io::Result<()> {
        fs::write(self.path_for(game.game_id), game.to_record())
    }

    /// Same as `persist`, but takes an already-rendered record. Lets a
    /// caller holding a live `&mut Game` borrow (from `get_mut`) render
    /// the record, drop that borrow, and persist without re-borrowing
    /// the table while the game is still mutably borrowed.
    pub fn persist_record(&self, game_id: u64, record: &str) -> io::Result<()> {
        fs::write(self.path_for(game_id), record)
    }

    pub fn insert(&mut self, game: Game) {
        self.games.insert(game.game_id, game);
    }

    pub fn get(&self, game_id: u64) -> Option<&Game> {
        self.games.get(&game_id)
    }

    pub fn get_mut(&mut self, game_id: u64) -> Option<&mut Game> {
        self.games.get_mut(&game_id)
    }

    /// Removes a game from the active table after a move ends it
    /// naturally. Its persisted file is left on disk untouched.
    pub fn remove(&mut self, game_id: u64) -> Option<Game> {
        self.games.remove(&game_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Player;

    fn temp_dir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("awale-games-test-{}-{}", label, std::process::id()));
        dir
    }

    #[test]
    fn next_game_id_resumes_after_highest_loaded_id() {
        let dir = temp_dir("resume-id");
        {
            let mut table = GameTable::load(&dir).unwrap();
            let id = table.allocate_id();
            let game = Game::new(id, "alice", "bob");
            table.persist(&game).unwrap();
            table.insert(game);
        }

        let table = GameTable::load(&dir).unwrap();
        assert_eq!(table.get(1).map(|g| g.game_id), Some(1));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn completed_games_are_excluded_from_the_reloaded_active_table() {
        let dir = temp_dir("exclude-terminal");
        {
            let table = GameTable::load(&dir).unwrap();
            let mut game = Game::new(1, "alice", "bob");
            game.make_move(Player::P0, 0);
            game.status = crate::game::GameStatus::P0Won;
            table.persist(&game).unwrap();
        }

        let table = GameTable::load(&dir).unwrap();
        assert!(table.get(1).is_none());
        assert_eq!(table.iter().count(), 0);

        fs::remove_dir_all(&dir).ok();
    }
}
