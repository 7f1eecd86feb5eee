//! The user registry: persistent profiles keyed by username, loaded and
//! saved as flat files under a configurable directory (`./users/` by
//! default). Friend lists are unilateral and capped at `MAX_FRIENDS`.

use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Maximum number of friends a user may accumulate.
pub const MAX_FRIENDS: usize = 100;

/// A persistent user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
    pub biography: String,
    pub friends: Vec<String>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> User {
        User {
            username: username.into(),
            password: password.into(),
            biography: String::new(),
            friends: Vec::new(),
        }
    }

    pub fn is_friend(&self, other: &str) -> bool {
        self.friends.iter().any(|f| f == other)
    }
}

/// Errors the user registry's friend-list operations can produce.
#[derive(Debug)]
pub enum UserError {
    NoSuchUser,
    CannotFriendSelf,
    AlreadyFriends,
    FriendListFull,
    NotFriends,
    Io(io::Error),
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UserError::NoSuchUser => write!(f, "No such user."),
            UserError::CannotFriendSelf => write!(f, "You can't friend yourself."),
            UserError::AlreadyFriends => write!(f, "Already on your friends list."),
            UserError::FriendListFull => write!(f, "Your friends list is full."),
            UserError::NotFriends => write!(f, "That user isn't on your friends list."),
            UserError::Io(e) => write!(f, "A persistence error occurred: {}", e),
        }
    }
}

impl std::error::Error for UserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UserError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for UserError {
    fn from(source: io::Error) -> Self {
        UserError::Io(source)
    }
}

/// File-backed store for `User` records under a single directory.
pub struct UserStore {
    dir: PathBuf,
}

impl UserStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<UserStore> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(UserStore { dir })
    }

    fn path_for(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}.dat", username))
    }

    /// Loads a user record. Returns `Ok(None)` when no such file exists;
    /// that is not an error, it means "no such user".
    pub fn load(&self, username: &str) -> io::Result<Option<User>> {
        let path = self.path_for(username);
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut lines = BufReader::new(file).lines();
        let password = lines.next().transpose()?.unwrap_or_default();
        let biography = lines.next().transpose()?.unwrap_or_default();
        let mut friends = Vec::new();
        for line in lines {
            let line = line?;
            if friends.len() >= MAX_FRIENDS {
                break;
            }
            if !line.is_empty() {
                friends.push(line);
            }
        }

        Ok(Some(User {
            username: username.to_string(),
            password,
            biography,
            friends,
        }))
    }

    pub fn exists(&self, username: &str) -> bool {
        self.path_for(username).is_file()
    }

    /// Overwrites the user's file: password, biography, then one friend
    /// per line. Empty friend slots are never written, so the on-disk
    /// line count can be less than `MAX_FRIENDS`.
    pub fn save(&self, user: &User) -> io::Result<()> {
        let path = self.path_for(&user.username);
        let mut file = fs::File::create(&path)?;
        writeln!(file, "{}", user.password)?;
        writeln!(file, "{}", user.biography)?;
        for friend in &user.friends {
            writeln!(file, "{}", friend)?;
        }
        Ok(())
    }

    pub fn add_friend(&self, username: &str, friend: &str) -> Result<(), UserError> {
        if username == friend {
            return Err(UserError::CannotFriendSelf);
        }
        let mut user = self.load(username)?.ok_or(UserError::NoSuchUser)?;
        if user.is_friend(friend) {
            return Err(UserError::AlreadyFriends);
        }
        if user.friends.len() >= MAX_FRIENDS {
            return Err(UserError::FriendListFull);
        }
        user.friends.push(friend.to_string());
        self.save(&user)?;
        Ok(())
    }

    /// Removes `friend` from `username`'s list, compacting the remaining
    /// entries left to fill the removed slot.
    pub fn remove_friend(&self, username: &str, friend: &str) -> Result<(), UserError> {
        let mut user = self.load(username)?.ok_or(UserError::NoSuchUser)?;
        let before = user.friends.len();
        user.friends.retain(|f| f != friend);
        if user.friends.len() == before {
            return Err(UserError::NotFriends);
        }
        self.save(&user)?;
        Ok(())
    }

    pub fn is_friend(&self, username: &str, friend: &str) -> Result<bool, UserError> {
        let user = self.load(username)?.ok_or(UserError::NoSuchUser)?;
        Ok(user.is_friend(friend))
    }
}

/// Validates a username against spec: 1-31 alphanumeric characters.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 31
        && username.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn users_dir_default() -> &'static Path {
    Path::new("./users")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("awale-user-test-{}-{}", label, std::process::id()));
        dir
    }

    #[test]
    fn missing_user_loads_as_none() {
        let dir = temp_dir("missing");
        let store = UserStore::new(&dir).unwrap();
        assert!(store.load("nobody").unwrap().is_none());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = temp_dir("roundtrip");
        let store = UserStore::new(&dir).unwrap();
        let mut user = User::new("alice", "hunter2");
        user.biography = "hello world".to_string();
        user.friends.push("bob".to_string());

        store.save(&user).unwrap();
        let loaded = store.load("alice").unwrap().unwrap();
        assert_eq!(loaded, user);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn add_friend_rejects_self() {
        let dir = temp_dir("self-friend");
        let store = UserStore::new(&dir).unwrap();
        store.save(&User::new("alice", "pw")).unwrap();
        let err = store.add_friend("alice", "alice").unwrap_err();
        assert!(matches!(err, UserError::CannotFriendSelf));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn remove_friend_compacts_list() {
        let dir = temp_dir("remove-friend");
        let store = UserStore::new(&dir).unwrap();
        let mut user = User::new("alice", "pw");
        user.friends = vec!["bob".into(), "carol".into(), "dave".into()];
        store.save(&user).unwrap();

        store.remove_friend("alice", "carol").unwrap();
        let loaded = store.load("alice").unwrap().unwrap();
        assert_eq!(loaded.friends, vec!["bob".to_string(), "dave".to_string()]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn remove_friend_not_present_errors() {
        let dir = temp_dir("remove-missing");
        let store = UserStore::new(&dir).unwrap();
        store.save(&User::new("alice", "pw")).unwrap();
        let err = store.remove_friend("alice", "ghost").unwrap_err();
        assert!(matches!(err, UserError::NotFriends));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("alice123"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"a".repeat(32)));
    }
}
