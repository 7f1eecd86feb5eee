//! Pending challenges: offers keyed by `(challenger, challenged, game_id)`,
//! created by `/challenge` and consumed by `/accept` or `/decline`. No TTL.

use std::collections::BTreeMap;

/// A pending offer to play.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub game_id: u64,
    pub challenger: String,
    pub challenged: String,
}

/// The set of pending challenges, keyed by the game id pre-allocated for
/// them when accepted.
#[derive(Default)]
pub struct ChallengeList {
    challenges: BTreeMap<u64, Challenge>,
}

impl ChallengeList {
    pub fn new() -> ChallengeList {
        ChallengeList {
            challenges: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, challenger: impl Into<String>, challenged: impl Into<String>, game_id: u64) {
        self.challenges.insert(
            game_id,
            Challenge {
                game_id,
                challenger: challenger.into(),
                challenged: challenged.into(),
            },
        );
    }

    /// Atomically extracts the challenge matching both `game_id` and
    /// `challenged`, the only party allowed to accept or decline it.
    pub fn find_and_remove(&mut self, game_id: u64, challenged: &str) -> Option<Challenge> {
        if self.challenges.get(&game_id)?.challenged == challenged {
            self.challenges.remove(&game_id)
        } else {
            None
        }
    }

    pub fn get(&self, game_id: u64) -> Option<&Challenge> {
        self.challenges.get(&game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_and_remove_requires_matching_challenged_party() {
        let mut list = ChallengeList::new();
        list.add("alice", "bob", 1);

        assert!(list.find_and_remove(1, "carol").is_none());
        assert!(list.get(1).is_some());

        let challenge = list.find_and_remove(1, "bob").unwrap();
        assert_eq!(challenge.challenger, "alice");
        assert!(list.get(1).is_none());
    }
}
