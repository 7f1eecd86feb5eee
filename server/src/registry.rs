//! The online client table: a fixed-capacity map from username to a send
//! handle, plus the single-slot matchmaking waiter it co-guards (release
//! on disconnect must also be able to clear the waiter, so both live
//! behind the same lock (see the concurrency model's guardian table).

use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::error::ServerError;
use crate::frame::Message;

/// Sender half used to push a `Message` to one connected client.
pub type Tx = mpsc::UnboundedSender<Message>;

/// The online client table.
pub struct ClientRegistry {
    capacity: usize,
    clients: BTreeMap<String, Tx>,
    waiter: Option<String>,
}

impl ClientRegistry {
    pub fn new(capacity: usize) -> ClientRegistry {
        ClientRegistry {
            capacity,
            clients: BTreeMap::new(),
            waiter: None,
        }
    }

    /// Claims `username` for a new session. Rejects the claim if the
    /// name is already taken or the table is full.
    pub fn claim(&mut self, username: &str, tx: Tx) -> Result<(), ServerError> {
        if self.clients.contains_key(username) {
            return Err(ServerError::UsernameTaken);
        }
        if self.clients.len() >= self.capacity {
            return Err(ServerError::ServerFull);
        }
        self.clients.insert(username.to_string(), tx);
        Ok(())
    }

    /// Releases a disconnecting user's slot. If they were the
    /// matchmaking waiter, that slot is cleared too.
    pub fn release(&mut self, username: &str) {
        self.clients.remove(username);
        if self.waiter.as_deref() == Some(username) {
            self.waiter = None;
        }
    }

    pub fn find(&self, username: &str) -> Option<&Tx> {
        self.clients.get(username)
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.clients.contains_key(username)
    }

    pub fn usernames(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Sends `msg` to every connected client except `except`.
    pub fn broadcast(&self, msg: &Message, except: &str) {
        for (username, tx) in self.clients.iter() {
            if username != except {
                let _ = tx.send(msg.clone());
            }
        }
    }

    pub fn send_to(&self, username: &str, msg: Message) -> bool {
        match self.clients.get(username) {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Enqueues `username` as the matchmaking waiter; returns the
    /// previously-waiting username, if any, so the caller can pair them
    /// up without holding the lock across any I/O.
    pub fn take_or_enqueue_waiter(&mut self, username: &str) -> Option<String> {
        match self.waiter.take() {
            Some(waiting) => Some(waiting),
            None => {
                self.waiter = Some(username.to_string());
                None
            }
        }
    }

    pub fn waiter(&self) -> Option<&str> {
        self.waiter.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Tx {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    #[test]
    fn claim_rejects_duplicate_names() {
        let mut registry = ClientRegistry::new(10);
        registry.claim("alice", tx()).unwrap();
        let err = registry.claim("alice", tx()).unwrap_err();
        assert!(matches!(err, ServerError::UsernameTaken));
    }

    #[test]
    fn claim_rejects_when_full() {
        let mut registry = ClientRegistry::new(1);
        registry.claim("alice", tx()).unwrap();
        let err = registry.claim("bob", tx()).unwrap_err();
        assert!(matches!(err, ServerError::ServerFull));
    }

    #[test]
    fn release_clears_matchmaking_waiter() {
        let mut registry = ClientRegistry::new(10);
        registry.claim("alice", tx()).unwrap();
        assert!(registry.take_or_enqueue_waiter("alice").is_none());
        assert_eq!(registry.waiter(), Some("alice"));

        registry.release("alice");
        assert_eq!(registry.waiter(), None);
    }

    #[test]
    fn matchmaking_pairs_waiter_with_next_caller() {
        let mut registry = ClientRegistry::new(10);
        assert!(registry.take_or_enqueue_waiter("alice").is_none());
        let paired = registry.take_or_enqueue_waiter("bob");
        assert_eq!(paired.as_deref(), Some("alice"));
        assert_eq!(registry.waiter(), None);
    }
}
