//! `Shared` owns every piece of state more than one connection can touch,
//! and the synchronization primitives guarding each of them. Session
//! handlers borrow an `Arc<Shared>`; this is the seam the concurrency
//! model's lock-ordering rule (`clients -> challenges -> games`) applies
//! to. In practice each command handler acquires at most one of these
//! locks at a time, copies out what it needs, releases it, then performs
//! any socket I/O; see `dispatch.rs`.

use std::io;

use tokio::sync::Mutex;

use crate::challenge::ChallengeList;
use crate::config::Params;
use crate::games::GameTable;
use crate::registry::ClientRegistry;
use crate::user::UserStore;

pub struct Shared {
    pub users: UserStore,
    pub clients: Mutex<ClientRegistry>,
    pub challenges: Mutex<ChallengeList>,
    pub games: Mutex<GameTable>,
}

impl Shared {
    pub fn try_new(params: &Params) -> io::Result<Shared> {
        Ok(Shared {
            users: UserStore::new(&params.users_dir)?,
            clients: Mutex::new(ClientRegistry::new(params.max_clients)),
            challenges: Mutex::new(ChallengeList::new()),
            games: Mutex::new(GameTable::load(&params.games_dir)?),
        })
    }
}
