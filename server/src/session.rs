//! Per-connection state machine: RECV_USERNAME -> AUTHENTICATING ->
//! ACTIVE -> CLOSED. One of these runs per accepted connection; the
//! acceptor loop in `main` spawns one task per connection and moves on.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{info, warn};

use crate::dispatch;
use crate::frame::{Message, MessageCodec, MessageKind};
use crate::registry::Tx;
use crate::state::Shared;
use crate::user::{is_valid_username, User};

type Conn = Framed<TcpStream, MessageCodec>;

/// Drives one connection from handshake through disconnect. Transport
/// and persistence failures end the session quietly; command-level
/// errors never do (the dispatcher replies and the loop continues).
pub async fn handle_connection(state: Arc<Shared>, stream: TcpStream, addr: SocketAddr) {
    let mut conn = Framed::new(stream, MessageCodec);

    let username = match receive_username(&mut conn).await {
        Some(username) => username,
        None => return,
    };

    if !authenticate(&mut conn, &state, &username).await {
        return;
    }

    run_active_session(state, conn, addr, username).await;
}

/// RECV_USERNAME: read one message, validate it, and make sure nobody
/// else online is already using it. Returns `None` on any failure path
/// (an EXIT has already been sent to the client where appropriate).
async fn receive_username(conn: &mut Conn) -> Option<String> {
    let msg = match conn.next().await {
        Some(Ok(msg)) if msg.kind != MessageKind::Exit => msg,
        _ => return None,
    };

    let username = msg.username;
    if !is_valid_username(&username) {
        let _ = conn
            .send(Message::exit("Invalid username: must be 1-31 alphanumeric characters."))
            .await;
        return None;
    }

    Some(username)
}

/// AUTHENTICATING: prompt for a password against an existing record, or
/// create a new one, per §4.7.
async fn authenticate(conn: &mut Conn, state: &Shared, username: &str) -> bool {
    let existing = match state.users.load(username) {
        Ok(user) => user,
        Err(e) => {
            warn!(%username, error = %e, "failed to load user record");
            let _ = conn.send(Message::exit("Internal error loading your account.")).await;
            return false;
        }
    };

    match existing {
        Some(user) => loop {
            if conn.send(Message::server("Password:")).await.is_err() {
                return false;
            }
            let msg = match conn.next().await {
                Some(Ok(msg)) if msg.kind != MessageKind::Exit => msg,
                _ => return false,
            };
            if msg.data == user.password {
                return true;
            }
            if conn
                .send(Message::server("Incorrect password"))
                .await
                .is_err()
            {
                return false;
            }
        },
        None => {
            if conn.send(Message::server("Create Password:")).await.is_err() {
                return false;
            }
            let password_msg = match conn.next().await {
                Some(Ok(msg)) if msg.kind != MessageKind::Exit => msg,
                _ => return false,
            };

            if conn.send(Message::server("Biography:")).await.is_err() {
                return false;
            }
            let bio_msg = match conn.next().await {
                Some(Ok(msg)) if msg.kind != MessageKind::Exit => msg,
                _ => return false,
            };

            let mut user = User::new(username, password_msg.data);
            user.biography = bio_msg.data;
            if let Err(e) = state.users.save(&user) {
                warn!(%username, error = %e, "failed to persist new user record");
                let _ = conn.send(Message::exit("Internal error creating your account.")).await;
                return false;
            }
            true
        }
    }
}

/// ACTIVE: claim a registry slot, announce the connection, and run the
/// command loop until EXIT or a transport error. CLOSED releases the
/// slot on every exit path.
async fn run_active_session(state: Arc<Shared>, mut conn: Conn, addr: SocketAddr, username: String) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    {
        let mut clients = state.clients.lock().await;
        if let Err(e) = clients.claim(&username, tx) {
            drop(clients);
            let _ = conn.send(Message::exit(e.to_string())).await;
            return;
        }
    }

    info!(%username, %addr, "connected");

    let (mut sink, mut stream) = conn.split();

    if sink.send(Message::server(format!("Welcome, {}!", username))).await.is_err() {
        release(&state, &username).await;
        return;
    }
    {
        let clients = state.clients.lock().await;
        clients.broadcast(
            &Message::server(format!("{} has connected", username)),
            &username,
        );
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if sink.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(msg)) if msg.kind == MessageKind::Exit => break,
                    Some(Ok(msg)) => {
                        if let Some(command) = msg.data.strip_prefix('/') {
                            if dispatch::handle_command(&state, &username, command).await {
                                break;
                            }
                        } else {
                            let clients = state.clients.lock().await;
                            clients.broadcast(&Message::text(&username, msg.data), &username);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%username, error = %e, "framing error, closing connection");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!(%username, "disconnected");
    release(&state, &username).await;
}

async fn release(state: &Shared, username: &str) {
    let mut clients = state.clients.lock().await;
    clients.release(username);
}
