//! Parses slash-commands, validates arguments and authorization, invokes
//! the relevant service, and formats the reply. Every command either
//! replies with a single SERVER message describing a problem, or carries
//! out its effect and notifies whoever needs to know; it never
//! disconnects the caller. `/exit` is the one exception: it signals the
//! session loop to close by returning `true`.

use rand::Rng;

use crate::frame::Message;
use crate::game::{Game, MoveResult, Visibility};
use crate::state::Shared;

const HELP_TEXT: &str = "\
Available commands:
  /help                       Show this message
  /list                       List connected users
  /info <user>                Show a user's biography
  /bio <text>                 Set your own biography
  /addfriend <user>           Add a friend
  /removefriend <user>        Remove a friend
  /getfriends                 List your friends
  /mp <user> <msg>            Send a private message
  /challenge <user>           Challenge a user to a game
  /accept <id>                Accept a pending challenge
  /decline <id>                Decline a pending challenge
  /match                      Queue for matchmaking
  /move <id> <hole>           Play hole <hole> (1-indexed) in game <id>
  /forfeit <id>               Forfeit game <id>
  /listgames                  List all known games
  /gameinfo <id>              Show the board for game <id>
  /history <id>               Show the moves played in game <id>
  /visibility <id> <0|1>      Set game <id> private (0) or public (1)
  /watch <id>                 Spectate game <id>
  /unwatch <id>                Stop spectating game <id>
  /chat <id> <msg>            Chat with the other player in game <id>
  /exit                       Disconnect
";

/// Dispatches one command line (with the leading `/` already stripped).
/// Returns `true` when the session should close afterward.
pub async fn handle_command(state: &Shared, username: &str, line: &str) -> bool {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "help" => reply(state, username, HELP_TEXT).await,
        "list" => cmd_list(state, username).await,
        "info" => cmd_info(state, username, rest).await,
        "bio" => cmd_bio(state, username, rest).await,
        "addfriend" => cmd_addfriend(state, username, rest).await,
        "removefriend" => cmd_removefriend(state, username, rest).await,
        "getfriends" => cmd_getfriends(state, username).await,
        "mp" => cmd_mp(state, username, rest).await,
        "challenge" => cmd_challenge(state, username, rest).await,
        "accept" => cmd_accept(state, username, rest).await,
        "decline" => cmd_decline(state, username, rest).await,
        "match" => cmd_match(state, username).await,
        "move" => cmd_move(state, username, rest).await,
        "forfeit" => cmd_forfeit(state, username, rest).await,
        "listgames" => cmd_listgames(state, username).await,
        "gameinfo" => cmd_gameinfo(state, username, rest).await,
        "history" => cmd_history(state, username, rest).await,
        "visibility" => cmd_visibility(state, username, rest).await,
        "watch" => cmd_watch(state, username, rest).await,
        "unwatch" => cmd_unwatch(state, username, rest).await,
        "chat" => cmd_chat(state, username, rest).await,
        "exit" => return true,
        _ => reply(state, username, "Unknown command.").await,
    }

    false
}

async fn reply(state: &Shared, username: &str, text: impl Into<String>) {
    let clients = state.clients.lock().await;
    clients.send_to(username, Message::server(text));
}

fn split_two(rest: &str) -> (&str, &str) {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("");
    let second = parts.next().unwrap_or("").trim();
    (first, second)
}

async fn cmd_list(state: &Shared, username: &str) {
    let names = {
        let clients = state.clients.lock().await;
        clients.usernames()
    };
    reply(state, username, format!("Connected: {}", names.join(", "))).await;
}

async fn cmd_info(state: &Shared, username: &str, target: &str) {
    if target.is_empty() {
        return reply(state, username, "Usage: /info <user>").await;
    }
    match state.users.load(target) {
        Ok(Some(user)) => {
            reply(
                state,
                username,
                format!("{}: {}", user.username, user.biography),
            )
            .await
        }
        Ok(None) => reply(state, username, "No such user.").await,
        Err(_) => reply(state, username, "A persistence error occurred.").await,
    }
}

async fn cmd_bio(state: &Shared, username: &str, text: &str) {
    match state.users.load(username) {
        Ok(Some(mut user)) => {
            user.biography = text.to_string();
            match state.users.save(&user) {
                Ok(()) => reply(state, username, "Biography updated.").await,
                Err(_) => reply(state, username, "A persistence error occurred.").await,
            }
        }
        Ok(None) => reply(state, username, "No such user.").await,
        Err(_) => reply(state, username, "A persistence error occurred.").await,
    }
}

async fn cmd_addfriend(state: &Shared, username: &str, target: &str) {
    if target.is_empty() {
        return reply(state, username, "Usage: /addfriend <user>").await;
    }
    if !state.users.exists(target) {
        return reply(state, username, "No such user.").await;
    }
    match state.users.add_friend(username, target) {
        Ok(()) => reply(state, username, format!("Added {} as a friend.", target)).await,
        Err(e) => reply(state, username, e.to_string()).await,
    }
}

async fn cmd_removefriend(state: &Shared, username: &str, target: &str) {
    if target.is_empty() {
        return reply(state, username, "Usage: /removefriend <user>").await;
    }
    match state.users.remove_friend(username, target) {
        Ok(()) => reply(state, username, format!("Removed {} from your friends.", target)).await,
        Err(e) => reply(state, username, e.to_string()).await,
    }
}

async fn cmd_getfriends(state: &Shared, username: &str) {
    match state.users.load(username) {
        Ok(Some(user)) if user.friends.is_empty() => {
            reply(state, username, "You have no friends yet.").await
        }
        Ok(Some(user)) => reply(state, username, format!("Friends: {}", user.friends.join(", "))).await,
        Ok(None) => reply(state, username, "No such user.").await,
        Err(_) => reply(state, username, "A persistence error occurred.").await,
    }
}

async fn cmd_mp(state: &Shared, username: &str, rest: &str) {
    let (target, body) = split_two(rest);
    if target.is_empty() || body.is_empty() {
        return reply(state, username, "Usage: /mp <user> <message>").await;
    }
    if target == username {
        return reply(state, username, "You can't message yourself.").await;
    }

    let delivered = {
        let clients = state.clients.lock().await;
        clients.send_to(target, Message::private(username, body))
    };
    if !delivered {
        reply(state, username, "That user isn't online.").await;
    }
}

fn randomized_pair(a: String, b: String) -> (String, String) {
    if rand::thread_rng().gen_bool(0.5) {
        (a, b)
    } else {
        (b, a)
    }
}

async fn cmd_challenge(state: &Shared, username: &str, target: &str) {
    if target.is_empty() {
        return reply(state, username, "Usage: /challenge <user>").await;
    }
    if target == username {
        return reply(state, username, "You can't challenge yourself.").await;
    }
    let online = {
        let clients = state.clients.lock().await;
        clients.is_online(target)
    };
    if !online {
        return reply(state, username, "That user isn't online.").await;
    }

    let game_id = {
        let mut games = state.games.lock().await;
        games.allocate_id()
    };
    {
        let mut challenges = state.challenges.lock().await;
        challenges.add(username, target, game_id);
    }

    let clients = state.clients.lock().await;
    clients.send_to(
        target,
        Message::text(
            username,
            format!(
                "{} has challenged you to a game (id {}). Use /accept {} or /decline {}.",
                username, game_id, game_id, game_id
            ),
        ),
    );
    drop(clients);
    reply(state, username, format!("Challenge sent (id {}).", game_id)).await;
}

async fn cmd_accept(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /accept <id>").await,
    };

    let challenge = {
        let mut challenges = state.challenges.lock().await;
        challenges.find_and_remove(game_id, username)
    };
    let challenge = match challenge {
        Some(c) => c,
        None => return reply(state, username, "No such challenge.").await,
    };

    let (p0, p1) = randomized_pair(challenge.challenger.clone(), username.to_string());
    let game = Game::new(game_id, p0, p1);
    let info = game.to_info_string();

    {
        let mut games = state.games.lock().await;
        let _ = games.persist(&game);
        games.insert(game);
    }

    let clients = state.clients.lock().await;
    for player in [challenge.challenger.as_str(), username] {
        clients.send_to(player, Message::server(format!("Game {} has started!", game_id)));
        clients.send_to(player, Message::info(info.clone()));
    }
}

async fn cmd_decline(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /decline <id>").await,
    };

    let challenge = {
        let mut challenges = state.challenges.lock().await;
        challenges.find_and_remove(game_id, username)
    };
    match challenge {
        Some(c) => {
            let clients = state.clients.lock().await;
            clients.send_to(
                &c.challenger,
                Message::server(format!("{} declined your challenge (id {}).", username, game_id)),
            );
        }
        None => reply(state, username, "No such challenge.").await,
    }
}

async fn cmd_match(state: &Shared, username: &str) {
    let waiting = {
        let mut clients = state.clients.lock().await;
        clients.take_or_enqueue_waiter(username)
    };

    let waiting = match waiting {
        Some(w) if w == username => {
            // `take_or_enqueue_waiter` already popped our own earlier
            // wait, since we can't tell whose name is whose from inside
            // the registry. Put it back instead of pairing a user
            // against themselves.
            let mut clients = state.clients.lock().await;
            clients.take_or_enqueue_waiter(username);
            return reply(state, username, "You're already queued for a match.").await;
        }
        Some(w) => w,
        None => return reply(state, username, "Queued for a match.").await,
    };

    let game_id = {
        let mut games = state.games.lock().await;
        games.allocate_id()
    };
    let (p0, p1) = randomized_pair(waiting.clone(), username.to_string());
    let game = Game::new(game_id, p0, p1);
    let info = game.to_info_string();

    {
        let mut games = state.games.lock().await;
        let _ = games.persist(&game);
        games.insert(game);
    }

    let clients = state.clients.lock().await;
    for player in [waiting.as_str(), username] {
        clients.send_to(player, Message::server(format!("Game {} has started!", game_id)));
        clients.send_to(player, Message::info(info.clone()));
    }
}

async fn cmd_move(state: &Shared, username: &str, rest: &str) {
    let (id_str, hole_str) = split_two(rest);
    let (game_id, hole_1indexed) = match (id_str.parse::<u64>(), hole_str.parse::<usize>()) {
        (Ok(id), Ok(h)) if h >= 1 => (id, h),
        _ => return reply(state, username, "Usage: /move <id> <hole>").await,
    };

    let outcome = {
        let mut games = state.games.lock().await;
        let game = match games.get_mut(game_id) {
            Some(g) => g,
            None => return reply(state, username, "No such game.").await,
        };
        let player = match game.player_index(username) {
            Some(p) => p,
            None => return reply(state, username, "You are not a participant in this game.").await,
        };
        if game.status != crate::game::GameStatus::Ongoing {
            return reply(state, username, "That game is already over.").await;
        }

        let result = game.make_move(player, hole_1indexed - 1);
        let snapshot = (
            result,
            game.players.clone(),
            game.watchers.iter().cloned().collect::<Vec<_>>(),
            game.to_info_string(),
        );
        let record = game.to_record();
        let _ = games.persist_record(game_id, &record);
        if result == MoveResult::GameOver {
            games.remove(game_id);
        }
        snapshot
    };

    let (result, players, watchers, info) = outcome;
    match result {
        MoveResult::NotYourTurn => reply(state, username, "It isn't your turn.").await,
        MoveResult::WrongSide => reply(state, username, "That hole isn't on your side.").await,
        MoveResult::EmptyHole => reply(state, username, "That hole is empty.").await,
        MoveResult::Continue | MoveResult::GameOver => {
            let headline = if result == MoveResult::GameOver {
                format!("{} played hole {}. Game over!", username, hole_1indexed)
            } else {
                format!("{} played hole {}.", username, hole_1indexed)
            };
            let clients = state.clients.lock().await;
            for recipient in players.iter().chain(watchers.iter()) {
                clients.send_to(recipient, Message::server(headline.clone()));
                clients.send_to(recipient, Message::info(info.clone()));
            }
        }
    }
}

async fn cmd_forfeit(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /forfeit <id>").await,
    };

    let outcome = {
        let mut games = state.games.lock().await;
        let game = match games.get_mut(game_id) {
            Some(g) => g,
            None => return reply(state, username, "No such game.").await,
        };
        let player = match game.player_index(username) {
            Some(p) => p,
            None => return reply(state, username, "You are not a participant in this game.").await,
        };
        if game.status != crate::game::GameStatus::Ongoing {
            return reply(state, username, "That game is already over.").await;
        }
        game.forfeit(player);
        let players = game.players.clone();
        let record = game.to_record();
        let _ = games.persist_record(game_id, &record);
        players
    };

    let clients = state.clients.lock().await;
    for player in &outcome {
        clients.send_to(
            player,
            Message::server(format!("{} forfeited game {}.", username, game_id)),
        );
    }
}

async fn cmd_listgames(state: &Shared, username: &str) {
    let games = state.games.lock().await;
    let mut lines = Vec::new();
    for game in games.iter() {
        let marker = if game.is_participant(username) { "[YOU] " } else { "" };
        lines.push(format!(
            "{}Game {}: {} vs {} ({})",
            marker,
            game.game_id,
            game.players[0],
            game.players[1],
            game.status.as_str(),
        ));
    }
    drop(games);

    if lines.is_empty() {
        reply(state, username, "No games.").await;
    } else {
        reply(state, username, lines.join("\n")).await;
    }
}

async fn cmd_gameinfo(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /gameinfo <id>").await,
    };
    let games = state.games.lock().await;
    match games.get(game_id) {
        Some(game) => {
            let info = game.to_info_string();
            drop(games);
            let clients = state.clients.lock().await;
            clients.send_to(username, Message::info(info));
        }
        None => {
            drop(games);
            reply(state, username, "No such game.").await;
        }
    }
}

async fn cmd_history(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /history <id>").await,
    };
    let games = state.games.lock().await;
    let text = match games.get(game_id) {
        Some(game) => {
            if game.move_history.is_empty() {
                "No moves played yet.".to_string()
            } else {
                game.move_history
                    .iter()
                    .map(|entry| {
                        format!(
                            "{} played hole {}",
                            game.players[entry.player.index()],
                            entry.hole + 1,
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        None => "No such game.".to_string(),
    };
    drop(games);
    reply(state, username, text).await;
}

async fn cmd_visibility(state: &Shared, username: &str, rest: &str) {
    let (id_str, flag_str) = split_two(rest);
    let game_id: u64 = match id_str.parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /visibility <id> <0|1>").await,
    };

    let mut games = state.games.lock().await;
    let game = match games.get_mut(game_id) {
        Some(g) => g,
        None => return reply(state, username, "No such game.").await,
    };
    if game.players[0] != username {
        return reply(state, username, "Only the host may set visibility.").await;
    }
    let flag: u8 = match flag_str.parse() {
        Ok(f) => f,
        Err(_) => return reply(state, username, "Visibility must be 0 or 1.").await,
    };
    let visibility = match Visibility::from_flag(flag) {
        Some(v) => v,
        None => return reply(state, username, "Visibility must be 0 or 1.").await,
    };
    game.visibility = visibility;
    let record = game.to_record();
    let _ = games.persist_record(game_id, &record);
    drop(games);
    reply(state, username, "Visibility updated.").await;
}

async fn cmd_watch(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /watch <id>").await,
    };

    let users = &state.users;
    let mut games = state.games.lock().await;
    let game = match games.get_mut(game_id) {
        Some(g) => g,
        None => return reply(state, username, "No such game.").await,
    };

    if game.is_participant(username) {
        return reply(state, username, "You're already playing in that game.").await;
    }
    if game.watchers.contains(username) {
        return reply(state, username, "You're already watching that game.").await;
    }
    if game.watchers.len() >= crate::game::MAX_WATCHERS {
        return reply(state, username, "That game's watcher list is full.").await;
    }

    if game.visibility == Visibility::Private {
        let is_friend_of_a_participant = users
            .is_friend(&game.players[0], username)
            .unwrap_or(false)
            || users.is_friend(&game.players[1], username).unwrap_or(false);
        if !is_friend_of_a_participant {
            return reply(
                state,
                username,
                "You must be friends with a participant to watch this private game.",
            )
            .await;
        }
    }

    game.watchers.insert(username.to_string());
    drop(games);
    reply(state, username, format!("Now watching game {}.", game_id)).await;
}

async fn cmd_unwatch(state: &Shared, username: &str, rest: &str) {
    let game_id: u64 = match rest.trim().parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /unwatch <id>").await,
    };

    let mut games = state.games.lock().await;
    let game = match games.get_mut(game_id) {
        Some(g) => g,
        None => return reply(state, username, "No such game.").await,
    };
    if !game.watchers.remove(username) {
        return reply(state, username, "You aren't watching that game.").await;
    }
    drop(games);
    reply(state, username, format!("Stopped watching game {}.", game_id)).await;
}

async fn cmd_chat(state: &Shared, username: &str, rest: &str) {
    let (id_str, body) = split_two(rest);
    let game_id: u64 = match id_str.parse() {
        Ok(id) => id,
        Err(_) => return reply(state, username, "Usage: /chat <id> <message>").await,
    };
    if body.is_empty() {
        return reply(state, username, "Usage: /chat <id> <message>").await;
    }

    let players = {
        let games = state.games.lock().await;
        match games.get(game_id) {
            Some(game) if game.is_participant(username) => game.players.clone(),
            Some(_) => return reply(state, username, "You are not a participant in this game.").await,
            None => return reply(state, username, "No such game.").await,
        }
    };

    let clients = state.clients.lock().await;
    for player in &players {
        clients.send_to(player, Message::game_chat(username, body));
    }
}
