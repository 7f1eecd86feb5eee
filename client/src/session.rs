//! The interactive client: a thin read/print loop over the framed
//! connection. It performs the username/password handshake directly
//! (mirroring the server's RECV_USERNAME/AUTHENTICATING states from the
//! other side), then alternates between printing inbound messages and
//! forwarding stdin lines as outbound ones.

use futures::{SinkExt, StreamExt};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::error::ClientError;
use crate::frame::{Message, MessageCodec, MessageKind};

type Conn = Framed<TcpStream, MessageCodec>;

/// Runs the client end to end: handshake, then the chat/command loop
/// until the server closes the connection or sends EXIT.
pub async fn run(stream: TcpStream) -> Result<(), ClientError> {
    let mut conn = Framed::new(stream, MessageCodec);
    let mut stdin = BufReader::new(io::stdin()).lines();

    handshake(&mut conn, &mut stdin).await?;

    loop {
        tokio::select! {
            incoming = conn.next() => {
                match incoming {
                    Some(Ok(msg)) if msg.kind == MessageKind::Exit => {
                        println!("{}", msg.data);
                        break;
                    }
                    Some(Ok(msg)) => print_message(&msg),
                    Some(Err(e)) => {
                        eprintln!("framing error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
            line = stdin.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim() == "/exit" {
                            conn.send(Message::exit("")).await.ok();
                            break;
                        }
                        if conn.send(Message::text(line)).await.is_err() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    Ok(())
}

async fn handshake(
    conn: &mut Conn,
    stdin: &mut io::Lines<BufReader<io::Stdin>>,
) -> Result<(), ClientError> {
    print!("Username: ");
    let username = prompt(stdin).await?;
    conn.send(Message::new(MessageKind::Text, username, "")).await?;

    loop {
        match conn.next().await {
            Some(Ok(msg)) if msg.kind == MessageKind::Exit => {
                println!("{}", msg.data);
                return Err(ClientError::ConnectionError(msg.data));
            }
            Some(Ok(msg)) if msg.kind == MessageKind::Server => {
                println!("{}", msg.data);
                if msg.data.starts_with("Welcome") {
                    return Ok(());
                }
                let reply = prompt(stdin).await?;
                conn.send(Message::new(MessageKind::Text, "", reply)).await?;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ClientError::ConnectionError("server closed the connection".into())),
        }
    }
}

async fn prompt(stdin: &mut io::Lines<BufReader<io::Stdin>>) -> Result<String, ClientError> {
    match stdin.next_line().await? {
        Some(line) => Ok(line),
        None => Err(ClientError::ConnectionError("stdin closed".into())),
    }
}

fn print_message(msg: &Message) {
    match msg.kind {
        MessageKind::Text => println!("{}: {}", msg.username, msg.data),
        MessageKind::Server => println!("* {}", msg.data),
        MessageKind::Info => println!("{}", msg.data),
        MessageKind::Private => println!("[PM from {}]: {}", msg.username, msg.data),
        MessageKind::GameChat => println!("[game chat] {}: {}", msg.username, msg.data),
        MessageKind::Exit => {}
    }
}
