use std::net::SocketAddr;

use structopt::StructOpt;

/// CLI parameters the server accepts. Every flag has a default matching
/// spec's zero-argument invocation, so running the binary with no
/// arguments reproduces the no-flags behavior exactly.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "awale-server",
    about = "Hosts concurrent Awalé sessions over a framed TCP protocol."
)]
pub struct Params {
    /// Address for the server to listen on.
    #[structopt(short, long, default_value = "0.0.0.0:12345")]
    pub addr: SocketAddr,

    /// Directory holding persisted user records.
    #[structopt(long, default_value = "./users")]
    pub users_dir: String,

    /// Directory holding persisted game records.
    #[structopt(long, default_value = "./games")]
    pub games_dir: String,

    /// Maximum number of concurrently connected clients.
    #[structopt(long, default_value = "10")]
    pub max_clients: usize,
}
