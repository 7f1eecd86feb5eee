use std::net::IpAddr;

use structopt::StructOpt;

pub mod error;
pub mod frame;
pub mod session;

/// CLI parameters the client accepts: an optional server address, per
/// spec defaulting to the loopback interface. The port is fixed to
/// match the server's listening port.
#[derive(Debug, StructOpt)]
#[structopt(name = "awale-client", about = "Interactive client for the Awalé game server.")]
pub struct Params {
    #[structopt(default_value = "127.0.0.1")]
    pub server_ip: IpAddr,
}

pub const SERVER_PORT: u16 = 12345;
