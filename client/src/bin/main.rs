use std::net::SocketAddr;

use structopt::StructOpt;
use tokio::net::TcpStream;

use client::{error::ClientError, session, Params, SERVER_PORT};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let params = Params::from_args();
    let addr = SocketAddr::new(params.server_ip, SERVER_PORT);

    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    println!("Connected to {}", addr);

    session::run(stream).await
}
