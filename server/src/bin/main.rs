use std::sync::Arc;

use structopt::StructOpt;
use tokio::net::TcpListener;
use tracing::info;

use server::{session, Params, ServerError, Shared};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let params = Params::from_args();
    let state = Arc::new(Shared::try_new(&params)?);
    let listener = TcpListener::bind(&params.addr).await?;

    info!(addr = %params.addr, "server listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            session::handle_connection(state, stream, addr).await;
        });
    }
}
