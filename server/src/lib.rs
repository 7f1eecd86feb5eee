pub mod challenge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod game;
pub mod games;
pub mod registry;
pub mod session;
pub mod state;
pub mod user;

pub use config::Params;
pub use error::ServerError;
pub use state::Shared;
