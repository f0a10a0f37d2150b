pub mod ack;
pub mod actions;
pub mod bootstrap;
pub mod cards;
pub mod client;
pub mod config;
pub mod mapper;
pub mod routes;
pub mod session;
pub mod tournament;
pub mod transport;
pub mod view;
pub mod wire;

use std::collections::HashSet;

use alloy::primitives::Address;
use client::PokerClient;
use session::Keys;

pub use routes::router;

/// Shared by every request handler.
pub struct AppState {
    pub client: PokerClient,
    pub keys: Keys,
    /// Wallets whose sessions may run table and tournament administration
    pub admins: HashSet<Address>,
}
