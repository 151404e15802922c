//! Data models for the Twitch Miner CLI.

pub mod channel;
pub mod gql;
pub mod inventory;

pub use channel::*;
pub use gql::*;
pub use inventory::*;
