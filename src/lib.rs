//! Streaming chat client for Eliza agents.
//!
//! [`client::ElizaClient`] sends messages and reads history; rooms are kept
//! per agent by [`session::SessionManager`] on top of a small persisted
//! [`storage::KeyValueStore`].

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod ids;
pub mod models;
pub mod session;
pub mod storage;
pub mod streaming;

pub use client::ElizaClient;
pub use conversation::Conversation;
pub use error::{ElizaError, Result};
pub use models::ChatMessage;
pub use session::{SessionContext, SessionManager};
