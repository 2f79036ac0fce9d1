//! seodang-core - Core library for Seodang
//!
//! Client-side data synchronization for the Seodang study companion:
//! session/token lifecycle, per-entity resource stores kept consistent with
//! the REST source, and the shared HTTP client. Consumed by all Seodang
//! interfaces (mobile, CLI).

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod session;
pub mod stores;
mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use client::SeodangClient;
pub use error::{Error, Result};
pub use http::{Api, ApiClient};
pub use session::{SessionStore, TokenStore};
pub use stores::{BoardStore, CalendarStore, DocStore, FriendStore, NoteStore};
