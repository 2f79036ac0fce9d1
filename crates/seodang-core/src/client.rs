//! Client composition root.
//!
//! The session store is constructed once and handed to every resource store
//! explicitly, keeping single-instance-per-process semantics without any
//! hidden globals. Consumers take the composed set and wire it into their
//! own activation hooks (screen focus, CLI commands).

use std::sync::Arc;

use crate::error::Result;
use crate::http::{Api, ApiClient};
use crate::session::{SessionStore, TokenStore};
use crate::stores::{BoardStore, CalendarStore, DocStore, FriendStore, NoteStore};

/// The composed Seodang client: one session plus the five resource stores.
pub struct SeodangClient {
    pub session: Arc<SessionStore>,
    pub board: BoardStore,
    pub calendar: CalendarStore,
    pub notes: NoteStore,
    pub docs: DocStore,
    pub friends: FriendStore,
}

impl SeodangClient {
    /// Compose the stores over an existing transport and token store.
    pub fn new(api: Arc<dyn Api>, tokens: Arc<dyn TokenStore>) -> Self {
        let session = Arc::new(SessionStore::new(Arc::clone(&api), tokens));
        Self {
            board: BoardStore::new(Arc::clone(&api), Arc::clone(&session)),
            calendar: CalendarStore::new(Arc::clone(&api), Arc::clone(&session)),
            notes: NoteStore::new(Arc::clone(&api), Arc::clone(&session)),
            docs: DocStore::new(Arc::clone(&api), Arc::clone(&session)),
            friends: FriendStore::new(Arc::clone(&api), Arc::clone(&session)),
            session,
        }
    }

    /// Compose over a reqwest-backed [`ApiClient`] for the given base URL.
    pub fn connect(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let api: Arc<dyn Api> = Arc::new(ApiClient::new(base_url)?);
        Ok(Self::new(api, tokens))
    }

    /// Restore a persisted session, if any. Run once at startup.
    pub async fn bootstrap(&self) {
        self.session.bootstrap().await;
    }
}
