//! Note store. Notes are private, so reads and writes are both bearer-gated.

use std::sync::{Arc, Mutex};

use reqwest::Method;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::http::Api;
use crate::models::{NewNote, Note, NotePatch};
use crate::session::SessionStore;
use crate::stores::{hold_spinner, lock, merge_record, RefreshSeq};

#[derive(Debug, Default)]
struct NoteState {
    notes: Vec<Note>,
    loading: bool,
    error: Option<String>,
}

pub struct NoteStore {
    api: Arc<dyn Api>,
    session: Arc<SessionStore>,
    state: Mutex<NoteState>,
    refresh_seq: RefreshSeq,
}

impl NoteStore {
    pub fn new(api: Arc<dyn Api>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(NoteState::default()),
            refresh_seq: RefreshSeq::default(),
        }
    }

    /// Reload the note list; without a session this resolves to an empty
    /// collection with no error and no network traffic.
    pub async fn refresh(&self) {
        let seq = self.refresh_seq.next();
        let Some(token) = self.session.token() else {
            let mut state = lock(&self.state);
            state.notes.clear();
            state.error = None;
            state.loading = false;
            return;
        };

        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }

        let started = Instant::now();
        let result = self
            .api
            .request(Method::GET, "/notes", &[], None, Some(&token))
            .await
            .and_then(|payload| Ok(serde_json::from_value::<Vec<Note>>(payload)?));
        hold_spinner(started).await;

        let mut state = lock(&self.state);
        if !self.refresh_seq.is_latest(seq) {
            return;
        }
        match result {
            Ok(notes) => state.notes = notes,
            Err(error) => {
                state.error = Some(error.to_string());
                state.notes.clear();
            }
        }
        state.loading = false;
    }

    pub async fn create(&self, note: NewNote) -> Result<Note> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::POST,
                "/notes",
                &[],
                Some(serde_json::to_value(&note)?),
                Some(&token),
            )
            .await?;
        let created: Note = serde_json::from_value(payload)?;
        lock(&self.state).notes.insert(0, created.clone());
        self.refresh().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: NotePatch) -> Result<Note> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::PUT,
                &format!("/notes/{id}"),
                &[],
                Some(serde_json::to_value(&patch)?),
                Some(&token),
            )
            .await?;
        // The response may carry only the changed fields; merge it over the
        // cached note so untouched fields survive.
        let updated: Note = {
            let state = lock(&self.state);
            merge_record(state.notes.iter().find(|note| note.id == id), payload)?
        };
        {
            let mut state = lock(&self.state);
            if let Some(slot) = state.notes.iter_mut().find(|note| note.id == id) {
                *slot = updated.clone();
            }
        }
        self.refresh().await;
        Ok(updated)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        self.api
            .request(Method::DELETE, &format!("/notes/{id}"), &[], None, Some(&token))
            .await?;
        lock(&self.state).notes.retain(|note| note.id != id);
        self.refresh().await;
        Ok(())
    }

    /// Local lookup only; never touches the network.
    pub fn get(&self, id: &str) -> Option<Note> {
        lock(&self.state).notes.iter().find(|note| note.id == id).cloned()
    }

    /// Local lookup with remote fallback; requires a session since notes are
    /// private. A fetched note is upserted by id.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Note> {
        let token = self.require_token()?;
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let payload = self
            .api
            .request(Method::GET, &format!("/notes/{id}"), &[], None, Some(&token))
            .await?;
        let note: Note = serde_json::from_value(payload)?;
        {
            let mut state = lock(&self.state);
            if let Some(slot) = state.notes.iter_mut().find(|existing| existing.id == note.id) {
                *slot = note.clone();
            } else {
                state.notes.push(note.clone());
            }
        }
        Ok(note)
    }

    pub fn notes(&self) -> Vec<Note> {
        lock(&self.state).notes.clone()
    }

    pub fn loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    fn require_token(&self) -> Result<String> {
        self.session.token().ok_or(Error::AuthRequired)
    }
}
