//! Friend list store. All routes are bearer-gated; adding a friend by email
//! upserts-by-id so a friend the server already knows is never duplicated.

use std::sync::{Arc, Mutex};

use reqwest::Method;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::http::Api;
use crate::models::Friend;
use crate::session::SessionStore;
use crate::stores::{hold_spinner, lock, RefreshSeq};

#[derive(Debug, Default)]
struct FriendState {
    friends: Vec<Friend>,
    loading: bool,
    error: Option<String>,
}

pub struct FriendStore {
    api: Arc<dyn Api>,
    session: Arc<SessionStore>,
    state: Mutex<FriendState>,
    refresh_seq: RefreshSeq,
}

impl FriendStore {
    pub fn new(api: Arc<dyn Api>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(FriendState::default()),
            refresh_seq: RefreshSeq::default(),
        }
    }

    /// Reload the friend list; without a session this resolves to an empty
    /// collection with no error and no network traffic.
    pub async fn refresh(&self) {
        let seq = self.refresh_seq.next();
        let Some(token) = self.session.token() else {
            let mut state = lock(&self.state);
            state.friends.clear();
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
            .request(Method::GET, "/friends", &[], None, Some(&token))
            .await
            .and_then(|payload| Ok(serde_json::from_value::<Vec<Friend>>(payload)?));
        hold_spinner(started).await;

        let mut state = lock(&self.state);
        if !self.refresh_seq.is_latest(seq) {
            return;
        }
        match result {
            Ok(friends) => state.friends = friends,
            Err(error) => {
                state.error = Some(error.to_string());
                state.friends.clear();
            }
        }
        state.loading = false;
    }

    /// Send a friend request by email; the server answers with the friend
    /// record, which is upserted at the front of the list.
    pub async fn add_friend(&self, email: &str) -> Result<Friend> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::POST,
                "/friends",
                &[],
                Some(serde_json::json!({ "email": email })),
                Some(&token),
            )
            .await?;
        let friend: Friend = serde_json::from_value(payload)?;
        {
            let mut state = lock(&self.state);
            state.friends.retain(|existing| existing.id != friend.id);
            state.friends.insert(0, friend.clone());
        }
        self.refresh().await;
        Ok(friend)
    }

    pub async fn remove_friend(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        self.api
            .request(Method::DELETE, &format!("/friends/{id}"), &[], None, Some(&token))
            .await?;
        lock(&self.state).friends.retain(|friend| friend.id != id);
        self.refresh().await;
        Ok(())
    }

    /// Local lookup only; never touches the network.
    pub fn get_friend(&self, id: &str) -> Option<Friend> {
        lock(&self.state)
            .friends
            .iter()
            .find(|friend| friend.id == id)
            .cloned()
    }

    pub fn friends(&self) -> Vec<Friend> {
        lock(&self.state).friends.clone()
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
