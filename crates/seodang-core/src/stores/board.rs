//! Community board store.
//!
//! Posts are public-readable, so `refresh` is not gated by a session; only
//! mutations require a token. Alongside the filtered collection the store
//! keeps an unfiltered "all posts" shadow collection for screens that need a
//! global view (home-screen digest), resynced silently whenever a filtered
//! refresh lands.

use std::sync::{Arc, Mutex};

use reqwest::Method;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::http::Api;
use crate::models::{NewPost, Post, PostFilters, PostPatch, ALL_CATEGORY};
use crate::session::SessionStore;
use crate::stores::{hold_spinner, lock, merge_record, RefreshSeq};

#[derive(Debug)]
struct BoardState {
    posts: Vec<Post>,
    all_posts: Vec<Post>,
    categories: Vec<String>,
    loading: bool,
    error: Option<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            all_posts: Vec::new(),
            categories: vec![ALL_CATEGORY.to_string()],
            loading: false,
            error: None,
        }
    }
}

pub struct BoardStore {
    api: Arc<dyn Api>,
    session: Arc<SessionStore>,
    state: Arc<Mutex<BoardState>>,
    filters: Mutex<PostFilters>,
    refresh_seq: RefreshSeq,
}

impl BoardStore {
    pub fn new(api: Arc<dyn Api>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: Arc::new(Mutex::new(BoardState::default())),
            filters: Mutex::new(PostFilters::default()),
            refresh_seq: RefreshSeq::default(),
        }
    }

    /// Reload the post list from the server.
    ///
    /// `Some(filters)` becomes the remembered filter set for subsequent
    /// parameterless calls; `None` reuses the last-used filters. Failures are
    /// captured into the `error` flag, never returned.
    pub async fn refresh(&self, next_filters: Option<PostFilters>) {
        let filters = {
            let mut current = lock(&self.filters);
            if let Some(next) = next_filters {
                *current = next;
            }
            current.clone()
        };

        let seq = self.refresh_seq.next();
        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }

        let started = Instant::now();
        let result = self
            .api
            .request(Method::GET, "/posts", &filters.query_pairs(), None, None)
            .await
            .and_then(parse_posts);
        hold_spinner(started).await;

        let unfiltered = filters.is_unfiltered();
        let mut resync_shadow = false;
        {
            let mut state = lock(&self.state);
            if !self.refresh_seq.is_latest(seq) {
                return;
            }
            match result {
                Ok(posts) => {
                    if unfiltered {
                        state.all_posts.clone_from(&posts);
                    } else {
                        resync_shadow = true;
                    }
                    state.posts = posts;
                }
                Err(error) => {
                    state.error = Some(error.to_string());
                    state.posts.clear();
                    if unfiltered {
                        state.all_posts.clear();
                    }
                }
            }
            state.loading = false;
        }

        if resync_shadow {
            self.spawn_shadow_resync();
        }
    }

    /// Load the category labels; failures are ignored and an empty response
    /// never replaces the defaults.
    pub async fn refresh_categories(&self) {
        match self
            .api
            .request(Method::GET, "/posts/categories", &[], None, None)
            .await
        {
            Ok(payload) => {
                if let Ok(categories) = serde_json::from_value::<Vec<String>>(payload) {
                    if !categories.is_empty() {
                        lock(&self.state).categories = categories;
                    }
                }
            }
            Err(error) => tracing::debug!("Failed to load post categories: {error}"),
        }
    }

    pub async fn add(&self, post: NewPost) -> Result<Post> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::POST,
                "/posts",
                &[],
                Some(serde_json::to_value(&post)?),
                Some(&token),
            )
            .await?;
        let created: Post = serde_json::from_value(payload)?;
        {
            let mut state = lock(&self.state);
            state.posts.insert(0, created.clone());
            state.all_posts.insert(0, created.clone());
        }
        self.refresh(None).await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: PostPatch) -> Result<Post> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::PUT,
                &format!("/posts/{id}"),
                &[],
                Some(serde_json::to_value(&patch)?),
                Some(&token),
            )
            .await?;
        // The response may carry only the changed fields; merge it over the
        // cached post so untouched fields survive.
        let updated: Post = {
            let state = lock(&self.state);
            let existing = state
                .posts
                .iter()
                .find(|post| post.id == id)
                .or_else(|| state.all_posts.iter().find(|post| post.id == id));
            merge_record(existing, payload)?
        };
        {
            let mut state = lock(&self.state);
            replace_by_id(&mut state.posts, &updated);
            replace_by_id(&mut state.all_posts, &updated);
        }
        self.refresh(None).await;
        Ok(updated)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        self.api
            .request(Method::DELETE, &format!("/posts/{id}"), &[], None, Some(&token))
            .await?;
        {
            let mut state = lock(&self.state);
            state.posts.retain(|post| post.id != id);
            state.all_posts.retain(|post| post.id != id);
        }
        self.refresh(None).await;
        Ok(())
    }

    /// Local lookup only; never touches the network.
    pub fn get(&self, id: &str) -> Option<Post> {
        lock(&self.state).posts.iter().find(|post| post.id == id).cloned()
    }

    /// Local lookup with remote fallback; posts are public so no token is
    /// needed. A fetched post is upserted into both collections.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Post> {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let payload = self
            .api
            .request(Method::GET, &format!("/posts/{id}"), &[], None, None)
            .await?;
        let post: Post = serde_json::from_value(payload)?;
        {
            let mut state = lock(&self.state);
            upsert_by_id(&mut state.posts, &post);
            upsert_by_id(&mut state.all_posts, &post);
        }
        Ok(post)
    }

    pub fn posts(&self) -> Vec<Post> {
        lock(&self.state).posts.clone()
    }

    pub fn all_posts(&self) -> Vec<Post> {
        lock(&self.state).all_posts.clone()
    }

    pub fn categories(&self) -> Vec<String> {
        lock(&self.state).categories.clone()
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

    /// Keep the unfiltered shadow collection fresh after a filtered refresh.
    /// Failure here is logged and swallowed, never surfaced as `error`.
    fn spawn_shadow_resync(&self) {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match api.request(Method::GET, "/posts", &[], None, None).await {
                Ok(payload) => match serde_json::from_value::<Vec<Post>>(payload) {
                    Ok(all_posts) => lock(&state).all_posts = all_posts,
                    Err(error) => {
                        tracing::warn!("Discarding malformed post list from resync: {error}");
                    }
                },
                Err(error) => tracing::warn!("Background post resync failed: {error}"),
            }
        });
    }
}

fn parse_posts(payload: Value) -> Result<Vec<Post>> {
    Ok(serde_json::from_value(payload)?)
}

fn replace_by_id(posts: &mut [Post], updated: &Post) {
    if let Some(slot) = posts.iter_mut().find(|post| post.id == updated.id) {
        *slot = updated.clone();
    }
}

fn upsert_by_id(posts: &mut Vec<Post>, post: &Post) {
    if let Some(slot) = posts.iter_mut().find(|existing| existing.id == post.id) {
        *slot = post.clone();
    } else {
        posts.push(post.clone());
    }
}
