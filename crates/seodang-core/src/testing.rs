//! In-memory doubles shared by the store and session tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::http::Api;
use crate::models::UploadFile;
use crate::session::{SessionStore, TokenStore};

/// One request as the fake transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub token: Option<String>,
}

#[derive(Clone)]
enum Reply {
    Payload(Value),
    Delayed(Duration, Value),
    Failure(String),
}

/// Recording [`Api`] double with per-route canned replies.
///
/// Unstubbed routes answer an empty array so implicit refreshes after a
/// mutation resolve without extra setup.
pub struct FakeApi {
    base_url: String,
    routes: Mutex<HashMap<(Method, String), Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base_url: "http://api.test".to_string(),
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn stub(&self, method: Method, path: &str, payload: Value) {
        lock(&self.routes).insert((method, path.to_string()), Reply::Payload(payload));
    }

    pub fn stub_delayed(&self, method: Method, path: &str, delay: Duration, payload: Value) {
        lock(&self.routes).insert((method, path.to_string()), Reply::Delayed(delay, payload));
    }

    pub fn stub_error(&self, method: Method, path: &str, message: &str) {
        lock(&self.routes).insert((method, path.to_string()), Reply::Failure(message.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.requests).clone()
    }

    /// Number of recorded calls to a given route, ignoring query strings.
    pub fn calls(&self, method: &Method, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|recorded| recorded.method == *method && recorded.path == path)
            .count()
    }

    fn reply_for(&self, method: &Method, path: &str) -> Reply {
        lock(&self.routes)
            .get(&(method.clone(), path.to_string()))
            .cloned()
            .unwrap_or(Reply::Payload(json!([])))
    }

    async fn resolve(&self, reply: Reply) -> Result<Value> {
        match reply {
            Reply::Payload(payload) => Ok(payload),
            Reply::Delayed(delay, payload) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
            Reply::Failure(message) => Err(Error::Api(message)),
        }
    }
}

#[async_trait]
impl Api for FakeApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value> {
        lock(&self.requests).push(Recorded {
            method: method.clone(),
            path: path.to_string(),
            query: query.to_vec(),
            body,
            token: token.map(ToString::to_string),
        });
        let reply = self.reply_for(&method, path);
        self.resolve(reply).await
    }

    async fn upload(
        &self,
        path: &str,
        file: UploadFile,
        title: Option<String>,
        token: Option<&str>,
    ) -> Result<Value> {
        lock(&self.requests).push(Recorded {
            method: Method::POST,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(json!({
                "file": file.name,
                "mime": file.mime,
                "size": file.bytes.len(),
                "title": title,
            })),
            token: token.map(ToString::to_string),
        });
        let reply = self.reply_for(&Method::POST, path);
        self.resolve(reply).await
    }
}

/// [`TokenStore`] over a plain in-memory slot.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }

    pub fn stored(&self) -> Option<String> {
        lock(&self.token).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> Result<Option<String>> {
        Ok(lock(&self.token).clone())
    }

    fn save_token(&self, token: &str) -> Result<()> {
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        *lock(&self.token) = None;
        Ok(())
    }
}

/// A session already authenticated with `test-token`.
pub async fn signed_in_session(api: &Arc<FakeApi>) -> Arc<SessionStore> {
    api.stub(Method::GET, "/auth/me", profile_json());
    let tokens = Arc::new(MemoryTokenStore::with_token("test-token"));
    let session = Arc::new(SessionStore::new(
        Arc::clone(api) as Arc<dyn Api>,
        tokens as Arc<dyn TokenStore>,
    ));
    session.bootstrap().await;
    session
}

/// A session with no token and no persisted state.
pub fn anonymous_session(api: &Arc<FakeApi>) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        Arc::clone(api) as Arc<dyn Api>,
        Arc::new(MemoryTokenStore::default()) as Arc<dyn TokenStore>,
    ))
}

pub fn profile_json() -> Value {
    json!({
        "id": "u1",
        "email": "a@b.com",
        "name": "김학생",
        "createdAt": "2024-05-01T09:00:00.000Z",
        "updatedAt": "2024-05-01T09:00:00.000Z",
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
