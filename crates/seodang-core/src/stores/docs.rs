//! Study document store (uploads + listing). All routes are bearer-gated.

use std::sync::{Arc, Mutex};

use reqwest::Method;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::http::Api;
use crate::models::{Doc, UploadFile};
use crate::session::SessionStore;
use crate::stores::{hold_spinner, lock, RefreshSeq};

#[derive(Debug, Default)]
struct DocState {
    docs: Vec<Doc>,
    loading: bool,
    error: Option<String>,
}

pub struct DocStore {
    api: Arc<dyn Api>,
    session: Arc<SessionStore>,
    state: Mutex<DocState>,
    refresh_seq: RefreshSeq,
}

impl DocStore {
    pub fn new(api: Arc<dyn Api>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(DocState::default()),
            refresh_seq: RefreshSeq::default(),
        }
    }

    /// Reload the document list; without a session this resolves to an empty
    /// collection with no error and no network traffic.
    pub async fn refresh(&self) {
        let seq = self.refresh_seq.next();
        let Some(token) = self.session.token() else {
            let mut state = lock(&self.state);
            state.docs.clear();
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
            .request(Method::GET, "/docs", &[], None, Some(&token))
            .await
            .and_then(|payload| Ok(serde_json::from_value::<Vec<Doc>>(payload)?));
        hold_spinner(started).await;

        let mut state = lock(&self.state);
        if !self.refresh_seq.is_latest(seq) {
            return;
        }
        match result {
            Ok(docs) => state.docs = docs,
            Err(error) => {
                state.error = Some(error.to_string());
                state.docs.clear();
            }
        }
        state.loading = false;
    }

    /// Multipart upload: a `file` part plus an optional `title` field.
    /// The created document is prepended for immediate visibility; the next
    /// explicit refresh reconciles ordering with the server.
    pub async fn upload(&self, file: UploadFile, title: Option<String>) -> Result<Doc> {
        let token = self.require_token()?;
        let payload = self
            .api
            .upload("/docs/upload", file, title, Some(&token))
            .await?;
        let created: Doc = serde_json::from_value(payload)?;
        lock(&self.state).docs.insert(0, created.clone());
        Ok(created)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        self.api
            .request(Method::DELETE, &format!("/docs/{id}"), &[], None, Some(&token))
            .await?;
        lock(&self.state).docs.retain(|doc| doc.id != id);
        self.refresh().await;
        Ok(())
    }

    /// Local lookup only; never touches the network.
    pub fn get(&self, id: &str) -> Option<Doc> {
        lock(&self.state).docs.iter().find(|doc| doc.id == id).cloned()
    }

    /// Absolute URL for a stored document: a pure join of the configured base
    /// URL and the document's server-relative path, recomputed on every call.
    pub fn file_url(&self, doc: &Doc) -> String {
        format!(
            "{}/{}",
            self.api.base_url().trim_end_matches('/'),
            doc.path.trim_start_matches('/')
        )
    }

    pub fn docs(&self) -> Vec<Doc> {
        lock(&self.state).docs.clone()
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

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::testing::{anonymous_session, signed_in_session, FakeApi};

    fn doc_json(id: &str) -> Value {
        json!({
            "id": id,
            "title": "기말고사 요약",
            "originalName": "summary.pdf",
            "mime": "application/pdf",
            "size": 2048,
            "path": "/uploads/summary.pdf",
            "uploadedAt": "2024-05-01T09:00:00.000Z",
        })
    }

    fn upload_file() -> UploadFile {
        UploadFile {
            name: "summary.pdf".to_string(),
            mime: "application/pdf".to_string(),
            bytes: vec![0x25, 0x50, 0x44, 0x46],
        }
    }

    async fn signed_in_store(api: &Arc<FakeApi>) -> DocStore {
        let session = signed_in_session(api).await;
        DocStore::new(Arc::clone(api) as Arc<dyn Api>, session)
    }

    #[tokio::test]
    async fn refresh_without_session_resolves_empty_with_no_network() {
        let api = FakeApi::new();
        let store = DocStore::new(Arc::clone(&api) as Arc<dyn Api>, anonymous_session(&api));

        store.refresh().await;

        assert_eq!(store.docs(), vec![]);
        assert_eq!(store.error(), None);
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn upload_requires_a_session() {
        let api = FakeApi::new();
        let store = DocStore::new(Arc::clone(&api) as Arc<dyn Api>, anonymous_session(&api));

        assert!(matches!(
            store.upload(upload_file(), None).await.unwrap_err(),
            Error::AuthRequired
        ));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn upload_prepends_without_an_implicit_refresh() {
        let api = FakeApi::new();
        let store = signed_in_store(&api).await;
        api.stub(Method::POST, "/docs/upload", doc_json("d9"));

        let created = store
            .upload(upload_file(), Some("기말고사 요약".to_string()))
            .await
            .unwrap();

        assert_eq!(created.id, "d9");
        assert_eq!(store.docs()[0].id, "d9");
        // No list reconciliation after an upload.
        assert_eq!(api.calls(&Method::GET, "/docs"), 0);

        let upload_request = api
            .requests()
            .into_iter()
            .find(|recorded| recorded.path == "/docs/upload")
            .unwrap();
        assert_eq!(upload_request.token, Some("test-token".to_string()));
        assert_eq!(
            upload_request.body,
            Some(json!({
                "file": "summary.pdf",
                "mime": "application/pdf",
                "size": 4,
                "title": "기말고사 요약",
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remove_drops_the_doc() {
        let api = FakeApi::new();
        api.stub(Method::GET, "/docs", json!([doc_json("d1")]));
        let store = signed_in_store(&api).await;
        store.refresh().await;

        api.stub(Method::GET, "/docs", json!([]));
        store.remove("d1").await.unwrap();

        assert_eq!(store.docs(), vec![]);
    }

    #[tokio::test]
    async fn file_url_joins_base_url_and_relative_path() {
        let api = FakeApi::new();
        let store = signed_in_store(&api).await;
        let doc: Doc = serde_json::from_value(doc_json("d1")).unwrap();

        assert_eq!(store.file_url(&doc), "http://api.test/uploads/summary.pdf");
    }
}
