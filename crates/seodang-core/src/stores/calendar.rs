//! Calendar event store. Events are per-user; every route is bearer-gated.

use std::sync::{Arc, Mutex};

use reqwest::Method;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::http::Api;
use crate::models::{CalendarEvent, EventPatch, NewEvent};
use crate::session::SessionStore;
use crate::stores::{hold_spinner, lock, merge_record, RefreshSeq};

#[derive(Debug, Default)]
struct CalendarState {
    events: Vec<CalendarEvent>,
    loading: bool,
    error: Option<String>,
}

pub struct CalendarStore {
    api: Arc<dyn Api>,
    session: Arc<SessionStore>,
    state: Mutex<CalendarState>,
    refresh_seq: RefreshSeq,
}

impl CalendarStore {
    pub fn new(api: Arc<dyn Api>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(CalendarState::default()),
            refresh_seq: RefreshSeq::default(),
        }
    }

    /// Reload the event list; without a session this resolves to an empty
    /// collection with no error and no network traffic.
    pub async fn refresh(&self) {
        let seq = self.refresh_seq.next();
        let Some(token) = self.session.token() else {
            let mut state = lock(&self.state);
            state.events.clear();
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
            .request(Method::GET, "/events", &[], None, Some(&token))
            .await
            .and_then(|payload| Ok(serde_json::from_value::<Vec<CalendarEvent>>(payload)?));
        hold_spinner(started).await;

        let mut state = lock(&self.state);
        if !self.refresh_seq.is_latest(seq) {
            return;
        }
        match result {
            Ok(events) => state.events = events,
            Err(error) => {
                state.error = Some(error.to_string());
                state.events.clear();
            }
        }
        state.loading = false;
    }

    pub async fn add(&self, event: NewEvent) -> Result<CalendarEvent> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::POST,
                "/events",
                &[],
                Some(serde_json::to_value(&event)?),
                Some(&token),
            )
            .await?;
        let created: CalendarEvent = serde_json::from_value(payload)?;
        lock(&self.state).events.insert(0, created.clone());
        self.refresh().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: EventPatch) -> Result<CalendarEvent> {
        let token = self.require_token()?;
        let payload = self
            .api
            .request(
                Method::PUT,
                &format!("/events/{id}"),
                &[],
                Some(serde_json::to_value(&patch)?),
                Some(&token),
            )
            .await?;
        // The response may carry only the changed fields; merge it over the
        // cached event so untouched fields survive.
        let updated: CalendarEvent = {
            let state = lock(&self.state);
            merge_record(state.events.iter().find(|event| event.id == id), payload)?
        };
        {
            let mut state = lock(&self.state);
            if let Some(slot) = state.events.iter_mut().find(|event| event.id == id) {
                *slot = updated.clone();
            }
        }
        self.refresh().await;
        Ok(updated)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        self.api
            .request(Method::DELETE, &format!("/events/{id}"), &[], None, Some(&token))
            .await?;
        lock(&self.state).events.retain(|event| event.id != id);
        self.refresh().await;
        Ok(())
    }

    /// Local lookup only; never touches the network.
    pub fn get(&self, id: &str) -> Option<CalendarEvent> {
        lock(&self.state)
            .events
            .iter()
            .find(|event| event.id == id)
            .cloned()
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        lock(&self.state).events.clone()
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

    fn event_json(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "description": "중간고사 대비",
            "participants": null,
            "place": "도서관",
            "supplies": null,
            "remarks": null,
            "start": "2024-05-01T10:00:00",
            "end": "2024-05-01T12:00:00",
        })
    }

    fn sample_event(id: &str, title: &str) -> CalendarEvent {
        serde_json::from_value(event_json(id, title)).unwrap()
    }

    #[tokio::test]
    async fn refresh_without_session_resolves_empty_with_no_network() {
        let api = FakeApi::new();
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, anonymous_session(&api));

        store.refresh().await;

        assert_eq!(store.events(), vec![]);
        assert_eq!(store.error(), None);
        assert!(!store.loading());
        assert!(api.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replaces_events_from_the_server() {
        let api = FakeApi::new();
        api.stub(Method::GET, "/events", json!([event_json("e1", "스터디")]));
        let session = signed_in_session(&api).await;
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, session);

        store.refresh().await;

        assert_eq!(store.events(), vec![sample_event("e1", "스터디")]);
        let list_request = api
            .requests()
            .into_iter()
            .find(|recorded| recorded.path == "/events")
            .unwrap();
        assert_eq!(list_request.token, Some("test-token".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_empties_the_collection() {
        let api = FakeApi::new();
        api.stub(Method::GET, "/events", json!([event_json("e1", "스터디")]));
        let session = signed_in_session(&api).await;
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, session);
        store.refresh().await;

        api.stub_error(Method::GET, "/events", "일정을 불러오지 못했습니다.");
        store.refresh().await;

        assert_eq!(store.error(), Some("일정을 불러오지 못했습니다.".to_string()));
        assert_eq!(store.events(), vec![]);
    }

    #[tokio::test]
    async fn mutations_require_a_session() {
        let api = FakeApi::new();
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, anonymous_session(&api));

        let new_event = NewEvent {
            title: "스터디".to_string(),
            description: None,
            participants: None,
            place: None,
            supplies: None,
            remarks: None,
            start: "2024-05-01T10:00:00".to_string(),
            end: "2024-05-01T12:00:00".to_string(),
        };
        assert!(matches!(
            store.add(new_event).await.unwrap_err(),
            Error::AuthRequired
        ));
        assert!(matches!(
            store.update("e1", EventPatch::default()).await.unwrap_err(),
            Error::AuthRequired
        ));
        assert!(matches!(
            store.remove("e1").await.unwrap_err(),
            Error::AuthRequired
        ));
        assert!(api.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn add_prepends_the_created_event() {
        let api = FakeApi::new();
        let session = signed_in_session(&api).await;
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, session);
        api.stub(Method::POST, "/events", event_json("e9", "새 일정"));
        api.stub(Method::GET, "/events", json!([event_json("e9", "새 일정")]));

        let created = store
            .add(NewEvent {
                title: "새 일정".to_string(),
                description: None,
                participants: None,
                place: None,
                supplies: None,
                remarks: None,
                start: "2024-05-02T10:00:00".to_string(),
                end: "2024-05-02T12:00:00".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.id, "e9");
        assert_eq!(store.get("e9"), Some(sample_event("e9", "새 일정")));
        assert_eq!(store.events()[0].id, "e9");
    }

    #[tokio::test(start_paused = true)]
    async fn update_overwrites_with_the_server_record() {
        let api = FakeApi::new();
        api.stub(Method::GET, "/events", json!([event_json("e1", "이전")]));
        let session = signed_in_session(&api).await;
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, session);
        store.refresh().await;

        api.stub(Method::PUT, "/events/e1", event_json("e1", "변경"));
        api.stub(Method::GET, "/events", json!([event_json("e1", "변경")]));
        let updated = store
            .update(
                "e1",
                EventPatch {
                    title: Some("변경".to_string()),
                    ..EventPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "변경");
        assert_eq!(store.get("e1").unwrap().title, "변경");
    }

    #[tokio::test(start_paused = true)]
    async fn update_merges_a_partial_response_over_the_cached_event() {
        let api = FakeApi::new();
        api.stub(Method::GET, "/events", json!([event_json("e1", "이전")]));
        let session = signed_in_session(&api).await;
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, session);
        store.refresh().await;

        // Server answers with only the changed fields.
        api.stub(Method::PUT, "/events/e1", json!({"id": "e1", "title": "변경"}));
        api.stub(Method::GET, "/events", json!([event_json("e1", "변경")]));
        let updated = store
            .update(
                "e1",
                EventPatch {
                    title: Some("변경".to_string()),
                    ..EventPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "변경");
        assert_eq!(updated.place, Some("도서관".to_string()));
        assert_eq!(updated.start, "2024-05-01T10:00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn remove_drops_the_event() {
        let api = FakeApi::new();
        api.stub(Method::GET, "/events", json!([event_json("e1", "스터디")]));
        let session = signed_in_session(&api).await;
        let store = CalendarStore::new(Arc::clone(&api) as Arc<dyn Api>, session);
        store.refresh().await;

        api.stub(Method::GET, "/events", json!([]));
        store.remove("e1").await.unwrap();

        assert_eq!(store.events(), vec![]);
        assert_eq!(store.get("e1"), None);
    }
}
