//! Resource stores: per-entity caches kept consistent with the REST source.
//!
//! Every store owns one in-memory collection plus `loading`/`error` flags and
//! mutates it only through its own operations. `refresh()` never returns an
//! error (failures land in the `error` flag because refreshes are often
//! implicit); mutating operations propagate errors to the caller. A per-store
//! sequence number discards stale refresh responses so a slow old response
//! cannot clobber a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::error::Result;

mod board;
mod calendar;
mod docs;
mod friends;
mod notes;

pub use board::BoardStore;
pub use calendar::CalendarStore;
pub use docs::DocStore;
pub use friends::FriendStore;
pub use notes::NoteStore;

/// Minimum visible duration of the loading flag, so spinners are perceptible.
/// A UX affordance, not a correctness requirement.
const MIN_LOADING: Duration = Duration::from_secs(1);

/// Tracks the latest issued refresh so stale responses can be discarded.
#[derive(Debug, Default)]
pub(crate) struct RefreshSeq(AtomicU64);

impl RefreshSeq {
    /// Issue the next sequence number; supersedes everything in flight.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        self.0.load(Ordering::SeqCst) == seq
    }
}

/// Hold the loading flag until [`MIN_LOADING`] has elapsed since `started`.
pub(crate) async fn hold_spinner(started: Instant) {
    let elapsed = started.elapsed();
    if elapsed < MIN_LOADING {
        sleep(MIN_LOADING - elapsed).await;
    }
}

/// Lock a state mutex, recovering the data from a poisoned lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shallow-merge an update response over the cached record at the JSON level.
///
/// Servers may answer an update with only the changed fields; fields present
/// in `payload` win and everything else carries over from `existing`. Without
/// a cached record the payload must stand on its own.
pub(crate) fn merge_record<T>(existing: Option<&T>, payload: Value) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let Some(existing) = existing else {
        return Ok(serde_json::from_value(payload)?);
    };
    let mut merged = serde_json::to_value(existing)?;
    match (merged.as_object_mut(), payload) {
        (Some(fields), Value::Object(updates)) => {
            for (key, value) in updates {
                fields.insert(key, value);
            }
        }
        (_, payload) => return Ok(serde_json::from_value(payload)?),
    }
    Ok(serde_json::from_value(merged)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::merge_record;
    use crate::models::Note;

    fn cached_note() -> Note {
        serde_json::from_value(json!({
            "id": "n1",
            "title": "수학",
            "content": "미분 정리",
            "createdAt": "T0",
            "updatedAt": "T1",
        }))
        .unwrap()
    }

    #[test]
    fn merge_record_keeps_cached_fields_absent_from_the_payload() {
        let note = cached_note();
        let merged: Note = merge_record(
            Some(&note),
            json!({"id": "n1", "title": "수학 요약", "updatedAt": "T2"}),
        )
        .unwrap();

        assert_eq!(merged.title, "수학 요약");
        assert_eq!(merged.content, "미분 정리");
        assert_eq!(merged.updated_at, "T2");
    }

    #[test]
    fn merge_record_without_a_cached_record_needs_a_full_payload() {
        let merged: Note = merge_record(
            None,
            json!({
                "id": "n2",
                "title": "영어",
                "content": "단어장",
                "createdAt": "T0",
                "updatedAt": "T0",
            }),
        )
        .unwrap();
        assert_eq!(merged.id, "n2");

        let partial = merge_record::<Note>(None, json!({"id": "n2", "title": "영어"}));
        assert!(partial.is_err());
    }
}
