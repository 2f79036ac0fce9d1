//! Wire models exchanged verbatim with the Seodang API.
//!
//! Entities are plain camelCase JSON records; ids are opaque server-assigned
//! strings and timestamps are carried as the server formats them. Clients
//! never generate ids for remotely persisted entities.

mod doc;
mod event;
mod friend;
mod note;
mod post;
mod profile;

pub use doc::{Doc, UploadFile};
pub use event::{CalendarEvent, EventPatch, NewEvent};
pub use friend::Friend;
pub use note::{NewNote, Note, NotePatch};
pub use post::{NewPost, Post, PostFilters, PostPatch, ALL_CATEGORY};
pub use profile::Profile;
