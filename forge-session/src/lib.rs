//! Session storage for lesson-forge.
//!
//! Sessions are handed out as shared handles: an event appended through the
//! [`SessionService`] is immediately visible through every handle to that
//! session, including its state delta.

pub mod inmemory;
pub mod service;

pub use forge_core::{Event, EventActions, KEY_PREFIX_APP, KEY_PREFIX_TEMP, KEY_PREFIX_USER};
pub use forge_core::{Session, State};
pub use inmemory::InMemorySessionService;
pub use service::{CreateRequest, DeleteRequest, GetRequest, ListRequest, SessionService};
