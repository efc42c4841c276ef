//! # forge-core
//!
//! Core traits and types for lesson-forge agents, tools, sessions, and events.
//!
//! ## Overview
//!
//! - [`Agent`] - The trait every agent implements
//! - [`Tool`] - Capabilities an agent can call during a model turn
//! - [`Llm`] - The model seam; a provider turns an [`LlmRequest`] into responses
//! - [`Session`] / [`State`] - Conversation record and key-value state
//! - [`Event`] - What agents stream back while they run
//! - [`ForgeError`] / [`Result`] - Unified error handling
//!
//! ## State Management
//!
//! State keys may carry a scope prefix:
//!
//! - `user:` - shared by every session of a user
//! - `app:` - shared by every session of the application
//! - `temp:` - never persisted

pub mod agent;
pub mod context;
pub mod error;
pub mod event;
pub mod instruction_template;
pub mod model;
pub mod tool;
pub mod types;

pub use agent::{Agent, EventStream};
pub use context::{IncludeContents, InvocationContext, ReadonlyContext, Session, State};
pub use error::{ForgeError, Result};
pub use event::{Event, EventActions, KEY_PREFIX_APP, KEY_PREFIX_TEMP, KEY_PREFIX_USER};
pub use instruction_template::inject_session_state;
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata,
};
pub use tool::{Tool, ToolContext};
pub use types::{Content, FunctionResponseData, Part};
