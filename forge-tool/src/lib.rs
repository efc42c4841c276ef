//! # forge-tool
//!
//! Tools lesson-forge agents can call:
//!
//! - [`FunctionTool`] - wraps an async Rust function
//! - [`ExitLoopTool`] - ends the enclosing loop agent
//! - [`GoogleSearchTool`] - Gemini's built-in search grounding
//!
//! ```rust,no_run
//! use forge_tool::FunctionTool;
//! use forge_core::{ToolContext, Result};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! async fn list_domains(_ctx: Arc<dyn ToolContext>, _args: Value) -> Result<Value> {
//!     Ok(json!("dsa, asyncio"))
//! }
//!
//! let tool = FunctionTool::new("list_domains", "List registered domains", list_domains);
//! ```

pub mod builtin;
mod function_tool;
pub mod schema;

pub use builtin::{ExitLoopTool, GoogleSearchTool};
pub use forge_core::{Tool, ToolContext};
pub use function_tool::FunctionTool;
pub use schema::generate_gemini_schema;
