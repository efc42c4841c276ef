//! # forge-model
//!
//! Model implementations for lesson-forge agents.
//!
//! - [`GeminiModel`] - Google Gemini over the `generateContent` REST endpoint
//! - [`MockLlm`] - Replays scripted responses, one per call
//!
//! ```rust,no_run
//! use forge_model::GeminiModel;
//!
//! let api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();
//! let model = GeminiModel::new(&api_key, "gemini-2.5-flash").unwrap();
//! ```

pub mod gemini;
pub mod mock;

pub use gemini::GeminiModel;
pub use mock::MockLlm;
