//! Downstream collaborators reached through narrow traits.
//!
//! # Submodules
//!
//! - [`cleanup`]: LLM-backed text cleanup of extracted bodies ([`TextCleaner`])
//! - [`publish`]: one-way posting of finished rows ([`Publisher`])
//! - [`sink`]: end-of-run storage of every row ([`ResultSink`])
//!
//! Each trait is also implemented for `Option<T>`, where `None` means the
//! collaborator is not configured: cleanup passes the body through and
//! publishing does nothing. No collaborator failure ever aborts a run.

pub mod cleanup;
pub mod publish;
pub mod sink;

pub use cleanup::{GroqCleaner, TextCleaner, clean_or_raw};
pub use publish::{Publisher, WordPressPublisher};
pub use sink::{JsonFileSink, ResultSink};
