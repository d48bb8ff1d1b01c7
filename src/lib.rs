//! Chat gateway for an AI companion.
//!
//! The core is [`cache::ConversationContextCache`]: per-session, size-bounded
//! windows of recent turns with a fixed time-to-live, fed to the language
//! model as conversational memory.

pub mod cache;
pub mod config;
pub mod emotion;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod persona;
pub mod types;
