//! AI service adapters for the pawsight pipeline.
//!
//! This crate turns raw model output into the typed assessment payloads the
//! core expects, classifies upstream failures, and provides two
//! [`AiService`](pawsight_core::AiService) implementations that need no
//! network: a scripted service for tests and demos, and an offline keyword
//! assessor for chat turns.

pub mod offline;
pub mod parsing;
pub mod scripted;

pub use offline::*;
pub use parsing::*;
pub use scripted::*;
