//! LLM boundary.
//!
//! The model is reached through one chat abstraction and used as three
//! pure services: paper relevance scoring, literature knowledge
//! extraction, and the narrative writer. None of them can change a
//! tier; the narrator's output is validated against the deterministic
//! tier and discarded on disagreement.

pub mod audit;
pub mod backend;
pub mod service;

pub use audit::DecisionLog;
pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use service::{LlmService, NarrativeInput};
