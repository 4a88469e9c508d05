//! Shared infrastructure for the Oncotier workspace: errors, the
//! allowlist-capped HTTP client, retry policy, tumor-type matching,
//! and runtime settings.

pub mod error;
pub mod retry;
pub mod sandbox;
pub mod settings;
pub mod tumor;

pub use error::{OncotierError, Result};
pub use sandbox::SandboxClient;
pub use settings::Settings;
