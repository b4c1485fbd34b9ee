//! uibot: resilient driver for a remote UI-automation agent.
//!
//! The crate turns flaky, asynchronously rendered UI state into bounded,
//! observable test steps. Three small primitives carry the discipline:
//!
//! - [`wait`] polls a condition against a deadline at a fixed interval;
//! - [`retry`] re-attempts a fallible UI action under a bounded budget;
//! - [`probe`] abstracts element lookup, visibility, text, and mutation
//!   behind an opaque [`probe::Locator`] so no automation backend's query
//!   syntax leaks into scenarios.
//!
//! [`session::UiSession`] composes them into named end-to-end operations
//! (open a project, toggle a panel, run a tree action), and
//! [`agent::RemoteAgentClient`] implements the probe over the agent's HTTP
//! interface.

pub mod agent;
pub mod config;
pub mod logging;
pub mod probe;
pub mod retry;
pub mod session;
pub mod wait;

pub use agent::{HierarchySink, RemoteAgentClient};
pub use config::{UiBotConfig, UiBotConfigOverrides, Verbosity};
pub use probe::{ActionKind, ActionSpec, ElementHandle, Locator, ProbeError, UiProbe};
pub use retry::{AttemptResult, RetryError, RetrySpec, retry_action};
pub use session::{ImportProjectSpec, PanelSpec, SessionError, UiSession};
pub use wait::{WaitError, WaitSpec, wait_for, wait_for_ok};
