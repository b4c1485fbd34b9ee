//! UI state probe abstraction.
//!
//! The probe is the only seam between the sequencer and whatever remote
//! agent actually owns the UI tree. Locators are an opaque structural query:
//! the probe forwards them verbatim and never interprets their syntax, so
//! swapping automation backends means implementing [`UiProbe`] once.
//!
//! Absence of an element is a signal, not a failure: callers polling for UI
//! state map [`ProbeError::NotFound`] to "condition not yet met".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque query identifying a UI element within the agent's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Locator {
    /// Structural tree-path query (e.g. an XPath over the component tree).
    Path { query: String },
    /// Match on the visible text of a labelled component.
    Label { text: String },
    /// Match on an arbitrary component attribute.
    Attribute { name: String, value: String },
}

impl Locator {
    pub fn path(query: impl Into<String>) -> Self {
        Locator::Path {
            query: query.into(),
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Locator::Label { text: text.into() }
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Locator::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Short human-readable form for logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            Locator::Path { query } => format!("path={query}"),
            Locator::Label { text } => format!("label={text}"),
            Locator::Attribute { name, value } => format!("attribute[{name}={value}]"),
        }
    }
}

/// Handle to an element resolved by the agent. Valid only as long as the
/// underlying component exists; callers re-resolve rather than caching
/// across waits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    pub locator: Locator,
}

/// Operation performed on a target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Click,
    DoubleClick,
    SetText,
}

/// One UI action to attempt: target, operation, optional input value.
/// Constructed immediately before execution and discarded after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub target: Locator,
    pub op: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ActionSpec {
    pub fn click(target: Locator) -> Self {
        Self {
            target,
            op: ActionKind::Click,
            value: None,
        }
    }

    pub fn double_click(target: Locator) -> Self {
        Self {
            target,
            op: ActionKind::DoubleClick,
            value: None,
        }
    }

    pub fn set_text(target: Locator, value: impl Into<String>) -> Self {
        Self {
            target,
            op: ActionKind::SetText,
            value: Some(value.into()),
        }
    }
}

/// Errors surfaced by probe implementations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No matching element exists at call time. Recoverable; used as a
    /// polling predicate input by callers.
    #[error("no element matching {locator}")]
    NotFound { locator: String },
    /// The agent rejected or failed the request.
    #[error("agent error: {0}")]
    Agent(String),
    /// A set-text action was issued without an input value.
    #[error("set-text action on {locator} is missing an input value")]
    MissingValue { locator: String },
}

impl ProbeError {
    pub fn not_found(locator: &Locator) -> Self {
        ProbeError::NotFound {
            locator: locator.describe(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound { .. })
    }
}

/// Queries and mutations against the remote UI tree.
#[async_trait]
pub trait UiProbe: Send + Sync {
    /// Resolve a locator to a live element handle.
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, ProbeError>;

    /// Whether the element is currently showing on screen.
    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, ProbeError>;

    /// All text fragments rendered by the element, in paint order.
    async fn element_text(&self, handle: &ElementHandle) -> Result<Vec<String>, ProbeError>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), ProbeError>;

    async fn double_click(&self, handle: &ElementHandle) -> Result<(), ProbeError>;

    async fn set_text(&self, handle: &ElementHandle, value: &str) -> Result<(), ProbeError>;

    /// Cheap liveness check against the agent itself.
    async fn ping(&self) -> Result<(), ProbeError>;

    /// Textual snapshot of the whole component hierarchy, for diagnostics.
    async fn component_hierarchy(&self) -> Result<String, ProbeError>;
}

/// Resolve the action's target and apply its operation once.
///
/// One invocation equals one attempt; the retry executor wraps this when a
/// flaky tree is expected.
pub async fn perform_action<P: UiProbe + ?Sized>(
    probe: &P,
    action: &ActionSpec,
) -> Result<(), ProbeError> {
    let handle = probe.find_element(&action.target).await?;
    match action.op {
        ActionKind::Click => probe.click(&handle).await,
        ActionKind::DoubleClick => probe.double_click(&handle).await,
        ActionKind::SetText => {
            let value = action.value.as_deref().ok_or_else(|| ProbeError::MissingValue {
                locator: action.target.describe(),
            })?;
            probe.set_text(&handle, value).await
        }
    }
}
