//! HTTP client for the remote UI-automation agent.
//!
//! The agent is a single network-addressable process (host:port) exposing
//! the application's UI tree. This module implements [`UiProbe`] over its
//! JSON endpoints and provides the component-hierarchy dump used as a
//! diagnostic sink when a scenario fails.
//!
//! Wire shape (everything else about the agent is its own concern):
//!
//! - `POST /element` with a locator body resolves an element; `404` means no
//!   match at call time.
//! - `GET  /element/{id}/visible` and `GET /element/{id}/text` query state.
//! - `POST /element/{id}/click`, `/double-click`, `/text` mutate.
//! - `GET  /ping` answers once the agent is serving.
//! - `GET  /` returns a textual snapshot of the whole component hierarchy.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::fs;

use crate::probe::{ElementHandle, Locator, ProbeError, UiProbe};

/// Destination for a component-hierarchy dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchySink {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    id: Option<String>,
}

impl FindResponse {
    fn into_handle(self, locator: &Locator) -> Result<ElementHandle, ProbeError> {
        let id = self.id.ok_or_else(|| {
            ProbeError::Agent(format!(
                "agent response for {} did not include an element id",
                locator.describe()
            ))
        })?;
        Ok(ElementHandle {
            id,
            locator: locator.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct VisibleResponse {
    visible: bool,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    lines: Vec<String>,
}

/// Reqwest-backed probe speaking the agent's JSON protocol.
#[derive(Debug, Clone)]
pub struct RemoteAgentClient {
    client: HttpClient,
    base_url: String,
}

impl RemoteAgentClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProbeError> {
        let client = HttpClient::builder()
            .build()
            .map_err(|err| ProbeError::Agent(format!("failed to construct HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    async fn read_error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable>".to_string());
        format!("agent call failed ({status}): {body}")
    }

    async fn post_empty(&self, path: &str) -> Result<(), ProbeError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|err| ProbeError::Agent(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::Agent(Self::read_error_body(response).await))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProbeError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProbeError::Agent(err.to_string()))?;
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|err| ProbeError::Agent(format!("failed to parse agent response: {err}")))
        } else {
            Err(ProbeError::Agent(Self::read_error_body(response).await))
        }
    }

    /// Fetch the agent's full component-hierarchy snapshot.
    pub async fn fetch_component_hierarchy(&self) -> Result<String, ProbeError> {
        let url = self.endpoint("/");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProbeError::Agent(err.to_string()))?;
        if response.status().is_success() {
            response
                .text()
                .await
                .map_err(|err| ProbeError::Agent(err.to_string()))
        } else {
            Err(ProbeError::Agent(Self::read_error_body(response).await))
        }
    }

    /// Fetch the hierarchy snapshot and write it to the sink, line by line.
    pub async fn dump_component_hierarchy(&self, sink: &HierarchySink) -> Result<(), ProbeError> {
        let content = self.fetch_component_hierarchy().await?;
        write_hierarchy(sink, &content).await
    }
}

/// Write an already-fetched hierarchy snapshot to the sink.
pub async fn write_hierarchy(sink: &HierarchySink, content: &str) -> Result<(), ProbeError> {
    match sink {
        HierarchySink::Stdout => {
            for line in content.lines() {
                println!("{line}");
            }
            Ok(())
        }
        HierarchySink::File(path) => {
            let mut out = String::with_capacity(content.len() + 1);
            for line in content.lines() {
                out.push_str(line);
                out.push('\n');
            }
            write_file(path, &out).await
        }
    }
}

async fn write_file(path: &Path, content: &str) -> Result<(), ProbeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| ProbeError::Agent(err.to_string()))?;
        }
    }
    fs::write(path, content)
        .await
        .map_err(|err| ProbeError::Agent(err.to_string()))
}

#[async_trait]
impl UiProbe for RemoteAgentClient {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, ProbeError> {
        let url = self.endpoint("element");
        let response = self
            .client
            .post(url)
            .json(locator)
            .send()
            .await
            .map_err(|err| ProbeError::Agent(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProbeError::not_found(locator));
        }
        if !response.status().is_success() {
            return Err(ProbeError::Agent(Self::read_error_body(response).await));
        }

        let parsed: FindResponse = response
            .json()
            .await
            .map_err(|err| ProbeError::Agent(format!("failed to parse agent response: {err}")))?;
        parsed.into_handle(locator)
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, ProbeError> {
        let parsed: VisibleResponse = self
            .get_json(&format!("element/{}/visible", handle.id))
            .await?;
        Ok(parsed.visible)
    }

    async fn element_text(&self, handle: &ElementHandle) -> Result<Vec<String>, ProbeError> {
        let parsed: TextResponse = self.get_json(&format!("element/{}/text", handle.id)).await?;
        Ok(parsed.lines)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        self.post_empty(&format!("element/{}/click", handle.id)).await
    }

    async fn double_click(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        self.post_empty(&format!("element/{}/double-click", handle.id))
            .await
    }

    async fn set_text(&self, handle: &ElementHandle, value: &str) -> Result<(), ProbeError> {
        let url = self.endpoint(&format!("element/{}/text", handle.id));
        let response = self
            .client
            .post(url)
            .json(&json!({ "value": value }))
            .send()
            .await
            .map_err(|err| ProbeError::Agent(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::Agent(Self::read_error_body(response).await))
        }
    }

    async fn ping(&self) -> Result<(), ProbeError> {
        let url = self.endpoint("ping");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProbeError::Agent(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::Agent(Self::read_error_body(response).await))
        }
    }

    async fn component_hierarchy(&self) -> Result<String, ProbeError> {
        self.fetch_component_hierarchy().await
    }
}
