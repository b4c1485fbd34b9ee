//! Tests against a live automation agent.
//!
//! These are ignored by default; they need a running agent (an IDE started
//! with the remote-automation plugin, listening on UIBOT_AGENT_URL or the
//! default port). Run them explicitly:
//!
//!   $ UIBOT_AGENT_URL=http://localhost:8082 cargo test --test live_agent -- --ignored

use anyhow::{Context, Result};
use serial_test::serial;
use uibot::config::UiBotConfig;
use uibot::probe::{Locator, UiProbe};
use uibot::session::UiSession;
use uibot::{HierarchySink, RemoteAgentClient};

fn live_session() -> Result<UiSession<RemoteAgentClient>> {
    let config = UiBotConfig::from_env().context("failed to load configuration")?;
    let agent = RemoteAgentClient::new(config.agent_url.clone())
        .context("failed to construct agent client")?;
    Ok(UiSession::new(agent, config))
}

#[tokio::test]
#[ignore]
#[serial]
async fn agent_answers_ping() -> Result<()> {
    let session = live_session()?;
    session
        .ensure_agent_ready()
        .await
        .context("agent never became ready")?;
    session.probe().ping().await.context("follow-up ping failed")?;
    Ok(())
}

#[tokio::test]
#[ignore]
#[serial]
async fn hierarchy_snapshot_is_non_empty() -> Result<()> {
    let session = live_session()?;
    session.ensure_agent_ready().await?;

    let content = session
        .probe()
        .component_hierarchy()
        .await
        .context("failed to fetch the component hierarchy")?;
    assert!(
        !content.trim().is_empty(),
        "a live agent must report at least the root frame"
    );

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hierarchy.html");
    session
        .capture_hierarchy(&HierarchySink::File(path.clone()))
        .await
        .context("failed to write the hierarchy snapshot")?;
    assert!(path.exists());
    Ok(())
}

#[tokio::test]
#[ignore]
#[serial]
async fn main_frame_is_locatable() -> Result<()> {
    let session = live_session()?;
    session.ensure_agent_ready().await?;

    // Every IDE frame, welcome screen included, descends from an IdeFrame.
    let frame = Locator::path("//div[@class='IdeFrameImpl']");
    let handle = session
        .probe()
        .find_element(&frame)
        .await
        .context("no IDE frame reported by the agent")?;
    assert!(session.probe().is_visible(&handle).await?);
    Ok(())
}
