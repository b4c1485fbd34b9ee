//! End-to-end sequencer scenarios against a scripted in-memory probe.
//!
//! The probe mimics the behaviours that make real UI automation flaky: state
//! that becomes visible only a few polls after the corrective click, tree
//! rows whose double-click fails while the application repaints, and an
//! agent that refuses connections while the application boots. All timing
//! runs under tokio's paused clock, so deadlines are exercised without
//! real-time sleeps.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uibot::config::UiBotConfig;
use uibot::probe::{ElementHandle, Locator, ProbeError, UiProbe};
use uibot::retry::RetryError;
use uibot::session::{ImportProjectSpec, PanelSpec, SessionError, UiSession};
use uibot::wait::WaitError;

#[derive(Default)]
struct State {
    /// Labels currently showing.
    visible: HashSet<String>,
    /// Number of visibility polls a label stays hidden after being shown.
    visibility_delay: HashMap<String, u32>,
    /// Text fragments per element (keyed by locator description).
    texts: HashMap<String, Vec<String>>,
    /// Remaining double-click attempts that should fail.
    double_click_failures: u32,
    /// Remaining pings that should fail.
    ping_failures: u32,
    clicks: Vec<String>,
    double_clicks: Vec<String>,
    set_texts: Vec<(String, String)>,
}

/// Scripted stand-in for a live application behind an automation agent.
struct ScriptedIde {
    state: Mutex<State>,
}

impl ScriptedIde {
    fn new(state: State) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    fn double_clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().double_clicks.clone()
    }

    fn set_texts(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().set_texts.clone()
    }
}

#[async_trait]
impl UiProbe for ScriptedIde {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, ProbeError> {
        let state = self.state.lock().unwrap();
        let exists = match locator {
            Locator::Label { text } => {
                state.visible.contains(text)
                    || state.visibility_delay.contains_key(text)
                    // Tree rows resolve as labelled components too.
                    || state.texts.values().flatten().any(|line| line.contains(text.as_str()))
            }
            // Structural queries resolve as long as the agent is up.
            _ => true,
        };
        if exists {
            Ok(ElementHandle {
                id: locator.describe(),
                locator: locator.clone(),
            })
        } else {
            Err(ProbeError::not_found(locator))
        }
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, ProbeError> {
        let mut state = self.state.lock().unwrap();
        if let Locator::Label { text } = &handle.locator {
            if let Some(remaining) = state.visibility_delay.get_mut(text) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(false);
                }
                let text = text.clone();
                state.visibility_delay.remove(&text);
                state.visible.insert(text);
            }
            Ok(state.visible.contains(text))
        } else {
            Ok(true)
        }
    }

    async fn element_text(&self, handle: &ElementHandle) -> Result<Vec<String>, ProbeError> {
        let state = self.state.lock().unwrap();
        Ok(state.texts.get(&handle.id).cloned().unwrap_or_default())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(handle.id.clone());

        match &handle.locator {
            // Clicking the welcome "Open" button raises the chooser dialog.
            Locator::Label { text } if text == "Open" => {
                state.visible.insert("OK".to_string());
            }
            // Stripe buttons toggle the panel named in their path query.
            Locator::Path { query } if query.contains("StripeButton") => {
                for name in ["Dashboard", "Project"] {
                    if query.contains(name) {
                        if !state.visible.remove(name) {
                            state.visible.insert(name.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn double_click(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        let mut state = self.state.lock().unwrap();
        if state.double_click_failures > 0 {
            state.double_click_failures -= 1;
            return Err(ProbeError::Agent(
                "component disappeared during repaint".into(),
            ));
        }
        state.double_clicks.push(handle.id.clone());
        Ok(())
    }

    async fn set_text(&self, handle: &ElementHandle, value: &str) -> Result<(), ProbeError> {
        let mut state = self.state.lock().unwrap();
        state
            .set_texts
            .push((handle.id.clone(), value.to_string()));
        // The field echoes what was typed; the chooser tree then resolves
        // the directory name under that path.
        state
            .texts
            .insert(handle.id.clone(), vec![value.to_string()]);
        if let Some(name) = value.rsplit('/').next() {
            state
                .texts
                .entry(Locator::attribute("class", "FileChooserTree").describe())
                .or_default()
                .push(name.to_string());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), ProbeError> {
        let mut state = self.state.lock().unwrap();
        if state.ping_failures > 0 {
            state.ping_failures -= 1;
            return Err(ProbeError::Agent("connection refused".into()));
        }
        Ok(())
    }

    async fn component_hierarchy(&self) -> Result<String, ProbeError> {
        Ok("<hierarchy>\n  <frame/>\n</hierarchy>".into())
    }
}

fn fast_config() -> UiBotConfig {
    let mut config = UiBotConfig::default();
    config.find_timeout_ms = 2_000;
    config.poll_interval_ms = 100;
    config.startup_timeout_ms = 10_000;
    config.startup_poll_interval_ms = 500;
    config.action_attempts = 3;
    config.action_retry_delay_ms = 100;
    config.import_settle_ms = 1_000;
    config
}

fn session_with(state: State) -> UiSession<ScriptedIde> {
    UiSession::new(ScriptedIde::new(state), fast_config())
}

#[tokio::test(start_paused = true)]
async fn agent_readiness_retries_through_boot_errors() {
    let session = session_with(State {
        ping_failures: 4,
        ..Default::default()
    });

    session
        .ensure_agent_ready()
        .await
        .expect("agent answers after boot");
}

#[tokio::test(start_paused = true)]
async fn agent_that_never_answers_times_out() {
    let session = session_with(State {
        ping_failures: u32::MAX,
        ..Default::default()
    });

    let err = session
        .ensure_agent_ready()
        .await
        .expect_err("must give up at the startup deadline");

    match err {
        SessionError::Wait(WaitError::Timeout { last_error, .. }) => {
            assert_eq!(last_error.as_deref(), Some("agent error: connection refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn import_project_drives_the_chooser_dialog_end_to_end() {
    let mut state = State::default();
    state.visible.insert("Open".to_string());
    let session = session_with(state);

    let import = ImportProjectSpec::new("/work/projects/sample-app", "sample-app");
    session.import_project(&import).await.expect("import succeeds");

    let probe = session.probe();
    assert_eq!(probe.clicks(), vec!["label=Open", "label=OK"]);
    assert_eq!(
        probe.set_texts(),
        vec![(
            "attribute[class=BorderlessTextField]".to_string(),
            "/work/projects/sample-app".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn open_panel_click_then_poll_until_panel_renders() {
    // The panel label starts rendering only after the corrective click and
    // a couple of polls, like a real tool window during indexing.
    let mut state = State::default();
    state.visibility_delay.insert("Dashboard".to_string(), 2);
    let session = session_with(state);
    let panel = PanelSpec::named("Dashboard");
    session.open_panel(&panel).await.expect("panel opens");

    let clicks = session.probe().clicks();
    assert_eq!(clicks.len(), 1, "one corrective click, no more");
    assert!(clicks[0].contains("StripeButton"));
}

#[tokio::test(start_paused = true)]
async fn open_panel_is_a_no_op_when_postcondition_already_holds() {
    let mut state = State::default();
    state.visible.insert("Dashboard".to_string());
    let session = session_with(state);

    session
        .open_panel(&PanelSpec::named("Dashboard"))
        .await
        .expect("no-op succeeds");

    assert!(session.probe().clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn flaky_tree_action_succeeds_within_retry_budget() {
    let mut state = State::default();
    state.visible.insert("Dashboard".to_string());
    state.texts.insert(
        Locator::attribute("class", "DashboardTree").describe(),
        vec!["sample-app".to_string(), "Start".to_string()],
    );
    // Two repaint glitches, then the double-click lands.
    state.double_click_failures = 2;
    let session = session_with(state);

    let tree = Locator::attribute("class", "DashboardTree");
    session
        .run_tree_action(&PanelSpec::named("Dashboard"), &tree, "Start")
        .await
        .expect("action runs after retries");

    assert_eq!(session.probe().double_clicks(), vec!["label=Start"]);
}

#[tokio::test(start_paused = true)]
async fn expand_tree_focuses_the_panel_then_clicks_expand_all_once() {
    let mut state = State::default();
    state.visible.insert("Dashboard".to_string());
    let session = session_with(state);

    let expand_all = Locator::attribute("myaction.key", "action.ExpandAll.text");
    session
        .expand_tree(&PanelSpec::named("Dashboard"), &expand_all)
        .await
        .expect("expand succeeds");

    assert_eq!(
        session.probe().clicks(),
        vec![
            "label=Dashboard",
            "attribute[myaction.key=action.ExpandAll.text]"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_action_budget_propagates_with_root_cause_and_dumps_hierarchy() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("failure-hierarchy.html");

    let mut state = State::default();
    state.visible.insert("Dashboard".to_string());
    state.texts.insert(
        Locator::attribute("class", "DashboardTree").describe(),
        vec!["Start".to_string()],
    );
    state.double_click_failures = u32::MAX;

    let mut config = fast_config();
    config.hierarchy_dump_file = dump_path.to_string_lossy().into_owned();
    let session = UiSession::new(ScriptedIde::new(state), config);

    let tree = Locator::attribute("class", "DashboardTree");
    let err = session
        .run_tree_action(&PanelSpec::named("Dashboard"), &tree, "Start")
        .await
        .expect_err("budget must be exhausted");

    match err {
        SessionError::Retry(RetryError::Exhausted {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("component disappeared during repaint"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The post-mortem dump was captured without replacing the error.
    let dumped = std::fs::read_to_string(&dump_path).unwrap();
    assert!(dumped.contains("<hierarchy>"));
}

#[tokio::test(start_paused = true)]
async fn missing_tree_item_times_out_with_its_description() {
    let mut state = State::default();
    state.visible.insert("Dashboard".to_string());
    state.texts.insert(
        Locator::attribute("class", "DashboardTree").describe(),
        vec!["sample-app".to_string()],
    );
    let session = session_with(state);

    let tree = Locator::attribute("class", "DashboardTree");
    let err = session
        .wait_for_tree_item(&tree, "Start")
        .await
        .expect_err("item never appears");

    match err {
        SessionError::Wait(WaitError::Timeout { failure, .. }) => {
            assert!(failure.contains("'Start' did not appear"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn close_project_frame_walks_the_menu() {
    let mut state = State::default();
    state.visible.insert("File".to_string());
    state.visible.insert("Close Project".to_string());
    state.visibility_delay.insert("Welcome".to_string(), 1);
    let session = session_with(state);

    session
        .close_project_frame(&Locator::label("File"), &Locator::label("Close Project"))
        .await
        .expect("menu sequence succeeds");
    session
        .wait_for_welcome_frame(&Locator::label("Welcome"))
        .await
        .expect("welcome frame returns");

    assert_eq!(
        session.probe().clicks(),
        vec!["label=File", "label=Close Project"]
    );
}
