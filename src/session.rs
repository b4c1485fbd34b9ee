//! Session sequencer: named high-level UI operations.
//!
//! Each operation is a fixed, linear sequence of probe queries, poller
//! waits, and retried actions. The only branching is the idempotent
//! early-exit check before a corrective mutation: if the postcondition
//! already holds, no click is issued. Terminal failures from nested waits or
//! exhausted retries propagate to the caller unchanged; the heavyweight
//! operations additionally capture a best-effort component-hierarchy dump on
//! failure, which never masks the original error.

use std::path::PathBuf;

use thiserror::Error;
use tokio::time::sleep;

use crate::agent::{HierarchySink, write_hierarchy};
use crate::config::UiBotConfig;
use crate::logging::UiBotLogger;
use crate::probe::{ActionSpec, Locator, ProbeError, UiProbe, perform_action};
use crate::retry::{RetryError, RetrySpec, retry_action};
use crate::wait::{WaitError, WaitSpec, wait_for, wait_for_ok};

/// Errors surfaced by [`UiSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Retry(#[from] RetryError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// A tool-window panel: the label proving it is open, and the stripe button
/// that toggles it.
#[derive(Debug, Clone)]
pub struct PanelSpec {
    pub name: String,
    pub content_label: Locator,
    pub stripe_button: Locator,
}

impl PanelSpec {
    /// Conventional locators for a panel toggled by a same-named stripe
    /// button.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let stripe_button = Locator::path(format!(
            "//div[@class='StripeButton' and @text='{name}']"
        ));
        Self {
            content_label: Locator::label(name.clone()),
            stripe_button,
            name,
        }
    }

    pub fn with_locators(
        name: impl Into<String>,
        content_label: Locator,
        stripe_button: Locator,
    ) -> Self {
        Self {
            name: name.into(),
            content_label,
            stripe_button,
        }
    }
}

/// Everything needed to drive the open-project dialog.
#[derive(Debug, Clone)]
pub struct ImportProjectSpec {
    pub project_path: String,
    pub project_name: String,
    pub open_button: Locator,
    pub path_field: Locator,
    pub chooser_tree: Locator,
    pub confirm_button: Locator,
}

impl ImportProjectSpec {
    /// Conventional locators for the stock open-project dialog.
    pub fn new(project_path: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            project_name: project_name.into(),
            open_button: Locator::label("Open"),
            path_field: Locator::attribute("class", "BorderlessTextField"),
            chooser_tree: Locator::attribute("class", "FileChooserTree"),
            confirm_button: Locator::label("OK"),
        }
    }
}

/// Orchestrates one logical test scenario against a [`UiProbe`].
pub struct UiSession<P: UiProbe> {
    probe: P,
    config: UiBotConfig,
    logger: UiBotLogger,
}

impl<P: UiProbe> UiSession<P> {
    pub fn new(probe: P, config: UiBotConfig) -> Self {
        let logger = UiBotLogger::new(config.verbose);
        Self {
            probe,
            config,
            logger,
        }
    }

    pub fn with_logger(probe: P, config: UiBotConfig, logger: UiBotLogger) -> Self {
        Self {
            probe,
            config,
            logger,
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn config(&self) -> &UiBotConfig {
        &self.config
    }

    pub fn logger(&self) -> &UiBotLogger {
        &self.logger
    }

    fn find_spec(&self) -> Result<WaitSpec, WaitError> {
        WaitSpec::new(self.config.find_timeout(), self.config.poll_interval())
    }

    fn startup_spec(&self) -> Result<WaitSpec, WaitError> {
        WaitSpec::new(
            self.config.startup_timeout(),
            self.config.startup_poll_interval(),
        )
    }

    fn retry_spec(&self) -> Result<RetrySpec, RetryError> {
        RetrySpec::new(self.config.action_attempts, self.config.action_retry_delay())
    }

    /// Whether the element exists and is showing. Absence is `Ok(false)`,
    /// not an error, so this can serve directly as a polling predicate.
    pub async fn element_visible(&self, locator: &Locator) -> Result<bool, ProbeError> {
        match self.probe.find_element(locator).await {
            Ok(handle) => self.probe.is_visible(&handle).await,
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Whether any text fragment of the element contains `needle`. Absence
    /// is `Ok(false)`.
    pub async fn element_contains_text(
        &self,
        locator: &Locator,
        needle: &str,
    ) -> Result<bool, ProbeError> {
        match self.probe.find_element(locator).await {
            Ok(handle) => {
                let lines = self.probe.element_text(&handle).await?;
                Ok(lines.iter().any(|line| line.contains(needle)))
            }
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Poll until the element is showing.
    pub async fn wait_until_visible(
        &self,
        locator: &Locator,
        what: &str,
    ) -> Result<(), SessionError> {
        let spec = self.find_spec()?.describing(
            format!("waiting for {what} to show"),
            format!("{what} is not showing"),
        );
        wait_for(&spec, || self.element_visible(locator)).await?;
        Ok(())
    }

    /// Poll until the element is gone or hidden.
    pub async fn wait_until_hidden(
        &self,
        locator: &Locator,
        what: &str,
    ) -> Result<(), SessionError> {
        let spec = self.find_spec()?.describing(
            format!("waiting for {what} to go away"),
            format!("{what} is still showing"),
        );
        wait_for(&spec, move || async move {
            self.element_visible(locator).await.map(|visible| !visible)
        })
        .await?;
        Ok(())
    }

    /// Run one action under the session retry budget.
    async fn attempt_action(&self, action: &ActionSpec, what: &str) -> Result<(), SessionError> {
        let spec = self.retry_spec()?;
        let result = retry_action(&spec, || perform_action(&self.probe, action)).await?;
        if result.attempt > 1 {
            self.logger.debug(
                format!("{what} needed {} attempts", result.attempt),
                Some("retry"),
                Some(serde_json::json!({ "target": action.target.describe() })),
            );
        }
        Ok(())
    }

    /// Block until the automation agent answers its first ping.
    ///
    /// Postcondition: subsequent probe calls reach a live agent. Startup
    /// errors (connection refused while the application boots) are expected
    /// and retried until the startup budget runs out.
    pub async fn ensure_agent_ready(&self) -> Result<(), SessionError> {
        let spec = self.startup_spec()?.describing(
            "waiting for the automation agent to answer",
            "automation agent did not answer",
        );
        wait_for_ok(&spec, || self.probe.ping()).await?;
        self.logger
            .info("automation agent is ready", Some("session"), None);
        Ok(())
    }

    /// Open a project through the open-project dialog.
    ///
    /// Precondition: the welcome frame is showing. Postcondition: the
    /// chooser was confirmed with the requested path and the application has
    /// begun loading the project.
    pub async fn import_project(&self, import: &ImportProjectSpec) -> Result<(), SessionError> {
        self.logger.info(
            format!("importing project '{}'", import.project_name),
            Some("session"),
            None,
        );
        let result = self.import_project_inner(import).await;
        self.note_failure(result).await
    }

    async fn import_project_inner(&self, import: &ImportProjectSpec) -> Result<(), SessionError> {
        self.wait_until_visible(&import.open_button, "open project button")
            .await?;
        self.attempt_action(
            &ActionSpec::click(import.open_button.clone()),
            "open project dialog",
        )
        .await?;

        self.wait_until_visible(&import.confirm_button, "confirm button")
            .await?;

        self.attempt_action(
            &ActionSpec::set_text(import.path_field.clone(), import.project_path.clone()),
            "enter project path",
        )
        .await?;

        // The field echoes asynchronously; poll until the set value sticks.
        let spec = self.find_spec()?.describing(
            "waiting for the path field to echo the set value",
            "path field was not populated with the set value",
        );
        wait_for(&spec, || {
            self.element_contains_text(&import.path_field, &import.project_path)
        })
        .await?;

        self.wait_for_tree_item(&import.chooser_tree, &import.project_name)
            .await?;

        self.attempt_action(
            &ActionSpec::click(import.confirm_button.clone()),
            "confirm project import",
        )
        .await?;

        // The chooser teardown emits no observable signal; give the
        // application a bounded pause before the next operation.
        sleep(self.config.import_settle()).await;
        Ok(())
    }

    /// Open a tool-window panel if it is not already open.
    ///
    /// Postcondition: the panel's content label is showing. A panel that is
    /// already open is left untouched (zero clicks).
    pub async fn open_panel(&self, panel: &PanelSpec) -> Result<(), SessionError> {
        if self.element_visible(&panel.content_label).await? {
            self.logger.debug(
                format!("panel '{}' is already open", panel.name),
                Some("session"),
                None,
            );
            return Ok(());
        }

        self.attempt_action(
            &ActionSpec::click(panel.stripe_button.clone()),
            &format!("open panel '{}'", panel.name),
        )
        .await?;
        self.wait_until_visible(&panel.content_label, &format!("panel '{}'", panel.name))
            .await
    }

    /// Close a tool-window panel if it is not already closed.
    ///
    /// Postcondition: the panel's content label is hidden. A panel that is
    /// already closed is left untouched (zero clicks).
    pub async fn close_panel(&self, panel: &PanelSpec) -> Result<(), SessionError> {
        if !self.element_visible(&panel.content_label).await? {
            self.logger.debug(
                format!("panel '{}' is already closed", panel.name),
                Some("session"),
                None,
            );
            return Ok(());
        }

        self.attempt_action(
            &ActionSpec::click(panel.stripe_button.clone()),
            &format!("close panel '{}'", panel.name),
        )
        .await?;
        self.wait_until_hidden(&panel.content_label, &format!("panel '{}'", panel.name))
            .await
    }

    /// Poll until `item` appears among the named tree's text fragments.
    ///
    /// Tolerates the tree blinking out of existence while the application
    /// indexes in the background: absence and transient probe errors both
    /// count as "not yet".
    pub async fn wait_for_tree_item(
        &self,
        tree: &Locator,
        item: &str,
    ) -> Result<(), SessionError> {
        let spec = self.find_spec()?.describing(
            format!("waiting for '{item}' to appear in {}", tree.describe()),
            format!("'{item}' did not appear in {}", tree.describe()),
        );
        wait_for(&spec, || self.element_contains_text(tree, item)).await?;
        Ok(())
    }

    /// Focus the panel and double-click the named action row in its tree.
    ///
    /// Precondition: the panel is open (see [`UiSession::open_panel`]).
    /// Postcondition: the action row received one successful double-click.
    pub async fn run_tree_action(
        &self,
        panel: &PanelSpec,
        tree: &Locator,
        action: &str,
    ) -> Result<(), SessionError> {
        self.logger.info(
            format!("running action '{action}' from panel '{}'", panel.name),
            Some("session"),
            None,
        );
        let result = self.run_tree_action_inner(panel, tree, action).await;
        self.note_failure(result).await
    }

    async fn run_tree_action_inner(
        &self,
        panel: &PanelSpec,
        tree: &Locator,
        action: &str,
    ) -> Result<(), SessionError> {
        self.attempt_action(
            &ActionSpec::click(panel.content_label.clone()),
            &format!("focus panel '{}'", panel.name),
        )
        .await?;

        self.wait_for_tree_item(tree, action).await?;

        self.attempt_action(
            &ActionSpec::double_click(Locator::label(action)),
            &format!("double-click '{action}'"),
        )
        .await
    }

    /// Focus the panel and click its expand-all button.
    ///
    /// Precondition: the panel is open.
    pub async fn expand_tree(
        &self,
        panel: &PanelSpec,
        expand_button: &Locator,
    ) -> Result<(), SessionError> {
        self.attempt_action(
            &ActionSpec::click(panel.content_label.clone()),
            &format!("focus panel '{}'", panel.name),
        )
        .await?;
        self.attempt_action(&ActionSpec::click(expand_button.clone()), "expand tree")
            .await
    }

    /// Close the project frame through the menu.
    ///
    /// Precondition: a project frame is open. Postcondition: the close menu
    /// item was clicked; pair with [`UiSession::wait_for_welcome_frame`] to
    /// confirm the frame actually went away.
    pub async fn close_project_frame(
        &self,
        menu: &Locator,
        close_item: &Locator,
    ) -> Result<(), SessionError> {
        self.attempt_action(&ActionSpec::click(menu.clone()), "open menu")
            .await?;
        self.wait_until_visible(close_item, "close menu item").await?;
        self.attempt_action(&ActionSpec::click(close_item.clone()), "close project")
            .await
    }

    /// Wait for the welcome frame shown once no project frame remains.
    /// Frame teardown can take a while, so this runs on the startup budget.
    pub async fn wait_for_welcome_frame(&self, welcome: &Locator) -> Result<(), SessionError> {
        let spec = self.startup_spec()?.describing(
            "waiting for the welcome frame",
            "welcome frame did not appear",
        );
        wait_for(&spec, || self.element_visible(welcome)).await?;
        Ok(())
    }

    /// Fetch the component hierarchy and write it to the sink.
    pub async fn capture_hierarchy(&self, sink: &HierarchySink) -> Result<(), SessionError> {
        let content = self.probe.component_hierarchy().await?;
        write_hierarchy(sink, &content).await?;
        Ok(())
    }

    /// On failure, capture a hierarchy snapshot for post-mortem debugging.
    /// Snapshot errors are logged and dropped so they can never replace the
    /// original failure.
    async fn note_failure<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(err) = &result {
            self.logger
                .error(format!("operation failed: {err}"), Some("session"), None);
            let sink = HierarchySink::File(PathBuf::from(&self.config.hierarchy_dump_file));
            match self.capture_hierarchy(&sink).await {
                Ok(()) => self.logger.info(
                    format!(
                        "component hierarchy captured to {}",
                        self.config.hierarchy_dump_file
                    ),
                    Some("session"),
                    None,
                ),
                Err(dump_err) => self.logger.error(
                    format!("failed to capture component hierarchy: {dump_err}"),
                    Some("session"),
                    None,
                ),
            }
        }
        result
    }
}
