//! Completion workflow driver
//!
//! `AssistantControl` owns the control state and at most one in-flight
//! completion task. The owner's event loop observes the task through
//! `poll_completion` (non-blocking) or `wait_for_completion`, and the terminal
//! effects are applied there in one step.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ai::CompletionService;
use crate::error::{CompletionError, ControlError};
use crate::event::ValueChangeEvent;
use crate::state::{ConfigUpdate, Configuration, ControlState, ControlView};

type RunHandle = JoinHandle<Result<String, CompletionError>>;

/// What happened to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A request was dispatched.
    Started,
    /// A run was already in flight; one re-run will follow it.
    Queued,
    /// The prompt was empty, nothing happened.
    Ignored,
    /// The configuration change does not call for a run.
    NotTriggered,
}

pub struct AssistantControl<S: CompletionService + 'static> {
    state: ControlState,
    service: Arc<S>,
    in_flight: Option<RunHandle>,
    rerun_pending: bool,
    events: mpsc::UnboundedSender<ValueChangeEvent>,
    runs_started: u64,
}

impl<S: CompletionService + 'static> AssistantControl<S> {
    pub fn new(
        configuration: Configuration,
        service: S,
    ) -> (Self, mpsc::UnboundedReceiver<ValueChangeEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let control = Self {
            state: ControlState::new(configuration),
            service: Arc::new(service),
            in_flight: None,
            rerun_pending: false,
            events,
            runs_started: 0,
        };
        (control, rx)
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn view(&self) -> ControlView {
        self.state.view()
    }

    /// Current control value (the displayed response).
    pub fn value(&self) -> &str {
        self.state.display_response()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn mount(&mut self) {
        self.state.mount();
    }

    pub fn set_prompt_text(&mut self, text: impl Into<String>) {
        self.state.set_prompt_text(text);
    }

    pub fn set_system_text(&mut self, text: impl Into<String>) -> bool {
        self.state.set_system_text(text)
    }

    /// Explicit submission. Rejected while a run is in flight.
    ///
    /// The request runs on a spawned task, so this must be called from
    /// within a Tokio runtime; otherwise it returns
    /// [`ControlError::NoRuntime`] and the control stays idle.
    pub fn submit(&mut self) -> Result<Admission, ControlError> {
        if self.is_busy() {
            warn!("submission rejected: a completion is already in progress");
            return Err(ControlError::Busy);
        }
        self.start_run()
    }

    /// Host-side configuration change. Changes to the model, system prompt or
    /// prompt re-ask the AI; while busy that re-ask is coalesced into a single
    /// follow-up run.
    ///
    /// Outside a Tokio runtime the update is still applied, but a run it
    /// would start fails with [`ControlError::NoRuntime`].
    pub fn set_configuration(&mut self, update: ConfigUpdate) -> Result<Admission, ControlError> {
        if !self.state.apply_update(update)? {
            return Ok(Admission::NotTriggered);
        }
        if self.is_busy() {
            debug!("configuration changed while busy; queueing a re-run");
            self.rerun_pending = true;
            return Ok(Admission::Queued);
        }
        self.start_run()
    }

    fn start_run(&mut self) -> Result<Admission, ControlError> {
        if self.state.session_input().prompt_text.is_empty() {
            debug!("empty prompt; nothing to submit");
            return Ok(Admission::Ignored);
        }
        // Checked before begin_run so a failed spawn never leaves the control busy.
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ControlError::NoRuntime)?;
        let Some(request) = self.state.begin_run()? else {
            return Ok(Admission::Ignored);
        };

        self.runs_started += 1;
        info!(run = self.runs_started, model = %request.model, "dispatching completion request");

        let api_key = self.state.configuration().api_key.clone();
        let service = Arc::clone(&self.service);
        self.in_flight = Some(runtime.spawn(async move {
            service.complete(&api_key, &request).await
        }));
        Ok(Admission::Started)
    }

    /// Applies the terminal effects if the in-flight run has settled.
    pub async fn poll_completion(&mut self) -> Option<ValueChangeEvent> {
        let settled = self.in_flight.as_ref().is_some_and(|handle| handle.is_finished());
        if !settled {
            return None;
        }
        self.wait_for_completion().await
    }

    /// Waits for the in-flight run, if any, and applies its terminal effects.
    pub async fn wait_for_completion(&mut self) -> Option<ValueChangeEvent> {
        let handle = self.in_flight.take()?;
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(error = %join_err, "completion task did not finish");
                Err(CompletionError::Task(join_err.to_string()))
            }
        };

        let event = self.state.finish_run(result);
        info!(run = self.runs_started, outcome = ?event.outcome, "completion settled");
        if self.events.send(event.clone()).is_err() {
            debug!("no listener for value change events");
        }

        if std::mem::take(&mut self.rerun_pending) {
            if let Err(e) = self.start_run() {
                warn!(error = %e, "queued re-run could not start");
            }
        }

        Some(event)
    }

    /// Drives runs until nothing is in flight, including queued re-runs.
    pub async fn run_until_idle(&mut self) -> Vec<ValueChangeEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.wait_for_completion().await {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AiModel;
    use crate::state::ChatRequest;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Replays canned results and records every request it receives. Each
    /// call waits for a permit on `gate`, so tests decide when runs settle.
    struct ScriptedService {
        results: Mutex<VecDeque<Result<String, CompletionError>>>,
        requests: Arc<Mutex<Vec<(String, ChatRequest)>>>,
        gate: Arc<Semaphore>,
    }

    impl ScriptedService {
        fn new(results: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                requests: Arc::new(Mutex::new(Vec::new())),
                gate: Arc::new(Semaphore::new(usize::MAX >> 4)),
            }
        }

        fn gated(results: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                gate: Arc::new(Semaphore::new(0)),
                ..Self::new(results)
            }
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, CompletionError> {
            self.requests
                .lock()
                .unwrap()
                .push((api_key.to_string(), request.clone()));
            self.gate.acquire().await.unwrap().forget();
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Transport("script exhausted".into())))
        }
    }

    fn control_with(
        service: ScriptedService,
    ) -> (
        AssistantControl<ScriptedService>,
        mpsc::UnboundedReceiver<ValueChangeEvent>,
        Arc<Mutex<Vec<(String, ChatRequest)>>>,
        Arc<Semaphore>,
    ) {
        let requests = Arc::clone(&service.requests);
        let gate = Arc::clone(&service.gate);
        let config = Configuration {
            api_key: "sk-test".to_string(),
            ..Configuration::default()
        };
        let (mut control, rx) = AssistantControl::new(config, service);
        control.mount();
        (control, rx, requests, gate)
    }

    #[tokio::test]
    async fn test_success_updates_display_and_notifies_once() {
        let (mut control, mut rx, requests, _) =
            control_with(ScriptedService::new(vec![Ok("Hello!".to_string())]));

        control.set_prompt_text("Say hello");
        assert_eq!(control.submit(), Ok(Admission::Started));
        assert_eq!(control.value(), "please wait...");
        assert!(!control.view().submit_enabled);

        let event = control.wait_for_completion().await.unwrap();
        assert_eq!(event.detail, "Hello!");
        assert!(event.is_success());
        assert_eq!(control.value(), "Hello!");
        assert!(control.view().submit_enabled);
        assert!(!control.view().waiting);

        assert_eq!(rx.try_recv().unwrap().detail, "Hello!");
        assert!(rx.try_recv().is_err());

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "sk-test");
        assert_eq!(requests[0].1.messages[1].content, "Say hello");
    }

    #[tokio::test]
    async fn test_http_failure_surfaces_status_without_success_event() {
        let (mut control, mut rx, _, _) = control_with(ScriptedService::new(vec![Err(
            CompletionError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            },
        )]));

        control.set_prompt_text("hi");
        control.submit().unwrap();
        control.wait_for_completion().await;

        assert!(control.value().contains("401"));
        assert!(control.view().submit_enabled);
        while let Ok(event) = rx.try_recv() {
            assert!(!event.is_success());
        }
    }

    #[tokio::test]
    async fn test_empty_prompt_never_calls_service() {
        let (mut control, mut rx, requests, _) = control_with(ScriptedService::new(vec![]));

        assert_eq!(control.submit(), Ok(Admission::Ignored));
        assert_eq!(control.value(), "Awaiting input from Human...");
        assert!(!control.is_busy());
        assert!(control.wait_for_completion().await.is_none());
        assert!(requests.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_rejected_while_busy() {
        let (mut control, _rx, requests, gate) =
            control_with(ScriptedService::gated(vec![Ok("first".to_string())]));

        control.set_prompt_text("one");
        control.submit().unwrap();
        assert_eq!(control.submit(), Err(ControlError::Busy));
        assert_eq!(control.poll_completion().await, None);

        gate.add_permits(1);
        let event = control.wait_for_completion().await.unwrap();
        assert_eq!(event.detail, "first");
        assert_eq!(requests.lock().unwrap().len(), 1);
        assert_eq!(control.runs_started(), 1);
    }

    #[tokio::test]
    async fn test_config_change_while_busy_coalesces_into_one_rerun() {
        let (mut control, _rx, requests, gate) = control_with(ScriptedService::gated(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
        ]));

        control.set_prompt_text("question");
        control.submit().unwrap();

        let update = ConfigUpdate::default().model("gpt-4");
        assert_eq!(control.set_configuration(update), Ok(Admission::Queued));
        let update = ConfigUpdate::default().system_prompt("Be brief");
        assert_eq!(control.set_configuration(update), Ok(Admission::Queued));

        gate.add_permits(2);
        let events = control.run_until_idle().await;
        let details: Vec<_> = events.iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(details, vec!["first", "second"]);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].1.model, AiModel::Gpt4);
        assert_eq!(requests[1].1.messages[0].content, "Be brief");
    }

    #[tokio::test]
    async fn test_each_relevant_change_triggers_exactly_one_run() {
        let (mut control, mut rx, requests, _) = control_with(ScriptedService::new(vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Ok("c".to_string()),
        ]));

        let changes = [
            ConfigUpdate::default().prompt("What is Rust?"),
            ConfigUpdate::default().model("gpt-4-32k"),
            ConfigUpdate::default().system_prompt("You are a pirate"),
        ];
        for update in changes {
            assert_eq!(control.set_configuration(update), Ok(Admission::Started));
            control.wait_for_completion().await.unwrap();
            assert!(control.view().submit_enabled);
            assert!(!control.view().waiting);
        }

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].1.messages[1].content, "What is Rust?");
        assert_eq!(requests[1].1.model, AiModel::Gpt4_32k);
        assert_eq!(requests[2].1.messages[0].content, "You are a pirate");

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test]
    async fn test_config_change_with_empty_prompt_is_ignored() {
        let (mut control, _rx, requests, _) = control_with(ScriptedService::new(vec![]));

        let update = ConfigUpdate::default().model("gpt-4");
        assert_eq!(control.set_configuration(update), Ok(Admission::Ignored));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_model_is_reported_not_run() {
        let (mut control, _rx, requests, _) = control_with(ScriptedService::new(vec![]));
        control.set_prompt_text("hi");

        let err = control
            .set_configuration(ConfigUpdate::default().model("text-davinci-003"))
            .unwrap_err();
        assert_eq!(err, ControlError::UnknownModel("text-davinci-003".to_string()));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_run_recovers_on_resubmit() {
        let (mut control, _rx, _, _) = control_with(ScriptedService::new(vec![
            Err(CompletionError::malformed("response contained no choices")),
            Ok("recovered".to_string()),
        ]));

        control.set_prompt_text("hi");
        control.submit().unwrap();
        let event = control.wait_for_completion().await.unwrap();
        assert!(!event.is_success());
        assert!(control.value().starts_with("Error: Malformed completion response"));

        control.submit().unwrap();
        control.wait_for_completion().await.unwrap();
        assert_eq!(control.value(), "recovered");
    }

    #[test]
    fn test_submit_outside_runtime_leaves_control_idle() {
        let (mut control, mut rx, requests, _) =
            control_with(ScriptedService::new(vec![Ok("unused".to_string())]));

        control.set_prompt_text("hi");
        assert_eq!(control.submit(), Err(ControlError::NoRuntime));
        assert!(!control.is_busy());
        assert!(control.view().submit_enabled);
        assert_eq!(control.value(), "Awaiting input from Human...");
        assert_eq!(control.runs_started(), 0);
        assert!(requests.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());

        let update = ConfigUpdate::default().model("gpt-4");
        assert_eq!(control.set_configuration(update), Err(ControlError::NoRuntime));
        assert_eq!(control.state().configuration().model, AiModel::Gpt4);
        assert!(!control.is_busy());

        control.set_prompt_text("");
        assert_eq!(control.submit(), Ok(Admission::Ignored));
    }

    #[tokio::test]
    async fn test_locked_system_prompt_is_sent() {
        let (mut control, _rx, requests, _) =
            control_with(ScriptedService::new(vec![Ok("ok".to_string())]));

        control
            .set_configuration(ConfigUpdate::default().allow_system_prompt(false))
            .unwrap();
        assert!(!control.set_system_text("sneaky"));
        control.set_prompt_text("hi");
        control.submit().unwrap();
        control.wait_for_completion().await;

        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0].1.messages[0].content,
            crate::state::DEFAULT_SYSTEM_PROMPT
        );
    }
}
