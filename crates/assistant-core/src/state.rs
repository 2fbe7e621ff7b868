//! UI-agnostic control state
//!
//! Holds the configuration set by the host, the two editable fields, and the
//! single response slot. Hosts render from `ControlState::view` and never
//! write presentation values back into the state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CompletionError, ControlError};
use crate::event::ValueChangeEvent;
use crate::model::AiModel;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a Helpful AI Assistant";
pub const AWAITING_INPUT: &str = "Awaiting input from Human...";
pub const PLEASE_WAIT: &str = "please wait...";

/// Host-owned configuration. The workflow only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub api_key: String,
    pub model: AiModel,
    pub system_prompt: String,
    /// Last prompt the host set through `aiPrompt`. The prompt field starts
    /// from it but user edits live in `SessionInput`.
    pub prompt: String,
    pub allow_system_prompt_edit: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: AiModel::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            prompt: String::new(),
            allow_system_prompt_edit: true,
        }
    }
}

/// A partial configuration update, named after the host-facing properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigUpdate {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(rename = "aiModel")]
    pub model: Option<String>,
    #[serde(rename = "aiSystemPrompt")]
    pub system_prompt: Option<String>,
    #[serde(rename = "aiPrompt")]
    pub prompt: Option<String>,
    #[serde(rename = "allowSystemPrompt")]
    pub allow_system_prompt: Option<bool>,
}

impl ConfigUpdate {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn allow_system_prompt(mut self, allow: bool) -> Self {
        self.allow_system_prompt = Some(allow);
        self
    }
}

/// Prompt and persona text captured from the fields at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInput {
    pub prompt_text: String,
    pub system_text: String,
}

/// A chat message in the completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// Body of one chat-completion call: the system message, then the user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: AiModel,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: AiModel, input: &SessionInput) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: ChatRole::System,
                    content: input.system_text.clone(),
                },
                ChatMessage {
                    role: ChatRole::User,
                    content: input.prompt_text.clone(),
                },
            ],
        }
    }
}

/// The single response slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Awaiting,
    Waiting,
    Text(String),
    Error(String),
}

impl Response {
    pub fn display_text(&self) -> &str {
        match self {
            Response::Awaiting => AWAITING_INPUT,
            Response::Waiting => PLEASE_WAIT,
            Response::Text(text) => text,
            Response::Error(message) => message,
        }
    }
}

/// What the host should draw for one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub value: String,
    pub hidden: bool,
    pub disabled: bool,
}

/// Read-only snapshot of everything the presentation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlView {
    pub model: AiModel,
    pub system_field: FieldView,
    pub prompt_field: FieldView,
    pub submit_enabled: bool,
    pub waiting: bool,
    pub response_text: String,
}

#[derive(Debug, Clone)]
pub struct ControlState {
    config: Configuration,
    input: SessionInput,
    response: Response,
    busy: bool,
    mounted: bool,
}

impl ControlState {
    pub fn new(config: Configuration) -> Self {
        let input = SessionInput {
            prompt_text: config.prompt.clone(),
            system_text: config.system_prompt.clone(),
        };
        Self {
            config,
            input,
            response: Response::Awaiting,
            busy: false,
            mounted: false,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn input(&self) -> &SessionInput {
        &self.input
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn display_response(&self) -> &str {
        self.response.display_text()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn submit_enabled(&self) -> bool {
        !self.busy
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Marks the input fields as present. Configuration changes only
    /// auto-trigger runs once the control is mounted.
    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// User edit of the prompt field.
    pub fn set_prompt_text(&mut self, text: impl Into<String>) {
        self.input.prompt_text = text.into();
    }

    /// User edit of the system field. Returns false when editing is disallowed.
    pub fn set_system_text(&mut self, text: impl Into<String>) -> bool {
        if !self.config.allow_system_prompt_edit {
            return false;
        }
        self.input.system_text = text.into();
        true
    }

    /// Merges `update` into the configuration and reports whether the change
    /// is due to re-ask the AI. The model is validated before anything is
    /// touched, so a rejected update leaves the state unchanged.
    pub fn apply_update(&mut self, update: ConfigUpdate) -> Result<bool, ControlError> {
        let model = update.model.as_deref().map(str::parse::<AiModel>).transpose()?;

        let mut retrigger = false;

        if let Some(key) = update.api_key {
            self.config.api_key = key;
        }
        if let Some(allow) = update.allow_system_prompt {
            self.config.allow_system_prompt_edit = allow;
        }
        if let Some(model) = model {
            if model != self.config.model {
                info!(from = %self.config.model, to = %model, "model changed");
                self.config.model = model;
                retrigger = true;
            }
        }
        // Host values are compared with what the host set last, not with the
        // fields; re-sending an unchanged value leaves user edits alone.
        if let Some(system_prompt) = update.system_prompt {
            if system_prompt != self.config.system_prompt {
                debug!("system prompt changed");
                self.input.system_text = system_prompt.clone();
                self.config.system_prompt = system_prompt;
                retrigger = true;
            }
        }
        if let Some(prompt) = update.prompt {
            if prompt != self.config.prompt {
                debug!("prompt changed");
                self.input.prompt_text = prompt.clone();
                self.config.prompt = prompt;
                retrigger = true;
            }
        }

        Ok(retrigger && self.mounted && !self.config.system_prompt.is_empty())
    }

    /// Session input as it will be sent. A locked system field always sends
    /// the configured system prompt.
    pub fn session_input(&self) -> SessionInput {
        let system_text = if self.config.allow_system_prompt_edit {
            self.input.system_text.clone()
        } else {
            self.config.system_prompt.clone()
        };
        SessionInput {
            prompt_text: self.input.prompt_text.clone(),
            system_text,
        }
    }

    /// Idle -> Busy. Returns `Ok(None)` without touching anything when the
    /// prompt is empty.
    pub fn begin_run(&mut self) -> Result<Option<ChatRequest>, ControlError> {
        if self.busy {
            return Err(ControlError::Busy);
        }
        let input = self.session_input();
        if input.prompt_text.is_empty() {
            return Ok(None);
        }

        self.busy = true;
        self.response = Response::Waiting;
        Ok(Some(ChatRequest::new(self.config.model, &input)))
    }

    /// Busy -> Succeeded | Failed -> Idle.
    pub fn finish_run(&mut self, result: Result<String, CompletionError>) -> ValueChangeEvent {
        self.busy = false;
        match result {
            Ok(text) => {
                self.response = Response::Text(text.clone());
                ValueChangeEvent::succeeded(text)
            }
            Err(err) => {
                warn!(error = %err, "completion failed");
                let message = format!("Error: {}", err);
                self.response = Response::Error(message.clone());
                ValueChangeEvent::failed(message)
            }
        }
    }

    pub fn view(&self) -> ControlView {
        let locked = !self.config.allow_system_prompt_edit;
        ControlView {
            model: self.config.model,
            system_field: FieldView {
                value: self.session_input().system_text,
                hidden: locked,
                disabled: locked,
            },
            prompt_field: FieldView {
                value: self.input.prompt_text.clone(),
                hidden: false,
                disabled: false,
            },
            submit_enabled: self.submit_enabled(),
            waiting: self.busy,
            response_text: self.display_response().to_string(),
        }
    }
}
