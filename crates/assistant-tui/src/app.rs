use anyhow::Result;
use assistant_core::{
    Admission, AssistantControl, Config, ConfigUpdate, Configuration, ControlError, OpenAIClient,
    ValueChangeEvent,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    System,
    Prompt,
    Submit,
}

/// Which text field an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    System,
    Prompt,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Focus,

    pub control: AssistantControl<OpenAIClient>,
    events: mpsc::UnboundedReceiver<ValueChangeEvent>,
    pub last_event: Option<ValueChangeEvent>,
    pub notice: Option<String>,

    // Cursor positions in chars, not bytes
    pub prompt_cursor: usize,
    pub system_cursor: usize,

    pub animation_frame: u8,
    pub config: Config,
}

impl App {
    pub fn new(config: Config, configuration: Configuration) -> Result<Self> {
        let client = OpenAIClient::with_endpoint(config.endpoint());
        let (mut control, events) = AssistantControl::new(configuration, client);
        // Fields are not mounted yet, so a preset prompt does not fire a run.
        control.set_configuration(config.initial_update())?;

        let prompt_cursor = control.state().input().prompt_text.chars().count();
        let system_cursor = control.state().input().system_text.chars().count();

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: Focus::Prompt,
            control,
            events,
            last_event: None,
            notice: None,
            prompt_cursor,
            system_cursor,
            animation_frame: 0,
            config,
        })
    }

    pub fn mount(&mut self) {
        self.control.mount();
    }

    pub fn system_editable(&self) -> bool {
        self.control.state().configuration().allow_system_prompt_edit
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            Focus::System => Focus::Prompt,
            Focus::Prompt => Focus::Submit,
            Focus::Submit if self.system_editable() => Focus::System,
            Focus::Submit => Focus::Prompt,
        };
    }

    pub fn focus_prev(&mut self) {
        self.focus = match self.focus {
            Focus::System => Focus::Submit,
            Focus::Prompt if self.system_editable() => Focus::System,
            Focus::Prompt => Focus::Submit,
            Focus::Submit => Focus::Prompt,
        };
    }

    /// Field under the cursor, if the focused widget is an editable field.
    pub fn focused_field(&self) -> Option<Field> {
        match self.focus {
            Focus::System if self.system_editable() => Some(Field::System),
            Focus::Prompt => Some(Field::Prompt),
            _ => None,
        }
    }

    pub fn field_text(&self, field: Field) -> &str {
        let input = self.control.state().input();
        match field {
            Field::System => &input.system_text,
            Field::Prompt => &input.prompt_text,
        }
    }

    pub fn cursor(&self, field: Field) -> usize {
        match field {
            Field::System => self.system_cursor,
            Field::Prompt => self.prompt_cursor,
        }
    }

    /// Applies `edit` to a copy of the field text and the cursor, then hands
    /// the result back to the control.
    pub fn edit_field(&mut self, field: Field, edit: impl FnOnce(&mut String, &mut usize)) {
        let mut text = self.field_text(field).to_string();
        let mut cursor = self.cursor(field);
        edit(&mut text, &mut cursor);
        let cursor = cursor.min(text.chars().count());

        match field {
            Field::System => {
                if self.control.set_system_text(text) {
                    self.system_cursor = cursor;
                }
            }
            Field::Prompt => {
                self.control.set_prompt_text(text);
                self.prompt_cursor = cursor;
            }
        }
    }

    pub fn submit(&mut self) {
        match self.control.submit() {
            Ok(Admission::Started) => self.notice = None,
            Ok(Admission::Ignored) => {
                self.notice = Some("Type a question first".to_string());
            }
            Ok(_) => {}
            Err(ControlError::Busy) => {
                self.notice = Some("Still waiting for the previous answer".to_string());
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Host-side reconfiguration. Reports how the control took it.
    pub fn reconfigure(&mut self, update: ConfigUpdate) {
        match self.control.set_configuration(update) {
            Ok(Admission::Queued) => {
                self.notice = Some("Will ask again once the current answer arrives".to_string());
            }
            Ok(_) => self.notice = None,
            Err(e) => {
                warn!(error = %e, "configuration rejected");
                self.notice = Some(e.to_string());
            }
        }
    }

    pub fn cycle_model(&mut self) {
        let next = self.control.state().configuration().model.next();
        self.reconfigure(ConfigUpdate::default().model(next.as_str()));
    }

    pub fn toggle_system_edit(&mut self) {
        let allow = !self.system_editable();
        self.reconfigure(ConfigUpdate::default().allow_system_prompt(allow));
        if !allow && self.focus == Focus::System {
            self.focus = Focus::Prompt;
        }
    }

    pub fn save_settings(&mut self) {
        self.config.remember(self.control.state().configuration());
        self.config.prompt = Some(self.control.state().input().prompt_text.clone());
        self.notice = Some(match self.config.save() {
            Ok(()) => "Settings saved".to_string(),
            Err(e) => format!("Could not save settings: {}", e),
        });
    }

    /// Settles a finished run, if there is one, and collects its notification.
    pub async fn poll_completion(&mut self) {
        self.control.poll_completion().await;
        while let Ok(event) = self.events.try_recv() {
            info!(outcome = ?event.outcome, chars = event.detail.len(), "value changed");
            self.last_event = Some(event);
        }
    }

    pub fn tick_animation(&mut self) {
        if self.control.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 10;
        }
    }
}
