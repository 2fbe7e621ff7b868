pub mod ai;
pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod meta;
pub mod model;
pub mod state;

// Re-export main types for convenience
pub use ai::{CompletionService, OpenAIClient};
pub use config::Config;
pub use control::{Admission, AssistantControl};
pub use error::{CompletionError, ControlError};
pub use event::{RunOutcome, ValueChangeEvent, VALUE_CHANGE_EVENT};
pub use meta::{control_meta, ControlMeta};
pub use model::AiModel;
pub use state::{ConfigUpdate, Configuration, ControlState, ControlView, Response};
