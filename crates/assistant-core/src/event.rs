use serde::Serialize;

/// Name of the notification dispatched once per completed workflow run.
pub const VALUE_CHANGE_EVENT: &str = "ntx-value-change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// Outbound change notification. `detail` is the response text on success
/// and the error description on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChangeEvent {
    pub name: &'static str,
    pub detail: String,
    pub outcome: RunOutcome,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
}

impl ValueChangeEvent {
    fn new(detail: String, outcome: RunOutcome) -> Self {
        Self {
            name: VALUE_CHANGE_EVENT,
            detail,
            outcome,
            bubbles: true,
            cancelable: false,
            composed: true,
        }
    }

    pub fn succeeded(detail: impl Into<String>) -> Self {
        Self::new(detail.into(), RunOutcome::Succeeded)
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self::new(detail.into(), RunOutcome::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_flags() {
        let event = ValueChangeEvent::succeeded("Hello!");
        assert_eq!(event.name, "ntx-value-change");
        assert!(event.bubbles);
        assert!(!event.cancelable);
        assert!(event.composed);
        assert!(event.is_success());
    }

    #[test]
    fn test_event_json_shape() {
        let event = ValueChangeEvent::failed("Error: Request failed with status: 500");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "ntx-value-change");
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["detail"], "Error: Request failed with status: 500");
    }
}
