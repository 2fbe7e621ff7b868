//! Descriptor a host reads to lay out and configure the control.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::event::VALUE_CHANGE_EVENT;
use crate::model::AiModel;
use crate::state::DEFAULT_SYSTEM_PROMPT;

pub const CONTROL_NAME: &str = "AI Assistant";
pub const GROUP_NAME: &str = "AI";
pub const CONTROL_VERSION: &str = "0.1";
pub const PLUGIN_AUTHOR: &str = "Deon Smit";
/// Smallest designer canvas width, in grid columns.
pub const MIN_CANVAS_SIZE: u32 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMeta {
    pub title: &'static str,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_as_radio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_layout: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_value_field: bool,
}

impl PropertyMeta {
    fn new(title: &'static str, type_name: &'static str) -> Self {
        Self {
            title,
            type_name,
            default_value: None,
            enum_values: None,
            show_as_radio: None,
            vertical_layout: None,
            is_value_field: false,
        }
    }

    fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Which of the host's built-in properties the designer offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardProperties {
    pub description: bool,
    pub default_value: bool,
    pub visibility: bool,
    pub field_label: bool,
    pub tool_tip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRestrictions {
    pub min_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Designer {
    pub canvas_restrictions: CanvasRestrictions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMeta {
    pub control_name: &'static str,
    pub group_name: &'static str,
    pub version: &'static str,
    pub plugin_author: &'static str,
    pub fallback_disable_submit: bool,
    pub standard_properties: StandardProperties,
    pub designer: Designer,
    pub properties: BTreeMap<&'static str, PropertyMeta>,
    pub events: Vec<&'static str>,
}

impl ControlMeta {
    /// Name of the property that carries the control's value.
    pub fn value_field(&self) -> Option<&'static str> {
        self.properties
            .iter()
            .find(|(_, prop)| prop.is_value_field)
            .map(|(name, _)| *name)
    }
}

pub fn control_meta() -> ControlMeta {
    let mut properties = BTreeMap::new();
    properties.insert("apiKey", PropertyMeta::new("API Key", "string"));
    properties.insert(
        "aiSystemPrompt",
        PropertyMeta::new("AI System Prompt or Persona", "string")
            .default_value(json!(DEFAULT_SYSTEM_PROMPT)),
    );
    properties.insert("aiPrompt", PropertyMeta::new("AI Prompt", "string"));
    properties.insert(
        "aiResponse",
        PropertyMeta {
            is_value_field: true,
            ..PropertyMeta::new("AI Response", "string")
        },
    );
    properties.insert(
        "aiModel",
        PropertyMeta {
            enum_values: Some(AiModel::all().iter().map(AiModel::as_str).collect()),
            show_as_radio: Some(false),
            vertical_layout: Some(true),
            ..PropertyMeta::new("AI Model", "string")
        }
        .default_value(json!(AiModel::default().as_str())),
    );
    properties.insert(
        "allowSystemPrompt",
        PropertyMeta::new("Allow Change to AI System Prompt", "boolean").default_value(json!(true)),
    );

    ControlMeta {
        control_name: CONTROL_NAME,
        group_name: GROUP_NAME,
        version: CONTROL_VERSION,
        plugin_author: PLUGIN_AUTHOR,
        fallback_disable_submit: false,
        standard_properties: StandardProperties {
            description: true,
            default_value: false,
            visibility: true,
            field_label: false,
            tool_tip: false,
        },
        designer: Designer {
            canvas_restrictions: CanvasRestrictions {
                min_size: MIN_CANVAS_SIZE,
            },
        },
        properties,
        events: vec![VALUE_CHANGE_EVENT],
    }
}
