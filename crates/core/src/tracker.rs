//! Per-request view of one conversation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::{deserialize_events, Event, ParseData};
use crate::serde_ext::{default_true, null_as_default};

/// Slot holding the name of the slot a form is currently asking for.
pub const REQUESTED_SLOT: &str = "requested_slot";

/// Action the orchestrator runs while waiting for user input.
pub const ACTION_LISTEN: &str = "action_listen";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveLoop {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default = "default_true", deserialize_with = "validate_flag")]
    pub validate: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rejected: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trigger_message: ParseData,
}

impl Default for ActiveLoop {
    fn default() -> Self {
        Self {
            name: String::new(),
            validate: true,
            rejected: false,
            trigger_message: ParseData::default(),
        }
    }
}

impl ActiveLoop {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn is_active(&self) -> bool {
        !self.name.is_empty()
    }
}

fn validate_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latest_message: ParseData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latest_event_time: f64,
    #[serde(default, deserialize_with = "deserialize_events")]
    pub events: Vec<Event>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paused: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followup_action: Option<String>,
    #[serde(default, alias = "active_form", deserialize_with = "null_as_default")]
    pub active_loop: ActiveLoop,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latest_action_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latest_input_channel: Option<String>,
}

impl Tracker {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self { sender_id: sender_id.into(), ..Self::default() }
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_slot(name, value);
        self
    }

    pub fn with_latest_message(mut self, message: ParseData) -> Self {
        self.latest_message = message;
        self
    }

    pub fn with_active_loop(mut self, name: impl Into<String>) -> Self {
        self.active_loop = ActiveLoop::named(name);
        self
    }

    pub fn with_latest_action(mut self, name: impl Into<String>) -> Self {
        self.latest_action_name = name.into();
        self
    }

    /// Value of a slot; `None` when the slot is absent or explicitly null.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|value| !value.is_null())
    }

    pub fn set_slot(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.slots.insert(name.into(), value.into());
    }

    /// Name of the slot the active form asked for, if any.
    pub fn requested_slot(&self) -> Option<&str> {
        self.slot(REQUESTED_SLOT).and_then(Value::as_str).filter(|name| !name.is_empty())
    }

    pub fn is_active_loop(&self, name: &str) -> bool {
        self.active_loop.is_active() && self.active_loop.name == name
    }

    /// Validation is skipped when the active loop disabled it or the form is not running
    /// right after the user spoke.
    pub fn no_form_validation(&self) -> bool {
        !self.active_loop.validate || self.latest_action_name != ACTION_LISTEN
    }

    /// Slot values set by the trailing run of `SlotSet` events in the history.
    pub fn slots_to_validate(&self) -> BTreeMap<String, Value> {
        let mut slots = BTreeMap::new();
        for event in self.events.iter().rev() {
            let Event::SlotSet(slot_set) = event else {
                break;
            };
            // Walking backwards, so the first value seen for a slot is the latest one.
            if !slots.contains_key(&slot_set.name) {
                slots.insert(slot_set.name.clone(), slot_set.value.clone());
            }
        }
        slots
    }

    /// Values of every entity with the given name in the latest message.
    pub fn latest_entity_values(&self, name: &str) -> Vec<&Value> {
        self.latest_message
            .entities
            .iter()
            .filter(|entity| entity.name == name)
            .map(|entity| &entity.value)
            .collect()
    }

    pub fn latest_intent(&self) -> Option<&str> {
        self.latest_message.intent_name()
    }
}
