use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::responses::Message;
use crate::serde_ext::{is_zero, null_as_default};

/// Wire tag of every event kind this crate understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    ActionExecuted,
    UserUttered,
    BotUttered,
    SessionStarted,
    SlotSet,
    ConversationPaused,
    ConversationResumed,
    ActiveLoop,
    Form,
    FormValidation,
    LoopInterrupted,
    ActionExecutionRejected,
    FollowupAction,
    StoryExported,
    ActionReverted,
    UserUtteranceReverted,
    Restarted,
    AllSlotsReset,
}

impl EventType {
    pub const ALL: [EventType; 18] = [
        EventType::ActionExecuted,
        EventType::UserUttered,
        EventType::BotUttered,
        EventType::SessionStarted,
        EventType::SlotSet,
        EventType::ConversationPaused,
        EventType::ConversationResumed,
        EventType::ActiveLoop,
        EventType::Form,
        EventType::FormValidation,
        EventType::LoopInterrupted,
        EventType::ActionExecutionRejected,
        EventType::FollowupAction,
        EventType::StoryExported,
        EventType::ActionReverted,
        EventType::UserUtteranceReverted,
        EventType::Restarted,
        EventType::AllSlotsReset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActionExecuted => "action",
            Self::UserUttered => "user",
            Self::BotUttered => "bot",
            Self::SessionStarted => "session_started",
            Self::SlotSet => "slot",
            Self::ConversationPaused => "pause",
            Self::ConversationResumed => "resume",
            Self::ActiveLoop => "active_loop",
            Self::Form => "form",
            Self::FormValidation => "form_validation",
            Self::LoopInterrupted => "loop_interrupted",
            Self::ActionExecutionRejected => "action_execution_rejected",
            Self::FollowupAction => "followup",
            Self::StoryExported => "export",
            Self::ActionReverted => "undo",
            Self::UserUtteranceReverted => "rewind",
            Self::Restarted => "restart",
            Self::AllSlotsReset => "reset_slots",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event_type| event_type.as_str() == tag)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every event on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(
        rename = "event",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl EventEnvelope {
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Access to the envelope embedded in every event struct.
pub trait HasEnvelope {
    fn envelope(&self) -> &EventEnvelope;
    fn envelope_mut(&mut self) -> &mut EventEnvelope;
}

impl HasEnvelope for EventEnvelope {
    fn envelope(&self) -> &EventEnvelope {
        self
    }

    fn envelope_mut(&mut self) -> &mut EventEnvelope {
        self
    }
}

macro_rules! impl_has_envelope {
    ($($event:ty),* $(,)?) => {
        $(
            impl HasEnvelope for $event {
                fn envelope(&self) -> &EventEnvelope {
                    &self.envelope
                }

                fn envelope_mut(&mut self) -> &mut EventEnvelope {
                    &mut self.envelope
                }
            }
        )*
    };
}

impl_has_envelope!(
    ActionExecuted,
    UserUttered,
    BotUttered,
    SessionStarted,
    SlotSet,
    ConversationPaused,
    ConversationResumed,
    ActiveLoopEvent,
    FormEvent,
    FormValidation,
    LoopInterrupted,
    ActionExecutionRejected,
    FollowupAction,
    StoryExported,
    ActionReverted,
    UserUtteranceReverted,
    Restarted,
    AllSlotsReset,
);

/// The assistant ran an action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionExecuted {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ActionExecuted {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentParseResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "entity")]
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into(), ..Self::default() }
    }
}

/// NLU result for one user message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent: IntentParseResult,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<Entity>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent_ranking: Vec<IntentParseResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

impl ParseData {
    pub fn with_intent(mut self, name: impl Into<String>, confidence: f64) -> Self {
        self.intent = IntentParseResult { name: name.into(), confidence };
        self
    }

    pub fn with_entity(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entities.push(Entity::new(name, value));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn intent_name(&self) -> Option<&str> {
        Some(self.intent.name.as_str()).filter(|name| !name.is_empty())
    }

    /// Value of the first entity with the given name.
    pub fn entity_value(&self, name: &str) -> Option<&Value> {
        self.entities.iter().find(|entity| entity.name == name).map(|entity| &entity.value)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUttered {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub input_channel: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parse_data: ParseData,
}

impl UserUttered {
    pub fn new(text: impl Into<String>, parse_data: ParseData) -> Self {
        Self { text: Some(text.into()), parse_data, ..Self::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BotUttered {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Message,
}

impl BotUttered {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStarted {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

/// Stores a value in a slot; `null` resets the slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotSet {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl SlotSet {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into(), ..Self::default() }
    }

    pub fn reset(name: impl Into<String>) -> Self {
        Self::new(name, Value::Null)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationPaused {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationResumed {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

/// Activates the named loop, or deactivates the current one when `name` is `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveLoopEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    #[serde(default)]
    pub name: Option<String>,
}

impl ActiveLoopEvent {
    pub fn activate(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn deactivate() -> Self {
        Self::default()
    }
}

/// Legacy form (de)activation, superseded by `active_loop`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormEvent {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormValidation {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub validate: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopInterrupted {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub is_interrupted: bool,
}

/// Tells the orchestrator that the action refused to run so another policy can take over.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionRejected {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ActionExecutionRejected {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

/// Forces the orchestrator to run the named action next.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowupAction {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    pub name: String,
}

impl FollowupAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryExported {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

/// Reverts the bot actions since the last user message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionReverted {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

/// Reverts the last user message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUtteranceReverted {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Restarted {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllSlotsReset {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}
