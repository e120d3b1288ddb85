//! Conversation events exchanged with the orchestrator.
//!
//! Events travel as a JSON array of objects discriminated by their `event` key. Decoding
//! is two-phase: the envelope is read first, its tag is looked up in the registry kept by
//! [`EventType`], and only then is the element decoded as the concrete variant. Elements
//! with tags this crate does not know, or with bodies that do not fit their tag, are kept
//! as [`Event::Unknown`] so one odd element never hides the rest of the history.

mod types;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::serde_ext::null_as_default;

pub use types::{
    ActionExecuted, ActionExecutionRejected, ActionReverted, ActiveLoopEvent, AllSlotsReset,
    BotUttered, ConversationPaused, ConversationResumed, Entity, EventEnvelope, EventType,
    FollowupAction, FormEvent, FormValidation, HasEnvelope, IntentParseResult, LoopInterrupted,
    ParseData, Restarted, SessionStarted, SlotSet, StoryExported, UserUttered,
    UserUtteranceReverted,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    ActionExecuted(ActionExecuted),
    UserUttered(UserUttered),
    BotUttered(BotUttered),
    SessionStarted(SessionStarted),
    SlotSet(SlotSet),
    ConversationPaused(ConversationPaused),
    ConversationResumed(ConversationResumed),
    ActiveLoop(ActiveLoopEvent),
    Form(FormEvent),
    FormValidation(FormValidation),
    LoopInterrupted(LoopInterrupted),
    ActionExecutionRejected(ActionExecutionRejected),
    FollowupAction(FollowupAction),
    StoryExported(StoryExported),
    ActionReverted(ActionReverted),
    UserUtteranceReverted(UserUtteranceReverted),
    Restarted(Restarted),
    AllSlotsReset(AllSlotsReset),
    /// Bare envelope of an element that could not be decoded as a known variant.
    Unknown(EventEnvelope),
}

macro_rules! event_from {
    ($($variant:ident($event:ty)),* $(,)?) => {
        $(
            impl From<$event> for Event {
                fn from(event: $event) -> Self {
                    Event::$variant(event)
                }
            }
        )*
    };
}

event_from!(
    ActionExecuted(ActionExecuted),
    UserUttered(UserUttered),
    BotUttered(BotUttered),
    SessionStarted(SessionStarted),
    SlotSet(SlotSet),
    ConversationPaused(ConversationPaused),
    ConversationResumed(ConversationResumed),
    ActiveLoop(ActiveLoopEvent),
    Form(FormEvent),
    FormValidation(FormValidation),
    LoopInterrupted(LoopInterrupted),
    ActionExecutionRejected(ActionExecutionRejected),
    FollowupAction(FollowupAction),
    StoryExported(StoryExported),
    ActionReverted(ActionReverted),
    UserUtteranceReverted(UserUtteranceReverted),
    Restarted(Restarted),
    AllSlotsReset(AllSlotsReset),
    Unknown(EventEnvelope),
);

impl Event {
    /// The identity of the variant; `None` for unknown events.
    pub fn event_type(&self) -> Option<EventType> {
        let event_type = match self {
            Self::ActionExecuted(_) => EventType::ActionExecuted,
            Self::UserUttered(_) => EventType::UserUttered,
            Self::BotUttered(_) => EventType::BotUttered,
            Self::SessionStarted(_) => EventType::SessionStarted,
            Self::SlotSet(_) => EventType::SlotSet,
            Self::ConversationPaused(_) => EventType::ConversationPaused,
            Self::ConversationResumed(_) => EventType::ConversationResumed,
            Self::ActiveLoop(_) => EventType::ActiveLoop,
            Self::Form(_) => EventType::Form,
            Self::FormValidation(_) => EventType::FormValidation,
            Self::LoopInterrupted(_) => EventType::LoopInterrupted,
            Self::ActionExecutionRejected(_) => EventType::ActionExecutionRejected,
            Self::FollowupAction(_) => EventType::FollowupAction,
            Self::StoryExported(_) => EventType::StoryExported,
            Self::ActionReverted(_) => EventType::ActionReverted,
            Self::UserUtteranceReverted(_) => EventType::UserUtteranceReverted,
            Self::Restarted(_) => EventType::Restarted,
            Self::AllSlotsReset(_) => EventType::AllSlotsReset,
            Self::Unknown(_) => return None,
        };
        Some(event_type)
    }

    pub fn envelope(&self) -> &EventEnvelope {
        self.as_has_envelope().envelope()
    }

    pub fn envelope_mut(&mut self) -> &mut EventEnvelope {
        self.as_has_envelope_mut().envelope_mut()
    }

    /// Tag as it will appear on the wire once normalized.
    pub fn tag(&self) -> &str {
        match self.event_type() {
            Some(event_type) => event_type.as_str(),
            None => self.envelope().event_type.as_str(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ActionExecutionRejected(_))
    }

    fn as_has_envelope(&self) -> &dyn HasEnvelope {
        match self {
            Self::ActionExecuted(event) => event,
            Self::UserUttered(event) => event,
            Self::BotUttered(event) => event,
            Self::SessionStarted(event) => event,
            Self::SlotSet(event) => event,
            Self::ConversationPaused(event) => event,
            Self::ConversationResumed(event) => event,
            Self::ActiveLoop(event) => event,
            Self::Form(event) => event,
            Self::FormValidation(event) => event,
            Self::LoopInterrupted(event) => event,
            Self::ActionExecutionRejected(event) => event,
            Self::FollowupAction(event) => event,
            Self::StoryExported(event) => event,
            Self::ActionReverted(event) => event,
            Self::UserUtteranceReverted(event) => event,
            Self::Restarted(event) => event,
            Self::AllSlotsReset(event) => event,
            Self::Unknown(envelope) => envelope,
        }
    }

    fn as_has_envelope_mut(&mut self) -> &mut dyn HasEnvelope {
        match self {
            Self::ActionExecuted(event) => event,
            Self::UserUttered(event) => event,
            Self::BotUttered(event) => event,
            Self::SessionStarted(event) => event,
            Self::SlotSet(event) => event,
            Self::ConversationPaused(event) => event,
            Self::ConversationResumed(event) => event,
            Self::ActiveLoop(event) => event,
            Self::Form(event) => event,
            Self::FormValidation(event) => event,
            Self::LoopInterrupted(event) => event,
            Self::ActionExecutionRejected(event) => event,
            Self::FollowupAction(event) => event,
            Self::StoryExported(event) => event,
            Self::ActionReverted(event) => event,
            Self::UserUtteranceReverted(event) => event,
            Self::Restarted(event) => event,
            Self::AllSlotsReset(event) => event,
            Self::Unknown(envelope) => envelope,
        }
    }
}

type Decoder = fn(Value) -> Result<Event, serde_json::Error>;

fn decode_as<T>(raw: Value) -> Result<Event, serde_json::Error>
where
    T: serde::de::DeserializeOwned + Into<Event>,
{
    serde_json::from_value::<T>(raw).map(Into::into)
}

impl EventType {
    /// Registry entry: how to build the full variant for this tag.
    fn decoder(self) -> Decoder {
        match self {
            Self::ActionExecuted => decode_as::<ActionExecuted>,
            Self::UserUttered => decode_as::<UserUttered>,
            Self::BotUttered => decode_as::<BotUttered>,
            Self::SessionStarted => decode_as::<SessionStarted>,
            Self::SlotSet => decode_as::<SlotSet>,
            Self::ConversationPaused => decode_as::<ConversationPaused>,
            Self::ConversationResumed => decode_as::<ConversationResumed>,
            Self::ActiveLoop => decode_as::<ActiveLoopEvent>,
            Self::Form => decode_as::<FormEvent>,
            Self::FormValidation => decode_as::<FormValidation>,
            Self::LoopInterrupted => decode_as::<LoopInterrupted>,
            Self::ActionExecutionRejected => decode_as::<ActionExecutionRejected>,
            Self::FollowupAction => decode_as::<FollowupAction>,
            Self::StoryExported => decode_as::<StoryExported>,
            Self::ActionReverted => decode_as::<ActionReverted>,
            Self::UserUtteranceReverted => decode_as::<UserUtteranceReverted>,
            Self::Restarted => decode_as::<Restarted>,
            Self::AllSlotsReset => decode_as::<AllSlotsReset>,
        }
    }
}

/// Decodes raw event objects in order.
///
/// Never fails: elements that cannot be decoded are kept as [`Event::Unknown`].
pub fn decode(raw_events: &[Value]) -> Vec<Event> {
    raw_events.iter().enumerate().map(|(index, raw)| decode_one(index, raw)).collect()
}

fn decode_one(index: usize, raw: &Value) -> Event {
    let envelope = match EventEnvelope::deserialize(raw) {
        Ok(envelope) => envelope,
        Err(error) => {
            let event_type = raw.get("event").and_then(Value::as_str).unwrap_or_default();
            warn!(
                event_name = "events.decode.malformed_envelope",
                event_type,
                index,
                error = %error,
                "event envelope is unreadable, keeping its tag only"
            );
            return Event::Unknown(EventEnvelope {
                event_type: event_type.to_string(),
                ..EventEnvelope::default()
            });
        }
    };

    let Some(event_type) = EventType::parse(&envelope.event_type) else {
        debug!(
            event_name = "events.decode.unknown_type",
            event_type = %envelope.event_type,
            index,
            "keeping event with unrecognized type as bare envelope"
        );
        return Event::Unknown(envelope);
    };

    match (event_type.decoder())(raw.clone()) {
        Ok(event) => event,
        Err(error) => {
            debug!(
                event_name = "events.decode.malformed_body",
                event_type = %event_type,
                index,
                error = %error,
                "event body does not match its type, keeping bare envelope"
            );
            Event::Unknown(envelope)
        }
    }
}

/// Sets every known event's envelope tag to the tag of its variant.
pub fn with_type_keys(events: Vec<Event>) -> Vec<Event> {
    events
        .into_iter()
        .map(|mut event| {
            if let Some(event_type) = event.event_type() {
                event.envelope_mut().event_type = event_type.as_str().to_string();
            }
            event
        })
        .collect()
}

/// Normalizes tags, then serializes each event to its wire object.
pub fn encode(events: Vec<Event>) -> Result<Vec<Value>, serde_json::Error> {
    with_type_keys(events).iter().map(serde_json::to_value).collect()
}

pub fn has_rejection(events: &[Event]) -> bool {
    events.iter().any(Event::is_rejection)
}

/// `deserialize_with` adapter that runs [`decode`] on a raw event array.
pub(crate) fn deserialize_events<'de, D>(deserializer: D) -> Result<Vec<Event>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = null_as_default(deserializer)?;
    Ok(decode(&raw))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::events::{
        decode, encode, has_rejection, with_type_keys, ActionExecuted, ActionExecutionRejected,
        ActionReverted, ActiveLoopEvent, AllSlotsReset, BotUttered, ConversationPaused,
        ConversationResumed, Event, EventType, FollowupAction, FormEvent, FormValidation,
        LoopInterrupted, ParseData, Restarted, SessionStarted, SlotSet, StoryExported,
        UserUttered, UserUtteranceReverted,
    };
    use crate::responses::Message;

    fn one_of_each() -> Vec<Event> {
        vec![
            Event::from(ActionExecuted {
                policy: Some("policy_2_MemoizationPolicy".to_string()),
                confidence: Some(1.0),
                ..ActionExecuted::new("action_listen")
            }),
            Event::from(UserUttered::new(
                "I want chinese food",
                ParseData::default()
                    .with_intent("request_restaurant", 0.93)
                    .with_entity("cuisine", "chinese")
                    .with_text("I want chinese food"),
            )),
            Event::from(BotUttered {
                data: Message::default().with_button("Yes", "/affirm"),
                ..BotUttered::new("Anything else?")
            }),
            Event::from(SessionStarted::default()),
            Event::from(SlotSet::new("num_people", 4)),
            Event::from(ConversationPaused::default()),
            Event::from(ConversationResumed::default()),
            Event::from(ActiveLoopEvent::activate("restaurant_form")),
            Event::from(FormEvent {
                name: Some("restaurant_form".to_string()),
                ..FormEvent::default()
            }),
            Event::from(FormValidation { validate: false, ..FormValidation::default() }),
            Event::from(LoopInterrupted { is_interrupted: true, ..LoopInterrupted::default() }),
            Event::from(ActionExecutionRejected::new("restaurant_form")),
            Event::from(FollowupAction::new("action_hello_world")),
            Event::from(StoryExported::default()),
            Event::from(ActionReverted::default()),
            Event::from(UserUtteranceReverted::default()),
            Event::from(Restarted::default()),
            Event::from(AllSlotsReset::default()),
        ]
    }

    #[test]
    fn registry_covers_every_event_type_exactly_once() {
        for event_type in EventType::ALL {
            assert_eq!(EventType::parse(event_type.as_str()), Some(event_type));
        }
        assert_eq!(EventType::parse("reminder"), None);
    }

    #[test]
    fn directly_constructed_events_survive_encode_then_decode() {
        let originals = one_of_each();
        assert_eq!(originals.len(), EventType::ALL.len());

        let encoded = encode(originals.clone()).expect("events encode");
        let decoded = decode(&encoded);

        assert_eq!(decoded, with_type_keys(originals));
        for event in &decoded {
            let event_type = event.event_type().expect("no unknown events after round trip");
            assert_eq!(event.envelope().event_type, event_type.as_str());
        }
    }

    #[test]
    fn encoding_overrides_a_stale_tag_with_the_variant_identity() {
        let mut slot = SlotSet::new("cuisine", "greek");
        slot.envelope.event_type = "bot".to_string();

        let encoded = encode(vec![Event::from(slot)]).expect("event encodes");

        assert_eq!(encoded, vec![json!({"event": "slot", "name": "cuisine", "value": "greek"})]);
    }

    #[test]
    fn unset_policy_and_confidence_stay_off_the_wire() {
        let mut listened = ActionExecuted::new("action_listen");
        listened.policy = Some("policy_0".to_string());

        let encoded = encode(vec![
            Event::from(ActionExecutionRejected::new("person_form")),
            Event::from(listened),
        ])
        .expect("events encode");

        assert_eq!(
            encoded,
            vec![
                json!({"event": "action_execution_rejected", "name": "person_form"}),
                json!({"event": "action", "name": "action_listen", "policy": "policy_0"}),
            ]
        );
    }

    #[test]
    fn unknown_event_types_are_kept_as_envelopes() {
        let raw = vec![
            json!({"event": "reminder", "timestamp": 1.5, "name": "remind_me"}),
            json!({"event": "slot", "name": "cuisine", "value": "greek"}),
        ];

        let decoded = decode(&raw);

        assert_eq!(decoded.len(), 2);
        assert!(matches!(
            &decoded[0],
            Event::Unknown(envelope) if envelope.event_type == "reminder" && envelope.timestamp == 1.5
        ));
        assert!(matches!(
            &decoded[1],
            Event::SlotSet(slot) if slot.name == "cuisine" && slot.value == json!("greek")
        ));
    }

    #[test]
    fn malformed_variant_body_degrades_without_dropping_neighbours() {
        let raw = vec![
            json!({"event": "slot", "name": 42, "timestamp": 3.0}),
            json!({"event": "followup", "name": "action_hello_world"}),
        ];

        let decoded = decode(&raw);

        assert!(matches!(
            &decoded[0],
            Event::Unknown(envelope) if envelope.event_type == "slot" && envelope.timestamp == 3.0
        ));
        assert_eq!(decoded[0].tag(), "slot");
        assert!(matches!(
            &decoded[1],
            Event::FollowupAction(event) if event.name == "action_hello_world"
        ));
    }

    #[test]
    fn unreadable_envelopes_degrade_without_dropping_neighbours() {
        let raw = vec![
            json!({"event": "restart"}),
            json!("not an event"),
            json!({"event": "user", "timestamp": "2021-01-01T00:00:00Z", "text": "hi"}),
            json!({"event": "followup", "name": "action_hello_world"}),
        ];

        let decoded = decode(&raw);

        assert_eq!(decoded.len(), 4);
        assert!(matches!(decoded[0], Event::Restarted(_)));
        assert!(matches!(&decoded[1], Event::Unknown(envelope) if envelope.event_type.is_empty()));
        assert!(matches!(
            &decoded[2],
            Event::Unknown(envelope) if envelope.event_type == "user" && envelope.timestamp == 0.0
        ));
        assert_eq!(decoded[2].tag(), "user");
        assert!(matches!(
            &decoded[3],
            Event::FollowupAction(event) if event.name == "action_hello_world"
        ));
    }

    #[test]
    fn unknown_events_keep_their_received_tag_on_encode() {
        let raw = vec![json!({"event": "reminder", "metadata": {"source": "scheduler"}})];
        let decoded = decode(&raw);

        let encoded = encode(decoded).expect("encode succeeds");

        assert_eq!(
            encoded,
            vec![json!({"event": "reminder", "metadata": {"source": "scheduler"}})]
        );
    }

    #[test]
    fn metadata_and_timestamp_round_trip() {
        let raw = json!({
            "event": "user",
            "timestamp": 1_600_000_000.25,
            "metadata": {"channel_user": "u-1"},
            "text": "hello",
            "parse_data": {
                "intent": {"name": "greet", "confidence": 0.99},
                "entities": [],
                "text": "hello"
            }
        });

        let decoded = decode(std::slice::from_ref(&raw));
        let Event::UserUttered(user) = &decoded[0] else {
            panic!("expected a user event, got {:?}", decoded[0]);
        };

        assert_eq!(user.envelope.timestamp, 1_600_000_000.25);
        let channel_user =
            user.envelope.metadata.as_ref().and_then(|metadata| metadata.get("channel_user"));
        assert_eq!(channel_user, Some(&json!("u-1")));
        assert_eq!(user.parse_data.intent_name(), Some("greet"));
    }

    #[test]
    fn rejection_is_detected_anywhere_in_the_list() {
        let events = vec![
            Event::from(SlotSet::new("cuisine", Value::Null)),
            Event::from(ActionExecutionRejected::new("restaurant_form")),
        ];

        assert!(has_rejection(&events));
        assert!(!has_rejection(&events[..1]));
        assert!(!has_rejection(&[]));
    }
}
