//! Declarative rules describing where a slot value comes from.

use serde_json::Value;

use crate::tracker::Tracker;

#[derive(Clone, Debug, PartialEq)]
pub enum SlotSource {
    /// First entity with this name in the latest message.
    Entity(String),
    /// Raw text of the latest message.
    Text,
    /// A fixed value; `null` never matches.
    Value(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotMapping {
    pub source: SlotSource,
    pub intents: Option<Vec<String>>,
    pub not_intents: Option<Vec<String>>,
    /// Only applies on the turn that activates the form.
    pub first_run_only: bool,
}

impl SlotMapping {
    pub fn from_entity(entity: impl Into<String>) -> Self {
        Self::with_source(SlotSource::Entity(entity.into()))
    }

    pub fn from_text() -> Self {
        Self::with_source(SlotSource::Text)
    }

    pub fn from_value(value: impl Into<Value>) -> Self {
        Self::with_source(SlotSource::Value(value.into()))
    }

    fn with_source(source: SlotSource) -> Self {
        Self { source, intents: None, not_intents: None, first_run_only: false }
    }

    /// Mapping used for slots without any configured mapping.
    pub fn default_for(slot: &str) -> Self {
        Self::from_entity(slot)
    }

    pub fn for_intents<I, S>(mut self, intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intents = Some(intents.into_iter().map(Into::into).collect());
        self
    }

    pub fn excluding_intents<I, S>(mut self, intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_intents = Some(intents.into_iter().map(Into::into).collect());
        self
    }

    pub fn first_run_only(mut self) -> Self {
        self.first_run_only = true;
        self
    }

    pub fn allows(&self, intent: &str) -> bool {
        if let Some(denied) = &self.not_intents {
            if denied.iter().any(|name| name == intent) {
                return false;
            }
        }
        match &self.intents {
            Some(allowed) => allowed.iter().any(|name| name == intent),
            None => true,
        }
    }

    /// Reduced copy used when a slot is filled out of order: the entity source and the
    /// intent gates survive, anything else does not apply.
    pub(crate) fn as_unrequested(&self) -> Option<Self> {
        match &self.source {
            SlotSource::Entity(_) => Some(Self {
                source: self.source.clone(),
                intents: self.intents.clone(),
                not_intents: self.not_intents.clone(),
                first_run_only: false,
            }),
            SlotSource::Text | SlotSource::Value(_) => None,
        }
    }

    /// Candidate value for the slot on this turn of the form named `form`.
    pub fn apply(&self, form: &str, tracker: &Tracker) -> Option<Value> {
        let message = &tracker.latest_message;
        if !self.allows(&message.intent.name) {
            return None;
        }
        if self.first_run_only && tracker.is_active_loop(form) {
            return None;
        }

        match &self.source {
            SlotSource::Entity(entity) if entity.is_empty() => None,
            SlotSource::Entity(entity) => message.entity_value(entity).cloned(),
            SlotSource::Text => Some(Value::String(message.text.clone())),
            SlotSource::Value(value) if value.is_null() => None,
            SlotSource::Value(value) => Some(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::events::ParseData;
    use crate::forms::mapping::SlotMapping;
    use crate::tracker::Tracker;

    fn tracker_with(message: ParseData) -> Tracker {
        Tracker::new("mapping").with_latest_message(message)
    }

    #[test]
    fn deny_list_wins_over_allow_list() {
        let mapping = SlotMapping::from_text().for_intents(["inform"]).excluding_intents(["inform"]);
        let tracker = tracker_with(ParseData::default().with_intent("inform", 0.9).with_text("hi"));

        assert_eq!(mapping.apply("restaurant_form", &tracker), None);
    }

    #[test]
    fn allow_list_rejects_other_intents() {
        let mapping = SlotMapping::from_value(true).for_intents(["affirm"]);

        let affirm = tracker_with(ParseData::default().with_intent("affirm", 0.9));
        let deny = tracker_with(ParseData::default().with_intent("deny", 0.9));

        assert_eq!(mapping.apply("restaurant_form", &affirm), Some(json!(true)));
        assert_eq!(mapping.apply("restaurant_form", &deny), None);
    }

    #[test]
    fn no_intent_lists_always_pass() {
        assert!(SlotMapping::from_text().allows("anything"));
        assert!(SlotMapping::from_text().excluding_intents(["chitchat"]).allows("inform"));
    }

    #[test]
    fn first_run_only_mappings_stop_once_the_form_is_active() {
        let mapping = SlotMapping::from_entity("cuisine").first_run_only();
        let message = ParseData::default().with_entity("cuisine", "thai");

        let fresh = tracker_with(message.clone());
        let running = tracker_with(message).with_active_loop("restaurant_form");

        assert_eq!(mapping.apply("restaurant_form", &fresh), Some(json!("thai")));
        assert_eq!(mapping.apply("restaurant_form", &running), None);
        assert_eq!(mapping.apply("other_form", &running), Some(json!("thai")));
    }

    #[test]
    fn entity_source_takes_the_first_matching_entity() {
        let tracker = tracker_with(
            ParseData::default().with_entity("number", 2).with_entity("number", 4).with_text("2 or 4"),
        );

        assert_eq!(SlotMapping::from_entity("number").apply("f", &tracker), Some(json!(2)));
        assert_eq!(SlotMapping::from_entity("missing").apply("f", &tracker), None);
        assert_eq!(SlotMapping::from_entity("").apply("f", &tracker), None);
    }

    #[test]
    fn text_and_constant_sources() {
        let tracker = tracker_with(ParseData::default().with_text("window seat please"));

        assert_eq!(SlotMapping::from_text().apply("f", &tracker), Some(json!("window seat please")));
        assert_eq!(SlotMapping::from_value(json!(["a"])).apply("f", &tracker), Some(json!(["a"])));
        assert_eq!(SlotMapping::from_value(Value::Null).apply("f", &tracker), None);
    }

    #[test]
    fn unrequested_copies_keep_entity_mappings_only() {
        let entity = SlotMapping::from_entity("cuisine").for_intents(["inform"]).first_run_only();

        let reduced = entity.as_unrequested().expect("entity mapping survives");
        assert!(!reduced.first_run_only);
        assert_eq!(reduced.intents, Some(vec!["inform".to_string()]));
        assert!(SlotMapping::from_text().as_unrequested().is_none());
        assert!(SlotMapping::from_value(1).as_unrequested().is_none());
    }

    #[test]
    fn default_mapping_reads_the_entity_named_like_the_slot() {
        let tracker = tracker_with(ParseData::default().with_entity("email", "a@b.c"));

        assert_eq!(SlotMapping::default_for("email").apply("f", &tracker), Some(json!("a@b.c")));
    }
}
