//! `validate_<form>` actions: the orchestrator runs the form loop itself and only asks
//! this server to extract and validate slot values.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::actions::Action;
use crate::domain::Domain;
use crate::events::{Event, SlotSet};
use crate::forms::validators::SlotValidator;
use crate::responses::ResponseDispatcher;
use crate::tracker::{Tracker, REQUESTED_SLOT};

/// Produces a value for a slot the orchestrator's own mappings cannot fill.
pub trait SlotExtractor: Send + Sync {
    fn extract(
        &self,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value>;
}

impl<F> SlotExtractor for F
where
    F: Fn(&Domain, &Tracker, &mut dyn ResponseDispatcher) -> Option<Value> + Send + Sync,
{
    fn extract(
        &self,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        self(domain, tracker, dispatcher)
    }
}

/// Picks the next slot to ask for; `None` stops requesting.
pub trait NextSlotRequester: Send + Sync {
    fn next_slot(
        &self,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<String>;
}

impl<F> NextSlotRequester for F
where
    F: Fn(&Domain, &Tracker, &mut dyn ResponseDispatcher) -> Option<String> + Send + Sync,
{
    fn next_slot(
        &self,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<String> {
        self(domain, tracker, dispatcher)
    }
}

pub struct FormValidationAction {
    form_name: String,
    action_name: String,
    validators: BTreeMap<String, Box<dyn SlotValidator>>,
    extractors: BTreeMap<String, Box<dyn SlotExtractor>>,
    next_slot: Option<Box<dyn NextSlotRequester>>,
}

impl fmt::Debug for FormValidationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValidationAction")
            .field("form_name", &self.form_name)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .field("next_slot", &self.next_slot.is_some())
            .finish()
    }
}

impl FormValidationAction {
    pub fn new(form_name: impl Into<String>) -> Self {
        let form_name = form_name.into();
        Self {
            action_name: format!("validate_{form_name}"),
            form_name,
            validators: BTreeMap::new(),
            extractors: BTreeMap::new(),
            next_slot: None,
        }
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    pub fn with_validator(
        mut self,
        slot: impl Into<String>,
        validator: impl SlotValidator + 'static,
    ) -> Self {
        self.validators.insert(slot.into(), Box::new(validator));
        self
    }

    pub fn with_extractor(
        mut self,
        slot: impl Into<String>,
        extractor: impl SlotExtractor + 'static,
    ) -> Self {
        self.extractors.insert(slot.into(), Box::new(extractor));
        self
    }

    pub fn with_next_slot_requester(mut self, requester: impl NextSlotRequester + 'static) -> Self {
        self.next_slot = Some(Box::new(requester));
        self
    }
}

impl Action for FormValidationAction {
    fn name(&self) -> &str {
        &self.action_name
    }

    fn run(
        &self,
        tracker: &mut Tracker,
        domain: &Domain,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event> {
        debug!(
            event_name = "action.form_validation.running",
            form = %self.form_name,
            validate = tracker.active_loop.validate,
            "validating form"
        );

        for (slot, extractor) in &self.extractors {
            if let Some(value) = extractor.extract(domain, tracker, dispatcher) {
                tracker.set_slot(slot.clone(), value.clone());
                tracker.events.push(SlotSet::new(slot.clone(), value).into());
            }
        }

        let mut events = Vec::new();
        for (slot, value) in tracker.slots_to_validate() {
            let validated = match self.validators.get(&slot) {
                Some(validator) => {
                    validator.validate(&value, domain, tracker, dispatcher).unwrap_or(Value::Null)
                }
                None => value,
            };
            events.push(SlotSet::new(slot, validated).into());
        }

        if let Some(requester) = &self.next_slot {
            let next = requester.next_slot(domain, tracker, dispatcher);
            debug!(
                event_name = "action.form_validation.next_slot",
                form = %self.form_name,
                next_slot = next.as_deref().unwrap_or("none"),
                "next slot decided"
            );
            events.push(SlotSet::new(REQUESTED_SLOT, next.map_or(Value::Null, Value::String)).into());
        }
        events
    }
}
