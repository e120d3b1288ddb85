//! Slot-filling state machine behind every form action.
//!
//! One invocation covers one turn: activate the form if it is not running yet, collect
//! candidates from the latest message, validate them, then either ask for the next empty
//! slot or submit and deactivate. A running form that extracts nothing for the slot it
//! asked for rejects the turn instead.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::actions::Action;
use crate::domain::Domain;
use crate::events::{ActionExecutionRejected, ActiveLoopEvent, Event, SlotSet};
use crate::forms::mapping::SlotMapping;
use crate::forms::validators::{AnyValidator, DefaultValidator, SlotValidator};
use crate::responses::{Message, ResponseDispatcher};
use crate::tracker::{Tracker, REQUESTED_SLOT};

/// Template prefix used to ask the user for a slot.
pub const ASK_TEMPLATE_PREFIX: &str = "utter_ask_";

type SubmitHandler =
    Box<dyn Fn(&Tracker, &Domain, &mut dyn ResponseDispatcher) -> Vec<Event> + Send + Sync>;

pub struct Form {
    name: String,
    required_slots: Vec<String>,
    mappings: HashMap<String, Vec<SlotMapping>>,
    validators: HashMap<String, AnyValidator>,
    on_submit: Option<SubmitHandler>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("required_slots", &self.required_slots)
            .field("mappings", &self.mappings)
            .field("validators", &self.validators)
            .field("on_submit", &self.on_submit.is_some())
            .finish()
    }
}

impl Form {
    pub fn new<I, S>(name: impl Into<String>, required_slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            required_slots: required_slots.into_iter().map(Into::into).collect(),
            mappings: HashMap::new(),
            validators: HashMap::new(),
            on_submit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_slots(&self) -> &[String] {
        &self.required_slots
    }

    /// Appends a mapping; a slot's mappings are tried in the order they were added.
    pub fn with_mapping(mut self, slot: impl Into<String>, mapping: SlotMapping) -> Self {
        self.mappings.entry(slot.into()).or_default().push(mapping);
        self
    }

    pub fn with_validator(
        mut self,
        slot: impl Into<String>,
        validator: impl SlotValidator + 'static,
    ) -> Self {
        self.validators.entry(slot.into()).or_default().push(validator);
        self
    }

    pub fn with_validator_fn<F>(self, slot: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value, &Domain, &Tracker, &mut dyn ResponseDispatcher) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        self.with_validator(slot, validator)
    }

    /// Runs once every required slot is filled; its events precede the deactivation.
    pub fn on_submit<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Tracker, &Domain, &mut dyn ResponseDispatcher) -> Vec<Event> + Send + Sync + 'static,
    {
        self.on_submit = Some(Box::new(handler));
        self
    }

    /// Configured mappings of a slot, or the implicit entity mapping named like the slot.
    pub fn mappings_for(&self, slot: &str) -> Cow<'_, [SlotMapping]> {
        match self.mappings.get(slot) {
            Some(mappings) if !mappings.is_empty() => Cow::Borrowed(mappings.as_slice()),
            _ => Cow::Owned(vec![SlotMapping::default_for(slot)]),
        }
    }

    /// Candidates for this turn: out-of-order entity values for every other required
    /// slot first, then the requested slot through its full mapping list.
    pub fn slot_candidates(&self, tracker: &Tracker) -> Vec<(String, Value)> {
        let requested = tracker.requested_slot();
        let mut candidates: Vec<(String, Value)> = self
            .required_slots
            .iter()
            .filter(|slot| Some(slot.as_str()) != requested)
            .filter_map(|slot| {
                let value = self
                    .mappings_for(slot)
                    .iter()
                    .filter_map(SlotMapping::as_unrequested)
                    .find_map(|mapping| mapping.apply(&self.name, tracker))?;
                Some((slot.clone(), value))
            })
            .collect();

        if let Some(slot) = requested {
            let value = self
                .mappings_for(slot)
                .iter()
                .find_map(|mapping| mapping.apply(&self.name, tracker));
            if let Some(value) = value {
                candidates.push((slot.to_owned(), value));
            }
        }
        candidates
    }

    /// First required slot that is absent or null.
    pub fn next_slot_to_request<'a>(&'a self, tracker: &Tracker) -> Option<&'a str> {
        self.required_slots
            .iter()
            .find(|slot| tracker.slot(slot).is_none())
            .map(String::as_str)
    }

    fn validate_candidate(
        &self,
        slot: &str,
        value: &Value,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        match self.validators.get(slot) {
            Some(validators) if !validators.is_empty() && !tracker.no_form_validation() => {
                validators.validate(value, domain, tracker, dispatcher)
            }
            _ => DefaultValidator.validate(value, domain, tracker, dispatcher),
        }
    }

    fn validated_slots(
        &self,
        candidates: Vec<(String, Value)>,
        domain: &Domain,
        tracker: &mut Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event> {
        let mut events = Vec::with_capacity(candidates.len());
        for (slot, value) in candidates {
            match self.validate_candidate(&slot, &value, domain, tracker, dispatcher) {
                Some(validated) => {
                    tracker.set_slot(slot.clone(), validated.clone());
                    events.push(SlotSet::new(slot, validated).into());
                }
                None => {
                    debug!(
                        event_name = "action.form.slot_rejected",
                        form = %self.name,
                        slot = %slot,
                        "slot validation failed"
                    );
                    tracker.set_slot(slot.clone(), Value::Null);
                    events.push(SlotSet::reset(slot).into());
                }
            }
        }
        events
    }

    fn activate(
        &self,
        tracker: &mut Tracker,
        domain: &Domain,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event> {
        debug!(event_name = "action.form.activated", form = %self.name, "activating form");

        let prefilled: Vec<(String, Value)> = self
            .required_slots
            .iter()
            .filter_map(|slot| Some((slot.clone(), tracker.slot(slot)?.clone())))
            .collect();

        let mut events = vec![Event::from(ActiveLoopEvent::activate(self.name.clone()))];
        events.extend(self.validated_slots(prefilled, domain, tracker, dispatcher));
        events
    }

    fn deactivate(
        &self,
        tracker: &Tracker,
        domain: &Domain,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event> {
        debug!(event_name = "action.form.deactivated", form = %self.name, "deactivating form");

        let mut events = match &self.on_submit {
            Some(handler) => handler(tracker, domain, dispatcher),
            None => Vec::new(),
        };
        events.push(ActiveLoopEvent::deactivate().into());
        events.push(SlotSet::reset(REQUESTED_SLOT).into());
        events
    }

    fn request_slot(&self, slot: &str, dispatcher: &mut dyn ResponseDispatcher) -> Event {
        debug!(event_name = "action.form.slot_requested", form = %self.name, slot, "requesting next slot");

        dispatcher.utter(Message::template(format!("{ASK_TEMPLATE_PREFIX}{slot}")));
        SlotSet::new(REQUESTED_SLOT, slot).into()
    }
}

impl Action for Form {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        tracker: &mut Tracker,
        domain: &Domain,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event> {
        let was_active = tracker.is_active_loop(&self.name);
        debug!(
            event_name = "action.form.running",
            form = %self.name,
            was_active,
            validate = tracker.active_loop.validate,
            "running form"
        );

        let mut events = Vec::new();
        if !was_active {
            events.extend(self.activate(tracker, domain, dispatcher));
        }

        let candidates = self.slot_candidates(tracker);
        if candidates.is_empty() && was_active {
            if let Some(missing) = self.next_slot_to_request(tracker) {
                info!(
                    event_name = "action.form.rejected",
                    form = %self.name,
                    missing_slot = missing,
                    requested_slot = tracker.requested_slot().unwrap_or_default(),
                    "nothing extracted while slots are still missing"
                );
                return vec![ActionExecutionRejected::new(self.name.clone()).into()];
            }
        }

        events.extend(self.validated_slots(candidates, domain, tracker, dispatcher));

        match self.next_slot_to_request(tracker) {
            Some(slot) => events.push(self.request_slot(slot, dispatcher)),
            None => events.extend(self.deactivate(tracker, domain, dispatcher)),
        }
        events
    }
}
