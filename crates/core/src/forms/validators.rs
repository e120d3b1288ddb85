//! Hooks deciding whether a candidate may fill a slot.

use serde_json::Value;

use crate::domain::Domain;
use crate::responses::ResponseDispatcher;
use crate::tracker::Tracker;

/// Accepts a candidate by returning the (possibly transformed) value to store.
pub trait SlotValidator: Send + Sync {
    fn validate(
        &self,
        value: &Value,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value>;
}

impl<F> SlotValidator for F
where
    F: Fn(&Value, &Domain, &Tracker, &mut dyn ResponseDispatcher) -> Option<Value> + Send + Sync,
{
    fn validate(
        &self,
        value: &Value,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        self(value, domain, tracker, dispatcher)
    }
}

/// Accepts any non-null value unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultValidator;

impl SlotValidator for DefaultValidator {
    fn validate(
        &self,
        value: &Value,
        _domain: &Domain,
        _tracker: &Tracker,
        _dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        Some(value).filter(|value| !value.is_null()).cloned()
    }
}

/// Ordered validators where the first one to accept decides the stored value.
#[derive(Default)]
pub struct AnyValidator {
    validators: Vec<Box<dyn SlotValidator>>,
}

impl AnyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validator: impl SlotValidator + 'static) {
        self.validators.push(Box::new(validator));
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl std::fmt::Debug for AnyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyValidator").field("validators", &self.validators.len()).finish()
    }
}

impl SlotValidator for AnyValidator {
    fn validate(
        &self,
        value: &Value,
        domain: &Domain,
        tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        self.validators
            .iter()
            .find_map(|validator| validator.validate(value, domain, tracker, dispatcher))
    }
}
