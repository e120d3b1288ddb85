//! Custom actions and the registry that dispatches requests to them.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::Domain;
use crate::errors::ActionError;
use crate::events::{has_rejection, with_type_keys, Event};
use crate::request::ActionRequest;
use crate::responses::{CollectingDispatcher, Message, ResponseDispatcher};
use crate::tracker::Tracker;

/// Something the orchestrator can ask this server to run.
///
/// Actions are built once at startup and shared by every request, so `run` must not keep
/// per-conversation state on `self`. Whatever the action wants to remember goes into the
/// returned events.
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        tracker: &mut Tracker,
        domain: &Domain,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event>;
}

/// Body returned to the orchestrator after a successful run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActionResponse {
    pub events: Vec<Event>,
    pub responses: Vec<Message>,
}

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry").field("actions", &self.names()).finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action; a later action with the same name replaces the earlier one.
    pub fn register(&mut self, action: impl Action + 'static) -> &mut Self {
        let name = action.name().to_owned();
        if self.actions.insert(name.clone(), Arc::new(action)).is_some() {
            warn!(
                event_name = "action.registry.replaced",
                action_name = %name,
                "action registered twice, keeping the latest"
            );
        }
        self
    }

    pub fn with(mut self, action: impl Action + 'static) -> Self {
        self.register(action);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs the requested action against the request's tracker and domain.
    pub fn execute(&self, request: ActionRequest) -> Result<ActionResponse, ActionError> {
        let ActionRequest { next_action, mut tracker, domain, .. } = request;

        let Some(action) = self.actions.get(&next_action) else {
            warn!(
                event_name = "action.execution.not_found",
                action_name = %next_action,
                "requested action is not registered"
            );
            return Err(ActionError::NotFound { name: next_action });
        };

        debug!(
            event_name = "action.execution.started",
            action_name = %next_action,
            sender_id = %tracker.sender_id,
            "running action"
        );

        let mut dispatcher = CollectingDispatcher::new();
        let events = action.run(&mut tracker, &domain, &mut dispatcher);

        if has_rejection(&events) {
            info!(
                event_name = "action.execution.rejected",
                action_name = %next_action,
                sender_id = %tracker.sender_id,
                "action rejected execution"
            );
            return Err(ActionError::ExecutionRejected { name: next_action });
        }

        let events = with_type_keys(events);
        debug!(
            event_name = "action.execution.finished",
            action_name = %next_action,
            sender_id = %tracker.sender_id,
            event_count = events.len(),
            response_count = dispatcher.responses().len(),
            "action finished"
        );

        Ok(ActionResponse { events, responses: dispatcher.into_responses() })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::actions::{Action, ActionRegistry};
    use crate::domain::Domain;
    use crate::errors::ActionError;
    use crate::events::{ActionExecutionRejected, Event, SlotSet};
    use crate::request::ActionRequest;
    use crate::responses::{Message, ResponseDispatcher};
    use crate::tracker::Tracker;

    struct Greeter;

    impl Action for Greeter {
        fn name(&self) -> &str {
            "action_greet"
        }

        fn run(
            &self,
            tracker: &mut Tracker,
            _domain: &Domain,
            dispatcher: &mut dyn ResponseDispatcher,
        ) -> Vec<Event> {
            dispatcher.utter(Message::text(format!("Hello {}", tracker.sender_id)));
            vec![SlotSet::new("greeted", true).into()]
        }
    }

    struct Refuser;

    impl Action for Refuser {
        fn name(&self) -> &str {
            "action_refuse"
        }

        fn run(&self, _: &mut Tracker, _: &Domain, _: &mut dyn ResponseDispatcher) -> Vec<Event> {
            vec![ActionExecutionRejected::new("action_refuse").into()]
        }
    }

    fn request(action: &str) -> ActionRequest {
        ActionRequest::from_value(json!({"next_action": action, "tracker": {"sender_id": "ada"}}))
            .expect("request decodes")
    }

    #[test]
    fn execute_returns_tagged_events_and_responses() {
        let registry = ActionRegistry::new().with(Greeter);

        let response = registry.execute(request("action_greet")).expect("action runs");

        assert_eq!(
            serde_json::to_value(&response).expect("response serializes"),
            json!({
                "events": [{"event": "slot", "name": "greeted", "value": true}],
                "responses": [{"text": "Hello ada"}]
            })
        );
    }

    #[test]
    fn unknown_action_is_not_found() {
        let registry = ActionRegistry::new().with(Greeter);

        let error = registry.execute(request("action_missing")).expect_err("must fail");

        assert_eq!(error, ActionError::NotFound { name: "action_missing".to_string() });
    }

    #[test]
    fn rejection_becomes_an_error() {
        let registry = ActionRegistry::new().with(Greeter).with(Refuser);

        let error = registry.execute(request("action_refuse")).expect_err("must fail");

        assert_eq!(error, ActionError::ExecutionRejected { name: "action_refuse".to_string() });
    }

    #[test]
    fn names_are_sorted_and_duplicates_replace() {
        let mut registry = ActionRegistry::new();
        registry.register(Refuser).register(Greeter).register(Greeter);

        assert_eq!(registry.names(), vec!["action_greet", "action_refuse"]);
        assert_eq!(registry.len(), 2);
    }
}
