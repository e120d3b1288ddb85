use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use parley_core::{ActionRegistry, ActionRequest, ActionResponse, ApplicationError, InterfaceError};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookState {
    registry: Arc<ActionRegistry>,
}

impl WebhookState {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
}

pub type WebhookRejection = (StatusCode, Json<ErrorBody>);

pub fn router(registry: Arc<ActionRegistry>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(WebhookState::new(registry))
}

pub async fn webhook(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Result<Json<ActionResponse>, WebhookRejection> {
    let correlation_id = Uuid::new_v4().to_string();

    let request = ActionRequest::from_slice(&body)
        .map_err(|error| reject(ApplicationError::from(error), &correlation_id))?;
    let action_name = request.next_action.clone();

    info!(
        event_name = "webhook.request.received",
        correlation_id = %correlation_id,
        action_name = %action_name,
        sender_id = %request.sender_id(),
        "custom action requested"
    );

    let registry = Arc::clone(&state.registry);
    let outcome = tokio::task::spawn_blocking(move || registry.execute(request)).await;

    match outcome {
        Ok(Ok(response)) => {
            info!(
                event_name = "webhook.request.completed",
                correlation_id = %correlation_id,
                action_name = %action_name,
                event_count = response.events.len(),
                response_count = response.responses.len(),
                "custom action completed"
            );
            Ok(Json(response))
        }
        Ok(Err(error)) => Err(reject(ApplicationError::from(error), &correlation_id)),
        Err(join_error) => Err(reject(
            ApplicationError::Execution { action_name, message: join_error.to_string() },
            &correlation_id,
        )),
    }
}

fn reject(error: ApplicationError, correlation_id: &str) -> WebhookRejection {
    let interface = error.into_interface(correlation_id);
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(
        event_name = "webhook.request.failed",
        correlation_id = %interface.correlation_id(),
        status = status.as_u16(),
        action_name = interface.action_name().unwrap_or("unknown"),
        error = %interface,
        "{}",
        interface.user_message()
    );

    let body = ErrorBody {
        error: interface.message().to_owned(),
        action_name: interface.action_name().map(str::to_owned),
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Bytes, extract::State, http::StatusCode, Json};
    use parley_core::events::{Event, SlotSet};
    use parley_core::{Action, ActionRegistry, Domain, ResponseDispatcher, Tracker};
    use serde_json::json;

    use crate::formbot;
    use crate::webhook::{webhook, ErrorBody, WebhookState};

    struct Panicking;

    impl Action for Panicking {
        fn name(&self) -> &str {
            "action_explode"
        }

        fn run(&self, _: &mut Tracker, _: &Domain, _: &mut dyn ResponseDispatcher) -> Vec<Event> {
            panic!("validator blew up");
        }
    }

    struct Remember;

    impl Action for Remember {
        fn name(&self) -> &str {
            "action_remember"
        }

        fn run(&self, _: &mut Tracker, _: &Domain, _: &mut dyn ResponseDispatcher) -> Vec<Event> {
            vec![SlotSet::new("remembered", true).into()]
        }
    }

    fn state() -> State<WebhookState> {
        let registry = formbot::registry().with(Panicking).with(Remember);
        State(WebhookState::new(Arc::new(registry)))
    }

    fn body(value: serde_json::Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&value).expect("payload serializes"))
    }

    #[tokio::test]
    async fn successful_action_returns_events_and_responses() {
        let result = webhook(state(), body(json!({"next_action": "action_hello_world"}))).await;

        let Json(response) = result.expect("action succeeds");
        assert!(response.events.is_empty());
        assert_eq!(response.responses[0].text.as_deref(), Some("Hello world from parley!"));
    }

    #[tokio::test]
    async fn returned_events_carry_their_wire_tag() {
        let result = webhook(state(), body(json!({"next_action": "action_remember"}))).await;

        let Json(response) = result.expect("action succeeds");
        assert_eq!(
            serde_json::to_value(&response.events).expect("events serialize"),
            json!([{"event": "slot", "name": "remembered", "value": true}])
        );
    }

    #[tokio::test]
    async fn unreadable_payload_is_a_bad_request() {
        let result = webhook(state(), Bytes::from_static(b"{\"next_action\": 12")).await;

        let (status, Json(error)) = result.expect_err("payload is rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.error.starts_with("parsing body failed with error: "));
        assert_eq!(error.action_name, None);
    }

    #[tokio::test]
    async fn unknown_action_is_not_found() {
        let result = webhook(state(), body(json!({"next_action": "action_missing"}))).await;

        let (status, Json(error)) = result.expect_err("action is missing");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            error,
            ErrorBody {
                error: "Action execution failed with error: action 'action_missing' was not found."
                    .to_string(),
                action_name: Some("action_missing".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn rejected_form_turn_is_a_bad_request() {
        let payload = json!({
            "next_action": "restaurant_form",
            "tracker": {
                "slots": {"requested_slot": "cuisine"},
                "latest_message": {"intent": {"name": "chitchat", "confidence": 0.9}},
                "active_loop": {"name": "restaurant_form"},
                "latest_action_name": "action_listen"
            }
        });

        let result = webhook(state(), body(payload)).await;

        let (status, Json(error)) = result.expect_err("form rejects");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.action_name.as_deref(), Some("restaurant_form"));
        assert!(error.error.contains("rejected execution"));
    }

    #[tokio::test]
    async fn panicking_action_is_an_internal_error() {
        let result = webhook(state(), body(json!({"next_action": "action_explode"}))).await;

        let (status, Json(error)) = result.expect_err("action panics");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.action_name.as_deref(), Some("action_explode"));
    }
}
