use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("parsing body failed with error: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action '{name}' was not found")]
    NotFound { name: String },
    #[error("action '{name}' rejected execution")]
    ExecutionRejected { name: String },
}

impl ActionError {
    pub fn action_name(&self) -> &str {
        match self {
            Self::NotFound { name } | Self::ExecutionRejected { name } => name,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("action '{action_name}' aborted: {message}")]
    Execution { action_name: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, action_name: Option<String>, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, action_name: Option<String>, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, action_name: Option<String>, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check the payload and try again."
            }
            Self::NotFound { .. } => "The requested action is not registered on this server.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Message placed in the `error` field of the HTTP body.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn action_name(&self) -> Option<&str> {
        match self {
            Self::BadRequest { action_name, .. }
            | Self::NotFound { action_name, .. }
            | Self::Internal { action_name, .. } => action_name.as_deref(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Request(error) => {
                Self::BadRequest { message: error.to_string(), action_name: None, correlation_id }
            }
            ApplicationError::Action(error @ ActionError::NotFound { .. }) => Self::NotFound {
                message: format!("Action execution failed with error: {error}."),
                action_name: Some(error.action_name().to_owned()),
                correlation_id,
            },
            ApplicationError::Action(error @ ActionError::ExecutionRejected { .. }) => {
                Self::BadRequest {
                    message: format!("Action execution failed with error: {error}."),
                    action_name: Some(error.action_name().to_owned()),
                    correlation_id,
                }
            }
            ApplicationError::Execution { action_name, message } => Self::Internal {
                message: format!("Action execution failed with error: {message}."),
                action_name: Some(action_name),
                correlation_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ActionError, ApplicationError, InterfaceError, RequestError};

    fn payload_error() -> RequestError {
        let error = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("malformed json must fail");
        RequestError::from(error)
    }

    #[test]
    fn payload_error_maps_to_bad_request_without_action_name() {
        let interface = ApplicationError::from(payload_error()).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, action_name: None, .. }
                if correlation_id == "req-1"
        ));
        assert!(interface.message().starts_with("parsing body failed with error: "));
    }

    #[test]
    fn unknown_action_maps_to_not_found_with_action_name() {
        let interface =
            ApplicationError::from(ActionError::NotFound { name: "action_missing".to_owned() })
                .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.action_name(), Some("action_missing"));
        assert_eq!(
            interface.message(),
            "Action execution failed with error: action 'action_missing' was not found."
        );
    }

    #[test]
    fn rejection_maps_to_bad_request() {
        let interface = ApplicationError::from(ActionError::ExecutionRejected {
            name: "restaurant_form".to_owned(),
        })
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(interface.action_name(), Some("restaurant_form"));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check the payload and try again."
        );
    }

    #[test]
    fn aborted_execution_maps_to_internal() {
        let interface = ApplicationError::Execution {
            action_name: "action_hello_world".to_owned(),
            message: "validator panicked".to_owned(),
        }
        .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.correlation_id(), "req-4");
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
