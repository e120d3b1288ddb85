pub mod actions;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod forms;
pub mod request;
pub mod responses;
mod serde_ext;
pub mod tracker;

pub use actions::{Action, ActionRegistry, ActionResponse};
pub use domain::Domain;
pub use errors::{ActionError, ApplicationError, InterfaceError, RequestError};
pub use events::{Event, EventEnvelope, EventType};
pub use forms::{Form, FormValidationAction, SlotMapping, SlotValidator};
pub use request::ActionRequest;
pub use responses::{CollectingDispatcher, Message, ResponseDispatcher};
pub use tracker::{ActiveLoop, Tracker, ACTION_LISTEN, REQUESTED_SLOT};
