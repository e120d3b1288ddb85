//! Forms collect a fixed set of slots over several turns.

pub mod engine;
pub mod mapping;
pub mod validation;
pub mod validators;

pub use engine::{Form, ASK_TEMPLATE_PREFIX};
pub use mapping::{SlotMapping, SlotSource};
pub use validation::{FormValidationAction, NextSlotRequester, SlotExtractor};
pub use validators::{AnyValidator, DefaultValidator, SlotValidator};
