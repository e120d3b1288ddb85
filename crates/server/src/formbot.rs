//! Demo actions served out of the box: a restaurant booking form and a greeting.

use parley_core::domain::Domain;
use parley_core::events::Event;
use parley_core::forms::{Form, SlotMapping, SlotValidator};
use parley_core::{Action, ActionRegistry, Message, ResponseDispatcher, Tracker};
use serde_json::Value;

pub const RESTAURANT_FORM: &str = "restaurant_form";
pub const HELLO_WORLD: &str = "action_hello_world";

const CUISINES: &[&str] = &["caribbean", "chinese", "french", "greek", "indian", "italian", "mexican"];

pub fn registry() -> ActionRegistry {
    ActionRegistry::new().with(restaurant_form()).with(HelloWorld)
}

pub fn restaurant_form() -> Form {
    Form::new(
        RESTAURANT_FORM,
        ["cuisine", "num_people", "outdoor_seating", "preferences", "feedback"],
    )
    .with_mapping("cuisine", SlotMapping::from_entity("cuisine").excluding_intents(["chitchat"]))
    .with_mapping(
        "num_people",
        SlotMapping::from_entity("num_people").for_intents(["inform", "request_restaurant"]),
    )
    .with_mapping("num_people", SlotMapping::from_entity("number"))
    .with_mapping("outdoor_seating", SlotMapping::from_entity("seating"))
    .with_mapping("outdoor_seating", SlotMapping::from_value(true).for_intents(["affirm"]))
    .with_mapping("outdoor_seating", SlotMapping::from_value(false).for_intents(["deny"]))
    .with_mapping(
        "preferences",
        SlotMapping::from_value("no additional preferences").for_intents(["deny"]),
    )
    .with_mapping("preferences", SlotMapping::from_text().excluding_intents(["affirm"]))
    .with_mapping("feedback", SlotMapping::from_entity("feedback"))
    .with_mapping("feedback", SlotMapping::from_text())
    .with_validator("cuisine", CuisineValidator)
    .with_validator("num_people", NumPeopleValidator)
    .with_validator("outdoor_seating", OutdoorSeatingValidator)
    .on_submit(|_, _, dispatcher| {
        dispatcher.utter(Message::template("utter_submit"));
        Vec::new()
    })
}

pub struct CuisineValidator;

impl SlotValidator for CuisineValidator {
    fn validate(
        &self,
        value: &Value,
        _domain: &Domain,
        _tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        let cuisine = value.as_str()?;
        if CUISINES.contains(&cuisine.to_lowercase().as_str()) {
            return Some(value.clone());
        }
        dispatcher.utter(Message::template("utter_wrong_cuisine"));
        None
    }
}

pub struct NumPeopleValidator;

impl SlotValidator for NumPeopleValidator {
    fn validate(
        &self,
        value: &Value,
        _domain: &Domain,
        _tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        let people = match value {
            Value::String(text) => text.trim().parse::<i64>().ok(),
            Value::Number(number) => number.as_i64(),
            _ => None,
        };
        match people {
            Some(people) if people >= 1 => Some(Value::from(people)),
            _ => {
                dispatcher.utter(Message::template("utter_wrong_num_people"));
                None
            }
        }
    }
}

pub struct OutdoorSeatingValidator;

impl SlotValidator for OutdoorSeatingValidator {
    fn validate(
        &self,
        value: &Value,
        _domain: &Domain,
        _tracker: &Tracker,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Option<Value> {
        match value {
            Value::Bool(seat_outside) => return Some(Value::Bool(*seat_outside)),
            Value::String(text) if text.contains("out") => return Some(Value::Bool(true)),
            Value::String(text) if text.contains("in") => return Some(Value::Bool(false)),
            _ => {}
        }
        dispatcher.utter(Message::template("utter_wrong_outdoor_seating"));
        None
    }
}

pub struct HelloWorld;

impl Action for HelloWorld {
    fn name(&self) -> &str {
        HELLO_WORLD
    }

    fn run(
        &self,
        _tracker: &mut Tracker,
        _domain: &Domain,
        dispatcher: &mut dyn ResponseDispatcher,
    ) -> Vec<Event> {
        dispatcher.utter(Message::text("Hello world from parley!"));
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use parley_core::domain::Domain;
    use parley_core::forms::SlotValidator;
    use parley_core::{CollectingDispatcher, Message, ResponseDispatcher, Tracker};
    use serde_json::{json, Value};

    use crate::formbot::{
        registry, CuisineValidator, NumPeopleValidator, OutdoorSeatingValidator, HELLO_WORLD,
        RESTAURANT_FORM,
    };

    fn check(validator: &dyn SlotValidator, value: Value) -> (Option<Value>, Vec<Message>) {
        let mut dispatcher = CollectingDispatcher::new();
        let result =
            validator.validate(&value, &Domain::default(), &Tracker::default(), &mut dispatcher);
        (result, dispatcher.responses().to_vec())
    }

    #[test]
    fn registry_serves_both_demo_actions() {
        assert_eq!(registry().names(), vec![HELLO_WORLD, RESTAURANT_FORM]);
    }

    #[test]
    fn cuisine_is_matched_case_insensitively() {
        assert_eq!(check(&CuisineValidator, json!("Greek")).0, Some(json!("Greek")));

        let (result, responses) = check(&CuisineValidator, json!("martian"));
        assert_eq!(result, None);
        assert_eq!(responses, vec![Message::template("utter_wrong_cuisine")]);
    }

    #[test]
    fn num_people_accepts_positive_numbers_and_numeric_text() {
        assert_eq!(check(&NumPeopleValidator, json!("4")).0, Some(json!(4)));
        assert_eq!(check(&NumPeopleValidator, json!(2)).0, Some(json!(2)));

        let (result, responses) = check(&NumPeopleValidator, json!(0));
        assert_eq!(result, None);
        assert_eq!(responses, vec![Message::template("utter_wrong_num_people")]);
    }

    #[test]
    fn outdoor_seating_understands_free_text() {
        assert_eq!(check(&OutdoorSeatingValidator, json!("outside please")).0, Some(json!(true)));
        assert_eq!(check(&OutdoorSeatingValidator, json!("inside")).0, Some(json!(false)));
        assert_eq!(check(&OutdoorSeatingValidator, json!(false)).0, Some(json!(false)));
        assert_eq!(check(&OutdoorSeatingValidator, json!(3)).0, None);
    }
}
