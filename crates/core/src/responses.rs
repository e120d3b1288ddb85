//! Outbound messages produced by actions while they run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::serde_ext::null_as_default;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: String,
}

impl Button {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { title: title.into(), payload: payload.into() }
    }
}

/// A message for the user. Either carries its content directly or references a response
/// template from the domain which the orchestrator renders.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn template(name: impl Into<String>) -> Self {
        Self { template: Some(name.into()), ..Self::default() }
    }

    pub fn custom(payload: Value) -> Self {
        Self { custom: Some(payload), ..Self::default() }
    }

    pub fn with_button(mut self, title: impl Into<String>, payload: impl Into<String>) -> Self {
        self.buttons.push(Button::new(title, payload));
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Value) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_quick_reply(mut self, reply: Value) -> Self {
        self.quick_replies.push(reply);
        self
    }

    pub fn with_element(mut self, element: Value) -> Self {
        self.elements.push(element);
        self
    }
}

/// Ordered sink for the messages an action wants to send.
pub trait ResponseDispatcher {
    fn utter(&mut self, message: Message);

    /// Messages dispatched so far, in dispatch order.
    fn responses(&self) -> &[Message];
}

#[derive(Clone, Debug, Default)]
pub struct CollectingDispatcher {
    responses: Vec<Message>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_responses(self) -> Vec<Message> {
        self.responses
    }
}

impl ResponseDispatcher for CollectingDispatcher {
    fn utter(&mut self, message: Message) {
        self.responses.push(message);
    }

    fn responses(&self) -> &[Message] {
        &self.responses
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::responses::{CollectingDispatcher, Message, ResponseDispatcher};

    #[test]
    fn dispatcher_keeps_messages_in_dispatch_order() {
        let mut dispatcher = CollectingDispatcher::new();
        dispatcher.utter(Message::text("first"));
        dispatcher.utter(Message::template("utter_second"));

        let responses = dispatcher.into_responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].text.as_deref(), Some("first"));
        assert_eq!(responses[1].template.as_deref(), Some("utter_second"));
    }

    #[test]
    fn empty_fields_are_left_out_of_the_wire_format() {
        let message = Message::template("utter_ask_age").with_button("Ten", "/inform{\"age\": 10}");

        let encoded = serde_json::to_value(&message).expect("message serializes");

        assert_eq!(
            encoded,
            json!({
                "template": "utter_ask_age",
                "buttons": [{"title": "Ten", "payload": "/inform{\"age\": 10}"}]
            })
        );
    }

    #[test]
    fn null_collections_from_the_orchestrator_decode_as_empty() {
        let message: Message = serde_json::from_value(json!({
            "text": "hi",
            "elements": null,
            "quick_replies": null,
            "buttons": null,
            "attachment": null,
            "image": null,
            "custom": null
        }))
        .expect("bot data decodes");

        assert_eq!(message, Message::text("hi"));
    }
}
