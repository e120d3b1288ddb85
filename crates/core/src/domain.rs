//! Read-only bot configuration the orchestrator ships with every request.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::responses::Button;
use crate::serde_ext::{default_true, null_as_default};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<String>,
    /// Form declarations keyed by form name. Older orchestrators send a bare list of names.
    #[serde(default, deserialize_with = "forms_list_or_map")]
    pub forms: BTreeMap<String, Value>,
    /// Intent declarations, either a bare name or a single-key object with properties.
    #[serde(default, deserialize_with = "null_as_default")]
    pub intents: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: BTreeMap<String, DomainSlot>,
    #[serde(default, alias = "templates", deserialize_with = "null_as_default")]
    pub responses: BTreeMap<String, Vec<DomainResponse>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: DomainConfig,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_config: SessionConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainSlot {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub slot_type: String,
    #[serde(default)]
    pub initial_value: Value,
    #[serde(default = "default_true", deserialize_with = "bool_or_true")]
    pub auto_fill: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default = "default_true", deserialize_with = "bool_or_true")]
    pub store_entities_as_slots: bool,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self { store_entities_as_slots: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Minutes of inactivity after which a new session starts.
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_expiration_time: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub carry_over_slots_to_new_session: bool,
}

fn bool_or_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn forms_list_or_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Forms {
        Names(Vec<String>),
        Declarations(BTreeMap<String, Value>),
    }

    Ok(match Option::<Forms>::deserialize(deserializer)? {
        None => BTreeMap::new(),
        Some(Forms::Names(names)) => names.into_iter().map(|name| (name, Value::Null)).collect(),
        Some(Forms::Declarations(declarations)) => declarations,
    })
}

impl Domain {
    pub fn form_names(&self) -> Vec<&str> {
        self.forms.keys().map(String::as_str).collect()
    }

    pub fn has_form(&self, name: &str) -> bool {
        self.forms.contains_key(name)
    }

    pub fn intent_names(&self) -> Vec<&str> {
        self.intents
            .iter()
            .filter_map(|intent| match intent {
                Value::String(name) => Some(name.as_str()),
                Value::Object(declaration) => declaration.keys().next().map(String::as_str),
                _ => None,
            })
            .collect()
    }

    /// Texts of every variation of a response template, in declaration order.
    pub fn response_texts(&self, template: &str) -> Vec<&str> {
        self.responses
            .get(template)
            .map(|variations| {
                variations.iter().filter_map(|response| response.text.as_deref()).collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::Domain;

    #[test]
    fn forms_decode_from_a_list_of_names() {
        let domain: Domain =
            serde_json::from_value(json!({"forms": ["restaurant_form", "booking_form"]}))
                .expect("domain decodes");

        assert_eq!(domain.form_names(), vec!["booking_form", "restaurant_form"]);
    }

    #[test]
    fn forms_decode_from_a_declaration_map() {
        let domain: Domain = serde_json::from_value(json!({
            "forms": {"restaurant_form": {"cuisine": [{"type": "from_entity", "entity": "cuisine"}]}}
        }))
        .expect("domain decodes");

        assert!(domain.has_form("restaurant_form"));
        assert!(!domain.has_form("booking_form"));
    }

    #[test]
    fn intent_names_cover_bare_and_declared_intents() {
        let domain: Domain = serde_json::from_value(json!({
            "intents": ["greet", {"inform": {"use_entities": true}}, 7]
        }))
        .expect("domain decodes");

        assert_eq!(domain.intent_names(), vec!["greet", "inform"]);
    }

    #[test]
    fn legacy_templates_key_and_null_sections_are_accepted() {
        let domain: Domain = serde_json::from_value(json!({
            "templates": {"utter_greet": [{"text": "Hey!"}, {"text": "Hello!"}, {"image": "x.png"}]},
            "slots": {"cuisine": {"type": "text", "auto_fill": null}},
            "config": null,
            "entities": null
        }))
        .expect("domain decodes");

        assert_eq!(domain.response_texts("utter_greet"), vec!["Hey!", "Hello!"]);
        assert!(domain.response_texts("utter_missing").is_empty());
        assert!(domain.slots["cuisine"].auto_fill);
        assert!(domain.config.store_entities_as_slots);
        assert!(domain.entities.is_empty());
    }
}
