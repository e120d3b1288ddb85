use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use parley_core::{ActionRequest, ACTION_LISTEN};
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "inspect";

#[derive(Debug, Serialize)]
struct InspectReport {
    next_action: String,
    sender_id: String,
    version: Option<String>,
    event_count: usize,
    events_by_tag: BTreeMap<String, usize>,
    unknown_events: Vec<String>,
    active_loop: Option<String>,
    requested_slot: Option<String>,
    filled_slots: Vec<String>,
    latest_intent: Option<String>,
    awaiting_user: bool,
}

pub fn run(path: &Path) -> CommandResult {
    let body = match fs::read(path) {
        Ok(body) => body,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "io",
                format!("could not read `{}`: {error}", path.display()),
                3,
            );
        }
    };

    let request = match ActionRequest::from_slice(&body) {
        Ok(request) => request,
        Err(error) => return CommandResult::failure(COMMAND, "payload", error.to_string(), 4),
    };

    let report = build_report(&request);
    let message = format!(
        "payload asks for `{}` with {} tracker event(s)",
        report.next_action, report.event_count
    );
    match serde_json::to_value(&report) {
        Ok(details) => CommandResult::success_with_details(COMMAND, message, Some(details)),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 5),
    }
}

fn build_report(request: &ActionRequest) -> InspectReport {
    let tracker = &request.tracker;

    let mut events_by_tag = BTreeMap::new();
    let mut unknown_events = Vec::new();
    for event in &tracker.events {
        *events_by_tag.entry(event.tag().to_string()).or_insert(0) += 1;
        if event.event_type().is_none() {
            unknown_events.push(event.tag().to_string());
        }
    }

    let mut filled_slots = tracker
        .slots
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, _)| name.clone())
        .collect::<Vec<_>>();
    filled_slots.sort();

    InspectReport {
        next_action: request.next_action.clone(),
        sender_id: request.sender_id().to_string(),
        version: request.version.clone(),
        event_count: tracker.events.len(),
        events_by_tag,
        unknown_events,
        active_loop: tracker.active_loop.is_active().then(|| tracker.active_loop.name.clone()),
        requested_slot: tracker.requested_slot().map(str::to_owned),
        filled_slots,
        latest_intent: tracker.latest_intent().map(str::to_owned),
        awaiting_user: tracker.latest_action_name == ACTION_LISTEN,
    }
}
