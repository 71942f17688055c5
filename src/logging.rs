use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::types::RuntimeEvent;

/// One JSON object per line on stderr. The library itself never logs; the
/// binaries turn drained `RuntimeEvent`s into these.
#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    pub timestamp: String,
    pub level: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub details: Value,
}

impl StructuredLogLine {
    pub fn new(level: &str, event: &str, tick: Option<u64>, details: Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level.to_string(),
            event: event.to_string(),
            tick,
            details,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            json!({ "level": "error", "event": "log_serialize_failed", "details": err.to_string() })
                .to_string()
        })
    }
}

pub fn emit_log(level: &str, event: &str, tick: Option<u64>, details: Value) {
    eprintln!("{}", StructuredLogLine::new(level, event, tick, details).to_json());
}

/// Log line for a board event; the event's own fields become the details.
pub fn event_log_line(tick: u64, event: &RuntimeEvent) -> StructuredLogLine {
    let level = match event {
        RuntimeEvent::GameOver { .. } | RuntimeEvent::ModeChanged { .. } => "info",
        _ => "debug",
    };
    let mut details = serde_json::to_value(event).unwrap_or(Value::Null);
    let name = details
        .as_object_mut()
        .and_then(|fields| fields.remove("type"))
        .and_then(|kind| kind.as_str().map(str::to_string))
        .unwrap_or_else(|| "board_event".to_string());
    StructuredLogLine::new(level, &name, Some(tick), details)
}

pub fn emit_event(tick: u64, event: &RuntimeEvent) {
    eprintln!("{}", event_log_line(tick, event).to_json());
}
