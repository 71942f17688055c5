use serde_json::Value;

use crate::types::Direction;

#[derive(Debug, PartialEq)]
pub enum ClientMessage {
    Input { dir: Direction },
    Restart,
    Ping { t: f64 },
}

pub fn parse_client_message(raw: &str) -> Option<ClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "input" => {
            let dir = Direction::parse(object.get("dir")?.as_str()?)?;
            Some(ClientMessage::Input { dir })
        }
        "restart" => Some(ClientMessage::Restart),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ClientMessage::Ping { t })
        }
        _ => None,
    }
}
