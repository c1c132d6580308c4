//! Gateway messages
//!
//! Messages exchanged between a session and its server runtime. Each one is a
//! mapping with a `type` discriminator, an optional `text` or `bytes` payload,
//! an optional close `code`, and any extra fields the caller attached.

use crate::status::CloseCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Keys owned by the typed fields of [`Message`]
const RESERVED_KEYS: [&str; 4] = ["type", "text", "bytes", "code"];

/// The `type` discriminator of a gateway message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// `websocket.connect`: the peer asks to open the connection
    Connect,
    /// `websocket.accept`: the application accepts the connection
    Accept,
    /// `websocket.receive`: a data frame from the peer
    Receive,
    /// `websocket.send`: a data frame for the peer
    Send,
    /// `websocket.disconnect`: either side closes the connection
    Disconnect,
    /// Any type this crate does not interpret
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "websocket.connect",
            Self::Accept => "websocket.accept",
            Self::Receive => "websocket.receive",
            Self::Send => "websocket.send",
            Self::Disconnect => "websocket.disconnect",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "websocket.connect" => Self::Connect,
            "websocket.accept" => Self::Accept,
            "websocket.receive" => Self::Receive,
            "websocket.send" => Self::Send,
            "websocket.disconnect" => Self::Disconnect,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for MessageType {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of a data or close message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Binary(data) => data.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::Binary(value.to_vec())
    }
}

/// A gateway message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(kind: impl Into<MessageType>) -> Self {
        Self {
            kind: kind.into(),
            text: None,
            bytes: None,
            code: None,
            extra: Map::new(),
        }
    }

    pub fn connect() -> Self {
        Self::new(MessageType::Connect)
    }

    pub fn accept() -> Self {
        Self::new(MessageType::Accept)
    }

    /// Inbound data frame as delivered by a server runtime
    ///
    /// Empty frames keep their field set, so an empty text frame still reads
    /// back as `Some(Payload::Text(""))`.
    pub fn receive(payload: impl Into<Payload>) -> Self {
        let mut msg = Self::new(MessageType::Receive);
        match payload.into() {
            Payload::Text(text) => msg.text = Some(text),
            Payload::Binary(data) => msg.bytes = Some(data),
        }
        msg
    }

    /// Outbound data frame
    pub fn send(payload: Option<Payload>) -> Self {
        Self::new(MessageType::Send).with_payload(payload)
    }

    pub fn disconnect(code: CloseCode) -> Self {
        Self::new(MessageType::Disconnect).with_code(code.as_u16())
    }

    /// Sets `text` or `bytes` from the payload.
    ///
    /// An empty or absent payload leaves both fields unset.
    pub fn with_payload(mut self, payload: Option<Payload>) -> Self {
        match payload {
            Some(Payload::Text(text)) if !text.is_empty() => self.text = Some(text),
            Some(Payload::Binary(data)) if !data.is_empty() => self.bytes = Some(data),
            _ => {}
        }
        self
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Merges caller-supplied fields into the message.
    ///
    /// Keys owned by the typed fields (`type`, `text`, `bytes`, `code`) are
    /// skipped.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        for (key, value) in extra {
            if RESERVED_KEYS.contains(&key.as_str()) {
                tracing::debug!("Ignoring reserved extra field '{}'", key);
                continue;
            }
            self.extra.insert(key, value);
        }
        self
    }

    pub fn is(&self, kind: &MessageType) -> bool {
        &self.kind == kind
    }

    /// The text payload if present, else the binary payload.
    pub fn into_payload(self) -> Option<Payload> {
        match (self.text, self.bytes) {
            (Some(text), _) => Some(Payload::Text(text)),
            (None, Some(data)) => Some(Payload::Binary(data)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_text_payload_sets_only_text() {
        let msg = Message::send(Some("hello".into()));
        assert_eq!(msg.text.as_deref(), Some("hello"));
        assert_eq!(msg.bytes, None);
    }

    #[test]
    fn test_binary_payload_sets_only_bytes() {
        let msg = Message::send(Some(vec![1u8, 2, 3].into()));
        assert_eq!(msg.text, None);
        assert_eq!(msg.bytes, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_empty_payload_sets_nothing() {
        for payload in [None, Some(Payload::from("")), Some(Payload::from(Vec::<u8>::new()))] {
            let msg = Message::send(payload);
            assert_eq!(msg.text, None);
            assert_eq!(msg.bytes, None);
        }
    }

    #[test]
    fn test_empty_inbound_frame_keeps_its_field() {
        let msg = Message::receive("");
        assert_eq!(msg.text.as_deref(), Some(""));
        assert_eq!(msg.into_payload(), Some(Payload::Text(String::new())));

        let msg = Message::receive(Vec::<u8>::new());
        assert_eq!(msg.text, None);
        assert_eq!(msg.into_payload(), Some(Payload::Binary(Vec::new())));
    }

    #[test]
    fn test_text_wins_over_bytes() {
        let mut msg = Message::receive("text");
        msg.bytes = Some(b"bytes".to_vec());
        assert_eq!(msg.into_payload(), Some(Payload::Text("text".into())));
    }

    #[test]
    fn test_serializes_to_gateway_shape() {
        let mut extra = Map::new();
        extra.insert("subprotocol".into(), json!("chat"));
        let msg = Message::accept().with_extra(extra);

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "websocket.accept", "subprotocol": "chat"}));

        let close = serde_json::to_value(Message::disconnect(CloseCode::GoingAway)).unwrap();
        assert_eq!(close, json!({"type": "websocket.disconnect", "code": 1001}));
    }

    #[test]
    fn test_deserializes_unknown_type() {
        let msg: Message =
            serde_json::from_value(json!({"type": "lifespan.startup", "extra": 1})).unwrap();
        assert_eq!(msg.kind, MessageType::Other("lifespan.startup".into()));
        assert_eq!(msg.kind.to_string(), "lifespan.startup");
        assert_eq!(msg.extra.get("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_reserved_extra_keys_are_ignored() {
        let mut extra = Map::new();
        extra.insert("type".into(), json!("websocket.close"));
        extra.insert("text".into(), json!("sneaky"));
        extra.insert("headers".into(), json!([]));

        let msg = Message::send(Some("real".into())).with_extra(extra);
        assert_eq!(msg.kind, MessageType::Send);
        assert_eq!(msg.text.as_deref(), Some("real"));
        assert_eq!(msg.extra.len(), 1);
        assert!(msg.extra.contains_key("headers"));
    }
}
