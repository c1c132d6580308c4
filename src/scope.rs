//! Request scope metadata
//!
//! Describes the request a session belongs to. The `type` field decides
//! whether the lifecycle hooks treat the request as connection-oriented.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Kind of request described by a [`Scope`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScopeType {
    Http,
    Websocket,
    /// Any other request type, e.g. `lifespan`
    Other(String),
}

impl ScopeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http => "http",
            Self::Websocket => "websocket",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ScopeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "http" => Self::Http,
            "websocket" => Self::Websocket,
            _ => Self::Other(value),
        }
    }
}

impl From<ScopeType> for String {
    fn from(value: ScopeType) -> Self {
        match value {
            ScopeType::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request connection metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: ScopeType,
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default)]
    pub query_string: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub subprotocols: Vec<String>,
    #[serde(default)]
    pub client: Option<SocketAddr>,
}

fn root_path() -> String {
    "/".to_owned()
}

impl Scope {
    pub fn new(kind: ScopeType, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            query_string: String::new(),
            headers: Vec::new(),
            subprotocols: Vec::new(),
            client: None,
        }
    }

    pub fn websocket(path: impl Into<String>) -> Self {
        Self::new(ScopeType::Websocket, path)
    }

    pub fn http(path: impl Into<String>) -> Self {
        Self::new(ScopeType::Http, path)
    }

    /// Whether this request is a persistent bidirectional connection
    pub fn is_websocket(&self) -> bool {
        self.kind == ScopeType::Websocket
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_client(mut self, client: SocketAddr) -> Self {
        self.client = Some(client);
        self
    }

    /// First value of the named header, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
