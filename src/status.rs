//! WebSocket close status codes
//!
//! The fixed 1000–1010 vocabulary from RFC 6455 section 7.4.1.

use std::fmt;

/// Standard WebSocket close status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum CloseCode {
    /// The purpose for which the connection was established has been fulfilled.
    #[default]
    Normal = 1000,
    /// An endpoint is going away, such as a server going down or a browser
    /// navigating away from a page.
    GoingAway = 1001,
    /// The connection is terminated due to a protocol error.
    ProtocolError = 1002,
    /// An endpoint received a type of data it cannot accept.
    UnsupportedData = 1003,
    /// Reserved. The meaning might be defined in the future.
    Reserved = 1004,
    /// No status code was actually present. Must not be sent in a close frame.
    NoStatus = 1005,
    /// The connection was closed without sending or receiving a close frame.
    /// Must not be sent in a close frame.
    Abnormal = 1006,
    /// Data within a message was not consistent with the message type
    /// (e.g. non-UTF-8 data in a text message).
    InvalidPayload = 1007,
    /// A message violated the endpoint's policy.
    PolicyViolation = 1008,
    /// A message was too big to process.
    MessageTooBig = 1009,
    /// The client expected the server to negotiate one or more extensions
    /// and the server did not.
    MandatoryExtension = 1010,
}

/// Error returned when converting a number outside 1000–1010 into a [`CloseCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid close code: {0}")]
pub struct InvalidCloseCode(pub u16);

impl CloseCode {
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for CloseCode {
    type Error = InvalidCloseCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1002 => Self::ProtocolError,
            1003 => Self::UnsupportedData,
            1004 => Self::Reserved,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::InvalidPayload,
            1008 => Self::PolicyViolation,
            1009 => Self::MessageTooBig,
            1010 => Self::MandatoryExtension,
            other => return Err(InvalidCloseCode(other)),
        };
        Ok(code)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
