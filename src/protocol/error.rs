//! Protocol error types
//!
//! Every variant is a per-client failure: the offending client is dropped
//! and other connections are unaffected.

/// Error type for message parsing and client requests
#[derive(Debug)]
pub enum ProtocolError {
    /// Message was not valid JSON of a known shape
    Malformed(serde_json::Error),
    /// Frame too short to carry its declared header
    Truncated,
    /// Header does not fit the 16-bit length prefix
    HeaderTooLarge(usize),
    /// `init` named a channel the catalog does not have
    UnknownChannel(String),
    /// `init` hit a channel with no servable live edge yet
    ChannelUnavailable(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Malformed(source) => write!(f, "malformed message: {}", source),
            ProtocolError::Truncated => write!(f, "truncated frame"),
            ProtocolError::HeaderTooLarge(len) => {
                write!(f, "header of {} bytes exceeds the length prefix", len)
            }
            ProtocolError::UnknownChannel(name) => write!(f, "unknown channel: {}", name),
            ProtocolError::ChannelUnavailable(name) => {
                write!(f, "channel {} has no live edge yet", name)
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed(source) => Some(source),
            _ => None,
        }
    }
}
