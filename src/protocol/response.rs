//! Response definitions
//!
//! Represents responses to clients and their wire rendering.

use std::fmt;

use crate::error::KvError;

/// A response to send to a client, one line on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command succeeded with nothing to return
    Ok,

    /// Key missing (GET) or nothing removed (DEL)
    Nil,

    /// GET hit
    Value(String),

    /// Parse or engine failure; the message follows `ERR `
    Error(String),
}

impl Response {
    /// Build the error response for a failed command
    pub fn from_error(err: KvError) -> Self {
        match err {
            // Protocol errors carry the exact wire message already
            KvError::Protocol(msg) => Response::Error(msg),
            other => Response::Error(other.to_string()),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Nil => write!(f, "nil"),
            Response::Value(value) => write!(f, "{}", value),
            Response::Error(msg) => write!(f, "ERR {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_rendering() {
        assert_eq!(Response::Ok.to_string(), "OK");
        assert_eq!(Response::Nil.to_string(), "nil");
        assert_eq!(Response::Value("bar".to_string()).to_string(), "bar");
        assert_eq!(
            Response::Error("unknown command".to_string()).to_string(),
            "ERR unknown command"
        );
    }

    #[test]
    fn test_from_protocol_error_keeps_message() {
        let response = Response::from_error(KvError::Protocol("invalid TTL value".to_string()));
        assert_eq!(response.to_string(), "ERR invalid TTL value");
    }
}
