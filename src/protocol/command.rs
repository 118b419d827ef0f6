//! Command parsing
//!
//! Turns one request line into a `Command`.

use crate::error::{KvError, Result};

/// A request line is split into at most this many fields; the last field
/// keeps the remainder of the line.
const MAX_FIELDS: usize = 4;

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up a key
    Get { key: String },

    /// Store a key-value pair; `ttl_ms <= 0` means no expiry
    Set {
        key: String,
        value: String,
        ttl_ms: i64,
    },

    /// Remove a key
    Del { key: String },
}

impl Command {
    /// Parse one request line.
    ///
    /// Errors are `KvError::Protocol` carrying the exact message to send
    /// after the `ERR ` marker.
    pub fn parse(line: &str) -> Result<Command> {
        let fields = split_fields(line);
        let verb = fields.first().copied().unwrap_or("");

        match verb.to_ascii_uppercase().as_str() {
            "GET" => {
                if fields.len() != 2 {
                    return Err(arity_error("GET"));
                }
                Ok(Command::Get {
                    key: fields[1].to_string(),
                })
            }
            "SET" => {
                if fields.len() < 3 {
                    return Err(arity_error("SET"));
                }
                let ttl_ms = match fields.get(3) {
                    Some(raw) => raw
                        .parse::<i64>()
                        .map_err(|_| KvError::Protocol("invalid TTL value".to_string()))?,
                    None => 0,
                };
                Ok(Command::Set {
                    key: fields[1].to_string(),
                    value: fields[2].to_string(),
                    ttl_ms,
                })
            }
            "DEL" => {
                if fields.len() != 2 {
                    return Err(arity_error("DEL"));
                }
                Ok(Command::Del {
                    key: fields[1].to_string(),
                })
            }
            _ => Err(KvError::Protocol("unknown command".to_string())),
        }
    }
}

fn arity_error(verb: &str) -> KvError {
    KvError::Protocol(format!("wrong number of arguments for {}", verb))
}

/// Split a line into at most `MAX_FIELDS` fields on runs of ASCII
/// whitespace. The last field keeps the remainder of the line.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = line.trim_matches(|c: char| c.is_ascii_whitespace());

    while !rest.is_empty() {
        if fields.len() == MAX_FIELDS - 1 {
            fields.push(rest);
            break;
        }
        match rest.find(|c: char| c.is_ascii_whitespace()) {
            Some(split) => {
                fields.push(&rest[..split]);
                rest = rest[split..].trim_start_matches(|c: char| c.is_ascii_whitespace());
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    fields
}
