//! Protocol Module
//!
//! Defines the line-oriented wire protocol for client-server communication.
//!
//! ## Requests
//!
//! One command per newline-terminated line, fields separated by runs of
//! ASCII whitespace, command names case-insensitive. At most four fields are
//! recognized; the fourth keeps any remaining text verbatim.
//!
//! ```text
//! GET <key>
//! SET <key> <value> [<ttl_ms>]
//! DEL <key>
//! ```
//!
//! ## Responses
//!
//! One line per command:
//!
//! ```text
//! OK               SET succeeded / DEL removed a key
//! nil              GET missed / DEL had nothing to remove
//! <value>          GET hit
//! ERR <message>    arity mismatch, bad TTL, unknown command, engine error
//! ```
//!
//! EXPIRE is engine-local and has no wire form.

mod command;
mod response;

pub use command::Command;
pub use response::Response;
