//! Connection Handler
//!
//! Handles a single client connection: read a line, run the command on the
//! engine, write the response line. Repeats until the client disconnects.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{Command, Response};

/// Handles a single client connection
pub struct Connection {
    stream: TcpStream,
    peer: String,
    engine: Arc<Engine>,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // The listener is non-blocking; this stream must not be
        stream.set_nonblocking(false)?;
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Ok(Self {
            stream,
            peer,
            engine,
        })
    }

    /// Set socket timeouts; 0 disables the corresponding timeout
    pub fn set_timeouts(&self, read_ms: u64, write_ms: u64) -> Result<()> {
        self.stream.set_read_timeout(to_timeout(read_ms))?;
        self.stream.set_write_timeout(to_timeout(write_ms))?;
        Ok(())
    }

    /// Peer address for logging
    pub fn peer_addr(&self) -> &str {
        &self.peer
    }

    /// Serve the connection until the client disconnects (blocking).
    ///
    /// Command and engine failures are reported to the client as `ERR`
    /// lines and do not end the connection; only socket errors do.
    pub fn handle(&mut self) -> Result<()> {
        let reader = BufReader::new(self.stream.try_clone()?);

        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                // Read timeout on an idle connection: close it quietly
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    tracing::debug!("Connection {} idle timeout", self.peer);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let response = self.dispatch(&line);
            self.stream.write_all(format!("{}\n", response).as_bytes())?;
            self.stream.flush()?;
        }

        tracing::debug!("Connection {} closed by peer", self.peer);
        Ok(())
    }

    /// Run one request line against the engine
    fn dispatch(&self, line: &str) -> Response {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => return Response::from_error(e),
        };

        match command {
            Command::Get { key } => match self.engine.get(&key) {
                Ok(Some(value)) => Response::Value(value),
                Ok(None) => Response::Nil,
                Err(e) => Response::from_error(e),
            },
            Command::Set { key, value, ttl_ms } => {
                match self.engine.set(&key, &value, ttl_ms) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::from_error(e),
                }
            }
            Command::Del { key } => match self.engine.del(&key) {
                Ok(true) => Response::Ok,
                Ok(false) => Response::Nil,
                Err(e) => Response::from_error(e),
            },
        }
    }
}

fn to_timeout(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}
