//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvError, Result};

use super::Connection;

/// Message sent to worker threads
enum WorkerMessage {
    /// New client connection to handle
    NewConnection(TcpStream),
    /// Signal to shutdown
    Shutdown,
}

/// Signals a running server to stop accepting and wind down
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Request a graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// TCP server for mapkv
///
/// ## Architecture
/// - Main thread accepts connections
/// - Worker thread pool handles client I/O
/// - Shared Engine reference for all workers
pub struct Server {
    /// Server configuration
    config: Config,

    /// Shared storage engine
    engine: Arc<Engine>,

    /// Bound TCP listener
    listener: TcpListener,

    /// Worker thread handles
    workers: Vec<JoinHandle<()>>,

    /// Shutdown flag
    shutdown: Arc<AtomicBool>,

    /// Active connection count
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Bind to the configured address and prepare a server around `engine`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Network(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

        // Non-blocking so the accept loop can check the shutdown flag
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Start serving (blocking)
    ///
    /// This method:
    /// 1. Spawns worker threads
    /// 2. Accepts connections in a loop
    /// 3. Returns when shutdown is signaled
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Server listening on {}", self.local_addr()?);

        // Step 1: Create worker thread pool
        let num_workers = num_workers();
        let (sender, receiver) = bounded::<WorkerMessage>(self.config.max_connections);

        tracing::info!("Starting {} worker threads", num_workers);

        for worker_id in 0..num_workers {
            let worker = Worker::new(
                worker_id,
                receiver.clone(),
                Arc::clone(&self.engine),
                Arc::clone(&self.active_connections),
                self.config.read_timeout_ms,
                self.config.write_timeout_ms,
            );
            let handle = thread::Builder::new()
                .name(format!("mapkv-worker-{}", worker_id))
                .spawn(move || worker.run())
                .map_err(|e| KvError::Network(format!("Failed to spawn worker: {}", e)))?;

            self.workers.push(handle);
        }

        // Step 2: Accept loop
        self.accept_loop(&sender)?;

        // Step 3: Cleanup (after shutdown signaled)
        self.cleanup(&sender);

        Ok(())
    }

    /// Main accept loop
    fn accept_loop(&self, sender: &Sender<WorkerMessage>) -> Result<()> {
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    // Check connection limit
                    let current = self.active_connections.load(Ordering::Relaxed);
                    if current >= self.config.max_connections {
                        tracing::warn!(
                            "Connection limit reached ({}/{}), rejecting {}",
                            current,
                            self.config.max_connections,
                            addr
                        );
                        drop(stream);
                        continue;
                    }

                    tracing::debug!("Accepted connection from {}", addr);

                    if let Err(e) = sender.send(WorkerMessage::NewConnection(stream)) {
                        tracing::error!("Failed to dispatch connection: {}", e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No pending connections, sleep briefly
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        tracing::error!("Accept error: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Cleanup workers and resources
    fn cleanup(&mut self, sender: &Sender<WorkerMessage>) {
        tracing::info!("Shutting down server...");

        // Send shutdown signal to all workers
        for _ in 0..self.workers.len() {
            let _ = sender.send(WorkerMessage::Shutdown);
        }

        // Wait for workers to finish
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                tracing::error!("Worker thread panicked: {:?}", e);
            }
        }

        tracing::info!("Server shutdown complete");
    }

    /// Handle that can stop the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        tracing::info!("Shutdown signal received");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Get the number of active connections
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get the bound address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Worker thread that handles client connections
struct Worker {
    /// Worker ID for logging
    id: usize,

    /// Channel to receive work
    receiver: Receiver<WorkerMessage>,

    /// Shared engine reference
    engine: Arc<Engine>,

    /// Active connection counter
    active_connections: Arc<AtomicUsize>,

    /// Read timeout in milliseconds (0 = none)
    read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 = none)
    write_timeout_ms: u64,
}

impl Worker {
    fn new(
        id: usize,
        receiver: Receiver<WorkerMessage>,
        engine: Arc<Engine>,
        active_connections: Arc<AtomicUsize>,
        read_timeout_ms: u64,
        write_timeout_ms: u64,
    ) -> Self {
        Self {
            id,
            receiver,
            engine,
            active_connections,
            read_timeout_ms,
            write_timeout_ms,
        }
    }

    fn run(self) {
        tracing::debug!("Worker {} started", self.id);

        loop {
            match self.receiver.recv() {
                Ok(WorkerMessage::NewConnection(stream)) => {
                    self.handle_connection(stream);
                }
                Ok(WorkerMessage::Shutdown) => {
                    tracing::debug!("Worker {} received shutdown signal", self.id);
                    break;
                }
                Err(_) => {
                    // Channel closed
                    tracing::debug!("Worker {} channel closed", self.id);
                    break;
                }
            }
        }

        tracing::debug!("Worker {} stopped", self.id);
    }

    fn handle_connection(&self, stream: TcpStream) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let mut conn = match Connection::new(stream, Arc::clone(&self.engine)) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to create connection: {}", e);
                self.active_connections.fetch_sub(1, Ordering::Relaxed);
                return;
            }
        };

        if let Err(e) = conn.set_timeouts(self.read_timeout_ms, self.write_timeout_ms) {
            tracing::warn!("Failed to set connection timeouts: {}", e);
        }

        if let Err(e) = conn.handle() {
            tracing::debug!("Connection {} ended with error: {}", conn.peer_addr(), e);
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Worker thread count: one per CPU, with a floor so a small machine can
/// still serve several clients at once (each worker holds one connection)
fn num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
        .max(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_server_bind_ephemeral_port() {
        let temp_dir = tempdir().unwrap();
        let config = Config::builder()
            .db_path(temp_dir.path().join("store.db"))
            .listen_addr("127.0.0.1:0")
            .build();

        let engine = Arc::new(Engine::open(&config.db_path).unwrap());
        let server = Server::bind(config, engine).unwrap();

        assert!(server.is_running());
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.active_connections(), 0);
    }
}
