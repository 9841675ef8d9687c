//! Daemon server: socket setup and the accept loop.
//!
//! Use the fluent [`ServerBuilder`] to configure the listening path and
//! backlog, then call `bind()` and `run()` to serve connections.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::UnixListener;

use crate::engine::RepositoryEngine;
use crate::error::Result;
use crate::session::run_session;
use crate::transport::{bind_socket, SocketGuard, DEFAULT_BACKLOG};

/// Builder for configuring and creating a daemon server.
pub struct ServerBuilder<E> {
    engine: E,
    socket_path: PathBuf,
    backlog: i32,
    max_path_len: usize,
}

impl<E: RepositoryEngine> ServerBuilder<E> {
    /// Create a builder serving `engine` on the socket at `socket_path`.
    pub fn new(engine: E, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            socket_path: socket_path.into(),
            backlog: DEFAULT_BACKLOG,
            max_path_len: crate::commands::MAX_PATH_LEN,
        }
    }

    /// Set the listen backlog.
    ///
    /// Default: 128
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the maximum accepted repository-path frame length.
    ///
    /// Default: 4095
    pub fn max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }

    /// Bind the listening socket. A stale socket file left by a previous
    /// run is unlinked and the bind retried.
    pub fn bind(self) -> Result<Server<E>> {
        let listener = bind_socket(&self.socket_path, self.backlog)?;
        tracing::info!(path = %self.socket_path.display(), "listening");
        Ok(Server {
            engine: Arc::new(self.engine),
            listener,
            max_path_len: self.max_path_len,
            _guard: SocketGuard::new(self.socket_path),
        })
    }
}

/// A bound daemon server. Dropping it removes the socket file.
pub struct Server<E> {
    engine: Arc<E>,
    listener: UnixListener,
    max_path_len: usize,
    _guard: SocketGuard,
}

impl<E: RepositoryEngine> Server<E> {
    /// Create a new server builder.
    pub fn builder(engine: E, socket_path: impl Into<PathBuf>) -> ServerBuilder<E> {
        ServerBuilder::new(engine, socket_path)
    }

    /// The path of the bound socket.
    pub fn socket_path(&self) -> &std::path::Path {
        self._guard.path()
    }

    /// Accept connections forever, one detached task per connection.
    ///
    /// Accept failures are logged and the loop continues; a transient
    /// error on one accept must not take the daemon down.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let engine = Arc::clone(&self.engine);
                    tokio::spawn(run_session(engine, stream, self.max_path_len));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
