//! Hook relay between repository hook scripts and the daemon.
//!
//! Git runs hooks as child processes of `git-receive-pack`, outside the
//! daemon. The relay bridges that gap: a tiny client binary installed as
//! the hook executable forwards its identity, arguments, `GIT_`
//! environment, and stdin over a second Unix socket, and the daemon
//! decides the hook's exit status. Connections authenticate with a
//! 64-byte cookie handed to the hook through its environment.
//!
//! Wire layout, client to daemon: the raw cookie, the argument count as
//! a little-endian `u64`, each argument NUL-terminated, each `GIT_`
//! environment entry NUL-terminated followed by one empty entry, then
//! the hook's stdin until half-close. Daemon to client: one status byte,
//! then optional diagnostic text the client copies to its stderr.

mod client;
mod server;

pub use client::{exchange, relay, write_invocation, COOKIE_ENV, SOCKET_ENV};
pub use server::{serve_hook_connection, serve_hooks, HookAuth};

use crate::error::HookError;

/// Length of the authentication cookie, raw bytes on the wire.
pub const COOKIE_LEN: usize = 64;

/// One decoded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRequest {
    /// Authentication cookie as received.
    pub cookie: Vec<u8>,
    /// Hook arguments; the first is the hook name.
    pub args: Vec<Vec<u8>>,
    /// `GIT_`-prefixed environment entries, `NAME=value` form.
    pub env: Vec<Vec<u8>>,
    /// Everything the hook received on stdin.
    pub stdin: Vec<u8>,
}

/// The daemon's verdict on a hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResponse {
    /// Exit status for the hook process. Zero accepts the operation.
    pub status: u8,
    /// Diagnostic text relayed to the hook's stderr.
    pub diagnostics: Vec<u8>,
}

impl HookResponse {
    /// Accept with no diagnostics.
    pub fn ok() -> Self {
        Self {
            status: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Reject with a status and a message for the pusher.
    pub fn reject(status: u8, message: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            diagnostics: message.into(),
        }
    }
}

/// Boxed future for hook handler results.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Daemon-side policy for hook invocations.
pub trait HookHandler: Send + Sync + 'static {
    /// Decide the outcome of one authenticated invocation.
    fn call(&self, request: HookRequest) -> BoxFuture<'static, HookResponse>;
}

impl<F, Fut> HookHandler for F
where
    F: Fn(HookRequest) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = HookResponse> + Send + 'static,
{
    fn call(&self, request: HookRequest) -> BoxFuture<'static, HookResponse> {
        Box::pin(self(request))
    }
}

/// Result alias for relay operations.
pub type HookResult<T> = std::result::Result<T, HookError>;
