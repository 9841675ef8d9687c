//! Git repository RPC daemon over Unix domain sockets.
//!
//! A small binary protocol lets a web frontend query and mutate bare git
//! repositories through a long-lived daemon instead of linking a git
//! library into every process. Each connection is one request: the peer
//! sends a repository path and a command tag, the daemon runs the command
//! against a pluggable [`engine::RepositoryEngine`], writes a status and
//! the result fields, and closes.
//!
//! A second socket carries the [`hook`] relay, which lets repository hook
//! scripts delegate their accept/reject decision to the daemon.
//!
//! # Example
//!
//! ```ignore
//! use gitwire::Server;
//!
//! #[tokio::main]
//! async fn main() -> gitwire::Result<()> {
//!     let engine = my_engine::LibgitEngine::new();
//!     Server::builder(engine, "/run/gitwire/socket")
//!         .bind()?
//!         .run()
//!         .await
//! }
//! ```

pub mod codec;
pub mod commands;
pub mod engine;
pub mod error;
pub mod hook;
mod server;
mod session;
pub mod transport;

pub use error::{Error, HookError, Result, WireError};
pub use server::{Server, ServerBuilder};
