//! Transport layer: Unix domain socket listener setup.
//!
//! The codec itself is transport-agnostic; this module only covers binding
//! the listening socket (with stale-socket recovery and the configured
//! listen backlog) and cleaning the path up afterwards.

mod socket;

pub use socket::{bind_socket, SocketGuard, DEFAULT_BACKLOG};
