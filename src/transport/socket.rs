//! Unix domain socket binding.

use std::io;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

use socket2::{Domain, SockAddr, Socket, Type};
use tokio::net::UnixListener;

/// Default listen backlog for the daemon socket.
pub const DEFAULT_BACKLOG: i32 = 128;

/// Bind a listening Unix socket at `path`.
///
/// If binding fails because the path is already occupied by a stale socket,
/// the path is unlinked and the bind retried exactly once.
///
/// Must be called from within a tokio runtime.
pub fn bind_socket(path: &Path, backlog: i32) -> io::Result<UnixListener> {
    match try_bind(path, backlog) {
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            std::fs::remove_file(path)?;
            try_bind(path, backlog)
        }
        other => other,
    }
}

fn try_bind(path: &Path, backlog: i32) -> io::Result<UnixListener> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    socket.bind(&SockAddr::unix(path)?)?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;
    let std_listener = std::os::unix::net::UnixListener::from(OwnedFd::from(socket));
    UnixListener::from_std(std_listener)
}

/// Removes the socket path on drop.
pub struct SocketGuard {
    path: PathBuf,
}

impl SocketGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_connect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitwire.sock");

        let listener = bind_socket(&path, DEFAULT_BACKLOG).unwrap();
        let client = tokio::net::UnixStream::connect(&path);
        let (accepted, connected) = tokio::join!(listener.accept(), client);
        accepted.unwrap();
        connected.unwrap();
    }

    #[tokio::test]
    async fn test_stale_socket_is_unlinked_and_rebound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitwire.sock");

        // First bind leaves the filesystem entry behind when dropped.
        let listener = bind_socket(&path, DEFAULT_BACKLOG).unwrap();
        drop(listener);
        assert!(path.exists());

        // Second bind hits AddrInUse, unlinks, and retries.
        let rebound = bind_socket(&path, DEFAULT_BACKLOG).unwrap();
        drop(rebound);
    }

    #[tokio::test]
    async fn test_guard_removes_path_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitwire.sock");

        let _listener = bind_socket(&path, DEFAULT_BACKLOG).unwrap();
        assert!(path.exists());

        drop(SocketGuard::new(path.clone()));
        assert!(!path.exists());
    }
}
