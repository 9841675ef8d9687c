//! Client side of the hook relay.
//!
//! Installed as the repository hook executable. Forwards the invocation
//! to the daemon and exits with the status the daemon returns, so the
//! daemon owns all hook policy.

use std::ffi::OsString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;

use super::{HookResult, COOKIE_LEN};
use crate::error::HookError;

/// Environment variable naming the daemon's hook socket path.
pub const SOCKET_ENV: &str = "GITWIRE_HOOK_SOCKET";
/// Environment variable carrying the 64-byte authentication cookie.
pub const COOKIE_ENV: &str = "GITWIRE_HOOK_COOKIE";

/// Check that `fd` is a FIFO. Hooks are always spawned by git with pipes
/// on both ends; anything else means the client is being run by hand.
fn ensure_fifo(fd: RawFd, name: &'static str) -> HookResult<()> {
    let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
    let rc = unsafe { libc::fstat(fd, stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(HookError::Io(io::Error::last_os_error()));
    }
    let stat = unsafe { stat.assume_init() };
    if stat.st_mode & libc::S_IFMT != libc::S_IFIFO {
        return Err(HookError::NotAPipe(name));
    }
    Ok(())
}

/// Write the invocation preamble: cookie, argument count as little-endian
/// `u64`, NUL-terminated arguments, NUL-terminated environment entries,
/// and the empty entry terminating the environment block.
pub async fn write_invocation<W>(
    sink: &mut W,
    cookie: &[u8],
    args: &[OsString],
    env: &[(OsString, OsString)],
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(cookie).await?;
    sink.write_all(&(args.len() as u64).to_le_bytes()).await?;
    for arg in args {
        sink.write_all(arg.as_bytes()).await?;
        sink.write_all(b"\0").await?;
    }
    for (key, value) in env {
        sink.write_all(key.as_bytes()).await?;
        sink.write_all(b"=").await?;
        sink.write_all(value.as_bytes()).await?;
        sink.write_all(b"\0").await?;
    }
    sink.write_all(b"\0").await
}

/// Drive one full exchange over an already-connected stream: invocation
/// preamble, stdin until EOF, half-close, then the verdict byte and any
/// diagnostic text, which is copied to `diag_sink`. The daemon resetting
/// the connection mid-copy is not an error.
pub async fn exchange<S, D>(
    stream: UnixStream,
    cookie: &[u8],
    args: &[OsString],
    env: &[(OsString, OsString)],
    stdin: &mut S,
    diag_sink: &mut D,
) -> HookResult<u8>
where
    S: AsyncRead + Unpin,
    D: AsyncWrite + Unpin,
{
    let (mut read_half, mut write_half) = stream.into_split();

    write_invocation(&mut write_half, cookie, args, env).await?;
    tokio::io::copy(stdin, &mut write_half).await?;
    // Half-close tells the daemon stdin is complete.
    write_half.shutdown().await?;

    let mut status = [0u8; 1];
    match read_half.read_exact(&mut status).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(HookError::UnexpectedEof)
        }
        Err(e) => return Err(HookError::Io(e)),
    }

    match tokio::io::copy(&mut read_half, diag_sink).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {}
        Err(e) => return Err(HookError::Io(e)),
    }

    Ok(status[0])
}

/// Run one hook invocation against the daemon and return the exit status
/// the hook process should use.
///
/// Reads [`SOCKET_ENV`] and [`COOKIE_ENV`], then relays arguments, the
/// `GIT_` environment, and stdin, and waits for the verdict byte.
/// Diagnostic text after the verdict is copied to stderr.
pub async fn relay() -> HookResult<u8> {
    let socket_path =
        std::env::var_os(SOCKET_ENV).ok_or(HookError::MissingEnv(SOCKET_ENV))?;
    let cookie = std::env::var_os(COOKIE_ENV).ok_or(HookError::MissingEnv(COOKIE_ENV))?;
    let cookie = cookie.as_bytes();
    if cookie.len() != COOKIE_LEN {
        return Err(HookError::BadCookieLength(cookie.len()));
    }

    ensure_fifo(libc::STDIN_FILENO, "stdin")?;
    ensure_fifo(libc::STDERR_FILENO, "stderr")?;

    let args: Vec<OsString> = std::env::args_os().collect();
    let env: Vec<(OsString, OsString)> = std::env::vars_os()
        .filter(|(key, _)| key.as_bytes().starts_with(b"GIT_"))
        .collect();

    let stream = UnixStream::connect(&socket_path).await?;
    exchange(
        stream,
        cookie,
        &args,
        &env,
        &mut tokio::io::stdin(),
        &mut tokio::io::stderr(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_invocation_layout() {
        let cookie = [0x41u8; COOKIE_LEN];
        let args = vec![OsString::from("pre-receive"), OsString::from("extra")];
        let env = vec![(OsString::from("GIT_DIR"), OsString::from("/srv/r.git"))];

        let mut out = Vec::new();
        write_invocation(&mut out, &cookie, &args, &env)
            .await
            .unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&cookie);
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(b"pre-receive\0extra\0");
        expected.extend_from_slice(b"GIT_DIR=/srv/r.git\0");
        expected.push(0);
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_write_invocation_empty_env_still_terminated() {
        let cookie = [0u8; COOKIE_LEN];
        let mut out = Vec::new();
        write_invocation(&mut out, &cookie, &[], &[]).await.unwrap();
        assert_eq!(out.len(), COOKIE_LEN + 8 + 1);
        assert_eq!(*out.last().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_exchange_returns_daemon_status_and_diagnostics() {
        use crate::hook::{serve_hook_connection, HookRequest, HookResponse};

        let (client_stream, server_stream) = UnixStream::pair().unwrap();

        let handler = |req: HookRequest| async move {
            assert_eq!(
                req.args,
                vec![b"hook".to_vec(), b"ref1".to_vec(), b"ref2".to_vec()]
            );
            assert_eq!(req.env, vec![b"GIT_DIR=/tmp/repo.git".to_vec()]);
            assert!(req.stdin.is_empty());
            HookResponse::reject(3, &b"denied\n"[..])
        };
        let auth = |_cookie: &[u8]| true;
        let server_task = tokio::spawn(async move {
            serve_hook_connection(&auth, &handler, server_stream).await
        });

        let cookie = [0x61u8; COOKIE_LEN];
        let args = vec![
            OsString::from("hook"),
            OsString::from("ref1"),
            OsString::from("ref2"),
        ];
        let env = vec![(OsString::from("GIT_DIR"), OsString::from("/tmp/repo.git"))];

        let mut stdin = tokio::io::empty();
        let mut diag = Vec::new();
        let status = exchange(client_stream, &cookie, &args, &env, &mut stdin, &mut diag)
            .await
            .unwrap();

        assert_eq!(status, 3);
        assert_eq!(diag, b"denied\n");
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_exchange_eof_before_status_is_an_error() {
        let (client_stream, server_stream) = UnixStream::pair().unwrap();

        // Daemon that consumes the invocation and hangs up with no verdict.
        let server_task = tokio::spawn(async move {
            let (mut read_half, _write_half) = server_stream.into_split();
            let mut sink = Vec::new();
            read_half.read_to_end(&mut sink).await.unwrap();
        });

        let cookie = [0u8; COOKIE_LEN];
        let mut stdin = tokio::io::empty();
        let mut diag = Vec::new();
        let result = exchange(client_stream, &cookie, &[], &[], &mut stdin, &mut diag).await;

        assert!(matches!(result, Err(HookError::UnexpectedEof)));
        server_task.await.unwrap();
    }
}
