//! Daemon side of the hook relay.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use super::{HookHandler, HookRequest, HookResult, COOKIE_LEN};
use crate::error::HookError;

/// Cookie check for incoming relay connections.
pub trait HookAuth: Send + Sync + 'static {
    fn authorize(&self, cookie: &[u8]) -> bool;
}

impl<F> HookAuth for F
where
    F: Fn(&[u8]) -> bool + Send + Sync + 'static,
{
    fn authorize(&self, cookie: &[u8]) -> bool {
        self(cookie)
    }
}

/// Read one NUL-terminated entry, without the terminator. EOF before the
/// terminator is a truncated invocation.
async fn read_entry<R: AsyncBufRead + Unpin>(reader: &mut R) -> HookResult<Vec<u8>> {
    let mut entry = Vec::new();
    reader.read_until(0, &mut entry).await?;
    if entry.pop() != Some(0) {
        return Err(HookError::UnexpectedEof);
    }
    Ok(entry)
}

/// Serve one relay connection: decode the invocation, consult the
/// handler, and write the verdict.
///
/// An unauthorized cookie gets status `1` with a short diagnostic and no
/// handler call. The invocation's stdin runs until the client half-closes
/// its side.
pub async fn serve_hook_connection<A, H>(
    auth: &A,
    handler: &H,
    stream: UnixStream,
) -> HookResult<()>
where
    A: HookAuth,
    H: HookHandler,
{
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut cookie = vec![0u8; COOKIE_LEN];
    reader.read_exact(&mut cookie).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            HookError::UnexpectedEof
        } else {
            HookError::Io(e)
        }
    })?;

    if !auth.authorize(&cookie) {
        write_half.write_all(&[1]).await?;
        write_half.write_all(b"internal error: invalid cookie\n").await?;
        return Ok(());
    }

    let mut argc_bytes = [0u8; 8];
    reader.read_exact(&mut argc_bytes).await?;
    let argc = u64::from_le_bytes(argc_bytes);

    // argc comes off the wire; never size an allocation from it. A bogus
    // count just runs the entry reader into EOF.
    let mut args = Vec::new();
    for _ in 0..argc {
        args.push(read_entry(&mut reader).await?);
    }

    let mut env = Vec::new();
    loop {
        let entry = read_entry(&mut reader).await?;
        if entry.is_empty() {
            break;
        }
        env.push(entry);
    }

    let mut stdin = Vec::new();
    reader.read_to_end(&mut stdin).await?;

    let response = handler
        .call(HookRequest {
            cookie,
            args,
            env,
            stdin,
        })
        .await;

    write_half.write_all(&[response.status]).await?;
    if !response.diagnostics.is_empty() {
        write_half.write_all(&response.diagnostics).await?;
    }
    Ok(())
}

/// Accept relay connections forever, one detached task per connection.
pub async fn serve_hooks<A, H>(listener: UnixListener, auth: Arc<A>, handler: Arc<H>)
where
    A: HookAuth,
    H: HookHandler,
{
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let auth = Arc::clone(&auth);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Err(e) = serve_hook_connection(auth.as_ref(), handler.as_ref(), stream).await
                    {
                        tracing::debug!(error = %e, "hook connection failed");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "hook accept failed");
            }
        }
    }
}
