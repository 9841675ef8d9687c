//! Per-connection session: one frame cycle, then close.
//!
//! A session reads the repository path, reads the command tag, runs
//! exactly one command, and ends. Keeping connections single-shot means
//! no per-connection command state survives a request and a misbehaving
//! peer can never wedge a handle open.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::UnixStream;

use crate::codec::{WireReader, WireWriter};
use crate::commands::{self, Command, CMD_INIT_REPO};
use crate::engine::RepositoryEngine;
use crate::error::WireError;

/// Opening the repository at the session path failed.
const STATUS_OPEN_FAILED: u64 = 1;
/// The command tag could not be read.
const STATUS_BAD_COMMAND: u64 = 2;
/// The tag is zero or not in the registry.
const STATUS_UNKNOWN_COMMAND: u64 = 3;

/// Drive one connection from accept to close.
///
/// Errors never propagate to the caller: anything the peer should know
/// about is written as a status value, and transport failures just end
/// the session. The connection closes when this returns.
pub(crate) async fn run_session<E: RepositoryEngine>(
    engine: Arc<E>,
    stream: UnixStream,
    max_path_len: usize,
) {
    if let Err(e) = serve(engine, stream, max_path_len).await {
        tracing::debug!(error = %e, "session ended with transport error");
    }
}

async fn serve<E: RepositoryEngine>(
    engine: Arc<E>,
    stream: UnixStream,
    max_path_len: usize,
) -> Result<(), WireError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = WireReader::new(read_half);
    let mut writer = WireWriter::new(write_half);

    // A peer that cannot even send a path gets nothing back.
    let path_bytes = reader.get_data(max_path_len).await?;
    let path = PathBuf::from(OsString::from_vec(path_bytes));

    let tag = match reader.get_uint().await {
        Ok(t) => t,
        Err(_) => return writer.put_uint(STATUS_BAD_COMMAND).await,
    };

    // The init tag runs before any open: its path names a repository
    // that does not exist yet.
    if tag == CMD_INIT_REPO {
        return commands::init::init_repo(engine.as_ref(), &path, &mut reader, &mut writer).await;
    }

    let command = match Command::from_tag(tag) {
        Some(c) => c,
        None => return writer.put_uint(STATUS_UNKNOWN_COMMAND).await,
    };

    let repo = match engine.open(&path) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "repository open failed");
            return writer.put_uint(STATUS_OPEN_FAILED).await;
        }
    };

    commands::dispatch(command, &repo, &mut reader, &mut writer).await
}
