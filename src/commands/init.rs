//! Repository initialization (reserved tag 15).
//!
//! The only command that runs without opening a repository first: the
//! session path names a directory that does not exist yet.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite};

use super::{MAX_PATH_LEN, STATUS_PROTOCOL};
use crate::codec::{WireReader, WireWriter};
use crate::engine::{InitError, RepositoryEngine};
use crate::error::WireError;

fn init_status(err: &InitError) -> u64 {
    match err {
        InitError::CreateDir(_) => 24,
        InitError::Init(_) => 20,
        InitError::ConfigOpen(_) => 21,
        InitError::HooksPath(_) => 22,
        InitError::PushOptions(_) => 23,
    }
}

/// Create a bare repository at the session path.
///
/// Request: hooks directory path as sized data. Success response: status
/// `0`. Errors report how far setup got: `24` directory creation, `20`
/// repository init, `21` config open, `22` hooks path, `23` push-option
/// advertisement.
pub(crate) async fn init_repo<E, In, Out>(
    engine: &E,
    path: &Path,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    E: RepositoryEngine,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let hooks = match reader.get_data(MAX_PATH_LEN).await {
        Ok(h) => h,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let hooks_path = PathBuf::from(OsString::from_vec(hooks));

    match engine.init_repo(path, &hooks_path) {
        Ok(()) => writer.put_uint(0).await,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "repository init failed");
            writer.put_uint(init_status(&e)).await
        }
    }
}
