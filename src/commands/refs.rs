//! Reference commands (tags 3, 4, 14).

use tokio::io::{AsyncRead, AsyncWrite};

use super::{MAX_HEX_LEN, MAX_PATH_LEN, MAX_REF_KIND_LEN, STATUS_PROTOCOL};
use crate::codec::{WireReader, WireWriter};
use crate::engine::{ObjectId, RefKind, Repository};
use crate::error::WireError;

/// Resolve a reference to a commit id (tag 3).
///
/// Request: kind selector as sized data (`""`, `"commit"`, `"branch"`,
/// `"tag"`), then the name as sized data. Success response: status `0`
/// and the sized 20-byte id. Errors: `12` unknown kind or resolution
/// failed.
pub(crate) async fn resolve_ref<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let kind = match reader.get_data(MAX_REF_KIND_LEN).await {
        Ok(k) => k,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let name = match reader.get_data(MAX_PATH_LEN).await {
        Ok(n) => n,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };

    let Some(kind) = RefKind::parse(&String::from_utf8_lossy(&kind)) else {
        return writer.put_uint(12).await;
    };

    match repo.resolve_ref(kind, &String::from_utf8_lossy(&name)) {
        Ok(id) => {
            writer.put_uint(0).await?;
            writer.put_data(id.as_bytes()).await
        }
        Err(_) => writer.put_uint(12).await,
    }
}

/// List local branch names (tag 4).
///
/// No request body. Success response: status `0`, branch count, then each
/// name as sized data. Errors: `13` branch iteration failed.
pub(crate) async fn list_branches<R, Out>(
    repo: &R,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    Out: AsyncWrite + Unpin,
{
    let branches = match repo.list_branches() {
        Ok(b) => b,
        Err(_) => return writer.put_uint(13).await,
    };

    writer.put_uint(0).await?;
    writer.put_uint(branches.len() as u64).await?;
    for name in &branches {
        writer.put_data(name.as_bytes()).await?;
    }
    Ok(())
}

/// Create or update a reference (tag 14).
///
/// Request: full reference name and a commit id hex, both sized data.
/// Success response: status `0`, no fields. Errors: `18` malformed id or
/// update failed.
pub(crate) async fn update_ref<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let name = match reader.get_data(MAX_PATH_LEN).await {
        Ok(n) => n,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let hex = match reader.get_data(MAX_HEX_LEN).await {
        Ok(h) => h,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };

    let id = match ObjectId::from_hex(&String::from_utf8_lossy(&hex)) {
        Ok(id) => id,
        Err(_) => return writer.put_uint(18).await,
    };

    match repo.update_ref(&String::from_utf8_lossy(&name), id) {
        Ok(()) => writer.put_uint(0).await,
        Err(_) => writer.put_uint(18).await,
    }
}
