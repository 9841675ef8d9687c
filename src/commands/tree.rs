//! Tree and blob commands (tags 2, 9, 10, 11).

use tokio::io::{AsyncRead, AsyncWrite};

use super::{MAX_BLOB_LEN, MAX_HEX_LEN, MAX_PATH_LEN, STATUS_PROTOCOL};
use crate::codec::{WireReader, WireWriter};
use crate::engine::{
    EngineError, ObjectId, Repository, TreePayload, TreeWriteEntry, OBJECT_ID_LEN,
};
use crate::error::WireError;

/// Raw lookup by path in the head tree (tag 2).
///
/// Request: path as sized data (empty selects the root tree). Success
/// response: status `0`, a kind varuint (`1` tree, `2` blob), then either
/// the entry list (count, then per entry kind/mode/size varuints and a
/// sized name) or the blob content as sized data. Errors: `3` path not in
/// tree, `4` no head tree, `7` object load failed, `8` content unavailable.
pub(crate) async fn tree_raw<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let path = match reader.get_data(MAX_PATH_LEN).await {
        Ok(p) => p,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let path = String::from_utf8_lossy(&path).into_owned();

    let payload = match repo.tree_by_path(&path) {
        Ok(p) => p,
        Err(e) => {
            let status = match e {
                EngineError::NotFound => 3,
                EngineError::BadObjectId => 4,
                EngineError::Resource => 8,
                EngineError::WrongType | EngineError::Engine(_) => 7,
            };
            return writer.put_uint(status).await;
        }
    };

    writer.put_uint(0).await?;
    match payload {
        TreePayload::Tree(entries) => {
            writer.put_uint(1).await?;
            writer.put_uint(entries.len() as u64).await?;
            for entry in &entries {
                writer.put_uint(entry.kind.tag()).await?;
                writer.put_uint(entry.mode).await?;
                writer.put_uint(entry.size).await?;
                writer.put_data(entry.name.as_bytes()).await?;
            }
        }
        TreePayload::Blob(content) => {
            writer.put_uint(2).await?;
            writer.put_data(&content).await?;
        }
    }
    Ok(())
}

/// Tree listing by tree object id (tag 9).
///
/// Request: tree id as hex sized data. Success response: status `0`,
/// entry count, then per entry a mode varuint, sized name, and sized
/// 20-byte id. Errors: `4` malformed or missing tree id.
pub(crate) async fn tree_list_by_oid<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let hex = match reader.get_data(MAX_HEX_LEN).await {
        Ok(h) => h,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let id = match ObjectId::from_hex(&String::from_utf8_lossy(&hex)) {
        Ok(id) => id,
        Err(_) => return writer.put_uint(4).await,
    };

    let entries = match repo.tree_by_oid(id) {
        Ok(entries) => entries,
        Err(_) => return writer.put_uint(4).await,
    };

    writer.put_uint(0).await?;
    writer.put_uint(entries.len() as u64).await?;
    for entry in &entries {
        writer.put_uint(entry.mode).await?;
        writer.put_data(entry.name.as_bytes()).await?;
        writer.put_data(entry.id.as_bytes()).await?;
    }
    Ok(())
}

/// Build and write a tree object (tag 10).
///
/// Request: entry count, then per entry a mode varuint, sized name, and a
/// fixed (unprefixed) 20-byte id. Success response: status `0` and the new
/// tree's sized 20-byte id. Errors: `15` tree build failed.
pub(crate) async fn write_tree<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let count = match reader.get_uint().await {
        Ok(c) => c,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };

    let mut entries = Vec::new();
    for _ in 0..count {
        let mode = match reader.get_uint().await {
            Ok(m) => m,
            Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
        };
        let name = match reader.get_data(MAX_PATH_LEN).await {
            Ok(n) => n,
            Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
        };
        let mut raw = [0u8; OBJECT_ID_LEN];
        if reader.get_fixed(&mut raw).await.is_err() {
            return writer.put_uint(STATUS_PROTOCOL).await;
        }
        entries.push(TreeWriteEntry {
            mode,
            name: String::from_utf8_lossy(&name).into_owned(),
            id: ObjectId(raw),
        });
    }

    match repo.write_tree(&entries) {
        Ok(id) => {
            writer.put_uint(0).await?;
            writer.put_data(id.as_bytes()).await
        }
        Err(_) => writer.put_uint(15).await,
    }
}

/// Write a blob object (tag 11).
///
/// Request: size varuint followed by that many raw (unprefixed) bytes.
/// Success response: status `0` and the blob's sized 20-byte id. Errors:
/// `15` blob creation failed or payload over the allocation bound.
pub(crate) async fn write_blob<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let size = match reader.get_uint().await {
        Ok(s) => s,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    if size > MAX_BLOB_LEN {
        return writer.put_uint(15).await;
    }

    let mut data = vec![0u8; size as usize];
    if reader.get_fixed(&mut data).await.is_err() {
        return writer.put_uint(STATUS_PROTOCOL).await;
    }

    match repo.write_blob(&data) {
        Ok(id) => {
            writer.put_uint(0).await?;
            writer.put_data(id.as_bytes()).await
        }
        Err(_) => writer.put_uint(15).await,
    }
}
