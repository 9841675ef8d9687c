//! Commit commands (tags 6, 12, 13).

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{MAX_BLOB_LEN, MAX_HEX_LEN, MAX_IDENT_LEN, STATUS_PROTOCOL};
use crate::codec::{WireReader, WireWriter};
use crate::engine::{
    CommitCreate, DiffLine, DiffOp, EngineError, ObjectId, Repository, Signature,
};
use crate::error::WireError;

/// One coalesced run of same-op diff lines.
#[derive(Debug, PartialEq)]
pub(crate) struct DiffChunk {
    pub op: DiffOp,
    pub content: Bytes,
}

/// Merge consecutive same-op lines of one hunk into chunks. Chunks never
/// span hunks. The accumulation buffer grows by amortized doubling and is
/// taken-and-reset at each op change.
pub(crate) fn coalesce_hunk(lines: &[DiffLine]) -> Vec<DiffChunk> {
    let mut chunks = Vec::new();
    let mut buf = BytesMut::new();
    let mut current: Option<DiffOp> = None;

    for line in lines {
        match current {
            Some(op) if op != line.op => {
                chunks.push(DiffChunk {
                    op,
                    content: buf.split().freeze(),
                });
                current = Some(line.op);
            }
            None => current = Some(line.op),
            _ => {}
        }
        buf.extend_from_slice(&line.content);
    }

    if let Some(op) = current {
        chunks.push(DiffChunk {
            op,
            content: buf.split().freeze(),
        });
    }
    chunks
}

fn lookup_status(err: &EngineError) -> u64 {
    match err {
        EngineError::BadObjectId | EngineError::NotFound => 14,
        _ => 15,
    }
}

/// Commit metadata with structured diff (tag 6).
///
/// Request: commit id hex as sized data. Success response: status `0`,
/// sized 20-byte id, author and committer (name, email as sized data,
/// when and offset as fixed i64), sized message, parent count plus sized
/// 20-byte parent ids, then the diff: file count, and per file from/to
/// mode varuints, from/to path sized data, chunk count, and per chunk an
/// op varuint (`0` context, `1` add, `2` delete) with sized content.
/// Errors: `14` malformed or missing commit, `15` diff failed.
pub(crate) async fn commit_info<R, In, Out>(
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
        Err(_) => return writer.put_uint(14).await,
    };

    let detail = match repo.commit_info(id) {
        Ok(d) => d,
        Err(e) => return writer.put_uint(lookup_status(&e)).await,
    };

    writer.put_uint(0).await?;
    writer.put_data(detail.id.as_bytes()).await?;
    put_signature(writer, &detail.author).await?;
    put_signature(writer, &detail.committer).await?;
    writer.put_data(detail.message.as_bytes()).await?;

    writer.put_uint(detail.parents.len() as u64).await?;
    for parent in &detail.parents {
        writer.put_data(parent.as_bytes()).await?;
    }

    writer.put_uint(detail.diff.len() as u64).await?;
    for file in &detail.diff {
        writer.put_uint(file.from_mode).await?;
        writer.put_uint(file.to_mode).await?;
        writer.put_data(file.from_path.as_bytes()).await?;
        writer.put_data(file.to_path.as_bytes()).await?;

        let chunked: Vec<Vec<DiffChunk>> =
            file.hunks.iter().map(|hunk| coalesce_hunk(hunk)).collect();
        let count: usize = chunked.iter().map(Vec::len).sum();
        writer.put_uint(count as u64).await?;
        for chunk in chunked.iter().flatten() {
            writer.put_uint(chunk.op.tag()).await?;
            writer.put_data(&chunk.content).await?;
        }
    }
    Ok(())
}

async fn put_signature<Out: AsyncWrite + Unpin>(
    writer: &mut WireWriter<Out>,
    sig: &Signature,
) -> Result<(), WireError> {
    writer.put_data(sig.name.as_bytes()).await?;
    writer.put_data(sig.email.as_bytes()).await?;
    writer.put_i64(sig.when).await?;
    writer.put_i64(sig.tz_offset).await
}

/// The tree id of a commit (tag 12).
///
/// Request: commit id hex as sized data. Success response: status `0` and
/// the sized 20-byte tree id. Errors: `14` malformed or missing commit.
pub(crate) async fn commit_tree_oid<R, In, Out>(
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
        Err(_) => return writer.put_uint(14).await,
    };

    match repo.commit_tree_oid(id) {
        Ok(tree) => {
            writer.put_uint(0).await?;
            writer.put_data(tree.as_bytes()).await
        }
        Err(_) => writer.put_uint(14).await,
    }
}

/// Create a commit object (tag 13).
///
/// Request: tree id hex as sized data, parent count plus parent id hex
/// sized data each, author name and email as sized data, when and
/// timezone offset as fixed i64, then the message as a size varuint
/// followed by that many raw bytes. Success response: status `0` and the
/// new commit's sized 20-byte id. Errors: `15` malformed tree/parent id
/// or payload over the allocation bound, `19` commit creation failed.
pub(crate) async fn create_commit<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let tree_hex = match reader.get_data(MAX_HEX_LEN).await {
        Ok(h) => h,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let tree = match ObjectId::from_hex(&String::from_utf8_lossy(&tree_hex)) {
        Ok(id) => id,
        Err(_) => return writer.put_uint(15).await,
    };

    let parent_count = match reader.get_uint().await {
        Ok(c) => c,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let mut parents = Vec::new();
    for _ in 0..parent_count {
        let hex = match reader.get_data(MAX_HEX_LEN).await {
            Ok(h) => h,
            Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
        };
        match ObjectId::from_hex(&String::from_utf8_lossy(&hex)) {
            Ok(id) => parents.push(id),
            Err(_) => return writer.put_uint(15).await,
        }
    }

    let name = match reader.get_data(MAX_IDENT_LEN).await {
        Ok(n) => n,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let email = match reader.get_data(MAX_IDENT_LEN).await {
        Ok(e) => e,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let when = match reader.get_i64().await {
        Ok(w) => w,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let tz_offset = match reader.get_i64().await {
        Ok(t) => t,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };

    let message_len = match reader.get_uint().await {
        Ok(l) => l,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    if message_len > MAX_BLOB_LEN {
        return writer.put_uint(15).await;
    }
    let mut message = vec![0u8; message_len as usize];
    if reader.get_fixed(&mut message).await.is_err() {
        return writer.put_uint(STATUS_PROTOCOL).await;
    }

    let request = CommitCreate {
        tree,
        parents,
        author: Signature {
            name: String::from_utf8_lossy(&name).into_owned(),
            email: String::from_utf8_lossy(&email).into_owned(),
            when,
            tz_offset,
        },
        message,
    };

    match repo.create_commit(&request) {
        Ok(id) => {
            writer.put_uint(0).await?;
            writer.put_data(id.as_bytes()).await
        }
        Err(EngineError::Engine(_)) => writer.put_uint(19).await,
        Err(_) => writer.put_uint(15).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(op: DiffOp, content: &str) -> DiffLine {
        DiffLine {
            op,
            content: Bytes::copy_from_slice(content.as_bytes()),
        }
    }

    #[test]
    fn test_coalesce_empty_hunk() {
        assert!(coalesce_hunk(&[]).is_empty());
    }

    #[test]
    fn test_coalesce_single_run() {
        let chunks = coalesce_hunk(&[line(DiffOp::Add, "a\n"), line(DiffOp::Add, "b\n")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].op, DiffOp::Add);
        assert_eq!(&chunks[0].content[..], b"a\nb\n");
    }

    #[test]
    fn test_coalesce_alternating_ops() {
        let chunks = coalesce_hunk(&[
            line(DiffOp::Context, "ctx\n"),
            line(DiffOp::Del, "old\n"),
            line(DiffOp::Del, "older\n"),
            line(DiffOp::Add, "new\n"),
            line(DiffOp::Context, "tail\n"),
        ]);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].op, DiffOp::Context);
        assert_eq!(&chunks[1].content[..], b"old\nolder\n");
        assert_eq!(chunks[2].op, DiffOp::Add);
        assert_eq!(&chunks[3].content[..], b"tail\n");
    }

    #[test]
    fn test_lookup_status_mapping() {
        assert_eq!(lookup_status(&EngineError::BadObjectId), 14);
        assert_eq!(lookup_status(&EngineError::NotFound), 14);
        assert_eq!(lookup_status(&EngineError::Engine("diff".into())), 15);
    }
}
