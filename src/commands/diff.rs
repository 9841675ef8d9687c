//! Patch and history commands (tags 5, 7, 8).

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{put_log_entry, MAX_HEX_LEN, MAX_PATH_LEN, STATUS_PROTOCOL};
use crate::codec::{WireReader, WireWriter};
use crate::engine::{EngineError, ObjectId, PatchInfo, Repository};
use crate::error::WireError;

/// Git version string used in the patch trailer.
const PATCH_SIGNATURE: &str = "2.48.1";

/// Assemble the mbox-style patch text for one commit. The leading `From`
/// line carries a fixed magic timestamp, matching `git format-patch`.
pub(crate) fn render_patch(info: &PatchInfo) -> Bytes {
    let mut out = BytesMut::new();
    out.extend_from_slice(
        format!(
            "From {} Mon Sep 17 00:00:00 2001\nFrom: {} <{}>\nDate: {}\nSubject: [PATCH] {}\n\n",
            info.id, info.author_name, info.author_email, info.date, info.title,
        )
        .as_bytes(),
    );
    if !info.body.is_empty() {
        out.extend_from_slice(info.body.as_bytes());
        out.extend_from_slice(b"\n");
    }
    out.extend_from_slice(b"---\n");
    out.extend_from_slice(info.stats.as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(info.patch.as_bytes());
    out.extend_from_slice(format!("\n-- \n{PATCH_SIGNATURE}\n").as_bytes());
    out.freeze()
}

/// A commit rendered as a `format-patch` style document (tag 5).
///
/// Request: commit id hex as sized data. Success response: status `0`
/// and the patch text as sized data. Errors: `14` malformed or missing
/// commit, `15` patch generation failed.
pub(crate) async fn format_patch<R, In, Out>(
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

    let info = match repo.format_patch(id) {
        Ok(i) => i,
        Err(EngineError::BadObjectId) | Err(EngineError::NotFound) => {
            return writer.put_uint(14).await
        }
        Err(_) => return writer.put_uint(15).await,
    };

    writer.put_uint(0).await?;
    writer.put_data(&render_patch(&info)).await
}

/// Nearest common ancestor of two commits (tag 7).
///
/// Request: two commit id hexes as sized data. Success response: status
/// `0` and the sized 20-byte ancestor id. Errors: `16` no common
/// ancestor, `17` malformed id or merge-base walk failed.
pub(crate) async fn merge_base<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let hex_a = match reader.get_data(MAX_HEX_LEN).await {
        Ok(h) => h,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let hex_b = match reader.get_data(MAX_HEX_LEN).await {
        Ok(h) => h,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let a = match ObjectId::from_hex(&String::from_utf8_lossy(&hex_a)) {
        Ok(id) => id,
        Err(_) => return writer.put_uint(17).await,
    };
    let b = match ObjectId::from_hex(&String::from_utf8_lossy(&hex_b)) {
        Ok(id) => id,
        Err(_) => return writer.put_uint(17).await,
    };

    match repo.merge_base(a, b) {
        Ok(base) => {
            writer.put_uint(0).await?;
            writer.put_data(base.as_bytes()).await
        }
        Err(EngineError::NotFound) => writer.put_uint(16).await,
        Err(_) => writer.put_uint(17).await,
    }
}

/// Commit history walk (tag 8).
///
/// Request: revision spec as sized data (empty means `HEAD`) and a limit
/// varuint (`0` means unlimited). Success response: status `0` followed
/// by one entry per commit in walk order; the peer reads entries until
/// the connection closes. Errors: `4` revision not resolvable, `9` walk
/// failed.
pub(crate) async fn log<R, In, Out>(
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    let spec = match reader.get_data(MAX_PATH_LEN).await {
        Ok(s) => s,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };
    let limit = match reader.get_uint().await {
        Ok(l) => l,
        Err(_) => return writer.put_uint(STATUS_PROTOCOL).await,
    };

    let spec = if spec.is_empty() {
        "HEAD".to_owned()
    } else {
        String::from_utf8_lossy(&spec).into_owned()
    };

    let entries = match repo.log(&spec, limit) {
        Ok(e) => e,
        Err(EngineError::BadObjectId) | Err(EngineError::NotFound) => {
            return writer.put_uint(4).await
        }
        Err(_) => return writer.put_uint(9).await,
    };

    writer.put_uint(0).await?;
    for entry in &entries {
        put_log_entry(writer, entry).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_patch_full() {
        let info = PatchInfo {
            id: ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap(),
            author_name: "Alice".into(),
            author_email: "alice@example.org".into(),
            date: "Thu, 1 Jan 2026 00:00:00 +0000".into(),
            title: "Add feature".into(),
            body: "Longer description.".into(),
            stats: " file.txt | 2 +-\n 1 file changed".into(),
            patch: "diff --git a/file.txt b/file.txt\n".into(),
        };
        let text = String::from_utf8(render_patch(&info).to_vec()).unwrap();
        assert!(text.starts_with(
            "From aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa Mon Sep 17 00:00:00 2001\n"
        ));
        assert!(text.contains("From: Alice <alice@example.org>\n"));
        assert!(text.contains("Subject: [PATCH] Add feature\n\nLonger description.\n---\n"));
        assert!(text.ends_with("\n-- \n2.48.1\n"));
    }

    #[test]
    fn test_render_patch_empty_body_skips_blank_line() {
        let info = PatchInfo {
            id: ObjectId::zero(),
            author_name: "A".into(),
            author_email: "a@b".into(),
            date: "d".into(),
            title: "t".into(),
            body: String::new(),
            stats: "s".into(),
            patch: "p".into(),
        };
        let text = String::from_utf8(render_patch(&info).to_vec()).unwrap();
        assert!(text.contains("Subject: [PATCH] t\n\n---\ns\np\n-- \n2.48.1\n"));
    }
}
