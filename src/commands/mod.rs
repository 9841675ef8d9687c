//! Command registry: tag table, request bounds, and dispatch.
//!
//! The registry is closed and append-only; tags are stable small integers.
//! Each handler reads its own request fields, writes the response status
//! field itself, and then writes the result fields. Engine failures become
//! a per-command status value and an `Ok` return (the session closes after
//! one frame cycle either way); only transport failures propagate as `Err`.

pub(crate) mod commit;
pub(crate) mod diff;
pub(crate) mod index;
pub(crate) mod init;
pub(crate) mod refs;
pub(crate) mod tree;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{WireReader, WireWriter};
use crate::engine::{LogEntry, Repository};
use crate::error::WireError;

/// Repository front-page summary.
pub const CMD_INDEX: u64 = 1;
/// Raw tree or blob lookup by path in the head tree.
pub const CMD_TREE_RAW: u64 = 2;
/// Resolve a reference to a commit id.
pub const CMD_RESOLVE_REF: u64 = 3;
/// List local branch names.
pub const CMD_LIST_BRANCHES: u64 = 4;
/// Assemble a mailbox-format patch for one commit.
pub const CMD_FORMAT_PATCH: u64 = 5;
/// Commit metadata with structured diff.
pub const CMD_COMMIT_INFO: u64 = 6;
/// Merge base of two commits.
pub const CMD_MERGE_BASE: u64 = 7;
/// Commit log from a revspec.
pub const CMD_LOG: u64 = 8;
/// Tree listing by tree object id.
pub const CMD_TREE_LIST_BY_OID: u64 = 9;
/// Build and write a tree object.
pub const CMD_WRITE_TREE: u64 = 10;
/// Write a blob object.
pub const CMD_WRITE_BLOB: u64 = 11;
/// The tree id of a commit.
pub const CMD_COMMIT_TREE_OID: u64 = 12;
/// Create a commit object.
pub const CMD_COMMIT_CREATE: u64 = 13;
/// Create or update a reference.
pub const CMD_UPDATE_REF: u64 = 14;
/// Reserved: initialize a repository at the session path instead of
/// opening an existing one.
pub const CMD_INIT_REPO: u64 = 15;

/// Bound on path-like request fields (repository paths, tree paths, ref
/// names, revspecs).
pub(crate) const MAX_PATH_LEN: usize = 4095;
/// Bound on hex-encoded object id fields.
pub(crate) const MAX_HEX_LEN: usize = 63;
/// Bound on the reference-kind selector.
pub(crate) const MAX_REF_KIND_LEN: usize = 31;
/// Bound on author/committer name and email fields.
pub(crate) const MAX_IDENT_LEN: usize = 511;
/// Bound on blob and commit-message payloads (1 GiB).
pub(crate) const MAX_BLOB_LEN: u64 = 1 << 30;

/// Status written when a command's own request body cannot be decoded.
/// Shared across commands; all other status values are per-command.
pub(crate) const STATUS_PROTOCOL: u64 = 11;

/// A recognized command tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Index,
    TreeRaw,
    ResolveRef,
    ListBranches,
    FormatPatch,
    CommitInfo,
    MergeBase,
    Log,
    TreeListByOid,
    WriteTree,
    WriteBlob,
    CommitTreeOid,
    CommitCreate,
    UpdateRef,
}

impl Command {
    /// Map a wire tag to a command. Tag 0, the init tag, and anything
    /// unregistered return `None`.
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            CMD_INDEX => Some(Command::Index),
            CMD_TREE_RAW => Some(Command::TreeRaw),
            CMD_RESOLVE_REF => Some(Command::ResolveRef),
            CMD_LIST_BRANCHES => Some(Command::ListBranches),
            CMD_FORMAT_PATCH => Some(Command::FormatPatch),
            CMD_COMMIT_INFO => Some(Command::CommitInfo),
            CMD_MERGE_BASE => Some(Command::MergeBase),
            CMD_LOG => Some(Command::Log),
            CMD_TREE_LIST_BY_OID => Some(Command::TreeListByOid),
            CMD_WRITE_TREE => Some(Command::WriteTree),
            CMD_WRITE_BLOB => Some(Command::WriteBlob),
            CMD_COMMIT_TREE_OID => Some(Command::CommitTreeOid),
            CMD_COMMIT_CREATE => Some(Command::CommitCreate),
            CMD_UPDATE_REF => Some(Command::UpdateRef),
            _ => None,
        }
    }

    pub fn tag(self) -> u64 {
        match self {
            Command::Index => CMD_INDEX,
            Command::TreeRaw => CMD_TREE_RAW,
            Command::ResolveRef => CMD_RESOLVE_REF,
            Command::ListBranches => CMD_LIST_BRANCHES,
            Command::FormatPatch => CMD_FORMAT_PATCH,
            Command::CommitInfo => CMD_COMMIT_INFO,
            Command::MergeBase => CMD_MERGE_BASE,
            Command::Log => CMD_LOG,
            Command::TreeListByOid => CMD_TREE_LIST_BY_OID,
            Command::WriteTree => CMD_WRITE_TREE,
            Command::WriteBlob => CMD_WRITE_BLOB,
            Command::CommitTreeOid => CMD_COMMIT_TREE_OID,
            Command::CommitCreate => CMD_COMMIT_CREATE,
            Command::UpdateRef => CMD_UPDATE_REF,
        }
    }
}

/// Run one command against an open repository.
pub(crate) async fn dispatch<R, In, Out>(
    command: Command,
    repo: &R,
    reader: &mut WireReader<In>,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    In: AsyncRead + Unpin,
    Out: AsyncWrite + Unpin,
{
    match command {
        Command::Index => index::index_summary(repo, writer).await,
        Command::TreeRaw => tree::tree_raw(repo, reader, writer).await,
        Command::ResolveRef => refs::resolve_ref(repo, reader, writer).await,
        Command::ListBranches => refs::list_branches(repo, writer).await,
        Command::FormatPatch => diff::format_patch(repo, reader, writer).await,
        Command::CommitInfo => commit::commit_info(repo, reader, writer).await,
        Command::MergeBase => diff::merge_base(repo, reader, writer).await,
        Command::Log => diff::log(repo, reader, writer).await,
        Command::TreeListByOid => tree::tree_list_by_oid(repo, reader, writer).await,
        Command::WriteTree => tree::write_tree(repo, reader, writer).await,
        Command::WriteBlob => tree::write_blob(repo, reader, writer).await,
        Command::CommitTreeOid => commit::commit_tree_oid(repo, reader, writer).await,
        Command::CommitCreate => commit::create_commit(repo, reader, writer).await,
        Command::UpdateRef => refs::update_ref(repo, reader, writer).await,
    }
}

/// Write one log entry: sized id, title, author name, author email, date.
pub(crate) async fn put_log_entry<Out: AsyncWrite + Unpin>(
    writer: &mut WireWriter<Out>,
    entry: &LogEntry,
) -> Result<(), WireError> {
    writer.put_data(entry.id.as_bytes()).await?;
    writer.put_data(entry.title.as_bytes()).await?;
    writer.put_data(entry.author_name.as_bytes()).await?;
    writer.put_data(entry.author_email.as_bytes()).await?;
    writer.put_data(entry.date.as_bytes()).await
}
