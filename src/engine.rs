//! Repository engine capability.
//!
//! The daemon does not inspect or mutate repositories itself; every command
//! handler calls into an implementation of [`RepositoryEngine`] supplied at
//! server construction. The engine is created once before the accept loop
//! starts, shared by handle, and torn down when the server is dropped;
//! per-session repository opens are independent and never pooled.
//!
//! All operations are fallible and synchronous: engine work is local object
//! database access, and sessions own their repository handle exclusively.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

/// Raw length of an object identifier on the wire.
pub const OBJECT_ID_LEN: usize = 20;

/// A raw 20-byte object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectId(pub [u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// The all-zero id, used as a placeholder for unresolvable parents.
    pub const fn zero() -> Self {
        Self([0; OBJECT_ID_LEN])
    }

    /// Parse a 40-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, EngineError> {
        let hex = hex.as_bytes();
        if hex.len() != OBJECT_ID_LEN * 2 {
            return Err(EngineError::BadObjectId);
        }

        let mut raw = [0u8; OBJECT_ID_LEN];
        for (i, byte) in raw.iter_mut().enumerate() {
            let hi = hex_nibble(hex[i * 2]).ok_or(EngineError::BadObjectId)?;
            let lo = hex_nibble(hex[i * 2 + 1]).ok_or(EngineError::BadObjectId)?;
            *byte = hi << 4 | lo;
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

/// Closed failure set reported by engine operations.
///
/// Command handlers map these onto their own wire status values; error
/// codes on the wire are a per-command contract, not a global one.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An object id could not be parsed.
    #[error("malformed object id")]
    BadObjectId,

    /// The named object, reference, or path does not exist.
    #[error("object not found")]
    NotFound,

    /// The object exists but has the wrong type for the operation.
    #[error("unexpected object type")]
    WrongType,

    /// Allocation or other resource exhaustion inside the engine.
    #[error("out of resources")]
    Resource,

    /// Any other engine-internal failure.
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Failure stages of repository initialization. Each stage maps to a
/// distinct wire status so a caller can tell how far setup got.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("creating repository directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("initializing repository: {0}")]
    Init(String),

    #[error("opening repository config: {0}")]
    ConfigOpen(String),

    #[error("setting core.hooksPath: {0}")]
    HooksPath(String),

    #[error("setting receive.advertisePushOptions: {0}")]
    PushOptions(String),
}

/// Author or committer identity with timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Seconds since the Unix epoch.
    pub when: i64,
    /// Timezone offset in minutes from UTC.
    pub tz_offset: i64,
}

/// One commit in a log or index listing. Dates are preformatted by the
/// engine; the wire carries them as strings.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: ObjectId,
    pub title: String,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
}

/// Repository front-page summary: README content plus recent commits.
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub readme: Bytes,
    pub commits: Vec<LogEntry>,
}

/// Kind tag for a node in a path-addressed tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Unknown,
    Tree,
    Blob,
}

impl NodeKind {
    pub fn tag(self) -> u64 {
        match self {
            NodeKind::Unknown => 0,
            NodeKind::Tree => 1,
            NodeKind::Blob => 2,
        }
    }
}

/// One entry of a path-addressed tree listing.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub mode: u64,
    /// Blob size in bytes; zero for subtrees.
    pub size: u64,
    pub name: String,
}

/// Result of looking a path up in the head tree.
#[derive(Debug, Clone)]
pub enum TreePayload {
    Tree(Vec<TreeNode>),
    Blob(Bytes),
}

/// One entry of an id-addressed tree listing.
#[derive(Debug, Clone)]
pub struct TreeListEntry {
    pub mode: u64,
    pub name: String,
    pub id: ObjectId,
}

/// One entry to insert when building a tree object.
#[derive(Debug, Clone)]
pub struct TreeWriteEntry {
    pub mode: u64,
    pub name: String,
    pub id: ObjectId,
}

/// Line operation inside a diff hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Context,
    Add,
    Del,
}

impl DiffOp {
    pub fn tag(self) -> u64 {
        match self {
            DiffOp::Context => 0,
            DiffOp::Add => 1,
            DiffOp::Del => 2,
        }
    }
}

/// One line of a diff hunk, content verbatim including the newline.
#[derive(Debug, Clone)]
pub struct DiffLine {
    pub op: DiffOp,
    pub content: Bytes,
}

/// Per-file diff: modes, paths, and hunks of lines. Handlers coalesce
/// consecutive same-op lines into wire chunks.
#[derive(Debug, Clone)]
pub struct DiffFile {
    pub from_mode: u64,
    pub to_mode: u64,
    pub from_path: String,
    pub to_path: String,
    pub hunks: Vec<Vec<DiffLine>>,
}

/// Full commit metadata with the structured diff against the first parent.
#[derive(Debug, Clone)]
pub struct CommitDetail {
    pub id: ObjectId,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    pub parents: Vec<ObjectId>,
    pub diff: Vec<DiffFile>,
}

/// Raw material for one mailbox-format patch. The handler assembles the
/// actual message around these parts.
#[derive(Debug, Clone)]
pub struct PatchInfo {
    pub id: ObjectId,
    pub author_name: String,
    pub author_email: String,
    /// RFC-2822 style date string for the patch header.
    pub date: String,
    pub title: String,
    pub body: String,
    pub stats: String,
    pub patch: String,
}

/// Reference kind selector for [`Repository::resolve_ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// The repository head.
    Head,
    /// A raw commit id, parsed rather than looked up.
    Commit,
    /// A local branch name under `refs/heads/`.
    Branch,
    /// A tag name under `refs/tags/`, peeled to a commit.
    Tag,
}

impl RefKind {
    /// Parse the wire selector: empty means head.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "" => Some(RefKind::Head),
            "commit" => Some(RefKind::Commit),
            "branch" => Some(RefKind::Branch),
            "tag" => Some(RefKind::Tag),
            _ => None,
        }
    }
}

/// Everything needed to create a commit object.
#[derive(Debug, Clone)]
pub struct CommitCreate {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    /// Raw message bytes, not required to be UTF-8.
    pub message: Vec<u8>,
}

/// One open repository. Sessions own their handle exclusively for the
/// lifetime of one request/response exchange; the handle is borrowed
/// across await points inside a spawned task, so it must also be `Sync`.
pub trait Repository: Send + Sync {
    fn index_summary(&self) -> Result<IndexSummary, EngineError>;
    fn tree_by_path(&self, path: &str) -> Result<TreePayload, EngineError>;
    fn resolve_ref(&self, kind: RefKind, name: &str) -> Result<ObjectId, EngineError>;
    fn list_branches(&self) -> Result<Vec<String>, EngineError>;
    fn format_patch(&self, id: ObjectId) -> Result<PatchInfo, EngineError>;
    fn commit_info(&self, id: ObjectId) -> Result<CommitDetail, EngineError>;
    fn merge_base(&self, a: ObjectId, b: ObjectId) -> Result<ObjectId, EngineError>;
    fn log(&self, spec: &str, limit: u64) -> Result<Vec<LogEntry>, EngineError>;
    fn tree_by_oid(&self, id: ObjectId) -> Result<Vec<TreeListEntry>, EngineError>;
    fn write_tree(&self, entries: &[TreeWriteEntry]) -> Result<ObjectId, EngineError>;
    fn write_blob(&self, bytes: &[u8]) -> Result<ObjectId, EngineError>;
    fn commit_tree_oid(&self, id: ObjectId) -> Result<ObjectId, EngineError>;
    fn create_commit(&self, req: &CommitCreate) -> Result<ObjectId, EngineError>;
    fn update_ref(&self, name: &str, id: ObjectId) -> Result<(), EngineError>;
}

/// Factory for repository handles, plus repository initialization.
pub trait RepositoryEngine: Send + Sync + 'static {
    type Repo: Repository;

    /// Open an existing repository at `path`. No search upward, bare only.
    fn open(&self, path: &Path) -> Result<Self::Repo, EngineError>;

    /// Create a bare repository at `path` configured to run hooks from
    /// `hooks_path`.
    fn init_repo(&self, path: &Path, hooks_path: &Path) -> Result<(), InitError>;
}
