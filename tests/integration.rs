//! End-to-end tests over real Unix sockets: an in-memory engine behind a
//! running server, exercised by a hand-rolled peer using the public codec.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;

use gitwire::codec::{WireReader, WireWriter};
use gitwire::engine::{
    CommitCreate, CommitDetail, EngineError, IndexSummary, InitError, LogEntry, ObjectId,
    PatchInfo, RefKind, Repository, RepositoryEngine, TreeListEntry, TreePayload, TreeWriteEntry,
};
use gitwire::Server;

const REPO_PATH: &str = "/srv/git/demo.git";

fn oid(fill: u8) -> ObjectId {
    ObjectId([fill; 20])
}

#[derive(Clone)]
struct MemoryRepo {
    branches: Vec<String>,
    refs: HashMap<(RefKind, String), ObjectId>,
}

impl Repository for MemoryRepo {
    fn index_summary(&self) -> Result<IndexSummary, EngineError> {
        Err(EngineError::NotFound)
    }

    fn tree_by_path(&self, _path: &str) -> Result<TreePayload, EngineError> {
        Err(EngineError::NotFound)
    }

    fn resolve_ref(&self, kind: RefKind, name: &str) -> Result<ObjectId, EngineError> {
        self.refs
            .get(&(kind, name.to_owned()))
            .copied()
            .ok_or(EngineError::NotFound)
    }

    fn list_branches(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.branches.clone())
    }

    fn format_patch(&self, _id: ObjectId) -> Result<PatchInfo, EngineError> {
        Err(EngineError::NotFound)
    }

    fn commit_info(&self, _id: ObjectId) -> Result<CommitDetail, EngineError> {
        Err(EngineError::NotFound)
    }

    fn merge_base(&self, _a: ObjectId, _b: ObjectId) -> Result<ObjectId, EngineError> {
        Err(EngineError::NotFound)
    }

    fn log(&self, _spec: &str, _limit: u64) -> Result<Vec<LogEntry>, EngineError> {
        Err(EngineError::NotFound)
    }

    fn tree_by_oid(&self, _id: ObjectId) -> Result<Vec<TreeListEntry>, EngineError> {
        Err(EngineError::NotFound)
    }

    fn write_tree(&self, _entries: &[TreeWriteEntry]) -> Result<ObjectId, EngineError> {
        Err(EngineError::Engine("unsupported".into()))
    }

    fn write_blob(&self, bytes: &[u8]) -> Result<ObjectId, EngineError> {
        // Length-keyed fake id, stable across calls.
        Ok(oid(bytes.len() as u8))
    }

    fn commit_tree_oid(&self, _id: ObjectId) -> Result<ObjectId, EngineError> {
        Err(EngineError::NotFound)
    }

    fn create_commit(&self, _req: &CommitCreate) -> Result<ObjectId, EngineError> {
        Err(EngineError::Engine("unsupported".into()))
    }

    fn update_ref(&self, _name: &str, _id: ObjectId) -> Result<(), EngineError> {
        Err(EngineError::NotFound)
    }
}

struct MemoryEngine {
    repos: HashMap<PathBuf, MemoryRepo>,
    inits: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl MemoryEngine {
    fn with_demo_repo() -> Self {
        let mut refs = HashMap::new();
        refs.insert((RefKind::Branch, "main".to_owned()), oid(0xaa));
        let repo = MemoryRepo {
            branches: vec!["main".to_owned(), "dev".to_owned()],
            refs,
        };
        let mut repos = HashMap::new();
        repos.insert(PathBuf::from(REPO_PATH), repo);
        Self {
            repos,
            inits: Mutex::new(Vec::new()),
        }
    }
}

impl RepositoryEngine for MemoryEngine {
    type Repo = MemoryRepo;

    fn open(&self, path: &Path) -> Result<MemoryRepo, EngineError> {
        self.repos.get(path).cloned().ok_or(EngineError::NotFound)
    }

    fn init_repo(&self, path: &Path, hooks_path: &Path) -> Result<(), InitError> {
        self.inits
            .lock()
            .unwrap()
            .push((path.to_owned(), hooks_path.to_owned()));
        Ok(())
    }
}

/// Start a server on a fresh socket and return the socket path. The
/// engine stays shared so tests can inspect it afterwards.
async fn start_server(engine: Arc<MemoryEngine>) -> (PathBuf, tempfile::TempDir) {
    struct Shared(Arc<MemoryEngine>);

    impl RepositoryEngine for Shared {
        type Repo = MemoryRepo;

        fn open(&self, path: &Path) -> Result<MemoryRepo, EngineError> {
            self.0.open(path)
        }

        fn init_repo(&self, path: &Path, hooks_path: &Path) -> Result<(), InitError> {
            self.0.init_repo(path, hooks_path)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("gitwire.sock");
    let server = Server::builder(Shared(engine), socket.clone())
        .bind()
        .unwrap();
    tokio::spawn(server.run());
    (socket, dir)
}

async fn connect(
    socket: &Path,
) -> (
    WireReader<tokio::net::unix::OwnedReadHalf>,
    WireWriter<tokio::net::unix::OwnedWriteHalf>,
) {
    let stream = UnixStream::connect(socket).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    (WireReader::new(read_half), WireWriter::new(write_half))
}

// Session futures borrow the repository handle across await points inside
// spawned tasks, so the trait itself must promise shared-reference safety.
#[test]
fn test_repository_handles_are_spawn_safe() {
    fn shareable<T: Send + Sync>() {}
    fn assert_spawn_safe<R: Repository>() {
        shareable::<R>();
    }
    assert_spawn_safe::<MemoryRepo>();
}

#[tokio::test]
async fn test_list_branches_roundtrip() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(engine).await;

    let (mut reader, mut writer) = connect(&socket).await;
    writer.put_data(REPO_PATH.as_bytes()).await.unwrap();
    writer.put_uint(4).await.unwrap();

    assert_eq!(reader.get_uint().await.unwrap(), 0);
    assert_eq!(reader.get_uint().await.unwrap(), 2);
    assert_eq!(reader.get_data(4096).await.unwrap(), b"main");
    assert_eq!(reader.get_data(4096).await.unwrap(), b"dev");
}

#[tokio::test]
async fn test_unknown_tag_reports_status_and_closes() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(engine).await;

    let (mut reader, mut writer) = connect(&socket).await;
    writer.put_data(REPO_PATH.as_bytes()).await.unwrap();
    writer.put_uint(99).await.unwrap();

    assert_eq!(reader.get_uint().await.unwrap(), 3);

    // Nothing else arrives; the daemon closed after one status.
    let mut rest = Vec::new();
    reader.into_inner().read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_open_failure_reports_status_one() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(engine).await;

    let (mut reader, mut writer) = connect(&socket).await;
    writer.put_data(b"/srv/git/missing.git").await.unwrap();
    writer.put_uint(4).await.unwrap();

    assert_eq!(reader.get_uint().await.unwrap(), 1);
}

#[tokio::test]
async fn test_resolve_ref_is_stable_across_connections() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(engine).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (mut reader, mut writer) = connect(&socket).await;
        writer.put_data(REPO_PATH.as_bytes()).await.unwrap();
        writer.put_uint(3).await.unwrap();
        writer.put_data(b"branch").await.unwrap();
        writer.put_data(b"main").await.unwrap();

        assert_eq!(reader.get_uint().await.unwrap(), 0);
        ids.push(reader.get_data(64).await.unwrap());
    }
    assert_eq!(ids[0], ids[1]);
    assert_eq!(ids[0], oid(0xaa).as_bytes());
}

#[tokio::test]
async fn test_bad_ref_kind_reports_resolve_status() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(engine).await;

    let (mut reader, mut writer) = connect(&socket).await;
    writer.put_data(REPO_PATH.as_bytes()).await.unwrap();
    writer.put_uint(3).await.unwrap();
    writer.put_data(b"remote").await.unwrap();
    writer.put_data(b"main").await.unwrap();

    assert_eq!(reader.get_uint().await.unwrap(), 12);
}

#[tokio::test]
async fn test_write_blob_returns_id() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(engine).await;

    let (mut reader, mut writer) = connect(&socket).await;
    writer.put_data(REPO_PATH.as_bytes()).await.unwrap();
    writer.put_uint(11).await.unwrap();
    writer.put_uint(5).await.unwrap();
    writer.put_fixed(b"hello").await.unwrap();

    assert_eq!(reader.get_uint().await.unwrap(), 0);
    assert_eq!(reader.get_data(64).await.unwrap(), oid(5).as_bytes());
}

#[tokio::test]
async fn test_init_runs_without_open() {
    let engine = Arc::new(MemoryEngine::with_demo_repo());
    let (socket, _dir) = start_server(Arc::clone(&engine)).await;

    let (mut reader, mut writer) = connect(&socket).await;
    writer.put_data(b"/srv/git/new.git").await.unwrap();
    writer.put_uint(15).await.unwrap();
    writer.put_data(b"/srv/git/hooks").await.unwrap();

    assert_eq!(reader.get_uint().await.unwrap(), 0);

    let inits = engine.inits.lock().unwrap();
    assert_eq!(inits.len(), 1);
    assert_eq!(
        inits[0],
        (
            PathBuf::from("/srv/git/new.git"),
            PathBuf::from("/srv/git/hooks"),
        )
    );
}
