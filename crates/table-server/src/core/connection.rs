use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    thread,
    time::Duration,
};

use rusqlite::{Connection, OpenFlags};
use tokio::sync::oneshot;

use crate::{
    core::{
        export, paging, schema,
        types::{PageRequest, PageResponse, TableDescriptor},
    },
    error::{AppError, AppResult},
};

/// Database worker threads keyed by database path.
///
/// Each worker owns at most one connection, opened on its first task and kept
/// until the worker exits, so a (worker, database) pair always maps to the same
/// handle and no connection is ever shared between threads.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    inner: Arc<Mutex<HashMap<PathBuf, WorkerSet>>>,
    workers_per_db: usize,
    busy_timeout_ms: u64,
}

impl ConnectionPool {
    pub fn new(workers_per_db: usize, busy_timeout_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            workers_per_db: workers_per_db.max(1),
            busy_timeout_ms,
        }
    }

    /// Pick the next worker for `db_path`, spawning the database's workers on first use.
    pub fn worker(&self, db_path: &Path) -> AppResult<WorkerHandle> {
        let db_path = absolute_path(db_path)?;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| AppError::Internal("poisoned lock".into()))?;
        if let Some(set) = guard.get(&db_path) {
            return Ok(set.next());
        }

        let set = WorkerSet::spawn(&db_path, self.workers_per_db, self.busy_timeout_ms)?;
        let h = set.next();
        guard.insert(db_path, set);
        Ok(h)
    }
}

#[derive(Debug, Clone)]
struct WorkerSet {
    handles: Arc<Vec<WorkerHandle>>,
    cursor: Arc<AtomicUsize>,
}

impl WorkerSet {
    fn spawn(db_path: &Path, count: usize, busy_timeout_ms: u64) -> AppResult<Self> {
        let handles = (0..count)
            .map(|index| WorkerHandle::spawn(db_path.to_path_buf(), index, busy_timeout_ms))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self {
            handles: Arc::new(handles),
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn next(&self) -> WorkerHandle {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        self.handles[i].clone()
    }
}

#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<DbTask>,
    pub index: usize,
}

impl WorkerHandle {
    fn spawn(db_path: PathBuf, index: usize, busy_timeout_ms: u64) -> AppResult<Self> {
        let (tx, rx) = mpsc::channel::<DbTask>();
        thread::Builder::new()
            .name(format!("db-worker-{index}"))
            .spawn(move || db_worker_main(db_path, busy_timeout_ms, rx))?;
        Ok(Self { tx, index })
    }

    pub async fn describe(&self, table: String) -> AppResult<TableDescriptor> {
        let (tx, rx) = oneshot::channel();
        self.send(DbTask::Describe { table, respond_to: tx })?;
        rx.await.map_err(|_| dropped())?
    }

    pub async fn page(&self, table: String, request: PageRequest) -> AppResult<PageResponse> {
        let (tx, rx) = oneshot::channel();
        self.send(DbTask::Page {
            table,
            request,
            respond_to: tx,
        })?;
        rx.await.map_err(|_| dropped())?
    }

    pub async fn export(&self, table: String, out_path: PathBuf) -> AppResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(DbTask::Export {
            table,
            out_path,
            respond_to: tx,
        })?;
        rx.await.map_err(|_| dropped())?
    }

    fn send(&self, task: DbTask) -> AppResult<()> {
        self.tx
            .send(task)
            .map_err(|_| AppError::Internal("db worker unavailable".into()))
    }
}

fn dropped() -> AppError {
    AppError::Internal("db worker dropped response".into())
}

enum DbTask {
    Describe {
        table: String,
        respond_to: oneshot::Sender<AppResult<TableDescriptor>>,
    },
    Page {
        table: String,
        request: PageRequest,
        respond_to: oneshot::Sender<AppResult<PageResponse>>,
    },
    Export {
        table: String,
        out_path: PathBuf,
        respond_to: oneshot::Sender<AppResult<usize>>,
    },
}

fn db_worker_main(db_path: PathBuf, busy_timeout_ms: u64, rx: mpsc::Receiver<DbTask>) {
    let mut conn: Option<Connection> = None;

    while let Ok(task) = rx.recv() {
        if conn.is_none() {
            match open_conn(&db_path, busy_timeout_ms) {
                Ok(c) => {
                    tracing::debug!(path = %db_path.display(), "opened worker connection");
                    conn = Some(c);
                }
                Err(e) => {
                    tracing::error!(error = %e, path = %db_path.display(), "failed to open db in worker");
                    respond_err(task, e);
                    continue;
                }
            }
        }
        let Some(conn) = conn.as_ref() else { continue };

        match task {
            DbTask::Describe { table, respond_to } => {
                let _ = respond_to.send(schema::describe_table(conn, &table));
            }
            DbTask::Page {
                table,
                request,
                respond_to,
            } => {
                let _ = respond_to.send(paging::get_page(conn, &table, &request));
            }
            DbTask::Export {
                table,
                out_path,
                respond_to,
            } => {
                let _ = respond_to.send(export::export_table(conn, &table, &out_path));
            }
        }
    }
}

fn respond_err(task: DbTask, err: AppError) {
    match task {
        DbTask::Describe { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
        DbTask::Page { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
        DbTask::Export { respond_to, .. } => {
            let _ = respond_to.send(Err(err));
        }
    }
}

/// Open a file-backed connection that refuses writes.
pub fn open_conn(path: &Path, busy_timeout_ms: u64) -> AppResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let open_failed = |source: rusqlite::Error| AppError::DbOpenFailed {
        path: path.to_path_buf(),
        source,
    };
    let conn = Connection::open_with_flags(path, flags).map_err(open_failed)?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(open_failed)?;
    conn.pragma_update(None, "query_only", true)
        .map_err(open_failed)?;
    Ok(conn)
}

fn absolute_path(path: &Path) -> AppResult<PathBuf> {
    // canonicalize requires the file to exist; SQLite may create it on open.
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(path))
    }
}
