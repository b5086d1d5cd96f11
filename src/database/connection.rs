/*!
 * SQLite connection handle for the translation cache.
 *
 * One connection is shared by every request behind a mutex. Statements run
 * on tokio's blocking pool so a slow disk never stalls the routing tasks.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::schema;

const CACHE_FILE_NAME: &str = "translation_cache.db";
const APP_DIR_NAME: &str = "transgate";

/// How long a writer waits on a locked file before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the cache database
#[derive(Clone)]
pub struct DatabaseConnection {
    location: Option<PathBuf>,
    inner: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("location", &self.location)
            .finish()
    }
}

impl DatabaseConnection {
    /// Open the cache under the user's local data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the cache file at `db_path`, creating parent directories
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        match db_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create cache directory {}", dir.display()))?,
            _ => {}
        }

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Cannot open cache database {}", db_path.display()))?;
        // Readers stay unblocked while the cleanup task deletes rows
        let journal: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .context("Cannot enable WAL journal")?;
        debug!("Journal mode: {}", journal);
        info!("Translation cache opened at {}", db_path.display());

        Self::from_connection(conn, Some(db_path))
    }

    /// Private in-memory cache, gone when the last clone is dropped
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory translation cache");
        let conn = Connection::open_in_memory().context("Cannot open in-memory database")?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, location: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Cannot set busy timeout")?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            location,
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data_local_dir>/transgate/translation_cache.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .context("No local data directory available for the translation cache")?;
        Ok(base.join(APP_DIR_NAME).join(CACHE_FILE_NAME))
    }

    /// File backing this cache, `None` when in memory
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || {
            let conn = inner.lock();
            f(&conn)
        })
        .await
        .context("Cache database task was cancelled or panicked")?
    }
}
