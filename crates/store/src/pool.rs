use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use retail_sim_shared::config::PoolConfig;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::StoreError;

struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

/// Process-owned pool of SQLite connections.
///
/// A connection is checked out for one unit of work and returned on drop.
/// Connections that saw an error are discarded instead of returned.
#[derive(Clone)]
pub struct SqlitePool {
    inner: Arc<PoolInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub idle: usize,
    pub open: usize,
}

impl SqlitePool {
    /// Opens the pool and one connection to verify the store is reachable.
    pub fn open(config: PoolConfig) -> Result<Self, StoreError> {
        if config.max_size == 0 {
            return Err(StoreError::Connection("pool size must be positive".into()));
        }
        let first = open_connection(&config)?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    idle: vec![first],
                    open: 1,
                }),
                available: Condvar::new(),
            }),
        })
    }

    pub fn get(&self) -> Result<PooledConnection, StoreError> {
        let deadline = Instant::now() + self.inner.config.acquire_timeout;
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| StoreError::Connection("pool lock poisoned".into()))?;
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection::new(conn, self.inner.clone()));
            }
            if state.open < self.inner.config.max_size {
                state.open += 1;
                drop(state);
                return match open_connection(&self.inner.config) {
                    Ok(conn) => Ok(PooledConnection::new(conn, self.inner.clone())),
                    Err(err) => {
                        self.inner.release_slot();
                        Err(err)
                    }
                };
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::Connection(format!(
                    "timed out waiting for a connection ({} open)",
                    state.open
                )));
            }
            state = self
                .inner
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| StoreError::Connection("pool lock poisoned".into()))?
                .0;
        }
    }

    pub fn status(&self) -> PoolStatus {
        match self.inner.state.lock() {
            Ok(state) => PoolStatus {
                idle: state.idle.len(),
                open: state.open,
            },
            Err(_) => PoolStatus { idle: 0, open: 0 },
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl PoolInner {
    fn release_slot(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.open = state.open.saturating_sub(1);
        }
        self.available.notify_one();
    }

    fn give_back(&self, conn: Connection) {
        match self.state.lock() {
            Ok(mut state) => state.idle.push(conn),
            Err(_) => warn!("pool lock poisoned, dropping connection"),
        }
        self.available.notify_one();
    }
}

fn open_connection(config: &PoolConfig) -> Result<Connection, StoreError> {
    let conn = Connection::open(&config.path).map_err(StoreError::connection)?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(StoreError::connection)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .map_err(StoreError::connection)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(StoreError::connection)?;
    debug!(path = %config.path.display(), "opened store connection");
    Ok(conn)
}

pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    broken: bool,
}

impl PooledConnection {
    fn new(conn: Connection, pool: Arc<PoolInner>) -> Self {
        Self {
            conn: Some(conn),
            pool,
            broken: false,
        }
    }

    /// Closes the connection on drop instead of returning it to the pool.
    pub fn discard(&mut self) {
        self.broken = true;
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `Drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.broken {
            drop(conn);
            self.pool.release_slot();
        } else {
            self.pool.give_back(conn);
        }
    }
}
