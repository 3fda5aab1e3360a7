//! Change log kept in the state database
//!
//! Processes that open the same SQLite file cannot share an in-process hub, so
//! each publish appends a row naming the originating context. Subscribers poll
//! for rows past the last one they saw and turn each into a storage event for
//! every local context except the originator.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::StoreError;
use crate::shared::{ChangeSignal, ContextId, SignalHub, Subscription};

/// Rows kept behind the newest change; readers only need the sequence number
const RETAINED_CHANGES: i64 = 1024;

struct SignalInner {
    conn: Mutex<Connection>,
    hub: SignalHub,
    last_seen: Mutex<i64>,
}

impl SignalInner {
    /// Deliver changes recorded since the last poll; returns how many were found
    fn poll(&self) -> usize {
        let mut last_seen = self.last_seen.lock();
        let changes = match self.changes_after(*last_seen) {
            Ok(changes) => changes,
            Err(e) => {
                warn!("Failed to poll change log: {}", e);
                return 0;
            }
        };

        for (seq, context) in &changes {
            // Rows that do not name a context come from nobody we host
            let from = ContextId::parse(context).unwrap_or_default();
            self.hub.publish(from);
            *last_seen = *seq;
        }
        if !changes.is_empty() {
            trace!("Delivered {} logged changes", changes.len());
        }
        changes.len()
    }

    fn changes_after(&self, seq: i64) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT seq, context FROM overlay_changes WHERE seq > ?1 ORDER BY seq")?;
        let rows = stmt
            .query_map(params![seq], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(i64, String)>, _>>()?;
        Ok(rows)
    }

    fn record(&self, from: ContextId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO overlay_changes (context) VALUES (?1)",
            params![from.to_string()],
        )?;
        let newest = conn.last_insert_rowid();
        conn.execute(
            "DELETE FROM overlay_changes WHERE seq <= ?1",
            params![newest - RETAINED_CHANGES],
        )?;
        Ok(())
    }
}

/// Change signal shared by every process that opens the same database
#[derive(Clone)]
pub struct SqliteSignal {
    inner: Arc<SignalInner>,
}

impl SqliteSignal {
    /// Open the change log in the database at `path`
    ///
    /// Changes recorded before opening are not replayed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS overlay_changes (
                seq     INTEGER PRIMARY KEY AUTOINCREMENT,
                context TEXT NOT NULL
            );",
        )?;
        let newest: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM overlay_changes",
            [],
            |row| row.get(0),
        )?;
        debug!("Opened change log at {:?} (seq {})", path, newest);

        Ok(Self {
            inner: Arc::new(SignalInner {
                conn: Mutex::new(conn),
                hub: SignalHub::new(),
                last_seen: Mutex::new(newest),
            }),
        })
    }

    /// Pull recorded changes into local subscriptions
    pub fn poll(&self) -> usize {
        self.inner.poll()
    }

    /// Number of live local subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.subscriber_count()
    }
}

impl ChangeSignal for SqliteSignal {
    fn publish(&self, from: ContextId) {
        if let Err(e) = self.inner.record(from) {
            warn!("Failed to record change from {}: {}", from, e);
        }
    }

    fn notify_local(&self, context: ContextId) {
        self.inner.hub.notify_local(context);
    }

    fn subscribe(&self, context: ContextId) -> Subscription {
        let inner: Weak<SignalInner> = Arc::downgrade(&self.inner);
        self.inner.hub.subscribe(context).with_poll(move || {
            if let Some(inner) = inner.upgrade() {
                inner.poll();
            }
        })
    }
}
