//! SQLite-backed local campaign store.
//!
//! One `kv` table holds the six campaign keys. Every mutation runs as a
//! single `BEGIN IMMEDIATE` transaction against the last committed record,
//! and only a committed record is published to subscribers, so readers never
//! see a half-applied update. A `worker_lease` table keeps two processes
//! from running the same background work.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::TimeZone;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::campaign::{CampaignState, Dashboard, STREAK_GOAL};
use crate::error::StorageError;
use crate::streak::StreakEngine;

use super::data_dir;

type Result<T> = std::result::Result<T, StorageError>;

pub const KEY_ACTIVE_CAMPAIGN_ID: &str = "active_campaign_id";
pub const KEY_TARGET_PACKAGE_NAMES: &str = "target_package_names";
pub const KEY_CURRENT_STREAK_COUNT: &str = "current_streak_count";
pub const KEY_LAST_RUN_TIMESTAMP: &str = "last_run_timestamp";
pub const KEY_MY_CREATED_CAMPAIGNS: &str = "my_created_campaigns";
pub const KEY_LAST_DASHBOARD: &str = "last_dashboard";

struct Inner {
    conn: Mutex<Connection>,
    tx: watch::Sender<CampaignState>,
}

/// Handle to the device's campaign record.
///
/// Cheap to clone; all clones share one connection and one publisher.
#[derive(Clone)]
pub struct CampaignStore {
    inner: Arc<Inner>,
}

impl CampaignStore {
    /// Open the store at `<data_dir>/launchloop.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be opened.
    pub fn open_default() -> Result<Self> {
        Self::open(data_dir()?.join("launchloop.db"))
    }

    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "opened campaign store");
        Self::from_connection(conn)
    }

    /// Open an in-memory store (tests, dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        let state = read_state(&conn)?;
        let (tx, _rx) = watch::channel(state);
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                tx,
            }),
        })
    }

    /// Latest committed record.
    pub fn snapshot(&self) -> CampaignState {
        self.inner.tx.borrow().clone()
    }

    /// Subscribe to committed records. The receiver starts at the current
    /// value; dropping it ends the subscription.
    pub fn subscribe(&self) -> watch::Receiver<CampaignState> {
        self.inner.tx.subscribe()
    }

    /// Re-read the record from the database and publish it.
    ///
    /// Picks up commits made through other connections, including other
    /// processes sharing the same file.
    pub async fn reload(&self) -> Result<CampaignState> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let conn = inner.conn.lock().map_err(|_| StorageError::Poisoned)?;
            let state = read_state(&conn)?;
            inner.tx.send_if_modified(|current| {
                if *current == state {
                    return false;
                }
                *current = state.clone();
                true
            });
            Ok(state)
        })
        .await?
    }

    /// Take or renew the lease for the background work `name`.
    ///
    /// Returns `false` when a different `owner` renewed it less than
    /// `ttl_ms` ago.
    pub async fn acquire_worker_lease(
        &self,
        name: impl Into<String>,
        owner: impl Into<String>,
        now: i64,
        ttl_ms: i64,
    ) -> Result<bool> {
        let name = name.into();
        let owner = owner.into();
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.conn.lock().map_err(|_| StorageError::Poisoned)?;
            let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let held: Option<(String, i64)> = txn
                .query_row(
                    "SELECT owner, renewed_at FROM worker_lease WHERE name = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            if let Some((holder, renewed_at)) = held {
                if holder != owner && now.saturating_sub(renewed_at) < ttl_ms {
                    debug!(%name, %holder, "worker lease held elsewhere");
                    return Ok(false);
                }
            }
            txn.execute(
                "INSERT INTO worker_lease (name, owner, renewed_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET owner = excluded.owner,
                                                 renewed_at = excluded.renewed_at",
                params![name, owner, now],
            )?;
            txn.commit()?;
            Ok(true)
        })
        .await?
    }

    /// Drop the lease for `name` if `owner` holds it.
    pub async fn release_worker_lease(
        &self,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        let owner = owner.into();
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let conn = inner.conn.lock().map_err(|_| StorageError::Poisoned)?;
            conn.execute(
                "DELETE FROM worker_lease WHERE name = ?1 AND owner = ?2",
                params![name, owner],
            )?;
            Ok(())
        })
        .await?
    }

    /// Atomically apply `f` to the committed record and persist the result.
    ///
    /// Concurrent calls are serialized; each sees the previous call's commit.
    pub async fn update<F>(&self, f: F) -> Result<CampaignState>
    where
        F: FnOnce(&mut CampaignState) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.conn.lock().map_err(|_| StorageError::Poisoned)?;
            let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = read_state(&txn)?;
            let mut next = current.clone();
            f(&mut next);
            if next != current {
                write_state(&txn, &next)?;
            }
            txn.commit()?;
            // Publish while still holding the connection so snapshots follow
            // commit order.
            inner.tx.send_replace(next.clone());
            debug!(?next, "campaign state committed");
            Ok(next)
        })
        .await?
    }

    pub async fn set_active_campaign_id(&self, id: impl Into<String>) -> Result<CampaignState> {
        let id = id.into();
        self.update(move |s| s.active_campaign_id = id).await
    }

    pub async fn set_target_package_names(&self, names: BTreeSet<String>) -> Result<CampaignState> {
        self.update(move |s| s.target_package_names = names).await
    }

    /// Add one to the streak, capped at the goal.
    pub async fn increment_streak(&self) -> Result<CampaignState> {
        self.update(|s| s.streak_count = (s.streak_count + 1).min(STREAK_GOAL))
            .await
    }

    pub async fn reset_streak(&self) -> Result<CampaignState> {
        self.update(|s| s.streak_count = 0).await
    }

    pub async fn update_last_run_timestamp(&self, timestamp: i64) -> Result<CampaignState> {
        self.update(move |s| s.last_run_timestamp = timestamp).await
    }

    pub async fn add_created_campaign(&self, id: impl Into<String>) -> Result<CampaignState> {
        let id = id.into();
        self.update(move |s| {
            s.my_created_campaigns.insert(id);
        })
        .await
    }

    pub async fn remove_created_campaign(&self, id: impl Into<String>) -> Result<CampaignState> {
        let id = id.into();
        self.update(move |s| {
            s.my_created_campaigns.remove(&id);
        })
        .await
    }

    pub async fn set_last_dashboard(&self, dashboard: Dashboard) -> Result<CampaignState> {
        self.update(move |s| s.last_dashboard = dashboard).await
    }

    /// Drop every key back to its default.
    pub async fn clear_all(&self) -> Result<CampaignState> {
        self.update(|s| *s = CampaignState::default()).await
    }

    /// Bind the device to a campaign: id, package, zero streak and a cleared
    /// timestamp in one transaction. Also remembers the tester dashboard.
    pub async fn bind_campaign(
        &self,
        campaign_id: impl Into<String>,
        package_name: impl Into<String>,
    ) -> Result<CampaignState> {
        let campaign_id = campaign_id.into();
        let package_name = package_name.into();
        self.update(move |s| {
            s.active_campaign_id = campaign_id;
            s.target_package_names = BTreeSet::from([package_name]);
            s.streak_count = 0;
            s.last_run_timestamp = 0;
            s.last_dashboard = Dashboard::Tester;
        })
        .await
    }

    /// Credit today's run. Two calls on the same calendar day, even racing
    /// each other, increment at most once.
    pub async fn record_completion<Tz>(
        &self,
        engine: &StreakEngine<Tz>,
        now: i64,
    ) -> Result<CampaignState>
    where
        Tz: TimeZone + Send + 'static,
    {
        let engine = engine.clone();
        self.update(move |s| *s = engine.record_completion(s, now))
            .await
    }
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS worker_lease (
            name       TEXT PRIMARY KEY,
            owner      TEXT NOT NULL,
            renewed_at INTEGER NOT NULL
        );",
    )
}

fn get_raw(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

fn corrupt(key: &str, message: impl ToString) -> StorageError {
    StorageError::CorruptValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn get_set(conn: &Connection, key: &str) -> Result<BTreeSet<String>> {
    match get_raw(conn, key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| corrupt(key, e)),
        None => Ok(BTreeSet::new()),
    }
}

fn get_number<T: std::str::FromStr>(conn: &Connection, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    get_raw(conn, key)?
        .map(|raw| raw.parse::<T>().map_err(|e| corrupt(key, e)))
        .transpose()
}

fn read_state(conn: &Connection) -> Result<CampaignState> {
    Ok(CampaignState {
        active_campaign_id: get_raw(conn, KEY_ACTIVE_CAMPAIGN_ID)?.unwrap_or_default(),
        target_package_names: get_set(conn, KEY_TARGET_PACKAGE_NAMES)?,
        streak_count: get_number::<u32>(conn, KEY_CURRENT_STREAK_COUNT)?
            .unwrap_or(0)
            .min(STREAK_GOAL),
        last_run_timestamp: get_number::<i64>(conn, KEY_LAST_RUN_TIMESTAMP)?
            .unwrap_or(0)
            .max(0),
        my_created_campaigns: get_set(conn, KEY_MY_CREATED_CAMPAIGNS)?,
        last_dashboard: Dashboard::from_stored(
            &get_raw(conn, KEY_LAST_DASHBOARD)?.unwrap_or_default(),
        ),
    })
}

fn write_state(conn: &Connection, state: &CampaignState) -> Result<()> {
    let sets = |set: &BTreeSet<String>, key: &str| {
        serde_json::to_string(set).map_err(|e| corrupt(key, e))
    };
    let rows = [
        (KEY_ACTIVE_CAMPAIGN_ID, state.active_campaign_id.clone()),
        (
            KEY_TARGET_PACKAGE_NAMES,
            sets(&state.target_package_names, KEY_TARGET_PACKAGE_NAMES)?,
        ),
        (KEY_CURRENT_STREAK_COUNT, state.streak_count.to_string()),
        (KEY_LAST_RUN_TIMESTAMP, state.last_run_timestamp.to_string()),
        (
            KEY_MY_CREATED_CAMPAIGNS,
            sets(&state.my_created_campaigns, KEY_MY_CREATED_CAMPAIGNS)?,
        ),
        (KEY_LAST_DASHBOARD, state.last_dashboard.as_str().to_string()),
    ];

    let mut stmt = conn.prepare_cached(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )?;
    for (key, value) in rows {
        stmt.execute(params![key, value])?;
    }
    Ok(())
}
