//! SQLite persistence for the simulator.
//!
//! A [`Store`] owns a single connection behind a mutex. Reads go through
//! [`Store::read`]; every mutation goes through [`Store::write`], which runs
//! the closure inside one transaction and only commits when it returns `Ok`.
//! Multi-step operations (posting a reply and bumping its parent, recording an
//! event and applying it) therefore either land completely or not at all.
//!
//! Entity modules ([`crate::directory`], [`crate::channels`],
//! [`crate::messages`], [`crate::events`]) add their operations as `impl Store`
//! blocks on top of crate-private functions that take a plain `&Connection`,
//! so they compose inside a single transaction.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{Result, SimError};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS teams (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    domain      TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS apps (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    team_id     TEXT NOT NULL REFERENCES teams(id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    display_name  TEXT,
    real_name     TEXT,
    email         TEXT,
    is_bot        INTEGER NOT NULL DEFAULT 0,
    team_id       TEXT NOT NULL REFERENCES teams(id),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channels (
    id            TEXT PRIMARY KEY,
    name          TEXT,
    channel_type  TEXT NOT NULL,
    is_private    INTEGER NOT NULL DEFAULT 0,
    topic         TEXT,
    purpose       TEXT,
    team_id       TEXT NOT NULL REFERENCES teams(id),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channel_memberships (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id),
    channel_id  TEXT NOT NULL REFERENCES channels(id),
    is_admin    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_channel_memberships_user_channel
    ON channel_memberships(user_id, channel_id);
CREATE INDEX IF NOT EXISTS idx_channel_memberships_channel
    ON channel_memberships(channel_id);

CREATE TABLE IF NOT EXISTS messages (
    id            TEXT PRIMARY KEY,
    ts            TEXT NOT NULL,
    text          TEXT,
    user_id       TEXT NOT NULL REFERENCES users(id),
    channel_id    TEXT NOT NULL REFERENCES channels(id),
    thread_ts     TEXT,
    reply_count   INTEGER NOT NULL DEFAULT 0,
    message_type  TEXT NOT NULL DEFAULT 'message',
    subtype       TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_channel_ts ON messages(channel_id, ts);
CREATE INDEX IF NOT EXISTS idx_messages_thread_ts ON messages(thread_ts);
CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id);

CREATE TABLE IF NOT EXISTS reactions (
    id          TEXT PRIMARY KEY,
    message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(id),
    emoji       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_reactions_message_user_emoji
    ON reactions(message_id, user_id, emoji);

CREATE TABLE IF NOT EXISTS generic_event_wrappers (
    id           TEXT PRIMARY KEY,
    event_id     TEXT NOT NULL,
    token        TEXT NOT NULL,
    team_id      TEXT NOT NULL REFERENCES teams(id),
    api_app_id   TEXT NOT NULL REFERENCES apps(id),
    event_type   TEXT NOT NULL,
    event_time   INTEGER NOT NULL,
    event_data   TEXT NOT NULL,
    authed_users TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_events_event_id ON generic_event_wrappers(event_id);
CREATE INDEX IF NOT EXISTS idx_events_team_app ON generic_event_wrappers(team_id, api_app_id);
CREATE INDEX IF NOT EXISTS idx_events_type_time ON generic_event_wrappers(event_type, event_time);

CREATE TABLE IF NOT EXISTS event_authed_users (
    id                TEXT PRIMARY KEY,
    event_wrapper_id  TEXT NOT NULL REFERENCES generic_event_wrappers(id) ON DELETE CASCADE,
    user_id           TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_event_authed_users_event_user
    ON event_authed_users(event_wrapper_id, user_id);
";

/// Tables in dependency order; dropped in reverse.
const TABLES: [&str; 9] = [
    "teams",
    "apps",
    "users",
    "channels",
    "channel_memberships",
    "messages",
    "reactions",
    "generic_event_wrappers",
    "event_authed_users",
];

/// Row counts per table, reported by the health endpoint and startup logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoreCounts {
    /// Teams.
    pub teams: u64,
    /// Apps.
    pub apps: u64,
    /// Users.
    pub users: u64,
    /// Channels of every type.
    pub channels: u64,
    /// Channel memberships.
    pub memberships: u64,
    /// Messages including thread replies.
    pub messages: u64,
    /// Reactions.
    pub reactions: u64,
    /// Recorded event envelopes.
    pub events: u64,
}

/// SQLite-backed store for all simulator state.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the database file at `path`.
    ///
    /// Parent directories are created as needed and the schema is applied
    /// idempotently.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or SQLite fails to
    /// open or migrate the database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to create the schema.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        match &path {
            Some(path) => info!(path = %path.display(), "Opened database"),
            None => debug!("Opened in-memory database"),
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Location of the database file, `None` when in memory.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SimError::LockPoisoned)
    }

    /// Run a read-only closure against the connection.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error, or [`SimError::LockPoisoned`].
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run a closure inside a transaction, committing only on success.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error (after rolling back), or any error from
    /// beginning or committing the transaction.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Drop every table and recreate the empty schema.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is dropped in that case.
    pub fn reset(&self) -> Result<()> {
        self.write(|tx| {
            for table in TABLES.iter().rev() {
                tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
            }
            tx.execute_batch(SCHEMA)?;
            Ok(())
        })?;
        info!("Database reset");
        Ok(())
    }

    /// Verify that the database answers queries.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when `SELECT 1` fails.
    pub fn health_check(&self) -> Result<()> {
        self.read(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    /// Count rows in every table.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn counts(&self) -> Result<StoreCounts> {
        self.read(|conn| {
            let count = |table: &str| -> Result<u64> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                Ok(u64::try_from(n).unwrap_or_default())
            };
            Ok(StoreCounts {
                teams: count("teams")?,
                apps: count("apps")?,
                users: count("users")?,
                channels: count("channels")?,
                memberships: count("channel_memberships")?,
                messages: count("messages")?,
                reactions: count("reactions")?,
                events: count("generic_event_wrappers")?,
            })
        })
    }

    /// `true` when no team has been created yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn is_empty(&self) -> Result<bool> {
        self.read(|conn| {
            let teams: i64 = conn.query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;
            Ok(teams == 0)
        })
    }
}
