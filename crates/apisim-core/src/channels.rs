//! Conversations and channel membership.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::directory::{find_team, user_exists};
use crate::error::{Result, SimError};
use crate::ids::{row_id, slack_id};
use crate::messages::{message_from_row, MESSAGE_COLUMNS};
use crate::models::{Channel, ChannelType, Message};
use crate::pagination::{Page, PageRequest};
use crate::store::Store;

const CHANNEL_COLUMNS: &str =
    "id, name, channel_type, is_private, topic, purpose, team_id, created_at, updated_at";

/// Maximum channel name length.
pub const MAX_CHANNEL_NAME_LEN: usize = 80;

static CHANNEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{1,80}$").expect("valid channel name regex"));

/// Conversation types returned when a listing names none.
const DEFAULT_LIST_TYPES: [ChannelType; 4] = [
    ChannelType::Channel,
    ChannelType::Group,
    ChannelType::Mpim,
    ChannelType::Im,
];

/// Type filter for `conversations.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFilter {
    /// Every channel regardless of type.
    All,
    /// Only channels of these types; an empty list matches nothing.
    Types(Vec<ChannelType>),
}

impl Default for ChannelFilter {
    fn default() -> Self {
        Self::Types(DEFAULT_LIST_TYPES.to_vec())
    }
}

impl ChannelFilter {
    /// Interpret the comma-separated `types` argument.
    ///
    /// Absent means the four conversation types, an empty string disables
    /// filtering, and unknown names are dropped (so a list of only unknown
    /// names matches nothing).
    #[must_use]
    pub fn from_types_param(types: Option<&str>) -> Self {
        match types {
            None => Self::default(),
            Some(raw) if raw.trim().is_empty() => Self::All,
            Some(raw) => {
                let mut kinds = Vec::new();
                for kind in raw.split(',').filter_map(ChannelType::from_conversation_type) {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                Self::Types(kinds)
            }
        }
    }
}

/// Lower-case and check a channel name.
///
/// # Errors
///
/// Returns [`SimError::InvalidChannelName`] unless the name is 1-80 characters
/// of lowercase letters, digits, `-` or `_`.
pub fn normalize_channel_name(name: &str) -> Result<String> {
    let normalized = name.trim().trim_start_matches('#').to_lowercase();
    if CHANNEL_NAME.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(SimError::InvalidChannelName(name.to_string()))
    }
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        name: row.get(1)?,
        channel_type: row.get(2)?,
        is_private: row.get(3)?,
        topic: row.get(4)?,
        purpose: row.get(5)?,
        team_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// =============================================================================
// CONNECTION-LEVEL OPERATIONS
// =============================================================================

pub(crate) fn insert_channel(conn: &Connection, channel: &Channel) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO channels ({CHANNEL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            channel.id,
            channel.name,
            channel.channel_type,
            channel.is_private,
            channel.topic,
            channel.purpose,
            channel.team_id,
            channel.created_at,
            channel.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_channel(conn: &Connection, id: &str) -> Result<Option<Channel>> {
    Ok(conn
        .query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"),
            [id],
            channel_from_row,
        )
        .optional()?)
}

pub(crate) fn require_channel(conn: &Connection, id: &str) -> Result<Channel> {
    find_channel(conn, id)?.ok_or_else(|| SimError::ChannelNotFound(id.to_string()))
}

pub(crate) fn add_member(conn: &Connection, channel_id: &str, user_id: &str, is_admin: bool) -> Result<bool> {
    let now = Utc::now();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO channel_memberships
             (id, user_id, channel_id, is_admin, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![row_id(), user_id, channel_id, is_admin, now],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn remove_member(conn: &Connection, channel_id: &str, user_id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM channel_memberships WHERE channel_id = ?1 AND user_id = ?2",
        params![channel_id, user_id],
    )?;
    Ok(removed > 0)
}

fn name_taken(conn: &Connection, team_id: &str, name: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM channels WHERE team_id = ?1 AND name = ?2",
            params![team_id, name],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn require_user(conn: &Connection, id: &str) -> Result<()> {
    if user_exists(conn, id)? {
        Ok(())
    } else {
        Err(SimError::UserNotFound(id.to_string()))
    }
}

// =============================================================================
// STORE API
// =============================================================================

impl Store {
    /// Insert a channel as given.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TeamNotFound`] when the owning team is missing.
    pub fn insert_channel(&self, channel: &Channel) -> Result<()> {
        self.write(|tx| {
            if find_team(tx, &channel.team_id)?.is_none() {
                return Err(SimError::TeamNotFound);
            }
            insert_channel(tx, channel)
        })
    }

    /// Look up a channel by id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn channel(&self, id: &str) -> Result<Option<Channel>> {
        self.read(|conn| find_channel(conn, id))
    }

    /// Channels ordered by id, filtered by type and paginated by id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn list_channels(&self, filter: &ChannelFilter, page: &PageRequest) -> Result<Page<Channel>> {
        let mut sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE 1 = 1");
        let mut args: Vec<Value> = Vec::new();

        if let ChannelFilter::Types(kinds) = filter {
            if kinds.is_empty() {
                return Ok(Page::from_overfetch(Vec::new(), page.limit, |c: &Channel| c.id.clone()));
            }
            let placeholders = vec!["?"; kinds.len()].join(", ");
            sql.push_str(&format!(" AND channel_type IN ({placeholders})"));
            args.extend(kinds.iter().map(|k| Value::Text(k.as_str().to_string())));
        }
        if let Some(cursor) = &page.cursor {
            sql.push_str(" AND id > ?");
            args.push(Value::Text(cursor.clone()));
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");
        args.push(Value::Integer(page.fetch_limit()));

        self.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args), channel_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Page::from_overfetch(rows, page.limit, |c| c.id.clone()))
        })
    }

    /// Create a named channel in `team_id`.
    ///
    /// The creator, when given, becomes the channel's first (admin) member.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidChannelName`], [`SimError::NameTaken`],
    /// [`SimError::TeamNotFound`] or [`SimError::UserNotFound`].
    pub fn create_channel(
        &self,
        team_id: &str,
        name: &str,
        is_private: bool,
        creator: Option<&str>,
    ) -> Result<Channel> {
        let name = normalize_channel_name(name)?;
        let kind = if is_private {
            ChannelType::Group
        } else {
            ChannelType::Channel
        };

        let channel = self.write(|tx| {
            if find_team(tx, team_id)?.is_none() {
                return Err(SimError::TeamNotFound);
            }
            if name_taken(tx, team_id, &name)? {
                return Err(SimError::NameTaken(name.clone()));
            }
            let channel = Channel::new(slack_id(kind.id_prefix()), Some(name.clone()), kind, team_id);
            insert_channel(tx, &channel)?;
            if let Some(creator) = creator {
                require_user(tx, creator)?;
                add_member(tx, &channel.id, creator, true)?;
            }
            Ok(channel)
        })?;

        info!(channel = %channel.id, name = %name, is_private, "Created channel");
        Ok(channel)
    }

    /// Number of members in a channel.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn member_count(&self, channel_id: &str) -> Result<u64> {
        self.read(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM channel_memberships WHERE channel_id = ?1",
                [channel_id],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }

    /// Add a user to a channel. Returns `false` if they were already a member.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ChannelNotFound`] or [`SimError::UserNotFound`].
    pub fn add_member(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let added = self.write(|tx| {
            require_channel(tx, channel_id)?;
            require_user(tx, user_id)?;
            add_member(tx, channel_id, user_id, false)
        })?;
        debug!(channel = %channel_id, user = %user_id, added, "Join channel");
        Ok(added)
    }

    /// Remove a user from a channel. Returns `false` if they were not a member.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ChannelNotFound`] when the channel does not exist.
    pub fn remove_member(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let removed = self.write(|tx| {
            require_channel(tx, channel_id)?;
            remove_member(tx, channel_id, user_id)
        })?;
        debug!(channel = %channel_id, user = %user_id, removed, "Leave channel");
        Ok(removed)
    }

    /// Member user ids ordered by id, paginated by user id.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ChannelNotFound`] when the channel does not exist.
    pub fn list_members(&self, channel_id: &str, page: &PageRequest) -> Result<Page<String>> {
        self.read(|conn| {
            require_channel(conn, channel_id)?;
            let mut stmt = conn.prepare(
                "SELECT user_id FROM channel_memberships
                 WHERE channel_id = ?1 AND (?2 IS NULL OR user_id > ?2)
                 ORDER BY user_id ASC LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![channel_id, page.cursor, page.fetch_limit()], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(Page::from_overfetch(rows, page.limit, Clone::clone))
        })
    }

    /// Newest top-level message in a channel.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn latest_message(&self, channel_id: &str) -> Result<Option<Message>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE channel_id = ?1 AND (thread_ts IS NULL OR thread_ts = ts)
                         ORDER BY ts DESC LIMIT 1"
                    ),
                    [channel_id],
                    message_from_row,
                )
                .optional()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Team, User};

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.insert_team(&Team::new("T1", "Acme", None)).unwrap();
        store.insert_user(&User::new("U1", "alice", "T1")).unwrap();
        store.insert_user(&User::new("U2", "bob", "T1")).unwrap();
        store
            .insert_channel(&Channel::new("C1", Some("general".into()), ChannelType::Channel, "T1"))
            .unwrap();
        store
            .insert_channel(&Channel::new("G1", Some("secret".into()), ChannelType::Group, "T1"))
            .unwrap();
        store
            .insert_channel(&Channel::new("D1", None, ChannelType::Im, "T1"))
            .unwrap();
        store
            .insert_channel(&Channel::new("H1", None, ChannelType::AppHome, "T1"))
            .unwrap();
        store
    }

    fn ids(page: &Page<Channel>) -> Vec<&str> {
        page.items.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_filter_from_types_param() {
        assert_eq!(ChannelFilter::from_types_param(None), ChannelFilter::default());
        assert_eq!(ChannelFilter::from_types_param(Some("")), ChannelFilter::All);
        assert_eq!(
            ChannelFilter::from_types_param(Some("public_channel,bogus,public_channel")),
            ChannelFilter::Types(vec![ChannelType::Channel])
        );
        assert_eq!(
            ChannelFilter::from_types_param(Some("bogus")),
            ChannelFilter::Types(vec![])
        );
    }

    #[test]
    fn test_list_channels_by_filter() {
        let store = seeded();
        let page = PageRequest::first(100);

        let default = store.list_channels(&ChannelFilter::default(), &page).unwrap();
        assert_eq!(ids(&default), ["C1", "D1", "G1"]);

        let all = store.list_channels(&ChannelFilter::All, &page).unwrap();
        assert_eq!(all.items.len(), 4);

        let private = store
            .list_channels(&ChannelFilter::from_types_param(Some("private_channel")), &page)
            .unwrap();
        assert_eq!(ids(&private), ["G1"]);

        let none = store
            .list_channels(&ChannelFilter::from_types_param(Some("bogus")), &page)
            .unwrap();
        assert!(none.items.is_empty());
        assert!(!none.has_more);
    }

    #[test]
    fn test_list_channels_paginates() {
        let store = seeded();
        let first = store
            .list_channels(&ChannelFilter::default(), &PageRequest::first(2))
            .unwrap();
        assert_eq!(ids(&first), ["C1", "D1"]);
        assert_eq!(first.next_cursor.as_deref(), Some("D1"));

        let second = store
            .list_channels(&ChannelFilter::default(), &PageRequest::after("D1", 2))
            .unwrap();
        assert_eq!(ids(&second), ["G1"]);
        assert!(!second.has_more);
    }

    #[test]
    fn test_channel_name_rules() {
        assert_eq!(normalize_channel_name("Dev-Ops").unwrap(), "dev-ops");
        assert_eq!(normalize_channel_name("#random").unwrap(), "random");
        assert!(normalize_channel_name("").is_err());
        assert!(normalize_channel_name("has space").is_err());
        assert!(normalize_channel_name(&"a".repeat(81)).is_err());
        assert!(normalize_channel_name(&"a".repeat(80)).is_ok());
    }

    #[test]
    fn test_create_channel() {
        let store = seeded();
        let public = store.create_channel("T1", "Projects", false, Some("U1")).unwrap();
        assert!(public.id.starts_with('C'));
        assert_eq!(public.name.as_deref(), Some("projects"));
        assert!(!public.is_private);
        assert_eq!(store.member_count(&public.id).unwrap(), 1);

        let private = store.create_channel("T1", "hush", true, None).unwrap();
        assert!(private.id.starts_with('G'));
        assert_eq!(private.channel_type, ChannelType::Group);
        assert!(private.is_private);

        assert!(matches!(
            store.create_channel("T1", "general", false, None),
            Err(SimError::NameTaken(_))
        ));
        assert!(matches!(
            store.create_channel("T1", "Bad Name", false, None),
            Err(SimError::InvalidChannelName(_))
        ));
        assert!(matches!(
            store.create_channel("T404", "fine", false, None),
            Err(SimError::TeamNotFound)
        ));
    }

    #[test]
    fn test_membership_lifecycle() {
        let store = seeded();
        assert!(store.add_member("C1", "U2").unwrap());
        assert!(!store.add_member("C1", "U2").unwrap());
        assert!(store.add_member("C1", "U1").unwrap());
        assert_eq!(store.member_count("C1").unwrap(), 2);

        let members = store.list_members("C1", &PageRequest::first(1)).unwrap();
        assert_eq!(members.items, ["U1"]);
        assert_eq!(members.next_cursor.as_deref(), Some("U1"));

        assert!(store.remove_member("C1", "U1").unwrap());
        assert!(!store.remove_member("C1", "U1").unwrap());
        assert_eq!(store.member_count("C1").unwrap(), 1);

        assert!(matches!(
            store.add_member("C404", "U1"),
            Err(SimError::ChannelNotFound(_))
        ));
        assert!(matches!(
            store.add_member("C1", "U404"),
            Err(SimError::UserNotFound(_))
        ));
    }
}
