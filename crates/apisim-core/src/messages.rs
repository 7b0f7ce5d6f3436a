//! Messages, threads and reactions.
//!
//! A message is a thread parent when `thread_ts == ts` and a reply when
//! `thread_ts` names another message. Replies are kept out of channel history
//! and listed through [`Store::replies`]. Posting a reply increments the
//! parent's `reply_count` in the same transaction; deleting one decrements it.
//! Deleting a thread parent deletes the whole thread.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::channels::require_channel;
use crate::directory::user_exists;
use crate::error::{Result, SimError};
use crate::ids::{normalize_ts, row_id};
use crate::models::{Message, ReactionSummary, ThreadSummary};
use crate::pagination::{Page, PageRequest};
use crate::store::Store;

pub(crate) const MESSAGE_COLUMNS: &str = "id, ts, text, user_id, channel_id, thread_ts, \
     reply_count, message_type, subtype, created_at, updated_at";

/// Default `message_type` for posted messages.
pub const MESSAGE_TYPE: &str = "message";

/// A message to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Target channel.
    pub channel_id: String,
    /// Author.
    pub user_id: String,
    /// Body.
    pub text: Option<String>,
    /// Parent timestamp when replying in a thread.
    pub thread_ts: Option<String>,
    /// Optional subtype such as `bot_message`.
    pub subtype: Option<String>,
}

impl NewMessage {
    /// A top-level message.
    #[must_use]
    pub fn new(channel_id: impl Into<String>, user_id: impl Into<String>, text: Option<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            text,
            thread_ts: None,
            subtype: None,
        }
    }

    /// Post as a reply to `thread_ts`.
    #[must_use]
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    /// Set the subtype.
    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }
}

/// Arguments for [`Store::history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Channel to read.
    pub channel_id: String,
    /// Only messages after this timestamp.
    pub oldest: Option<String>,
    /// Only messages before this timestamp.
    pub latest: Option<String>,
    /// Include messages exactly at `oldest`/`latest`.
    pub inclusive: bool,
    /// Cursor (a timestamp) and limit.
    pub page: PageRequest,
}

impl HistoryQuery {
    /// Newest messages of a channel, unbounded.
    #[must_use]
    pub fn new(channel_id: impl Into<String>, page: PageRequest) -> Self {
        Self {
            channel_id: channel_id.into(),
            oldest: None,
            latest: None,
            inclusive: false,
            page,
        }
    }

    /// Bound the time range.
    #[must_use]
    pub fn between(mut self, oldest: Option<String>, latest: Option<String>, inclusive: bool) -> Self {
        self.oldest = oldest;
        self.latest = latest;
        self.inclusive = inclusive;
        self
    }
}

/// A message with its thread metadata and grouped reactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetails {
    /// The message.
    pub message: Message,
    /// Reply metadata, set for thread parents.
    pub thread: Option<ThreadSummary>,
    /// Reactions grouped by emoji, in first-reaction order.
    pub reactions: Vec<ReactionSummary>,
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        ts: row.get(1)?,
        text: row.get(2)?,
        user_id: row.get(3)?,
        channel_id: row.get(4)?,
        thread_ts: row.get(5)?,
        reply_count: row.get(6)?,
        message_type: row.get(7)?,
        subtype: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn canonical_ts(value: &str, what: &str) -> Result<String> {
    normalize_ts(value).ok_or_else(|| SimError::InvalidArgument(format!("invalid {what}: '{value}'")))
}

/// Strip surrounding colons from an emoji name (`:tada:` becomes `tada`).
#[must_use]
pub fn normalize_emoji(name: &str) -> String {
    name.trim().trim_matches(':').to_string()
}

// =============================================================================
// CONNECTION-LEVEL OPERATIONS
// =============================================================================

pub(crate) fn find_message(conn: &Connection, channel_id: &str, ts: &str) -> Result<Option<Message>> {
    Ok(conn
        .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE channel_id = ?1 AND ts = ?2"),
            params![channel_id, ts],
            message_from_row,
        )
        .optional()?)
}

fn require_message(conn: &Connection, channel_id: &str, ts: &str) -> Result<Message> {
    let canonical = normalize_ts(ts).unwrap_or_else(|| ts.to_string());
    find_message(conn, channel_id, &canonical)?.ok_or_else(|| SimError::MessageNotFound {
        channel: channel_id.to_string(),
        ts: ts.to_string(),
    })
}

/// Insert a message at `ts`, bumping its thread parent when it is a reply.
///
/// Channel and author must exist. A reply to a reply is attached to the
/// thread root. A `thread_ts` that names no message is stored unchanged.
pub(crate) fn insert_message(conn: &Connection, new: &NewMessage, ts: &str) -> Result<Message> {
    require_channel(conn, &new.channel_id)?;
    if !user_exists(conn, &new.user_id)? {
        return Err(SimError::UserNotFound(new.user_id.clone()));
    }
    let ts = canonical_ts(ts, "ts")?;

    let mut thread_ts = None;
    if let Some(raw) = new.thread_ts.as_deref().filter(|t| !t.trim().is_empty()) {
        let parent_ts = canonical_ts(raw, "thread_ts")?;
        match find_message(conn, &new.channel_id, &parent_ts)? {
            Some(parent) => {
                let root_ts = if parent.is_thread_reply() {
                    parent.thread_ts.clone().unwrap_or(parent.ts)
                } else {
                    parent.ts
                };
                conn.execute(
                    "UPDATE messages
                     SET reply_count = reply_count + 1, thread_ts = ts, updated_at = ?3
                     WHERE channel_id = ?1 AND ts = ?2",
                    params![new.channel_id, root_ts, Utc::now()],
                )?;
                thread_ts = Some(root_ts);
            }
            None => {
                warn!(channel = %new.channel_id, thread_ts = %parent_ts, "Reply to unknown parent");
                thread_ts = Some(parent_ts);
            }
        }
    }

    let now = Utc::now();
    let message = Message {
        id: row_id(),
        ts,
        text: new.text.clone(),
        user_id: new.user_id.clone(),
        channel_id: new.channel_id.clone(),
        thread_ts,
        reply_count: 0,
        message_type: MESSAGE_TYPE.to_string(),
        subtype: new.subtype.clone(),
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        &format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            message.id,
            message.ts,
            message.text,
            message.user_id,
            message.channel_id,
            message.thread_ts,
            message.reply_count,
            message.message_type,
            message.subtype,
            message.created_at,
            message.updated_at,
        ],
    )?;
    Ok(message)
}

/// Add a reaction; `Ok(false)` when the user already reacted with this emoji.
pub(crate) fn insert_reaction(conn: &Connection, message_id: &str, user_id: &str, emoji: &str) -> Result<bool> {
    let now = Utc::now();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO reactions (id, message_id, user_id, emoji, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![row_id(), message_id, user_id, emoji, now],
    )?;
    Ok(inserted > 0)
}

/// Remove a reaction; `Ok(false)` when there was none.
pub(crate) fn delete_reaction(conn: &Connection, message_id: &str, user_id: &str, emoji: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
        params![message_id, user_id, emoji],
    )?;
    Ok(removed > 0)
}

fn reaction_summaries(conn: &Connection, message_id: &str) -> Result<Vec<ReactionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT emoji, user_id FROM reactions WHERE message_id = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map([message_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut summaries: Vec<ReactionSummary> = Vec::new();
    for row in rows {
        let (emoji, user) = row?;
        match summaries.iter_mut().find(|s| s.name == emoji) {
            Some(summary) => {
                summary.users.push(user);
                summary.count += 1;
            }
            None => summaries.push(ReactionSummary {
                name: emoji,
                users: vec![user],
                count: 1,
            }),
        }
    }
    Ok(summaries)
}

fn thread_summary(conn: &Connection, parent: &Message) -> Result<ThreadSummary> {
    let mut stmt = conn.prepare(
        "SELECT user_id, ts FROM messages
         WHERE channel_id = ?1 AND thread_ts = ?2 AND ts <> ?2
         ORDER BY ts ASC",
    )?;
    let rows = stmt.query_map(params![parent.channel_id, parent.ts], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut summary = ThreadSummary {
        reply_count: parent.reply_count,
        ..ThreadSummary::default()
    };
    for row in rows {
        let (user, ts) = row?;
        if !summary.reply_users.contains(&user) {
            summary.reply_users.push(user);
        }
        summary.latest_reply = Some(ts);
    }
    Ok(summary)
}

// =============================================================================
// STORE API
// =============================================================================

impl Store {
    /// Post a message at `ts`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ChannelNotFound`], [`SimError::UserNotFound`], or
    /// [`SimError::InvalidArgument`] for a malformed timestamp.
    pub fn post_message(&self, new: &NewMessage, ts: &str) -> Result<Message> {
        let message = self.write(|tx| insert_message(tx, new, ts))?;
        debug!(channel = %message.channel_id, ts = %message.ts, reply = message.is_thread_reply(), "Posted message");
        Ok(message)
    }

    /// Look up a message by channel and timestamp.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn message(&self, channel_id: &str, ts: &str) -> Result<Option<Message>> {
        let Some(ts) = normalize_ts(ts) else {
            return Ok(None);
        };
        self.read(|conn| find_message(conn, channel_id, &ts))
    }

    /// Replace a message's text.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MessageNotFound`] when no such message exists.
    pub fn update_message_text(&self, channel_id: &str, ts: &str, text: Option<&str>) -> Result<Message> {
        self.write(|tx| {
            let message = require_message(tx, channel_id, ts)?;
            let now = Utc::now();
            tx.execute(
                "UPDATE messages SET text = ?2, updated_at = ?3 WHERE id = ?1",
                params![message.id, text, now],
            )?;
            Ok(Message {
                text: text.map(str::to_string),
                updated_at: now,
                ..message
            })
        })
    }

    /// Delete a message and its reactions, returning the deleted record.
    ///
    /// Deleting a reply decrements its parent's `reply_count` (never below zero).
    /// Deleting a thread parent also deletes its replies.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MessageNotFound`] when no such message exists.
    pub fn delete_message(&self, channel_id: &str, ts: &str) -> Result<Message> {
        self.write(|tx| {
            let message = require_message(tx, channel_id, ts)?;
            if message.thread_ts.as_deref() == Some(message.ts.as_str()) {
                let replies = tx.execute(
                    "DELETE FROM messages WHERE channel_id = ?1 AND thread_ts = ?2 AND ts <> ?2",
                    params![channel_id, message.ts],
                )?;
                debug!(channel_id, ts = %message.ts, replies, "Deleted thread replies");
            }
            tx.execute("DELETE FROM messages WHERE id = ?1", [&message.id])?;
            if message.is_thread_reply() {
                if let Some(parent_ts) = &message.thread_ts {
                    tx.execute(
                        "UPDATE messages
                         SET reply_count = MAX(reply_count - 1, 0), updated_at = ?3
                         WHERE channel_id = ?1 AND ts = ?2",
                        params![channel_id, parent_ts, Utc::now()],
                    )?;
                }
            }
            Ok(message)
        })
    }

    /// Channel history, newest first, excluding thread replies.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ChannelNotFound`], or [`SimError::InvalidArgument`]
    /// for a malformed bound or cursor.
    pub fn history(&self, query: &HistoryQuery) -> Result<Page<Message>> {
        let oldest = query.oldest.as_deref().map(|t| canonical_ts(t, "oldest")).transpose()?;
        let latest = query.latest.as_deref().map(|t| canonical_ts(t, "latest")).transpose()?;
        let cursor = query.page.cursor.as_deref().map(|t| canonical_ts(t, "cursor")).transpose()?;
        let (lower, upper) = if query.inclusive { (">=", "<=") } else { (">", "<") };

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE channel_id = ?1
               AND (thread_ts IS NULL OR thread_ts = ts)
               AND (?2 IS NULL OR ts {lower} ?2)
               AND (?3 IS NULL OR ts {upper} ?3)
               AND (?4 IS NULL OR ts < ?4)
             ORDER BY ts DESC LIMIT ?5"
        );

        self.read(|conn| {
            require_channel(conn, &query.channel_id)?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![query.channel_id, oldest, latest, cursor, query.page.fetch_limit()],
                    message_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Page::from_overfetch(rows, query.page.limit, |m| m.ts.clone()))
        })
    }

    /// A thread: the parent followed by its replies, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ChannelNotFound`] or [`SimError::ThreadNotFound`].
    pub fn replies(&self, channel_id: &str, thread_ts: &str, page: &PageRequest) -> Result<Page<Message>> {
        let thread_not_found = || SimError::ThreadNotFound {
            channel: channel_id.to_string(),
            ts: thread_ts.to_string(),
        };
        let parent_ts = normalize_ts(thread_ts).ok_or_else(thread_not_found)?;
        let cursor = page.cursor.as_deref().map(|t| canonical_ts(t, "cursor")).transpose()?;

        self.read(|conn| {
            require_channel(conn, channel_id)?;
            let parent = find_message(conn, channel_id, &parent_ts)?
                .filter(|m| !m.is_thread_reply())
                .ok_or_else(thread_not_found)?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE channel_id = ?1 AND (ts = ?2 OR thread_ts = ?2)
                   AND (?3 IS NULL OR ts > ?3)
                 ORDER BY ts ASC LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(
                    params![channel_id, parent.ts, cursor, page.fetch_limit()],
                    message_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Page::from_overfetch(rows, page.limit, |m| m.ts.clone()))
        })
    }

    /// Add `emoji` from `user_id` to the message at `(channel_id, ts)`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MessageNotFound`], [`SimError::UserNotFound`] or
    /// [`SimError::AlreadyReacted`].
    pub fn add_reaction(&self, channel_id: &str, ts: &str, user_id: &str, emoji: &str) -> Result<()> {
        let emoji = normalize_emoji(emoji);
        self.write(|tx| {
            let message = require_message(tx, channel_id, ts)?;
            if !user_exists(tx, user_id)? {
                return Err(SimError::UserNotFound(user_id.to_string()));
            }
            if insert_reaction(tx, &message.id, user_id, &emoji)? {
                Ok(())
            } else {
                Err(SimError::AlreadyReacted {
                    user: user_id.to_string(),
                    emoji: emoji.clone(),
                })
            }
        })
    }

    /// Remove `emoji` from `user_id` on the message at `(channel_id, ts)`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MessageNotFound`] or [`SimError::NoReaction`].
    pub fn remove_reaction(&self, channel_id: &str, ts: &str, user_id: &str, emoji: &str) -> Result<()> {
        let emoji = normalize_emoji(emoji);
        self.write(|tx| {
            let message = require_message(tx, channel_id, ts)?;
            if delete_reaction(tx, &message.id, user_id, &emoji)? {
                Ok(())
            } else {
                Err(SimError::NoReaction {
                    user: user_id.to_string(),
                    emoji: emoji.clone(),
                })
            }
        })
    }

    /// Attach thread metadata (for thread parents) and grouped reactions to
    /// each message, under a single lock.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn message_details(&self, messages: Vec<Message>) -> Result<Vec<MessageDetails>> {
        self.read(|conn| {
            messages
                .into_iter()
                .map(|message| {
                    let thread = if message.is_thread_parent() {
                        Some(thread_summary(conn, &message)?)
                    } else {
                        None
                    };
                    let reactions = reaction_summaries(conn, &message.id)?;
                    Ok(MessageDetails {
                        message,
                        thread,
                        reactions,
                    })
                })
                .collect()
        })
    }
}
