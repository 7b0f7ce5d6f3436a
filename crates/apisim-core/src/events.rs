//! Events API envelopes and their side effects.
//!
//! An `event_callback` envelope is recorded (with its authed users) and its
//! inner event is applied to the workspace inside the same transaction:
//! messages are inserted, memberships and reactions added or removed.
//! References to unknown channels, users or messages inside the inner event
//! are skipped with a warning; the envelope itself is still recorded.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::channels::{add_member, find_channel, remove_member};
use crate::directory::{find_app, find_team, user_exists};
use crate::error::{Result, SimError};
use crate::ids::{normalize_ts, row_id, slack_id, TsClock};
use crate::messages::{delete_reaction, find_message, insert_message, insert_reaction, normalize_emoji, NewMessage};
use crate::models::EventRecord;
use crate::store::Store;

/// Token recorded when an envelope carries none.
pub const DEFAULT_TOKEN: &str = "default_token";

const EVENT_COLUMNS: &str = "id, event_id, token, team_id, api_app_id, event_type, event_time, \
     event_data, authed_users, created_at";

/// An incoming Events API request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "type": "event_callback",
    "token": "XXYYZZ",
    "team_id": "T1H9RESGL",
    "api_app_id": "A2H9RFS1A",
    "event": {"type": "message", "channel": "C2147483705", "user": "U2147483697", "text": "Hello", "ts": "1355517523.000005"},
    "event_id": "Ev0PV52K25",
    "event_time": 1355517523,
    "authed_users": ["U2147483697"]
}))]
pub struct EventEnvelope {
    /// `url_verification`, `event_callback`, or another envelope type.
    #[serde(rename = "type", default)]
    pub envelope_type: Option<String>,
    /// Challenge to echo for `url_verification`.
    #[serde(default)]
    pub challenge: Option<String>,
    /// Verification token.
    #[serde(default)]
    pub token: Option<String>,
    /// Team the event belongs to.
    #[serde(default)]
    pub team_id: Option<String>,
    /// App the event is delivered to.
    #[serde(default)]
    pub api_app_id: Option<String>,
    /// Inner event payload.
    #[serde(default)]
    pub event: Option<Value>,
    /// Unique envelope id.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Event time in epoch seconds.
    #[serde(default)]
    pub event_time: Option<i64>,
    /// Users the event is delivered on behalf of.
    #[serde(default)]
    pub authed_users: Vec<String>,
}

impl EventEnvelope {
    /// `url_verification` envelope with the given challenge.
    #[must_use]
    pub fn url_verification(challenge: impl Into<String>) -> Self {
        Self {
            envelope_type: Some("url_verification".to_string()),
            challenge: Some(challenge.into()),
            ..Self::default()
        }
    }

    /// `event_callback` envelope wrapping `event`.
    #[must_use]
    pub fn callback(team_id: impl Into<String>, api_app_id: impl Into<String>, event: Value) -> Self {
        Self {
            envelope_type: Some("event_callback".to_string()),
            team_id: Some(team_id.into()),
            api_app_id: Some(api_app_id.into()),
            event: Some(event),
            ..Self::default()
        }
    }

    /// Type of the inner event, e.g. `message`.
    #[must_use]
    pub fn inner_type(&self) -> Option<&str> {
        self.event.as_ref()?.get("type")?.as_str()
    }
}

/// What happened to an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// `url_verification`: echo the challenge.
    Challenge(String),
    /// The envelope was recorded and its inner event applied.
    Recorded {
        /// Envelope id, generated when absent.
        event_id: String,
        /// Inner event type.
        inner_type: Option<String>,
    },
    /// The envelope id was seen before; nothing changed.
    Duplicate {
        /// Repeated envelope id.
        event_id: String,
    },
    /// Unknown envelope type; acknowledged without effect.
    Ignored {
        /// The envelope type received.
        envelope_type: Option<String>,
    },
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    let authed: Value = row.get(8)?;
    Ok(EventRecord {
        id: row.get(0)?,
        event_id: row.get(1)?,
        token: row.get(2)?,
        team_id: row.get(3)?,
        api_app_id: row.get(4)?,
        event_type: row.get(5)?,
        event_time: row.get(6)?,
        event_data: row.get(7)?,
        authed_users: serde_json::from_value(authed).unwrap_or_default(),
        created_at: row.get(9)?,
    })
}

fn str_field<'a>(event: &'a Value, key: &str) -> Option<&'a str> {
    event.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

// =============================================================================
// CONNECTION-LEVEL OPERATIONS
// =============================================================================

fn event_exists(conn: &Connection, event_id: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM generic_event_wrappers WHERE event_id = ?1",
            [event_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// Store the wrapper and its authed users.
pub(crate) fn insert_event(conn: &Connection, record: &EventRecord) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO generic_event_wrappers ({EVENT_COLUMNS}, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)"
        ),
        params![
            record.id,
            record.event_id,
            record.token,
            record.team_id,
            record.api_app_id,
            record.event_type,
            record.event_time,
            record.event_data,
            serde_json::to_value(&record.authed_users)?,
            record.created_at,
        ],
    )?;
    for user_id in &record.authed_users {
        conn.execute(
            "INSERT OR IGNORE INTO event_authed_users
                 (id, event_wrapper_id, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![row_id(), record.id, user_id, record.created_at],
        )?;
    }
    Ok(())
}

fn apply_message(conn: &Connection, event: &Value, clock: &TsClock) -> Result<()> {
    let (Some(channel), Some(user)) = (str_field(event, "channel"), str_field(event, "user")) else {
        warn!("Message event without channel or user");
        return Ok(());
    };
    if find_channel(conn, channel)?.is_none() {
        warn!(channel = %channel, "Message event for unknown channel");
        return Ok(());
    }
    if !user_exists(conn, user)? {
        warn!(user = %user, "Message event from unknown user");
        return Ok(());
    }
    let ts = match str_field(event, "ts") {
        Some(raw) => match normalize_ts(raw) {
            Some(ts) => ts,
            None => {
                warn!(ts = %raw, "Message event with malformed ts");
                return Ok(());
            }
        },
        None => clock.next(),
    };
    if find_message(conn, channel, &ts)?.is_some() {
        debug!(channel = %channel, ts = %ts, "Message already stored");
        return Ok(());
    }

    let mut new = NewMessage::new(channel, user, Some(str_field(event, "text").unwrap_or_default().to_string()));
    if let Some(raw) = str_field(event, "thread_ts") {
        // A malformed thread reference leaves the message top-level.
        match normalize_ts(raw) {
            Some(thread_ts) => new = new.in_thread(thread_ts),
            None => warn!(thread_ts = %raw, "Message event with malformed thread_ts"),
        }
    }
    if let Some(subtype) = str_field(event, "subtype") {
        new = new.with_subtype(subtype);
    }
    insert_message(conn, &new, &ts)?;
    Ok(())
}

fn apply_membership(conn: &Connection, event: &Value, joined: bool) -> Result<()> {
    let (Some(channel), Some(user)) = (str_field(event, "channel"), str_field(event, "user")) else {
        warn!("Membership event without channel or user");
        return Ok(());
    };
    if find_channel(conn, channel)?.is_none() || !user_exists(conn, user)? {
        warn!(channel = %channel, user = %user, "Membership event for unknown channel or user");
        return Ok(());
    }
    if joined {
        add_member(conn, channel, user, false)?;
    } else {
        remove_member(conn, channel, user)?;
    }
    Ok(())
}

fn apply_reaction(conn: &Connection, event: &Value, added: bool) -> Result<()> {
    let Some(item) = event.get("item") else {
        return Ok(());
    };
    if str_field(item, "type") != Some("message") {
        return Ok(());
    }
    let (Some(user), Some(emoji), Some(channel), Some(ts)) = (
        str_field(event, "user"),
        str_field(event, "reaction"),
        str_field(item, "channel"),
        str_field(item, "ts"),
    ) else {
        warn!("Reaction event with missing fields");
        return Ok(());
    };
    let Some(message) = normalize_ts(ts)
        .map(|ts| find_message(conn, channel, &ts))
        .transpose()?
        .flatten()
    else {
        warn!(channel = %channel, ts = %ts, "Reaction event for unknown message");
        return Ok(());
    };

    let emoji = normalize_emoji(emoji);
    if added {
        if !user_exists(conn, user)? {
            warn!(user = %user, "Reaction event from unknown user");
            return Ok(());
        }
        insert_reaction(conn, &message.id, user, &emoji)?;
    } else {
        delete_reaction(conn, &message.id, user, &emoji)?;
    }
    Ok(())
}

fn apply_inner_event(conn: &Connection, event: &Value, clock: &TsClock) -> Result<()> {
    match str_field(event, "type") {
        Some("message") => apply_message(conn, event, clock),
        Some("member_joined_channel") => apply_membership(conn, event, true),
        Some("member_left_channel") => apply_membership(conn, event, false),
        Some("reaction_added") => apply_reaction(conn, event, true),
        Some("reaction_removed") => apply_reaction(conn, event, false),
        other => {
            debug!(event_type = ?other, "Recorded event without side effects");
            Ok(())
        }
    }
}

// =============================================================================
// STORE API
// =============================================================================

impl Store {
    /// Process an Events API envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingChallenge`] for a `url_verification` without
    /// challenge, [`SimError::InvalidEvent`] when the team or app is missing or
    /// unknown, or a storage error (in which case nothing is recorded).
    pub fn handle_event(&self, envelope: &EventEnvelope, clock: &TsClock) -> Result<EventOutcome> {
        match envelope.envelope_type.as_deref() {
            Some("url_verification") => envelope
                .challenge
                .clone()
                .filter(|c| !c.is_empty())
                .map(EventOutcome::Challenge)
                .ok_or(SimError::MissingChallenge),
            Some("event_callback") => self.record_event(envelope, clock),
            other => {
                warn!(envelope_type = ?other, "Unknown event envelope type");
                Ok(EventOutcome::Ignored {
                    envelope_type: other.map(str::to_string),
                })
            }
        }
    }

    /// Record an `event_callback` envelope and apply its inner event.
    ///
    /// # Errors
    ///
    /// See [`Store::handle_event`].
    pub fn record_event(&self, envelope: &EventEnvelope, clock: &TsClock) -> Result<EventOutcome> {
        let team_id = envelope
            .team_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SimError::InvalidEvent("team_id is required".into()))?;
        let api_app_id = envelope
            .api_app_id
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| SimError::InvalidEvent("api_app_id is required".into()))?;
        let event_data = envelope.event.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let inner_type = envelope.inner_type().map(str::to_string);

        let now = Utc::now();
        let record = EventRecord {
            id: row_id(),
            event_id: envelope
                .event_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| slack_id("Ev")),
            token: envelope
                .token
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN.to_string()),
            team_id: team_id.to_string(),
            api_app_id: api_app_id.to_string(),
            event_type: "event_callback".to_string(),
            event_time: envelope.event_time.unwrap_or_else(|| now.timestamp()),
            event_data,
            authed_users: envelope.authed_users.clone(),
            created_at: now,
        };

        let outcome = self.write(|tx| {
            if find_team(tx, team_id)?.is_none() {
                return Err(SimError::InvalidEvent(format!("unknown team_id '{team_id}'")));
            }
            if find_app(tx, api_app_id)?.is_none() {
                return Err(SimError::InvalidEvent(format!("unknown api_app_id '{api_app_id}'")));
            }
            if event_exists(tx, &record.event_id)? {
                return Ok(EventOutcome::Duplicate {
                    event_id: record.event_id.clone(),
                });
            }
            insert_event(tx, &record)?;
            apply_inner_event(tx, &record.event_data, clock)?;
            Ok(EventOutcome::Recorded {
                event_id: record.event_id.clone(),
                inner_type: inner_type.clone(),
            })
        })?;

        match &outcome {
            EventOutcome::Recorded { event_id, inner_type } => {
                info!(event_id = %event_id, event_type = ?inner_type, team = %team_id, "Processed event");
            }
            EventOutcome::Duplicate { event_id } => {
                info!(event_id = %event_id, "Duplicate event ignored");
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// Look up a recorded envelope by its event id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn event(&self, event_id: &str) -> Result<Option<EventRecord>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {EVENT_COLUMNS} FROM generic_event_wrappers WHERE event_id = ?1"),
                    [event_id],
                    event_from_row,
                )
                .optional()?)
        })
    }
}
