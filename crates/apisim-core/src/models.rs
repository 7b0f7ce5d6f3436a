//! Domain records stored by the simulator.
//!
//! These mirror the rows of the SQLite schema one-to-one. Response shaping for
//! the Web API happens in the server crate; the records here only carry data.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// A Slack team (workspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Team {
    /// Team id, e.g. `T1H9RESGL`.
    #[schema(example = "T1H9RESGL")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Workspace subdomain.
    pub domain: Option<String>,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a team record stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, domain: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            domain,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An installed app that receives events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct App {
    /// App id, e.g. `A2H9RFS1A`.
    pub id: String,
    /// App name.
    pub name: String,
    /// Owning team.
    pub team_id: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl App {
    /// Create an app record stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, team_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            team_id: team_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A workspace member, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// User id, e.g. `U061F7AUR`.
    pub id: String,
    /// Handle.
    pub name: String,
    /// Preferred display name.
    pub display_name: Option<String>,
    /// Full name.
    pub real_name: Option<String>,
    /// Contact address.
    pub email: Option<String>,
    /// Whether the account belongs to a bot.
    pub is_bot: bool,
    /// Owning team.
    pub team_id: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a human user with only a handle set.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, team_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            real_name: None,
            email: None,
            is_bot: false,
            team_id: team_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the display and real name.
    #[must_use]
    pub fn with_names(mut self, display_name: impl Into<String>, real_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self.real_name = Some(real_name.into());
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Mark the user as a bot.
    #[must_use]
    pub const fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Name shown in message attributions: display name, then real name, then handle.
    #[must_use]
    pub fn preferred_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.real_name.as_deref())
            .unwrap_or(&self.name)
    }
}

// =============================================================================
// CHANNELS
// =============================================================================

/// Kind of conversation a channel represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Public channel.
    Channel,
    /// Private channel.
    Group,
    /// Direct message.
    Im,
    /// Multi-party direct message.
    Mpim,
    /// An app's home tab.
    AppHome,
}

/// Error returned when parsing an unknown channel type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown channel type: '{0}'")]
pub struct UnknownChannelType(pub String);

impl ChannelType {
    /// Every stored channel type.
    pub const ALL: [Self; 5] = [
        Self::Channel,
        Self::Group,
        Self::Im,
        Self::Mpim,
        Self::AppHome,
    ];

    /// Stored name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Im => "im",
            Self::Mpim => "mpim",
            Self::AppHome => "app_home",
        }
    }

    /// Maps a `conversations.list` type name onto a stored type.
    ///
    /// `public_channel` and `private_channel` map to `channel` and `group`;
    /// `im` and `mpim` map to themselves. Anything else yields `None`.
    #[must_use]
    pub fn from_conversation_type(name: &str) -> Option<Self> {
        match name.trim() {
            "public_channel" => Some(Self::Channel),
            "private_channel" => Some(Self::Group),
            "mpim" => Some(Self::Mpim),
            "im" => Some(Self::Im),
            _ => None,
        }
    }

    /// Id prefix used when minting a channel of this type.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Channel | Self::AppHome => "C",
            Self::Group | Self::Mpim => "G",
            Self::Im => "D",
        }
    }

    /// Whether conversations of this type carry a name.
    #[must_use]
    pub const fn is_named(self) -> bool {
        matches!(self, Self::Channel | Self::Group)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = UnknownChannelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownChannelType(s.to_string()))
    }
}

impl ToSql for ChannelType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChannelType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// A conversation: public or private channel, DM or group DM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Channel {
    /// Channel id, e.g. `C0PNCRP9N`.
    pub id: String,
    /// Name without the leading `#`; `None` for DMs.
    pub name: Option<String>,
    /// Conversation kind.
    pub channel_type: ChannelType,
    /// Whether the channel is private.
    pub is_private: bool,
    /// Current topic.
    pub topic: Option<String>,
    /// Current purpose.
    pub purpose: Option<String>,
    /// Owning team.
    pub team_id: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// Create a channel record stamped with the current time.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        channel_type: ChannelType,
        team_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name,
            channel_type,
            is_private: !matches!(channel_type, ChannelType::Channel),
            topic: None,
            purpose: None,
            team_id: team_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the topic and purpose.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>, purpose: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self.purpose = Some(purpose.into());
        self
    }

    /// `true` for public and private channels.
    #[must_use]
    pub const fn is_channel(&self) -> bool {
        matches!(self.channel_type, ChannelType::Channel | ChannelType::Group)
    }
}

/// A user's membership in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Row id.
    pub id: String,
    /// Member.
    pub user_id: String,
    /// Channel joined.
    pub channel_id: String,
    /// Whether the member administers the channel.
    pub is_admin: bool,
    /// Join time (UTC).
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A message posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Row id.
    pub id: String,
    /// Message timestamp; unique within the channel.
    #[schema(example = "1700000000.000100")]
    pub ts: String,
    /// Message body.
    pub text: Option<String>,
    /// Author.
    pub user_id: String,
    /// Channel the message lives in.
    pub channel_id: String,
    /// Parent timestamp for replies; equal to `ts` on a thread parent.
    pub thread_ts: Option<String>,
    /// Number of replies (thread parents only).
    pub reply_count: u32,
    /// Message type, normally `message`.
    pub message_type: String,
    /// Optional subtype such as `bot_message`.
    pub subtype: Option<String>,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// A message is a thread reply iff `thread_ts` is set and differs from `ts`.
    #[must_use]
    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts.as_deref().is_some_and(|parent| parent != self.ts)
    }

    /// A thread parent has `thread_ts == ts` and at least one reply.
    #[must_use]
    pub fn is_thread_parent(&self) -> bool {
        self.thread_ts.as_deref() == Some(self.ts.as_str()) && self.reply_count > 0
    }
}

/// A single user's emoji reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Row id.
    pub id: String,
    /// Message reacted to.
    pub message_id: String,
    /// Reacting user.
    pub user_id: String,
    /// Emoji name without colons.
    pub emoji: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
}

/// Reactions on a message grouped by emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReactionSummary {
    /// Emoji name.
    #[schema(example = "thumbsup")]
    pub name: String,
    /// Users who reacted, in reaction order.
    pub users: Vec<String>,
    /// Number of users.
    pub count: usize,
}

/// Aggregate thread metadata for a parent message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ThreadSummary {
    /// Number of replies.
    pub reply_count: u32,
    /// Distinct repliers in first-reply order.
    pub reply_users: Vec<String>,
    /// Timestamp of the newest reply.
    pub latest_reply: Option<String>,
}

// =============================================================================
// EVENTS
// =============================================================================

/// A recorded Events API envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    /// Row id.
    pub id: String,
    /// Envelope id, e.g. `Ev0PV52K25`.
    pub event_id: String,
    /// Verification token.
    pub token: String,
    /// Team the event belongs to.
    pub team_id: String,
    /// App the event was delivered to.
    pub api_app_id: String,
    /// Envelope type, normally `event_callback`.
    pub event_type: String,
    /// Event time in epoch seconds.
    pub event_time: i64,
    /// Inner event payload.
    pub event_data: serde_json::Value,
    /// Users the event was delivered on behalf of.
    pub authed_users: Vec<String>,
    /// Receive time (UTC).
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Type of the inner event, e.g. `message`.
    #[must_use]
    pub fn inner_type(&self) -> Option<&str> {
        self.event_data.get("type").and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(ts: &str, thread_ts: Option<&str>, reply_count: u32) -> Message {
        let now = Utc::now();
        Message {
            id: "m1".into(),
            ts: ts.into(),
            text: Some("hi".into()),
            user_id: "U1".into(),
            channel_id: "C1".into(),
            thread_ts: thread_ts.map(str::to_string),
            reply_count,
            message_type: "message".into(),
            subtype: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_channel_type_round_trips_through_str() {
        for kind in ChannelType::ALL {
            assert_eq!(kind.as_str().parse::<ChannelType>().unwrap(), kind);
        }
        assert!("public".parse::<ChannelType>().is_err());
    }

    #[test]
    fn test_conversation_type_mapping() {
        assert_eq!(
            ChannelType::from_conversation_type("public_channel"),
            Some(ChannelType::Channel)
        );
        assert_eq!(
            ChannelType::from_conversation_type("private_channel"),
            Some(ChannelType::Group)
        );
        assert_eq!(ChannelType::from_conversation_type("im"), Some(ChannelType::Im));
        assert_eq!(ChannelType::from_conversation_type("mpim"), Some(ChannelType::Mpim));
        assert_eq!(ChannelType::from_conversation_type("app_home"), None);
        assert_eq!(ChannelType::from_conversation_type("bogus"), None);
    }

    #[test]
    fn test_channel_privacy_follows_type() {
        assert!(!Channel::new("C1", Some("general".into()), ChannelType::Channel, "T1").is_private);
        assert!(Channel::new("G1", Some("secret".into()), ChannelType::Group, "T1").is_private);
        assert!(Channel::new("D1", None, ChannelType::Im, "T1").is_private);
    }

    #[test]
    fn test_thread_reply_detection() {
        assert!(!message("1.000000", None, 0).is_thread_reply());
        assert!(!message("1.000000", Some("1.000000"), 2).is_thread_reply());
        assert!(message("2.000000", Some("1.000000"), 0).is_thread_reply());

        assert!(message("1.000000", Some("1.000000"), 2).is_thread_parent());
        assert!(!message("1.000000", None, 0).is_thread_parent());
    }

    #[test]
    fn test_preferred_name_fallbacks() {
        let user = User::new("U1", "jdoe", "T1");
        assert_eq!(user.preferred_name(), "jdoe");
        let user = user.with_names("Jay", "Jay Doe");
        assert_eq!(user.preferred_name(), "Jay");
    }
}
