//! Slack-shaped response objects.
//!
//! Stored records are converted into the JSON objects the Slack Web API
//! returns. Fields the simulator does not model are filled with fixed values.

use apisim_core::{Channel, ChannelType, Message, Page, ReactionSummary, Team, ThreadSummary, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const AVATAR_BASE: &str = "https://avatars.slack-edge.com/2023-01-01";
const LOCALE: &str = "en-US";
const USER_COLOR: &str = "e7392d";
const USER_TZ: &str = "America/Los_Angeles";
const USER_TZ_LABEL: &str = "Pacific Standard Time";
const USER_TZ_OFFSET: i32 = -28_800;

/// `response_metadata` carried by paginated responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    /// Cursor for the next page; empty on the last page.
    #[schema(example = "C0PNCRP9N")]
    pub next_cursor: String,
}

impl ResponseMetadata {
    /// Metadata for a page; the cursor is empty on the last page.
    #[must_use]
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            next_cursor: page.next_cursor_or_empty(),
        }
    }
}

// ============================================================================
// Channels
// ============================================================================

/// Topic or purpose of a channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopicView {
    /// Text.
    pub value: String,
    /// Who set it.
    pub creator: String,
    /// When it was set (epoch seconds).
    pub last_set: i64,
}

impl TopicView {
    fn new(value: Option<&str>) -> Self {
        Self {
            value: value.unwrap_or_default().to_string(),
            creator: String::new(),
            last_set: 0,
        }
    }
}

/// A conversation object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "C0PNCRP9N",
    "name": "general",
    "is_channel": true,
    "is_group": false,
    "is_im": false,
    "is_mpim": false,
    "is_private": false,
    "created": 1700000000,
    "is_archived": false,
    "is_general": true,
    "name_normalized": "general",
    "num_members": 4
}))]
#[allow(clippy::struct_excessive_bools)]
pub struct ChannelView {
    /// Channel id.
    pub id: String,
    /// Name; `null` for direct messages.
    pub name: Option<String>,
    /// Public channel.
    pub is_channel: bool,
    /// Private channel.
    pub is_group: bool,
    /// Direct message.
    pub is_im: bool,
    /// Multi-party direct message.
    pub is_mpim: bool,
    /// Private conversation.
    pub is_private: bool,
    /// Creation time (epoch seconds).
    pub created: i64,
    /// Always `false`.
    pub is_archived: bool,
    /// Whether this is the `general` channel.
    pub is_general: bool,
    /// Always 0.
    pub unlinked: u32,
    /// Lower-cased name.
    pub name_normalized: String,
    /// Always `false`.
    pub is_shared: bool,
    /// Always `false`.
    pub is_ext_shared: bool,
    /// Always `false`.
    pub is_org_shared: bool,
    /// Channel purpose.
    pub purpose: TopicView,
    /// Channel topic.
    pub topic: TopicView,
    /// Always `true`.
    pub is_member: bool,
    /// Read marker.
    pub last_read: String,
    /// Newest top-level message, when requested.
    pub latest: Option<MessageView>,
    /// Always 0.
    pub unread_count: u32,
    /// Always 0.
    pub unread_count_display: u32,
    /// Member count (`conversations.info` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_members: Option<u64>,
    /// Locale, when `include_locale` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl ChannelView {
    /// Conversation object for a stored channel.
    #[must_use]
    pub fn new(channel: &Channel, last_read: String) -> Self {
        let name_normalized = channel
            .name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self {
            id: channel.id.clone(),
            name: channel.name.clone(),
            is_channel: channel.channel_type == ChannelType::Channel,
            is_group: channel.channel_type == ChannelType::Group,
            is_im: channel.channel_type == ChannelType::Im,
            is_mpim: channel.channel_type == ChannelType::Mpim,
            is_private: channel.is_private,
            created: channel.created_at.timestamp(),
            is_archived: false,
            is_general: channel.name.as_deref() == Some("general"),
            unlinked: 0,
            name_normalized,
            is_shared: false,
            is_ext_shared: false,
            is_org_shared: false,
            purpose: TopicView::new(channel.purpose.as_deref()),
            topic: TopicView::new(channel.topic.as_deref()),
            is_member: true,
            last_read,
            latest: None,
            unread_count: 0,
            unread_count_display: 0,
            num_members: None,
            locale: None,
        }
    }

    /// Attach the member count.
    #[must_use]
    pub const fn with_num_members(mut self, num_members: u64) -> Self {
        self.num_members = Some(num_members);
        self
    }

    /// Attach the newest message.
    #[must_use]
    pub fn with_latest(mut self, latest: Option<MessageView>) -> Self {
        self.latest = latest;
        self
    }

    /// Attach the locale when `include` is set.
    #[must_use]
    pub fn with_locale(mut self, include: bool) -> Self {
        self.locale = include.then(|| LOCALE.to_string());
        self
    }
}

// ============================================================================
// Messages
// ============================================================================

/// A message object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "type": "message",
    "subtype": null,
    "user": "U061F7AUR",
    "text": "Hello world",
    "ts": "1700000000.000100",
    "thread_ts": "1700000000.000100",
    "reply_count": 1,
    "reply_users_count": 1,
    "latest_reply": "1700000001.000200",
    "reply_users": ["U0G9QF9C6"],
    "reactions": [{"name": "thumbsup", "users": ["U0G9QF9C6"], "count": 1}]
}))]
pub struct MessageView {
    /// Always `message`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Subtype such as `bot_message`.
    pub subtype: Option<String>,
    /// Author.
    pub user: String,
    /// Body.
    pub text: Option<String>,
    /// Timestamp.
    pub ts: String,
    /// Thread parent timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Replies (thread parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u32>,
    /// Distinct repliers (thread parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_users_count: Option<usize>,
    /// Newest reply timestamp (thread parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_reply: Option<String>,
    /// Repliers in first-reply order (thread parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_users: Option<Vec<String>>,
    /// Reactions grouped by emoji.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<ReactionSummary>,
}

impl MessageView {
    /// Message object without thread metadata or reactions.
    #[must_use]
    pub fn new(message: &Message) -> Self {
        Self {
            message_type: message.message_type.clone(),
            subtype: message.subtype.clone(),
            user: message.user_id.clone(),
            text: message.text.clone(),
            ts: message.ts.clone(),
            thread_ts: message.thread_ts.clone(),
            reply_count: None,
            reply_users_count: None,
            latest_reply: None,
            reply_users: None,
            reactions: Vec::new(),
        }
    }

    /// Attach thread metadata; ignored when the thread has no replies.
    #[must_use]
    pub fn with_thread(mut self, summary: ThreadSummary) -> Self {
        if summary.reply_count > 0 {
            self.reply_count = Some(summary.reply_count);
            self.reply_users_count = Some(summary.reply_users.len());
            self.latest_reply = summary.latest_reply;
            self.reply_users = Some(summary.reply_users);
        }
        self
    }

    /// Attach grouped reactions.
    #[must_use]
    pub fn with_reactions(mut self, reactions: Vec<ReactionSummary>) -> Self {
        self.reactions = reactions;
        self
    }
}

// ============================================================================
// Users and teams
// ============================================================================

/// A user's profile block.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileView {
    /// Job title.
    pub title: String,
    /// Phone number.
    pub phone: String,
    /// Skype handle.
    pub skype: String,
    /// Full name.
    pub real_name: String,
    /// Lower-cased full name.
    pub real_name_normalized: String,
    /// Display name.
    pub display_name: String,
    /// Lower-cased display name.
    pub display_name_normalized: String,
    /// Email address.
    pub email: String,
    /// Original avatar.
    pub image_original: String,
    /// 24px avatar.
    pub image_24: String,
    /// 32px avatar.
    pub image_32: String,
    /// 48px avatar.
    pub image_48: String,
    /// 72px avatar.
    pub image_72: String,
    /// 192px avatar.
    pub image_192: String,
    /// 512px avatar.
    pub image_512: String,
    /// Team id.
    pub team: String,
}

/// A user object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "U061F7AUR",
    "team_id": "T1H9RESGL",
    "name": "alice.smith",
    "deleted": false,
    "real_name": "Alice Smith",
    "is_bot": false
}))]
#[allow(clippy::struct_excessive_bools)]
pub struct UserView {
    /// User id.
    pub id: String,
    /// Team id.
    pub team_id: String,
    /// Handle.
    pub name: String,
    /// Always `false`.
    pub deleted: bool,
    /// Display color.
    pub color: String,
    /// Full name, falling back to the handle.
    pub real_name: String,
    /// Time zone.
    pub tz: String,
    /// Time zone label.
    pub tz_label: String,
    /// Time zone offset in seconds.
    pub tz_offset: i32,
    /// Profile block.
    pub profile: ProfileView,
    /// Always `false`.
    pub is_admin: bool,
    /// Always `false`.
    pub is_owner: bool,
    /// Always `false`.
    pub is_primary_owner: bool,
    /// Always `false`.
    pub is_restricted: bool,
    /// Always `false`.
    pub is_ultra_restricted: bool,
    /// Bot account.
    pub is_bot: bool,
    /// Always `false`.
    pub is_app_user: bool,
    /// Last update (epoch seconds).
    pub updated: i64,
    /// Always `false`.
    pub has_2fa: bool,
    /// Locale, when `include_locale` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl UserView {
    /// User object for a stored user.
    #[must_use]
    pub fn new(user: &User, include_locale: bool) -> Self {
        let real_name = user.real_name.clone().unwrap_or_else(|| user.name.clone());
        let display_name = user.display_name.clone().unwrap_or_else(|| user.name.clone());
        let avatar = |size: &str| format!("{AVATAR_BASE}/{}_{size}.png", user.id);

        Self {
            id: user.id.clone(),
            team_id: user.team_id.clone(),
            name: user.name.clone(),
            deleted: false,
            color: USER_COLOR.to_string(),
            real_name: real_name.clone(),
            tz: USER_TZ.to_string(),
            tz_label: USER_TZ_LABEL.to_string(),
            tz_offset: USER_TZ_OFFSET,
            profile: ProfileView {
                title: String::new(),
                phone: String::new(),
                skype: String::new(),
                real_name_normalized: real_name.to_lowercase(),
                real_name,
                display_name_normalized: display_name.to_lowercase(),
                display_name,
                email: user.email.clone().unwrap_or_default(),
                image_original: avatar("original"),
                image_24: avatar("24"),
                image_32: avatar("32"),
                image_48: avatar("48"),
                image_72: avatar("72"),
                image_192: avatar("192"),
                image_512: avatar("512"),
                team: user.team_id.clone(),
            },
            is_admin: false,
            is_owner: false,
            is_primary_owner: false,
            is_restricted: false,
            is_ultra_restricted: false,
            is_bot: user.is_bot,
            is_app_user: false,
            updated: user.updated_at.timestamp(),
            has_2fa: false,
            locale: include_locale.then(|| LOCALE.to_string()),
        }
    }
}

/// Team icon URLs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamIconView {
    /// 34px icon.
    pub image_34: String,
    /// 44px icon.
    pub image_44: String,
    /// 68px icon.
    pub image_68: String,
    /// 88px icon.
    pub image_88: String,
    /// 102px icon.
    pub image_102: String,
    /// 132px icon.
    pub image_132: String,
    /// Original icon.
    pub image_original: String,
}

/// A team object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamView {
    /// Team id.
    pub id: String,
    /// Team name.
    pub name: String,
    /// Workspace subdomain.
    pub domain: Option<String>,
    /// Email domain.
    pub email_domain: Option<String>,
    /// Icons.
    pub icon: TeamIconView,
    /// Always `null`.
    pub enterprise_id: Option<String>,
    /// Always `null`.
    pub enterprise_name: Option<String>,
}

impl TeamView {
    /// Team object for a stored team.
    #[must_use]
    pub fn new(team: &Team) -> Self {
        let icon = |size: &str| format!("{AVATAR_BASE}/{}_{size}.png", team.id);
        Self {
            id: team.id.clone(),
            name: team.name.clone(),
            domain: team.domain.clone(),
            email_domain: team.domain.clone(),
            icon: TeamIconView {
                image_34: icon("34"),
                image_44: icon("44"),
                image_68: icon("68"),
                image_88: icon("88"),
                image_102: icon("102"),
                image_132: icon("132"),
                image_original: icon("original"),
            },
            enterprise_id: None,
            enterprise_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_view_flags() {
        let channel = Channel::new("G1", Some("Secret".into()), ChannelType::Group, "T1");
        let view = ChannelView::new(&channel, "1.000000".into()).with_locale(true);
        assert!(view.is_group && view.is_private);
        assert!(!view.is_channel && !view.is_general);
        assert_eq!(view.name_normalized, "secret");
        assert_eq!(view.locale.as_deref(), Some("en-US"));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("num_members").is_none());
        assert_eq!(json["topic"]["value"], "");
    }

    #[test]
    fn test_message_view_thread_metadata() {
        let mut message = Message {
            id: "m1".into(),
            ts: "1700000000.000001".into(),
            text: Some("hi".into()),
            user_id: "U1".into(),
            channel_id: "C1".into(),
            thread_ts: None,
            reply_count: 0,
            message_type: "message".into(),
            subtype: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let plain = serde_json::to_value(MessageView::new(&message).with_thread(ThreadSummary::default())).unwrap();
        assert!(plain.get("reply_count").is_none());
        assert!(plain.get("reactions").is_none());
        assert!(plain["subtype"].is_null());

        message.thread_ts = Some(message.ts.clone());
        let summary = ThreadSummary {
            reply_count: 2,
            reply_users: vec!["U2".into(), "U3".into()],
            latest_reply: Some("1700000001.000001".into()),
        };
        let view = MessageView::new(&message).with_thread(summary);
        assert_eq!(view.reply_count, Some(2));
        assert_eq!(view.reply_users_count, Some(2));
        assert_eq!(view.latest_reply.as_deref(), Some("1700000001.000001"));
    }

    #[test]
    fn test_user_view_falls_back_to_handle() {
        let user = User::new("U1", "alice", "T1");
        let view = UserView::new(&user, false);
        assert_eq!(view.real_name, "alice");
        assert_eq!(view.profile.display_name, "alice");
        assert!(view.profile.image_48.ends_with("U1_48.png"));
        assert!(view.locale.is_none());
    }
}
