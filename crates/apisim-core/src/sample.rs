//! Sample workspace data.
//!
//! Fills an empty store with a small, plausible workspace so the mock API
//! has something to return out of the box. Everything is written in a single
//! transaction. With a seed, the generated ids, names and structure repeat
//! across runs.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::channels::{add_member, insert_channel};
use crate::directory::{insert_app, insert_team, insert_user};
use crate::error::{Result, SimError};
use crate::events::insert_event;
use crate::ids::{format_ts, row_id, slack_id_with};
use crate::messages::{insert_message, insert_reaction, NewMessage};
use crate::models::{App, Channel, ChannelType, EventRecord, Message, Team, User};
use crate::store::Store;

const COMPANIES: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Hooli", "Stark", "Wayne", "Tyrell", "Cyberdyne",
    "Soylent", "Vandelay", "Wonka",
];
const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Labs", "Group", "Systems", "Partners"];
const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi", "Ivan", "Judy", "Mallory",
    "Niaj", "Olivia", "Peggy", "Rupert", "Sybil", "Trent", "Victor", "Walter", "Yolanda",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Lee", "Garcia", "Martin", "Clark", "Lopez", "Walker", "Young", "King",
    "Wright", "Hill", "Scott", "Adams", "Baker", "Nelson",
];
const WORDS: &[&str] = &[
    "alpha", "build", "design", "deploy", "docs", "engineering", "feedback", "growth", "infra",
    "launch", "marketing", "ops", "product", "random", "release", "research", "sales", "support",
    "team", "watercooler",
];
const SENTENCE_WORDS: &[&str] = &[
    "the", "release", "is", "ready", "for", "review", "please", "check", "deploy", "logs", "today",
    "tomorrow", "meeting", "notes", "shipped", "bug", "fixed", "thanks", "everyone", "great",
    "work", "on", "this", "update", "new", "feature", "dashboard", "numbers", "look", "good",
];
const EMOJIS: &[&str] = &[
    "thumbsup", "heart", "joy", "open_mouth", "cry", "rage", "thumbsdown", "tada", "fire", "clap",
];
const EVENT_TYPES: &[&str] = &[
    "message",
    "app_mention",
    "reaction_added",
    "member_joined_channel",
    "channel_created",
];

const CHANNEL_KINDS: [ChannelType; 4] = [
    ChannelType::Channel,
    ChannelType::Group,
    ChannelType::Im,
    ChannelType::Mpim,
];

const THIRTY_DAYS_SECS: i64 = 30 * 86_400;

/// How much sample data to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOptions {
    /// Teams, each with one app.
    pub teams: usize,
    /// Users spread over the teams.
    pub users: usize,
    /// Channels spread over the teams.
    pub channels: usize,
    /// Messages including thread replies.
    pub messages: usize,
    /// Upper bound on unique reactions.
    pub reactions: usize,
    /// Recorded event envelopes.
    pub events: usize,
    /// Seed for reproducible output.
    pub seed: Option<u64>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            teams: 3,
            users: 20,
            channels: 10,
            messages: 100,
            reactions: 50,
            events: 50,
            seed: None,
        }
    }
}

impl SampleOptions {
    /// Default sizes with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// Rows written by [`Store::populate_sample_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SampleSummary {
    /// Teams.
    pub teams: usize,
    /// Apps.
    pub apps: usize,
    /// Users.
    pub users: usize,
    /// Channels.
    pub channels: usize,
    /// Channel memberships.
    pub memberships: usize,
    /// Messages.
    pub messages: usize,
    /// Reactions.
    pub reactions: usize,
    /// Event envelopes.
    pub events: usize,
}

fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn sentence<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(3..=20);
    let words: Vec<&str> = (0..len).map(|_| pick(rng, SENTENCE_WORDS)).collect();
    let mut text = words.join(" ");
    if let Some(first) = text.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    text.push('.');
    text
}

struct Generator {
    rng: StdRng,
    summary: SampleSummary,
    teams: Vec<Team>,
    apps: Vec<App>,
    users: Vec<User>,
    channels: Vec<Channel>,
    messages: Vec<Message>,
}

impl Generator {
    fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            summary: SampleSummary::default(),
            teams: Vec::new(),
            apps: Vec::new(),
            users: Vec::new(),
            channels: Vec::new(),
            messages: Vec::new(),
        }
    }

    fn random_team_id(&mut self) -> String {
        let index = self.rng.gen_range(0..self.teams.len());
        self.teams[index].id.clone()
    }

    fn teams_and_apps(&mut self, conn: &rusqlite::Connection, count: usize) -> Result<()> {
        for _ in 0..count.max(1) {
            let company = pick(&mut self.rng, COMPANIES);
            let suffix = pick(&mut self.rng, COMPANY_SUFFIXES);
            let team = Team::new(
                slack_id_with(&mut self.rng, "T"),
                format!("{company} {suffix}"),
                Some(company.to_lowercase()),
            );
            insert_team(conn, &team)?;

            let word = pick(&mut self.rng, WORDS);
            let mut app_name: String = word.chars().take(1).flat_map(char::to_uppercase).collect();
            app_name.push_str(&word[1..]);
            let app = App::new(slack_id_with(&mut self.rng, "A"), format!("{app_name} Bot"), &team.id);
            insert_app(conn, &app)?;

            self.teams.push(team);
            self.apps.push(app);
        }
        self.summary.teams = self.teams.len();
        self.summary.apps = self.apps.len();
        Ok(())
    }

    fn users(&mut self, conn: &rusqlite::Connection, count: usize) -> Result<()> {
        for _ in 0..count {
            let first = pick(&mut self.rng, FIRST_NAMES);
            let last = pick(&mut self.rng, LAST_NAMES);
            let handle = format!("{}.{}", first.to_lowercase(), last.to_lowercase());
            let team_id = self.random_team_id();
            let domain = self
                .teams
                .iter()
                .find(|t| t.id == team_id)
                .and_then(|t| t.domain.clone())
                .unwrap_or_else(|| "example".to_string());

            let mut user = User::new(slack_id_with(&mut self.rng, "U"), handle.clone(), team_id)
                .with_names(first, format!("{first} {last}"))
                .with_email(format!("{handle}@{domain}.example.com"));
            if self.rng.gen_bool(0.1) {
                user = user.bot();
            }
            insert_user(conn, &user)?;
            self.users.push(user);
        }
        self.summary.users = self.users.len();
        Ok(())
    }

    fn channels(&mut self, conn: &rusqlite::Connection, count: usize) -> Result<()> {
        let mut taken: HashSet<(String, String)> = HashSet::new();
        for index in 0..count {
            let (kind, team_id) = if index == 0 {
                (ChannelType::Channel, self.teams[0].id.clone())
            } else {
                let kind = *CHANNEL_KINDS.choose(&mut self.rng).unwrap_or(&ChannelType::Channel);
                (kind, self.random_team_id())
            };

            let name = if index == 0 {
                Some("general".to_string())
            } else if !kind.is_named() {
                None
            } else {
                let base = pick(&mut self.rng, WORDS).to_string();
                let mut candidate = base.clone();
                let mut n = 2;
                while taken.contains(&(team_id.clone(), candidate.clone())) {
                    candidate = format!("{base}-{n}");
                    n += 1;
                }
                Some(candidate)
            };
            if let Some(name) = &name {
                taken.insert((team_id.clone(), name.clone()));
            }

            let mut channel = Channel::new(slack_id_with(&mut self.rng, kind.id_prefix()), name, kind, team_id);
            if self.rng.gen_bool(0.5) {
                channel = channel.with_topic(sentence(&mut self.rng), sentence(&mut self.rng));
            }
            insert_channel(conn, &channel)?;
            self.channels.push(channel);
        }
        self.summary.channels = self.channels.len();
        Ok(())
    }

    fn memberships(&mut self, conn: &rusqlite::Connection) -> Result<()> {
        if self.channels.is_empty() {
            return Ok(());
        }
        let upper = self.channels.len().min(5);
        let lower = upper.min(2);
        for user in &self.users {
            let n = self.rng.gen_range(lower..=upper);
            let picked: Vec<String> = self
                .channels
                .choose_multiple(&mut self.rng, n)
                .map(|c| c.id.clone())
                .collect();
            for channel_id in picked {
                let is_admin = self.rng.gen_bool(0.2);
                if add_member(conn, &channel_id, &user.id, is_admin)? {
                    self.summary.memberships += 1;
                }
            }
        }
        Ok(())
    }

    fn messages(&mut self, conn: &rusqlite::Connection, count: usize) -> Result<()> {
        if self.users.is_empty() || self.channels.is_empty() {
            return Ok(());
        }
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let mut stamps: Vec<u64> = (0..count)
            .map(|_| {
                let secs = now.saturating_sub(self.rng.gen_range(0..THIRTY_DAYS_SECS.unsigned_abs()));
                secs * 1_000_000 + self.rng.gen_range(100_000..1_000_000)
            })
            .collect();
        stamps.sort_unstable();
        stamps.dedup();

        for micros in stamps {
            let user_id = self.users[self.rng.gen_range(0..self.users.len())].id.clone();
            let channel_id = self.channels[self.rng.gen_range(0..self.channels.len())].id.clone();

            let mut new = NewMessage::new(&channel_id, user_id, Some(sentence(&mut self.rng)));
            if self.rng.gen_bool(0.2) {
                let parents: Vec<&Message> = self
                    .messages
                    .iter()
                    .filter(|m| m.channel_id == channel_id && !m.is_thread_reply())
                    .collect();
                if let Some(parent) = parents.choose(&mut self.rng) {
                    new = new.in_thread(parent.ts.clone());
                }
            }
            if self.rng.gen_bool(0.1) {
                new = new.with_subtype("bot_message");
            }
            let message = insert_message(conn, &new, &format_ts(micros))?;
            self.messages.push(message);
        }
        self.summary.messages = self.messages.len();
        Ok(())
    }

    fn reactions(&mut self, conn: &rusqlite::Connection, count: usize) -> Result<()> {
        if self.messages.is_empty() || self.users.is_empty() {
            return Ok(());
        }
        let mut attempts = 0;
        while self.summary.reactions < count && attempts < count * 10 {
            attempts += 1;
            let message_id = self.messages[self.rng.gen_range(0..self.messages.len())].id.clone();
            let user_id = self.users[self.rng.gen_range(0..self.users.len())].id.clone();
            let emoji = pick(&mut self.rng, EMOJIS);
            if insert_reaction(conn, &message_id, &user_id, emoji)? {
                self.summary.reactions += 1;
            }
        }
        Ok(())
    }

    fn event_data(&mut self, team_id: &str, app_id: &str, event_type: &str) -> serde_json::Value {
        let event_ts = format_ts(u64::try_from(Utc::now().timestamp_micros()).unwrap_or_default());
        let team_channels: Vec<&Channel> = self.channels.iter().filter(|c| c.team_id == team_id).collect();
        let team_messages: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| team_channels.iter().any(|c| c.id == m.channel_id))
            .collect();

        match (event_type, team_messages.choose(&mut self.rng)) {
            ("message", Some(message)) => {
                let channel_type = team_channels
                    .iter()
                    .find(|c| c.id == message.channel_id)
                    .map_or("channel", |c| c.channel_type.as_str());
                json!({
                    "type": "message",
                    "channel": message.channel_id,
                    "user": message.user_id,
                    "text": message.text,
                    "ts": message.ts,
                    "event_ts": message.ts,
                    "channel_type": channel_type,
                })
            }
            ("app_mention", Some(message)) => json!({
                "type": "app_mention",
                "channel": message.channel_id,
                "user": message.user_id,
                "text": format!("<@{app_id}> {}", message.text.as_deref().unwrap_or_default()),
                "ts": message.ts,
                "event_ts": message.ts,
            }),
            _ => json!({ "type": event_type, "event_ts": event_ts }),
        }
    }

    fn events(&mut self, conn: &rusqlite::Connection, count: usize) -> Result<()> {
        for _ in 0..count {
            let team_index = self.rng.gen_range(0..self.teams.len());
            let team_id = self.teams[team_index].id.clone();
            let Some(app_id) = self
                .apps
                .iter()
                .find(|a| a.team_id == team_id)
                .map(|a| a.id.clone())
            else {
                continue;
            };
            let event_type = pick(&mut self.rng, EVENT_TYPES);
            let event_data = self.event_data(&team_id, &app_id, event_type);

            let team_users: Vec<String> = self
                .users
                .iter()
                .filter(|u| u.team_id == team_id)
                .map(|u| u.id.clone())
                .collect();
            let authed_count = self.rng.gen_range(1..=3).min(team_users.len());
            let authed_users: Vec<String> = team_users
                .choose_multiple(&mut self.rng, authed_count)
                .cloned()
                .collect();

            let token: String = (0..32).map(|_| format!("{:02x}", self.rng.gen::<u8>())).collect();
            let received = Utc::now() - Duration::seconds(self.rng.gen_range(0..THIRTY_DAYS_SECS));
            let record = EventRecord {
                id: row_id(),
                event_id: slack_id_with(&mut self.rng, "Ev"),
                token,
                team_id,
                api_app_id: app_id,
                event_type: "event_callback".to_string(),
                event_time: received.timestamp(),
                event_data,
                authed_users,
                created_at: Utc::now(),
            };
            insert_event(conn, &record)?;
            self.summary.events += 1;
        }
        Ok(())
    }
}

impl Store {
    /// Populate an empty store with a sample workspace.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidArgument`] when the store already holds
    /// data, or a storage error (in which case nothing is written).
    pub fn populate_sample_data(&self, options: &SampleOptions) -> Result<SampleSummary> {
        if !self.is_empty()? {
            return Err(SimError::InvalidArgument("store already contains data".into()));
        }
        let mut generator = Generator::new(options.seed);
        let summary = self.write(|tx| {
            generator.teams_and_apps(tx, options.teams)?;
            generator.users(tx, options.users)?;
            generator.channels(tx, options.channels)?;
            generator.memberships(tx)?;
            generator.messages(tx, options.messages)?;
            generator.reactions(tx, options.reactions)?;
            generator.events(tx, options.events)?;
            Ok(generator.summary)
        })?;

        info!(
            teams = summary.teams,
            users = summary.users,
            channels = summary.channels,
            memberships = summary.memberships,
            messages = summary.messages,
            reactions = summary.reactions,
            events = summary.events,
            "Populated sample data"
        );
        Ok(summary)
    }
}
