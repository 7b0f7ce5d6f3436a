//! # apisim-core
//!
//! Core domain logic for the apisim Slack-like API simulator.
//!
//! This crate provides:
//! - The messaging data model (teams, apps, users, channels, messages, reactions, events)
//! - A SQLite-backed [`Store`] with transactional multi-step operations
//! - Cursor pagination shared by every list endpoint
//! - Events API envelope handling
//! - Sample workspace generation
//! - Configuration loading and validation
//!
//! ## Architecture
//!
//! - [`store`] - Connection management, schema and transactions
//! - [`directory`] - Teams, apps and users
//! - [`channels`] - Conversations and channel membership
//! - [`messages`] - Messages, threads and reactions
//! - [`events`] - Events API envelopes and their side effects
//! - [`sample`] - Sample data population
//! - [`pagination`] - Cursor pagination primitives
//! - [`ids`] - Slack-style identifiers and message timestamps
//! - [`models`] - Domain records
//! - [`config`] - Application configuration
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod channels;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod ids;
pub mod messages;
pub mod models;
pub mod pagination;
pub mod sample;
pub mod store;

// Re-export primary types for convenience
pub use channels::ChannelFilter;
pub use crate::config::{
    default_data_dir, AppConfig, AuthConfig, ConfigError, ConfigResult, DatabaseConfig,
    LoggingConfig, PaginationConfig, ServerConfig, SimulationConfig,
};
pub use error::{Result, SimError};
pub use events::{EventEnvelope, EventOutcome};
pub use ids::{format_ts, normalize_ts, parse_ts, slack_id, TsClock};
pub use messages::{HistoryQuery, MessageDetails, NewMessage};
pub use models::{
    App, Channel, ChannelType, EventRecord, Message, Reaction, ReactionSummary, Team,
    ThreadSummary, User,
};
pub use pagination::{Page, PageRequest};
pub use sample::{SampleOptions, SampleSummary};
pub use store::{Store, StoreCounts};
