//! Unified error types for the apisim core library.
//!
//! [`SimError`] covers every failure mode of the simulator: lookups that miss,
//! conflicting writes, malformed input and storage failures. Each variant knows
//! its HTTP status and the Slack-style error code the mock API reports, so the
//! server layer can translate errors without inspecting messages.
//!
//! # Example
//!
//! ```rust
//! use apisim_core::error::{Result, SimError};
//!
//! fn require_channel(channel: Option<&str>) -> Result<&str> {
//!     channel.ok_or_else(|| SimError::InvalidArgument("channel is required".into()))
//! }
//! ```

use thiserror::Error;

/// The unified error type for all simulator operations.
#[derive(Debug, Error)]
pub enum SimError {
    // =========================================================================
    // LOOKUP ERRORS
    // =========================================================================
    /// No channel exists with the given id.
    #[error("Channel not found: '{0}'")]
    ChannelNotFound(String),

    /// No user exists with the given id.
    #[error("User not found: '{0}'")]
    UserNotFound(String),

    /// The workspace has no team.
    #[error("No team has been created in this workspace")]
    TeamNotFound,

    /// No message with this timestamp exists in the channel.
    #[error("Message {ts} not found in channel {channel}")]
    MessageNotFound {
        /// Channel that was searched.
        channel: String,
        /// Timestamp that was not found.
        ts: String,
    },

    /// The thread parent does not exist.
    #[error("Thread {ts} not found in channel {channel}")]
    ThreadNotFound {
        /// Channel that was searched.
        channel: String,
        /// Parent timestamp that was not found.
        ts: String,
    },

    // =========================================================================
    // CONFLICT ERRORS
    // =========================================================================
    /// The user already reacted to the message with this emoji.
    #[error("User {user} already reacted with :{emoji}:")]
    AlreadyReacted {
        /// Reacting user.
        user: String,
        /// Emoji name.
        emoji: String,
    },

    /// The user has no such reaction on the message.
    #[error("User {user} has no :{emoji}: reaction on this message")]
    NoReaction {
        /// Reacting user.
        user: String,
        /// Emoji name.
        emoji: String,
    },

    /// A channel with this name already exists in the team.
    #[error("A channel named '{0}' already exists")]
    NameTaken(String),

    // =========================================================================
    // INPUT ERRORS
    // =========================================================================
    /// A request argument is missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The channel name does not satisfy the naming rules.
    #[error("Invalid channel name '{0}': use 1-80 lowercase letters, digits, '-' or '_'")]
    InvalidChannelName(String),

    /// A `url_verification` envelope arrived without a challenge.
    #[error("url_verification request is missing the challenge value")]
    MissingChallenge,

    /// An event envelope cannot be recorded.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    // =========================================================================
    // STORAGE ERRORS
    // =========================================================================
    /// The underlying SQLite database reported an error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event payload (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the database connection.
    #[error("Database connection lock was poisoned")]
    LockPoisoned,

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Returns `true` if the error means a referenced record does not exist.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound(_)
                | Self::UserNotFound(_)
                | Self::TeamNotFound
                | Self::MessageNotFound { .. }
                | Self::ThreadNotFound { .. }
        )
    }

    /// Returns `true` if the error was caused by the caller rather than the server.
    #[inline]
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !self.is_storage_error()
    }

    /// Returns `true` if the error originated in persistence.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::LockPoisoned | Self::Io(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input or rejected state change
            Self::AlreadyReacted { .. }
            | Self::NameTaken(_)
            | Self::InvalidArgument(_)
            | Self::InvalidChannelName(_)
            | Self::MissingChallenge
            | Self::InvalidEvent(_) => 400,

            // 404 Not Found
            Self::ChannelNotFound(_)
            | Self::UserNotFound(_)
            | Self::TeamNotFound
            | Self::MessageNotFound { .. }
            | Self::ThreadNotFound { .. }
            | Self::NoReaction { .. } => 404,

            // 500 Internal Server Error
            Self::Database(_) | Self::Serialization(_) | Self::LockPoisoned | Self::Io(_) => 500,
        }
    }

    /// Returns the Slack-style error code reported in `{"ok": false, "error": ...}`.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ChannelNotFound(_) => "channel_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::TeamNotFound => "team_not_found",
            Self::MessageNotFound { .. } => "message_not_found",
            Self::ThreadNotFound { .. } => "thread_not_found",
            Self::AlreadyReacted { .. } => "already_reacted",
            Self::NoReaction { .. } => "no_reaction",
            Self::NameTaken(_) => "name_taken",
            Self::InvalidArgument(_) => "invalid_arguments",
            Self::InvalidChannelName(_) => "invalid_name",
            Self::MissingChallenge => "missing_challenge",
            Self::InvalidEvent(_) => "invalid_event",
            Self::Database(_) | Self::Serialization(_) | Self::LockPoisoned | Self::Io(_) => {
                "internal_error"
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(SimError::ChannelNotFound("C1".into()).is_not_found());
        assert!(SimError::TeamNotFound.is_not_found());
        assert!(SimError::MessageNotFound {
            channel: "C1".into(),
            ts: "1.000000".into()
        }
        .is_not_found());

        assert!(!SimError::MissingChallenge.is_not_found());
        assert!(!SimError::LockPoisoned.is_not_found());
    }

    #[test]
    fn test_storage_classification() {
        assert!(SimError::LockPoisoned.is_storage_error());
        assert!(SimError::Database(rusqlite::Error::QueryReturnedNoRows).is_storage_error());
        assert!(!SimError::NameTaken("general".into()).is_storage_error());
        assert!(SimError::NameTaken("general".into()).is_client_error());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            SimError::AlreadyReacted {
                user: "U1".into(),
                emoji: "tada".into()
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            SimError::NoReaction {
                user: "U1".into(),
                emoji: "tada".into()
            }
            .http_status_code(),
            404
        );
        assert_eq!(SimError::UserNotFound("U1".into()).http_status_code(), 404);
        assert_eq!(SimError::LockPoisoned.http_status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SimError::TeamNotFound.error_code(), "team_not_found");
        assert_eq!(
            SimError::InvalidChannelName("Bad Name".into()).error_code(),
            "invalid_name"
        );
        assert_eq!(SimError::LockPoisoned.error_code(), "internal_error");
    }

    #[test]
    fn test_error_display_messages() {
        let err = SimError::MessageNotFound {
            channel: "C123".into(),
            ts: "1700000000.000100".into(),
        };
        let text = err.to_string();
        assert!(text.contains("C123"));
        assert!(text.contains("1700000000.000100"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SimError>();
        assert_sync::<SimError>();
    }
}
