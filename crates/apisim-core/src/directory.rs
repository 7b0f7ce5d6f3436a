//! Teams, apps and users.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{Result, SimError};
use crate::models::{App, Team, User};
use crate::pagination::{Page, PageRequest};
use crate::store::Store;

const TEAM_COLUMNS: &str = "id, name, domain, created_at, updated_at";
const APP_COLUMNS: &str = "id, name, team_id, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, name, display_name, real_name, email, is_bot, team_id, created_at, updated_at";

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        domain: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn app_from_row(row: &Row<'_>) -> rusqlite::Result<App> {
    Ok(App {
        id: row.get(0)?,
        name: row.get(1)?,
        team_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        real_name: row.get(3)?,
        email: row.get(4)?,
        is_bot: row.get(5)?,
        team_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// =============================================================================
// CONNECTION-LEVEL OPERATIONS
// =============================================================================

pub(crate) fn insert_team(conn: &Connection, team: &Team) -> Result<()> {
    conn.execute(
        "INSERT INTO teams (id, name, domain, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![team.id, team.name, team.domain, team.created_at, team.updated_at],
    )?;
    Ok(())
}

pub(crate) fn insert_app(conn: &Connection, app: &App) -> Result<()> {
    conn.execute(
        "INSERT INTO apps (id, name, team_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![app.id, app.name, app.team_id, app.created_at, app.updated_at],
    )?;
    Ok(())
}

pub(crate) fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            user.id,
            user.name,
            user.display_name,
            user.real_name,
            user.email,
            user.is_bot,
            user.team_id,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_team(conn: &Connection, id: &str) -> Result<Option<Team>> {
    Ok(conn
        .query_row(
            &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?1"),
            [id],
            team_from_row,
        )
        .optional()?)
}

pub(crate) fn find_app(conn: &Connection, id: &str) -> Result<Option<App>> {
    Ok(conn
        .query_row(
            &format!("SELECT {APP_COLUMNS} FROM apps WHERE id = ?1"),
            [id],
            app_from_row,
        )
        .optional()?)
}

pub(crate) fn find_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?)
}

pub(crate) fn user_exists(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn first_team(conn: &Connection) -> Result<Option<Team>> {
    Ok(conn
        .query_row(
            &format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY rowid LIMIT 1"),
            [],
            team_from_row,
        )
        .optional()?)
}

/// Provision the configured bot user in `team_id` if it does not exist yet.
pub(crate) fn ensure_bot_user(conn: &Connection, id: &str, team_id: &str) -> Result<User> {
    if let Some(user) = find_user(conn, id)? {
        return Ok(user);
    }
    let user = User::new(id, "slackbot", team_id)
        .with_names("Slackbot", "Slackbot")
        .bot();
    insert_user(conn, &user)?;
    info!(user = %id, team = %team_id, "Provisioned bot user");
    Ok(user)
}

// =============================================================================
// STORE API
// =============================================================================

impl Store {
    /// Insert a team.
    ///
    /// # Errors
    ///
    /// Returns a database error, e.g. when the id already exists.
    pub fn insert_team(&self, team: &Team) -> Result<()> {
        self.write(|tx| insert_team(tx, team))
    }

    /// Insert an app.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TeamNotFound`] when the owning team is missing.
    pub fn insert_app(&self, app: &App) -> Result<()> {
        self.write(|tx| {
            if find_team(tx, &app.team_id)?.is_none() {
                return Err(SimError::TeamNotFound);
            }
            insert_app(tx, app)
        })
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TeamNotFound`] when the owning team is missing.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.write(|tx| {
            if find_team(tx, &user.team_id)?.is_none() {
                return Err(SimError::TeamNotFound);
            }
            insert_user(tx, user)
        })
    }

    /// Look up a team by id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn team(&self, id: &str) -> Result<Option<Team>> {
        self.read(|conn| find_team(conn, id))
    }

    /// Look up an app by id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn app(&self, id: &str) -> Result<Option<App>> {
        self.read(|conn| find_app(conn, id))
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn user(&self, id: &str) -> Result<Option<User>> {
        self.read(|conn| find_user(conn, id))
    }

    /// The first team created.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn first_team(&self) -> Result<Option<Team>> {
        self.read(first_team)
    }

    /// The first user created.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn first_user(&self) -> Result<Option<User>> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid LIMIT 1"),
                    [],
                    user_from_row,
                )
                .optional()?)
        })
    }

    /// Users ordered by id, paginated by id.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn list_users(&self, page: &PageRequest) -> Result<Page<User>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR id > ?1)
                 ORDER BY id ASC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![page.cursor, page.fetch_limit()], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Page::from_overfetch(rows, page.limit, |user| user.id.clone()))
        })
    }

    /// Return the bot user, creating it in `team_id` on first use.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub fn ensure_bot_user(&self, id: &str, team_id: &str) -> Result<User> {
        self.write(|tx| ensure_bot_user(tx, id, team_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_team() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.insert_team(&Team::new("T1", "Acme", Some("acme".into()))).unwrap();
        store
    }

    #[test]
    fn test_insert_and_get_team_app_user() {
        let store = store_with_team();
        store.insert_app(&App::new("A1", "Bot App", "T1")).unwrap();
        store
            .insert_user(&User::new("U1", "alice", "T1").with_email("alice@example.com"))
            .unwrap();

        assert_eq!(store.team("T1").unwrap().unwrap().domain.as_deref(), Some("acme"));
        assert_eq!(store.app("A1").unwrap().unwrap().name, "Bot App");
        let user = store.user("U1").unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert!(!user.is_bot);
        assert!(store.user("U404").unwrap().is_none());
    }

    #[test]
    fn test_user_requires_team() {
        let store = Store::open_in_memory().unwrap();
        let err = store.insert_user(&User::new("U1", "alice", "T404")).unwrap_err();
        assert!(matches!(err, SimError::TeamNotFound));
    }

    #[test]
    fn test_first_team_and_user_follow_insertion_order() {
        let store = Store::open_in_memory().unwrap();
        store.insert_team(&Team::new("TZZ", "Zed", None)).unwrap();
        store.insert_team(&Team::new("TAA", "Aye", None)).unwrap();
        store.insert_user(&User::new("UZZ", "zed", "TZZ")).unwrap();
        store.insert_user(&User::new("UAA", "aye", "TAA")).unwrap();

        assert_eq!(store.first_team().unwrap().unwrap().id, "TZZ");
        assert_eq!(store.first_user().unwrap().unwrap().id, "UZZ");
    }

    #[test]
    fn test_list_users_paginates_by_id() {
        let store = store_with_team();
        for id in ["U3", "U1", "U2"] {
            store.insert_user(&User::new(id, id.to_lowercase(), "T1")).unwrap();
        }

        let first = store.list_users(&PageRequest::first(2)).unwrap();
        let ids: Vec<_> = first.items.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["U1", "U2"]);
        assert!(first.has_more);
        assert_eq!(first.next_cursor.as_deref(), Some("U2"));

        let second = store.list_users(&PageRequest::after("U2", 2)).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "U3");
        assert!(!second.has_more);
    }

    #[test]
    fn test_ensure_bot_user_is_idempotent() {
        let store = store_with_team();
        let bot = store.ensure_bot_user("USLACKBOT", "T1").unwrap();
        assert!(bot.is_bot);
        assert_eq!(bot.preferred_name(), "Slackbot");

        store.ensure_bot_user("USLACKBOT", "T1").unwrap();
        assert_eq!(store.counts().unwrap().users, 1);
    }
}
