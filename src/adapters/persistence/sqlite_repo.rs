//! SQLite-backed roster storage via libsql. Implements RosterRepoPort, UserPort and AssignmentPort.
//!
//! One database file: data/roster.db. Every connection enables foreign keys so
//! deleting a roster or a user cascades to its roster entries.
//! `(roster_id, identifier)` is unique; a violation is reported as an identifier
//! validation failure, never as a storage error.

use crate::domain::{
    AssignmentId, DomainError, EntryField, EntryWithRepo, GithubAccount, GroupAssignmentId,
    NewRosterEntry, Roster, RosterEntry, RosterEntryId, RosterId, User, UserId,
};
use crate::ports::{AssignmentPort, RosterRepoPort, UnitOfWork, UserPort};
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Database, Row, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const ROSTERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rosters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier TEXT NOT NULL,
    created_at INTEGER NOT NULL
)"#;

const USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    github_id INTEGER,
    github_login TEXT,
    github_name TEXT
)"#;

const ROSTER_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS roster_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    roster_id INTEGER NOT NULL REFERENCES rosters (id) ON DELETE CASCADE,
    user_id INTEGER REFERENCES users (id) ON DELETE CASCADE,
    identifier TEXT NOT NULL,
    lms_user_id TEXT,
    created_at INTEGER NOT NULL
)"#;
const ROSTER_ENTRIES_IDENTIFIER_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_roster_entries_identifier ON roster_entries (roster_id, identifier)";
const ROSTER_ENTRIES_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_roster_entries_user ON roster_entries (user_id)";

/// One repo per (assignment, user): the user accepted the assignment.
const ASSIGNMENT_REPOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS assignment_repos (
    assignment_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (assignment_id, user_id)
)"#;

/// Team repo access lists, flattened: one team per (group assignment, user).
const TEAM_ACCESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS team_access (
    group_assignment_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    team_name TEXT NOT NULL,
    PRIMARY KEY (group_assignment_id, user_id)
)"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ENTRY_COLUMNS: &str = "id, roster_id, identifier, user_id, lms_user_id, created_at";

fn repo_err(e: libsql::Error) -> DomainError {
    DomainError::Repo(e.to_string())
}

/// Map an insert failure on `roster_entries` to a field-level validation error where one applies.
fn insert_err(e: libsql::Error) -> DomainError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        DomainError::Validation {
            field: EntryField::Identifier,
            message: "has already been taken".to_string(),
        }
    } else if msg.contains("FOREIGN KEY constraint failed") {
        DomainError::Validation {
            field: EntryField::Roster,
            message: "must exist".to_string(),
        }
    } else {
        DomainError::Repo(msg)
    }
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

/// Reads the `ENTRY_COLUMNS` projection starting at column 0.
fn row_to_entry(row: &Row) -> Result<RosterEntry, DomainError> {
    Ok(RosterEntry {
        id: row.get(0).map_err(repo_err)?,
        roster_id: row.get(1).map_err(repo_err)?,
        identifier: row.get(2).map_err(repo_err)?,
        user_id: row.get::<Option<i64>>(3).map_err(repo_err)?,
        lms_user_id: row.get::<Option<String>>(4).map_err(repo_err)?,
        created_at: to_datetime(row.get(5).map_err(repo_err)?),
    })
}

fn row_to_roster(row: &Row) -> Result<Roster, DomainError> {
    Ok(Roster {
        id: row.get(0).map_err(repo_err)?,
        identifier: row.get(1).map_err(repo_err)?,
        created_at: to_datetime(row.get(2).map_err(repo_err)?),
    })
}

/// `github_id, github_login, github_name` starting at `offset`; `None` when the user has no account.
fn row_to_github(row: &Row, offset: i32) -> Result<Option<GithubAccount>, DomainError> {
    let github_id: Option<i64> = row.get(offset).map_err(repo_err)?;
    let login: Option<String> = row.get(offset + 1).map_err(repo_err)?;
    let name: Option<String> = row.get(offset + 2).map_err(repo_err)?;
    Ok(github_id.zip(login).map(|(github_id, login)| GithubAccount {
        github_id,
        login,
        name,
    }))
}

async fn select_entries(conn: &Connection, roster_id: RosterId) -> Result<Vec<RosterEntry>, DomainError> {
    let mut rows = conn
        .query(
            &format!("SELECT {ENTRY_COLUMNS} FROM roster_entries WHERE roster_id = ?1 ORDER BY id"),
            params![roster_id],
        )
        .await
        .map_err(repo_err)?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next().await.map_err(repo_err)? {
        entries.push(row_to_entry(&row)?);
    }
    Ok(entries)
}

/// Validate and insert one entry on `conn` (plain connection or open transaction).
async fn insert_entry_on(conn: &Connection, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError> {
    entry.validate()?;
    let now = Utc::now().timestamp();
    conn.execute(
        r#"
        INSERT INTO roster_entries (roster_id, identifier, lms_user_id, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![entry.roster_id, entry.identifier.as_str(), entry.lms_user_id.clone(), now],
    )
    .await
    .map_err(insert_err)?;

    Ok(RosterEntry {
        id: conn.last_insert_rowid(),
        roster_id: entry.roster_id,
        identifier: entry.identifier.clone(),
        user_id: None,
        lms_user_id: entry.lms_user_id.clone(),
        created_at: to_datetime(now),
    })
}

/// SQLite repository. One database file (roster.db) in the given base directory.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
}

impl SqliteRepo {
    /// Connect to (or create) the SQLite database and ensure the schema exists.
    /// Call this once at startup; the returned repo is safe to share via Arc.
    ///
    /// Sets WAL mode and synchronous=NORMAL: concurrent readers plus one writer.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Repo(e.to_string()))?;
        let db_path = base.join("roster.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;

        // PRAGMA returns a row (new value); use query and consume rows (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Repo(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(repo_err)?.is_some() {}
        let mut sync_rows = conn
            .query("PRAGMA synchronous=NORMAL", ())
            .await
            .map_err(|e| DomainError::Repo(format!("synchronous pragma failed: {}", e)))?;
        while sync_rows.next().await.map_err(repo_err)?.is_some() {}

        for ddl in [
            ROSTERS_TABLE,
            USERS_TABLE,
            ROSTER_ENTRIES_TABLE,
            ROSTER_ENTRIES_IDENTIFIER_INDEX,
            ROSTER_ENTRIES_USER_INDEX,
            ASSIGNMENT_REPOS_TABLE,
            TEAM_ACCESS_TABLE,
        ] {
            conn.execute(ddl, ()).await.map_err(repo_err)?;
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// New connection with foreign keys enforced (the pragma is per connection).
    /// Waits up to `BUSY_TIMEOUT` for the write lock instead of failing with `SQLITE_BUSY`.
    async fn conn(&self) -> Result<Connection, DomainError> {
        let conn = self.db.connect().map_err(repo_err)?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| DomainError::Repo(format!("busy_timeout failed: {}", e)))?;
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DomainError::Repo(format!("foreign_keys pragma failed: {}", e)))?;
        Ok(conn)
    }

    async fn require_entry(&self, conn: &Connection, entry_id: RosterEntryId) -> Result<RosterEntry, DomainError> {
        let mut rows = conn
            .query(
                &format!("SELECT {ENTRY_COLUMNS} FROM roster_entries WHERE id = ?1"),
                params![entry_id],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => row_to_entry(&row),
            None => Err(DomainError::NotFound {
                kind: "roster entry",
                id: entry_id,
            }),
        }
    }
}

#[async_trait::async_trait]
impl RosterRepoPort for SqliteRepo {
    async fn create_roster(&self, identifier: &str) -> Result<Roster, DomainError> {
        let conn = self.conn().await?;
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO rosters (identifier, created_at) VALUES (?1, ?2)",
            params![identifier, now],
        )
        .await
        .map_err(repo_err)?;
        Ok(Roster {
            id: conn.last_insert_rowid(),
            identifier: identifier.to_string(),
            created_at: to_datetime(now),
        })
    }

    async fn find_roster(&self, roster_id: RosterId) -> Result<Option<Roster>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, identifier, created_at FROM rosters WHERE id = ?1",
                params![roster_id],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(Some(row_to_roster(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_rosters(&self) -> Result<Vec<Roster>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query("SELECT id, identifier, created_at FROM rosters ORDER BY id", ())
            .await
            .map_err(repo_err)?;
        let mut rosters = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            rosters.push(row_to_roster(&row)?);
        }
        Ok(rosters)
    }

    async fn delete_roster(&self, roster_id: RosterId) -> Result<(), DomainError> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM rosters WHERE id = ?1", params![roster_id])
            .await
            .map_err(repo_err)?;
        if deleted == 0 {
            return Err(DomainError::NotFound {
                kind: "roster",
                id: roster_id,
            });
        }
        Ok(())
    }

    async fn insert_entry(&self, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError> {
        let conn = self.conn().await?;
        insert_entry_on(&conn, entry).await
    }

    async fn find_entry(&self, entry_id: RosterEntryId) -> Result<Option<RosterEntry>, DomainError> {
        let conn = self.conn().await?;
        match self.require_entry(&conn, entry_id).await {
            Ok(entry) => Ok(Some(entry)),
            Err(DomainError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_entries(&self, roster_id: RosterId) -> Result<Vec<RosterEntry>, DomainError> {
        let conn = self.conn().await?;
        select_entries(&conn, roster_id).await
    }

    async fn set_entry_user(
        &self,
        entry_id: RosterEntryId,
        user_id: Option<UserId>,
    ) -> Result<RosterEntry, DomainError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE roster_entries SET user_id = ?1 WHERE id = ?2",
            params![user_id, entry_id],
        )
        .await
        .map_err(repo_err)?;
        self.require_entry(&conn, entry_id).await
    }

    async fn delete_entry(&self, entry_id: RosterEntryId) -> Result<(), DomainError> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM roster_entries WHERE id = ?1", params![entry_id])
            .await
            .map_err(repo_err)?;
        if deleted == 0 {
            return Err(DomainError::NotFound {
                kind: "roster entry",
                id: entry_id,
            });
        }
        Ok(())
    }

    /// IMMEDIATE: takes the write lock up front so concurrent bulk creators
    /// serialize instead of reading the same existing identifiers.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let conn = self.conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(repo_err)?;
        Ok(Box::new(SqliteUnitOfWork { tx }))
    }
}

/// Unit of work backed by a libsql transaction.
pub struct SqliteUnitOfWork {
    tx: libsql::Transaction,
}

#[async_trait::async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn roster_exists(&mut self, roster_id: RosterId) -> Result<bool, DomainError> {
        let mut rows = self
            .tx
            .query("SELECT 1 FROM rosters WHERE id = ?1", params![roster_id])
            .await
            .map_err(repo_err)?;
        Ok(rows.next().await.map_err(repo_err)?.is_some())
    }

    async fn existing_identifiers(&mut self, roster_id: RosterId) -> Result<HashSet<String>, DomainError> {
        let mut rows = self
            .tx
            .query(
                "SELECT identifier FROM roster_entries WHERE roster_id = ?1",
                params![roster_id],
            )
            .await
            .map_err(repo_err)?;
        let mut identifiers = HashSet::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            identifiers.insert(row.get::<String>(0).map_err(repo_err)?);
        }
        Ok(identifiers)
    }

    async fn create_entry(&mut self, entry: &NewRosterEntry) -> Result<RosterEntry, DomainError> {
        insert_entry_on(&self.tx, entry).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(repo_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.rollback().await.map_err(repo_err)
    }
}

#[async_trait::async_trait]
impl UserPort for SqliteRepo {
    async fn create_user(&self, github: Option<GithubAccount>) -> Result<User, DomainError> {
        let conn = self.conn().await?;
        let (github_id, login, name) = match &github {
            Some(g) => (Some(g.github_id), Some(g.login.clone()), g.name.clone()),
            None => (None, None, None),
        };
        conn.execute(
            "INSERT INTO users (github_id, github_login, github_name) VALUES (?1, ?2, ?3)",
            params![github_id, login, name],
        )
        .await
        .map_err(repo_err)?;
        Ok(User {
            id: conn.last_insert_rowid(),
            github,
        })
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, github_id, github_login, github_name FROM users WHERE id = ?1",
                params![user_id],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(Some(User {
                id: row.get(0).map_err(repo_err)?,
                github: row_to_github(&row, 1)?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), DomainError> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])
            .await
            .map_err(repo_err)?;
        if deleted == 0 {
            return Err(DomainError::NotFound {
                kind: "user",
                id: user_id,
            });
        }
        Ok(())
    }

    async fn linked_accounts(&self, roster_id: RosterId) -> Result<HashMap<UserId, GithubAccount>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT u.id, u.github_id, u.github_login, u.github_name
                FROM roster_entries re
                JOIN users u ON u.id = re.user_id
                WHERE re.roster_id = ?1 AND u.github_id IS NOT NULL
                "#,
                params![roster_id],
            )
            .await
            .map_err(repo_err)?;
        let mut accounts = HashMap::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let user_id: i64 = row.get(0).map_err(repo_err)?;
            if let Some(github) = row_to_github(&row, 1)? {
                accounts.insert(user_id, github);
            }
        }
        Ok(accounts)
    }
}

#[async_trait::async_trait]
impl AssignmentPort for SqliteRepo {
    async fn record_assignment_repo(
        &self,
        assignment_id: AssignmentId,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let conn = self.conn().await?;
        conn.execute(
            r#"
            INSERT INTO assignment_repos (assignment_id, user_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (assignment_id, user_id) DO UPDATE SET created_at = excluded.created_at
            "#,
            params![assignment_id, user_id, created_at.timestamp()],
        )
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn accepted_user_ids(&self, assignment_id: AssignmentId) -> Result<HashSet<UserId>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT user_id FROM assignment_repos WHERE assignment_id = ?1",
                params![assignment_id],
            )
            .await
            .map_err(repo_err)?;
        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            ids.insert(row.get::<i64>(0).map_err(repo_err)?);
        }
        Ok(ids)
    }

    async fn entries_with_repo_created_at(
        &self,
        roster_id: RosterId,
        assignment_id: AssignmentId,
    ) -> Result<Vec<EntryWithRepo>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT re.id, re.roster_id, re.identifier, re.user_id, re.lms_user_id, re.created_at,
                       ar.created_at
                FROM roster_entries re
                LEFT OUTER JOIN assignment_repos ar
                    ON re.user_id = ar.user_id
                    AND ar.assignment_id = ?2
                WHERE re.roster_id = ?1
                ORDER BY re.id
                "#,
                params![roster_id, assignment_id],
            )
            .await
            .map_err(repo_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let entry = row_to_entry(&row)?;
            let repo_created_at = row.get::<Option<i64>>(6).map_err(repo_err)?.map(to_datetime);
            out.push(EntryWithRepo {
                entry,
                repo_created_at,
            });
        }
        Ok(out)
    }

    async fn record_team_access(
        &self,
        group_assignment_id: GroupAssignmentId,
        team_name: &str,
        user_id: UserId,
    ) -> Result<(), DomainError> {
        let conn = self.conn().await?;
        conn.execute(
            r#"
            INSERT INTO team_access (group_assignment_id, user_id, team_name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (group_assignment_id, user_id) DO UPDATE SET team_name = excluded.team_name
            "#,
            params![group_assignment_id, user_id, team_name],
        )
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn team_member_ids(&self, group_assignment_id: GroupAssignmentId) -> Result<HashSet<UserId>, DomainError> {
        Ok(self.team_names(group_assignment_id).await?.into_keys().collect())
    }

    async fn team_names(&self, group_assignment_id: GroupAssignmentId) -> Result<HashMap<UserId, String>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                "SELECT user_id, team_name FROM team_access WHERE group_assignment_id = ?1",
                params![group_assignment_id],
            )
            .await
            .map_err(repo_err)?;
        let mut names = HashMap::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let user_id: i64 = row.get(0).map_err(repo_err)?;
            let team_name: String = row.get(1).map_err(repo_err)?;
            names.insert(user_id, team_name);
        }
        Ok(names)
    }
}
