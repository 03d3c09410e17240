//! Overlay repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the three overlay tables: field overrides, locally-added
//!   records, soft-delete tombstones.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every mutating call commits before returning; reads reflect the latest
//!   committed state.
//! - All tables are keyed by normalized ids; mutations reject blank ids.
//! - A stored document that no longer parses is treated as absent (fail-soft),
//!   never as a caller-visible error.

use crate::db::DbError;
use crate::model::movie::{Movie, MoviePatch, MovieValidationError};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REQUIRED_TABLES: [&str; 3] = ["overrides", "adds", "deletes"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for overlay persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MovieValidationError),
    Db(DbError),
    /// The record cannot be serialized for storage.
    InvalidData(String),
    /// The connection has not been migrated (`PRAGMA user_version` is stale).
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// The connection is migrated but missing an overlay table.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid overlay record data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; run migrations first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required overlay table is missing: {table}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<MovieValidationError> for RepoError {
    fn from(value: MovieValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the local overlay tables.
///
/// All operations are synchronous read-modify-write cycles over a single
/// table; no cross-table transaction exists except `reset_all`.
pub trait OverlayRepository {
    fn get_overrides(&self) -> RepoResult<BTreeMap<String, MoviePatch>>;
    /// Shallow-merges `patch` onto any override already stored for `id`.
    fn set_override(&self, id: &str, patch: &MoviePatch) -> RepoResult<()>;
    fn remove_override(&self, id: &str) -> RepoResult<()>;

    fn get_adds(&self) -> RepoResult<BTreeMap<String, Movie>>;
    fn get_add(&self, id: &str) -> RepoResult<Option<Movie>>;
    /// Inserts or replaces a locally-created record under its own id.
    fn add_movie(&self, movie: &Movie) -> RepoResult<()>;
    fn remove_add(&self, id: &str) -> RepoResult<()>;

    fn get_deletes(&self) -> RepoResult<BTreeSet<String>>;
    fn is_deleted(&self, id: &str) -> RepoResult<bool>;
    /// Tombstones `id`. Idempotent.
    fn delete(&self, id: &str) -> RepoResult<()>;
    /// Removes the tombstone for `id`. Idempotent, no error if absent.
    fn undelete(&self, id: &str) -> RepoResult<()>;

    /// Clears all three tables atomically from the caller's point of view.
    fn reset_all(&self) -> RepoResult<()>;
}

/// SQLite-backed overlay repository.
pub struct SqliteOverlayRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOverlayRepository<'conn> {
    /// Wraps a migrated connection, rejecting unmigrated or partial schemas.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = crate::db::migrations::latest_version();
        let actual_version =
            conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        if actual_version == 0 {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        for table in REQUIRED_TABLES {
            let found: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                    [table],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }

        Ok(Self { conn })
    }
}

impl OverlayRepository for SqliteOverlayRepository<'_> {
    fn get_overrides(&self) -> RepoResult<BTreeMap<String, MoviePatch>> {
        let mut stmt = self
            .conn
            .prepare("SELECT movie_id, patch FROM overrides;")?;
        let mut rows = stmt.query([])?;
        let mut overrides = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let id: String = row.get("movie_id")?;
            let raw: String = row.get("patch")?;
            if let Some(patch) = parse_document::<MoviePatch>("overrides", &id, &raw) {
                overrides.insert(id, patch);
            }
        }

        Ok(overrides)
    }

    fn set_override(&self, id: &str, patch: &MoviePatch) -> RepoResult<()> {
        let id = require_id(id)?;

        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT patch FROM overrides WHERE movie_id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        let mut merged = existing
            .and_then(|raw| parse_document::<MoviePatch>("overrides", id, &raw))
            .unwrap_or_default();
        merged.merge(patch);

        let document = to_document(&merged)?;
        self.conn.execute(
            "INSERT INTO overrides (movie_id, patch) VALUES (?1, ?2)
             ON CONFLICT (movie_id) DO UPDATE SET
                patch = excluded.patch,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![id, document],
        )?;

        Ok(())
    }

    fn remove_override(&self, id: &str) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM overrides WHERE movie_id = ?1;",
            [id.trim()],
        )?;
        Ok(())
    }

    fn get_adds(&self) -> RepoResult<BTreeMap<String, Movie>> {
        let mut stmt = self.conn.prepare("SELECT movie_id, record FROM adds;")?;
        let mut rows = stmt.query([])?;
        let mut adds = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let id: String = row.get("movie_id")?;
            let raw: String = row.get("record")?;
            if let Some(movie) = parse_document::<Movie>("adds", &id, &raw) {
                adds.insert(id, movie);
            }
        }

        Ok(adds)
    }

    fn get_add(&self, id: &str) -> RepoResult<Option<Movie>> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }

        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM adds WHERE movie_id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|raw| parse_document::<Movie>("adds", id, &raw)))
    }

    fn add_movie(&self, movie: &Movie) -> RepoResult<()> {
        movie.validate()?;

        let document = to_document(movie)?;
        self.conn.execute(
            "INSERT INTO adds (movie_id, record) VALUES (?1, ?2)
             ON CONFLICT (movie_id) DO UPDATE SET
                record = excluded.record,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![movie.imdb_id, document],
        )?;

        Ok(())
    }

    fn remove_add(&self, id: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM adds WHERE movie_id = ?1;", [id.trim()])?;
        Ok(())
    }

    fn get_deletes(&self) -> RepoResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT movie_id FROM deletes;")?;
        let mut rows = stmt.query([])?;
        let mut deletes = BTreeSet::new();

        while let Some(row) = rows.next()? {
            deletes.insert(row.get::<_, String>("movie_id")?);
        }

        Ok(deletes)
    }

    fn is_deleted(&self, id: &str) -> RepoResult<bool> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(false);
        }

        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM deletes WHERE movie_id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let id = require_id(id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO deletes (movie_id) VALUES (?1);",
            [id],
        )?;
        Ok(())
    }

    fn undelete(&self, id: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM deletes WHERE movie_id = ?1;", [id.trim()])?;
        Ok(())
    }

    fn reset_all(&self) -> RepoResult<()> {
        self.conn.execute_batch(
            "BEGIN;
             DELETE FROM overrides;
             DELETE FROM adds;
             DELETE FROM deletes;
             COMMIT;",
        )?;
        Ok(())
    }
}

fn require_id(id: &str) -> RepoResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RepoError::Validation(MovieValidationError::MissingId));
    }
    Ok(id)
}

fn to_document<T: serde::Serialize>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|err| RepoError::InvalidData(err.to_string()))
}

/// Fail-soft row decode: a corrupt document reads as absent.
fn parse_document<T: serde::de::DeserializeOwned>(table: &str, id: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "event=overlay_read module=repo status=corrupt_row table={table} movie_id={id} error={err}"
            );
            None
        }
    }
}
