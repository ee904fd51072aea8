//! Bundle repository backed by a single SQLite database.

use std::path::Path;

use betadrop_protocol::{BundleRecord, GroupKey, Platform};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::StoreError;
use crate::schema;

const RECORD_COLUMNS: &str = "uuid, platform, name, bundle_id, version, build, \
                              size_bytes, changelog, downloads, created_at";

/// Persistence and query layer for bundle records.
///
/// The connection is guarded internally, so every operation is atomic and a
/// record inserted by [`create`](Self::create) is visible to any query that
/// starts after it returns.
pub struct Repository {
    conn: Mutex<Connection>,
}

impl Repository {
    /// Opens (or creates) the database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        schema::init(&conn)?;
        tracing::debug!(path = %path.display(), "bundle database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts a new record.
    ///
    /// Fails with [`StoreError::DuplicateId`] if the id is already taken.
    pub fn create(&self, record: &BundleRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO bundles (uuid, platform, name, bundle_id, version, build, \
                                  size_bytes, changelog, downloads, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                record.id,
                record.platform.as_str(),
                record.name,
                record.bundle_id,
                record.version,
                record.build,
                to_sql_int(record.size_bytes),
                record.changelog,
                to_sql_int(record.downloads),
                record.created_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                tracing::error!(id = %record.id, "duplicate bundle id rejected");
                Err(StoreError::DuplicateId(record.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches a record by id.
    pub fn get(&self, id: &str) -> Result<BundleRecord, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM bundles WHERE uuid = ?1;"),
            params![id],
            record_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Distinct versions of a group, most recently uploaded version first.
    ///
    /// A version's position is decided by its newest upload, so re-uploading
    /// an old version string moves it back to the front.
    pub fn list_versions(&self, key: &GroupKey) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT version FROM bundles \
             WHERE bundle_id = ?1 AND platform = ?2 \
             GROUP BY version \
             ORDER BY MAX(seq) DESC;",
        )?;
        let versions = stmt
            .query_map(params![key.bundle_id, key.platform.as_str()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    /// Every build of `version` within a group, most recent upload first.
    ///
    /// An unknown version yields an empty list.
    pub fn list_builds(
        &self,
        key: &GroupKey,
        version: &str,
    ) -> Result<Vec<BundleRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM bundles \
             WHERE bundle_id = ?1 AND platform = ?2 AND version = ?3 \
             ORDER BY seq DESC;"
        ))?;
        let builds = stmt
            .query_map(
                params![key.bundle_id, key.platform.as_str(), version],
                record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(builds)
    }

    /// [`list_versions`](Self::list_versions) for the group of bundle `id`.
    pub fn versions_for(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let record = self.get(id)?;
        self.list_versions(&record.group_key())
    }

    /// [`list_builds`](Self::list_builds) for the group of bundle `id`.
    pub fn builds_for(&self, id: &str, version: &str) -> Result<Vec<BundleRecord>, StoreError> {
        let record = self.get(id)?;
        self.list_builds(&record.group_key(), version)
    }

    /// Atomically adds one to the download counter of `id`.
    pub fn increment_download(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE bundles SET downloads = downloads + 1 WHERE uuid = ?1;",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Total number of stored records.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM bundles;", [], |row| row.get(0))?;
        Ok(from_sql_int(n))
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<BundleRecord> {
    let platform: String = row.get(1)?;
    let platform = platform
        .parse::<Platform>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let created_at: DateTime<Utc> = row.get(9)?;

    Ok(BundleRecord {
        id: row.get(0)?,
        platform,
        name: row.get(2)?,
        bundle_id: row.get(3)?,
        version: row.get(4)?,
        build: row.get(5)?,
        size_bytes: from_sql_int(row.get(6)?),
        changelog: row.get(7)?,
        downloads: from_sql_int(row.get(8)?),
        created_at,
    })
}

fn to_sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn from_sql_int(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}
