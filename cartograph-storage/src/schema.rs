//! Connection setup and schema migrations.
//!
//! Migrations are forward-only and applied in order inside one transaction.
//! The applied version is tracked in `schema_meta`.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use cartograph_core::{CatalogResult, StorageError, StorageStep};

use crate::config::{DbLocation, StoreConfig};

/// Ordered migrations; index + 1 is the schema version.
const MIGRATIONS: &[&str] = &[
    // 1: entity base record, child tables and typed spec tables
    r#"
    CREATE TABLE entity (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        api_version TEXT NOT NULL,
        kind        TEXT NOT NULL,
        namespace   TEXT NOT NULL,
        name        TEXT NOT NULL,
        title       TEXT,
        description TEXT,
        tags        TEXT,
        UNIQUE (kind, namespace, name)
    );

    CREATE TABLE label (
        entity_id INTEGER NOT NULL REFERENCES entity(id) ON DELETE CASCADE,
        k         TEXT NOT NULL,
        v         TEXT NOT NULL,
        PRIMARY KEY (entity_id, k)
    );

    CREATE TABLE annotation (
        entity_id INTEGER NOT NULL REFERENCES entity(id) ON DELETE CASCADE,
        k         TEXT NOT NULL,
        v         TEXT NOT NULL,
        PRIMARY KEY (entity_id, k)
    );

    CREATE TABLE link (
        entity_id INTEGER NOT NULL REFERENCES entity(id) ON DELETE CASCADE,
        position  INTEGER NOT NULL,
        url       TEXT NOT NULL,
        title     TEXT,
        icon      TEXT,
        type      TEXT,
        UNIQUE (entity_id, url)
    );

    CREATE TABLE component (
        entity_id       INTEGER PRIMARY KEY REFERENCES entity(id) ON DELETE CASCADE,
        type            TEXT NOT NULL,
        lifecycle       TEXT NOT NULL,
        owner           TEXT NOT NULL,
        system          TEXT,
        subcomponent_of TEXT,
        provides_apis   TEXT,
        consumes_apis   TEXT,
        depends_on      TEXT,
        dependency_of   TEXT
    );

    CREATE TABLE api (
        entity_id  INTEGER PRIMARY KEY REFERENCES entity(id) ON DELETE CASCADE,
        type       TEXT NOT NULL,
        lifecycle  TEXT NOT NULL,
        owner      TEXT NOT NULL,
        system     TEXT,
        definition TEXT NOT NULL
    );

    CREATE TABLE "user" (
        entity_id    INTEGER PRIMARY KEY REFERENCES entity(id) ON DELETE CASCADE,
        display_name TEXT,
        email        TEXT,
        picture      TEXT,
        member_of    TEXT
    );

    CREATE TABLE "group" (
        entity_id    INTEGER PRIMARY KEY REFERENCES entity(id) ON DELETE CASCADE,
        type         TEXT NOT NULL,
        display_name TEXT,
        email        TEXT,
        picture      TEXT,
        parent       TEXT,
        children     TEXT,
        members      TEXT
    );
    "#,
    // 2: listing filters and ordering hit these columns
    r#"
    CREATE INDEX entity_kind_namespace ON entity (kind, namespace);
    CREATE INDEX entity_kind_name ON entity (kind, name);
    "#,
];

/// Latest schema version this build knows how to create.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

const OPERATION: &str = "open store";

/// Open a connection, apply pragmas and bring the schema up to date.
pub fn open_connection(config: &StoreConfig) -> CatalogResult<Connection> {
    let mut conn = match &config.location {
        DbLocation::InMemory => Connection::open_in_memory(),
        DbLocation::File(path) => Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    }
    .map_err(|e| StorageError::step(OPERATION, StorageStep::Open, e))?;

    apply_pragmas(&conn, config)?;
    migrate(&mut conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> CatalogResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| StorageError::step(OPERATION, StorageStep::Open, e))?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| StorageError::step(OPERATION, StorageStep::Open, e))?;
    if let DbLocation::File(_) = config.location {
        // WAL reports its mode back as a row, so read it rather than execute.
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get::<_, String>(0))
            .map_err(|e| StorageError::step(OPERATION, StorageStep::Open, e))?;
    }
    Ok(())
}

/// Apply every migration newer than the recorded version.
pub fn migrate(conn: &mut Connection) -> CatalogResult<i64> {
    let schema_err = |e: rusqlite::Error| StorageError::step(OPERATION, StorageStep::Schema, e);

    let tx = conn.transaction().map_err(schema_err)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS schema_meta (version INTEGER NOT NULL);")
        .map_err(schema_err)?;
    let recorded: Option<i64> = tx
        .query_row("SELECT version FROM schema_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(schema_err)?;
    let current = recorded.unwrap_or(0);

    if current > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchemaVersion {
            found: current,
            supported: SCHEMA_VERSION,
        }
        .into());
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        tx.execute_batch(sql).map_err(schema_err)?;
        tracing::debug!(version = index + 1, "applied schema migration");
    }

    if recorded.is_none() {
        tx.execute("INSERT INTO schema_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
            .map_err(schema_err)?;
    } else if current < SCHEMA_VERSION {
        tx.execute("UPDATE schema_meta SET version = ?1", params![SCHEMA_VERSION])
            .map_err(schema_err)?;
    }

    tx.commit().map_err(schema_err)?;
    Ok(SCHEMA_VERSION)
}
