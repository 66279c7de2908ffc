//! Entity base record.
//!
//! The `entity` row holds the envelope and tags. Labels, annotations and
//! links live in child rows owned by the base row and are removed with it.
//! Every function here runs on a caller-supplied connection, normally an
//! open transaction.

use std::collections::{BTreeMap, HashSet};

use rusqlite::{ffi, params, Connection, OptionalExtension};

use cartograph_core::{
    CatalogError, CatalogResult, Entity, EntityId, EntityRef, Kind, Link, Metadata, StorageError,
    StorageStep, ValidationError,
};

use crate::codec;
use crate::diff::{self, LinkDiff, MapDiff};

const INSERT_ENTITY: &str = "INSERT INTO entity (api_version, kind, namespace, name, title, description, tags) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const SELECT_ENTITY: &str = "SELECT id, api_version, kind, namespace, name, title, description, tags \
     FROM entity WHERE kind = ?1 AND namespace = ?2 AND name = ?3";
const SELECT_ENTITY_ID: &str = "SELECT id FROM entity WHERE kind = ?1 AND namespace = ?2 AND name = ?3";
const UPDATE_ENTITY: &str = "UPDATE entity SET api_version = ?2, kind = ?3, namespace = ?4, name = ?5, \
     title = ?6, description = ?7, tags = ?8 WHERE id = ?1";
const DELETE_ENTITY: &str = "DELETE FROM entity WHERE id = ?1";

const INSERT_LINK: &str =
    "INSERT INTO link (entity_id, position, url, title, icon, type) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const SELECT_LINKS: &str =
    "SELECT url, title, icon, type FROM link WHERE entity_id = ?1 ORDER BY position";
const UPDATE_LINK: &str = "UPDATE link SET position = ?2, title = ?4, icon = ?5, type = ?6 \
     WHERE entity_id = ?1 AND url = ?3";
const DELETE_LINK: &str = "DELETE FROM link WHERE entity_id = ?1 AND url = ?2";

/// Statements for one key/value child table.
struct KeyValueTable {
    step: StorageStep,
    select: &'static str,
    insert: &'static str,
    update: &'static str,
    delete: &'static str,
}

const LABELS: KeyValueTable = KeyValueTable {
    step: StorageStep::Labels,
    select: "SELECT k, v FROM label WHERE entity_id = ?1",
    insert: "INSERT INTO label (entity_id, k, v) VALUES (?1, ?2, ?3)",
    update: "UPDATE label SET v = ?3 WHERE entity_id = ?1 AND k = ?2",
    delete: "DELETE FROM label WHERE entity_id = ?1 AND k = ?2",
};

const ANNOTATIONS: KeyValueTable = KeyValueTable {
    step: StorageStep::Annotations,
    select: "SELECT k, v FROM annotation WHERE entity_id = ?1",
    insert: "INSERT INTO annotation (entity_id, k, v) VALUES (?1, ?2, ?3)",
    update: "UPDATE annotation SET v = ?3 WHERE entity_id = ?1 AND k = ?2",
    delete: "DELETE FROM annotation WHERE entity_id = ?1 AND k = ?2",
};

/// Map an engine error into a storage error tagged with where it happened.
pub fn at(
    operation: &str,
    step: StorageStep,
) -> impl Fn(rusqlite::Error) -> CatalogError + '_ {
    move |err| StorageError::step(operation, step, err).into()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Base-row write failure; a natural-key collision is a conflict.
fn base_row_error(operation: &str, entity: &Entity, err: rusqlite::Error) -> CatalogError {
    if is_unique_violation(&err) {
        return CatalogError::Conflict {
            entity_ref: entity.entity_ref(),
        };
    }
    StorageError::step(operation, StorageStep::BaseRow, err).into()
}

/// Links are keyed by URL within an entity.
fn check_links(links: &[Link]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(links.len());
    for link in links {
        if !seen.insert(link.url.as_str()) {
            return Err(ValidationError::DuplicateLinkUrl {
                url: link.url.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// CREATE
// ============================================================================

/// Insert the base row and all child rows, returning the new id.
pub fn create_entity(conn: &Connection, entity: &Entity, operation: &str) -> CatalogResult<EntityId> {
    let metadata = &entity.metadata;
    let tags = codec::encode_tags(&metadata.tags)?;
    check_links(&metadata.links)?;

    conn.prepare_cached(INSERT_ENTITY)
        .map_err(at(operation, StorageStep::BaseRow))?
        .execute(params![
            entity.api_version,
            entity.kind.as_db_str(),
            metadata.namespace,
            metadata.name,
            metadata.title,
            metadata.description,
            tags,
        ])
        .map_err(|e| base_row_error(operation, entity, e))?;
    let id = conn.last_insert_rowid();

    for (k, v) in &metadata.labels {
        insert_key_value(conn, &LABELS, id, k, v, operation)?;
    }
    for (k, v) in &metadata.annotations {
        insert_key_value(conn, &ANNOTATIONS, id, k, v, operation)?;
    }
    for (position, link) in metadata.links.iter().enumerate() {
        insert_link(conn, id, position as i64, link, operation)?;
    }

    Ok(id)
}

// ============================================================================
// READ
// ============================================================================

/// Look up an entity id by natural key.
pub fn find_entity_id(
    conn: &Connection,
    entity_ref: &EntityRef,
    operation: &str,
) -> CatalogResult<EntityId> {
    conn.prepare_cached(SELECT_ENTITY_ID)
        .map_err(at(operation, StorageStep::BaseRow))?
        .query_row(
            params![entity_ref.kind, entity_ref.namespace, entity_ref.name],
            |row| row.get::<_, EntityId>(0),
        )
        .optional()
        .map_err(at(operation, StorageStep::BaseRow))?
        .ok_or_else(|| CatalogError::NotFound {
            entity_ref: entity_ref.clone(),
        })
}

struct EntityRow {
    id: EntityId,
    api_version: String,
    kind: String,
    namespace: String,
    name: String,
    title: Option<String>,
    description: Option<String>,
    tags: Option<String>,
}

/// Read the base row and child rows for `entity_ref`.
pub fn read_entity(
    conn: &Connection,
    entity_ref: &EntityRef,
    operation: &str,
) -> CatalogResult<Entity> {
    let row = conn
        .prepare_cached(SELECT_ENTITY)
        .map_err(at(operation, StorageStep::BaseRow))?
        .query_row(
            params![entity_ref.kind, entity_ref.namespace, entity_ref.name],
            |row| {
                Ok(EntityRow {
                    id: row.get(0)?,
                    api_version: row.get(1)?,
                    kind: row.get(2)?,
                    namespace: row.get(3)?,
                    name: row.get(4)?,
                    title: row.get(5)?,
                    description: row.get(6)?,
                    tags: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(at(operation, StorageStep::BaseRow))?;

    let Some(row) = row else {
        return Err(CatalogError::NotFound {
            entity_ref: entity_ref.clone(),
        });
    };

    Ok(Entity {
        id: Some(row.id),
        api_version: row.api_version,
        kind: Kind::from_db_str(&row.kind)?,
        metadata: Metadata {
            name: row.name,
            namespace: row.namespace,
            title: row.title,
            description: row.description,
            labels: read_key_values(conn, &LABELS, row.id, operation)?,
            annotations: read_key_values(conn, &ANNOTATIONS, row.id, operation)?,
            tags: codec::decode_tags(row.tags),
            links: read_links(conn, row.id, operation)?,
        },
    })
}

fn read_key_values(
    conn: &Connection,
    table: &KeyValueTable,
    id: EntityId,
    operation: &str,
) -> CatalogResult<BTreeMap<String, String>> {
    let mut stmt = conn
        .prepare_cached(table.select)
        .map_err(at(operation, table.step))?;
    let rows = stmt
        .query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(at(operation, table.step))?;
    rows.collect::<Result<BTreeMap<String, String>, _>>()
        .map_err(at(operation, table.step))
}

fn read_links(conn: &Connection, id: EntityId, operation: &str) -> CatalogResult<Vec<Link>> {
    let mut stmt = conn
        .prepare_cached(SELECT_LINKS)
        .map_err(at(operation, StorageStep::Links))?;
    let rows = stmt
        .query_map(params![id], |row| {
            Ok(Link {
                url: row.get(0)?,
                title: row.get(1)?,
                icon: row.get(2)?,
                link_type: row.get(3)?,
            })
        })
        .map_err(at(operation, StorageStep::Links))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(at(operation, StorageStep::Links))
}

// ============================================================================
// UPDATE
// ============================================================================

/// Overwrite the base row of `id` and bring child rows in line with `entity`.
///
/// Child rows are diffed against what is stored so unchanged rows are not
/// rewritten.
pub fn update_entity(
    conn: &Connection,
    id: EntityId,
    entity: &Entity,
    operation: &str,
) -> CatalogResult<()> {
    let metadata = &entity.metadata;
    let tags = codec::encode_tags(&metadata.tags)?;
    check_links(&metadata.links)?;

    let changed = conn
        .prepare_cached(UPDATE_ENTITY)
        .map_err(at(operation, StorageStep::BaseRow))?
        .execute(params![
            id,
            entity.api_version,
            entity.kind.as_db_str(),
            metadata.namespace,
            metadata.name,
            metadata.title,
            metadata.description,
            tags,
        ])
        .map_err(|e| base_row_error(operation, entity, e))?;
    if changed == 0 {
        return Err(CatalogError::NotFound {
            entity_ref: entity.entity_ref(),
        });
    }

    let labels = read_key_values(conn, &LABELS, id, operation)?;
    apply_map_diff(conn, &LABELS, id, diff::diff_map(&labels, &metadata.labels), operation)?;

    let annotations = read_key_values(conn, &ANNOTATIONS, id, operation)?;
    apply_map_diff(
        conn,
        &ANNOTATIONS,
        id,
        diff::diff_map(&annotations, &metadata.annotations),
        operation,
    )?;

    let links = read_links(conn, id, operation)?;
    apply_link_diff(conn, id, diff::diff_links(&links, &metadata.links), operation)?;

    Ok(())
}

fn apply_map_diff(
    conn: &Connection,
    table: &KeyValueTable,
    id: EntityId,
    diff: MapDiff<'_>,
    operation: &str,
) -> CatalogResult<()> {
    if diff.is_empty() {
        return Ok(());
    }
    for k in diff.delete {
        conn.prepare_cached(table.delete)
            .map_err(at(operation, table.step))?
            .execute(params![id, k])
            .map_err(at(operation, table.step))?;
    }
    for (k, v) in diff.update {
        conn.prepare_cached(table.update)
            .map_err(at(operation, table.step))?
            .execute(params![id, k, v])
            .map_err(at(operation, table.step))?;
    }
    for (k, v) in diff.insert {
        insert_key_value(conn, table, id, k, v, operation)?;
    }
    Ok(())
}

fn apply_link_diff(
    conn: &Connection,
    id: EntityId,
    diff: LinkDiff<'_>,
    operation: &str,
) -> CatalogResult<()> {
    for url in diff.delete {
        conn.prepare_cached(DELETE_LINK)
            .map_err(at(operation, StorageStep::Links))?
            .execute(params![id, url])
            .map_err(at(operation, StorageStep::Links))?;
    }
    for entry in diff.update {
        let link = entry.link;
        conn.prepare_cached(UPDATE_LINK)
            .map_err(at(operation, StorageStep::Links))?
            .execute(params![id, entry.position, link.url, link.title, link.icon, link.link_type])
            .map_err(at(operation, StorageStep::Links))?;
    }
    for entry in diff.insert {
        insert_link(conn, id, entry.position, entry.link, operation)?;
    }
    Ok(())
}

fn insert_key_value(
    conn: &Connection,
    table: &KeyValueTable,
    id: EntityId,
    k: &str,
    v: &str,
    operation: &str,
) -> CatalogResult<()> {
    conn.prepare_cached(table.insert)
        .map_err(at(operation, table.step))?
        .execute(params![id, k, v])
        .map_err(at(operation, table.step))?;
    Ok(())
}

fn insert_link(
    conn: &Connection,
    id: EntityId,
    position: i64,
    link: &Link,
    operation: &str,
) -> CatalogResult<()> {
    conn.prepare_cached(INSERT_LINK)
        .map_err(at(operation, StorageStep::Links))?
        .execute(params![id, position, link.url, link.title, link.icon, link.link_type])
        .map_err(at(operation, StorageStep::Links))?;
    Ok(())
}

// ============================================================================
// DELETE
// ============================================================================

/// Delete the base row; child and spec rows go with it. Returns whether a
/// row was removed.
pub fn delete_entity(conn: &Connection, id: EntityId, operation: &str) -> CatalogResult<bool> {
    let removed = conn
        .prepare_cached(DELETE_ENTITY)
        .map_err(at(operation, StorageStep::BaseRow))?
        .execute(params![id])
        .map_err(at(operation, StorageStep::BaseRow))?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::schema::open_connection;
    use cartograph_core::ValidationError;

    fn entity() -> Entity {
        let mut e = Entity::new(Kind::Component, "default", "billing");
        e.metadata.title = Some("Billing".to_string());
        e.metadata.labels.insert("tier".to_string(), "backend".to_string());
        e.metadata.annotations.insert("owner/slack".to_string(), "#billing".to_string());
        e.metadata.tags = vec!["java".to_string(), "payments".to_string()];
        e.metadata.links = vec![Link::new("https://a.example"), Link::new("https://b.example")];
        e
    }

    #[test]
    fn test_create_then_read() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let e = entity();
        let id = create_entity(&conn, &e, "test")?;

        let read = read_entity(&conn, &e.entity_ref(), "test")?;
        assert_eq!(read.id, Some(id));
        assert_eq!(Entity { id: None, ..read }, e);
        assert_eq!(find_entity_id(&conn, &e.entity_ref(), "test")?, id);
        Ok(())
    }

    #[test]
    fn test_read_missing_is_not_found() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let r = EntityRef::new("component", "default", "ghost");
        assert_eq!(
            read_entity(&conn, &r, "test"),
            Err(CatalogError::NotFound { entity_ref: r.clone() })
        );
        assert!(matches!(
            find_entity_id(&conn, &r, "test"),
            Err(CatalogError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_duplicate_natural_key_conflicts() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let e = entity();
        create_entity(&conn, &e, "test")?;
        assert_eq!(
            create_entity(&conn, &e, "test"),
            Err(CatalogError::Conflict {
                entity_ref: e.entity_ref()
            })
        );
        Ok(())
    }

    #[test]
    fn test_tag_with_comma_rejected_before_write() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let mut e = entity();
        e.metadata.tags.push("a,b".to_string());
        assert!(matches!(
            create_entity(&conn, &e, "test"),
            Err(CatalogError::Validation(ValidationError::TagContainsDelimiter { .. }))
        ));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entity", [], |row| row.get(0))
            .map_err(at("test", StorageStep::BaseRow))?;
        assert_eq!(count, 0);
        Ok(())
    }

    #[test]
    fn test_duplicate_link_url_rejected() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let mut e = entity();
        let id = create_entity(&conn, &e, "test")?;

        e.metadata.links.push(Link {
            title: Some("second".to_string()),
            ..Link::new("https://a.example")
        });
        let duplicate = Err(CatalogError::Validation(ValidationError::DuplicateLinkUrl {
            url: "https://a.example".to_string(),
        }));
        assert_eq!(update_entity(&conn, id, &e, "test"), duplicate);

        e.metadata.name = "billing-copy".to_string();
        assert_eq!(create_entity(&conn, &e, "test").map(|_| ()), duplicate);
        Ok(())
    }

    #[test]
    fn test_update_reorders_links() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let mut e = entity();
        let id = create_entity(&conn, &e, "test")?;

        e.metadata.links.reverse();
        update_entity(&conn, id, &e, "test")?;
        let read = read_entity(&conn, &e.entity_ref(), "test")?;
        assert_eq!(read.metadata.links[0].url, "https://b.example");
        assert_eq!(read.metadata.links[1].url, "https://a.example");
        Ok(())
    }

    #[test]
    fn test_delete_removes_child_rows() -> CatalogResult<()> {
        let conn = open_connection(&StoreConfig::default())?;
        let e = entity();
        let id = create_entity(&conn, &e, "test")?;
        assert!(delete_entity(&conn, id, "test")?);
        assert!(!delete_entity(&conn, id, "test")?);

        for table in ["label", "annotation", "link"] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE entity_id = ?1", table),
                    params![id],
                    |row| row.get(0),
                )
                .map_err(at("test", StorageStep::BaseRow))?;
            assert_eq!(count, 0, "{} rows left behind", table);
        }
        Ok(())
    }
}
