//! SQLite implementation of [`CatalogStore`].
//!
//! One connection is shared behind a mutex. Every operation, reads included,
//! runs in a single transaction: writes take the write lock up front
//! (`BEGIN IMMEDIATE`) and reads use a deferred transaction for a consistent
//! snapshot across the base, child and spec rows.

use std::sync::Mutex;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use cartograph_core::{
    Api, CatalogError, CatalogResult, Component, Document, EntityRef, Filter, Group, Kind,
    ListPage, Ordering, Pagination, StorageError, StorageStep, User, ValidationError,
};

use crate::config::StoreConfig;
use crate::entity::{self, at};
use crate::list;
use crate::schema;
use crate::spec::{self, SpecTable};
use crate::CatalogStore;

/// SQLite-backed catalog store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database described by `config` and migrate it.
    pub fn open(config: &StoreConfig) -> CatalogResult<Self> {
        let conn = schema::open_connection(config)?;
        tracing::debug!(location = ?config.location, "opened catalog store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database.
    pub fn in_memory() -> CatalogResult<Self> {
        Self::open(&StoreConfig::default())
    }

    /// Run `f` against the raw connection outside any transaction.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> CatalogResult<T> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&conn))
    }

    /// Run `f` in one transaction, committing on success.
    ///
    /// On failure the transaction is rolled back explicitly. If the rollback
    /// fails too, both errors are returned together.
    fn in_transaction<T>(
        &self,
        operation: &str,
        behavior: TransactionBehavior,
        f: impl FnOnce(&Transaction<'_>) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let tx = conn
            .transaction_with_behavior(behavior)
            .map_err(at(operation, StorageStep::Begin))?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(at(operation, StorageStep::Commit))?;
                Ok(value)
            }
            Err(err) => match tx.rollback() {
                Ok(()) => Err(err),
                Err(rollback) => {
                    tracing::warn!(operation, error = %err, rollback_error = %rollback, "rollback failed");
                    Err(StorageError::RollbackFailed {
                        rollback: rollback.to_string(),
                        original: Box::new(err),
                    }
                    .into())
                }
            },
        }
    }

    // ========================================================================
    // GENERIC DOCUMENT OPERATIONS
    // ========================================================================

    fn create_doc<D: SpecTable>(&self, doc: &D) -> CatalogResult<D> {
        check_kind(doc)?;
        let operation = format!("create {}", D::KIND);
        let created = self.in_transaction(&operation, TransactionBehavior::Immediate, |tx| {
            let id = entity::create_entity(tx, doc.entity(), &operation)?;
            spec::insert_spec(tx, doc, id, &operation)?;
            let mut created = doc.clone();
            created.entity_mut().id = Some(id);
            Ok(created)
        })?;
        tracing::debug!(entity_ref = %created.entity().entity_ref(), "created entity");
        Ok(created)
    }

    fn read_doc<D: SpecTable>(&self, entity_ref: &EntityRef) -> CatalogResult<D> {
        let key = lookup_key::<D>(entity_ref)?;
        let operation = format!("read {}", D::KIND);
        self.in_transaction(&operation, TransactionBehavior::Deferred, |tx| {
            let entity = entity::read_entity(tx, &key, &operation)?;
            let id = entity.id.ok_or_else(|| CatalogError::NotFound {
                entity_ref: key.clone(),
            })?;
            spec::read_spec(tx, id, entity, &operation)
        })
    }

    fn update_doc<D: SpecTable>(&self, doc: &D) -> CatalogResult<D> {
        check_kind(doc)?;
        let operation = format!("update {}", D::KIND);
        let updated = self.in_transaction(&operation, TransactionBehavior::Immediate, |tx| {
            let id = match doc.entity().id {
                Some(id) => id,
                None => entity::find_entity_id(tx, &doc.entity().entity_ref(), &operation)?,
            };
            entity::update_entity(tx, id, doc.entity(), &operation)?;
            spec::update_spec(tx, doc, id, &operation)?;
            let mut updated = doc.clone();
            updated.entity_mut().id = Some(id);
            Ok(updated)
        })?;
        tracing::debug!(entity_ref = %updated.entity().entity_ref(), "updated entity");
        Ok(updated)
    }

    fn delete_doc<D: SpecTable>(&self, entity_ref: &EntityRef) -> CatalogResult<D> {
        let key = lookup_key::<D>(entity_ref)?;
        let operation = format!("delete {}", D::KIND);
        let deleted = self.in_transaction(&operation, TransactionBehavior::Immediate, |tx| {
            let entity = entity::read_entity(tx, &key, &operation)?;
            let id = entity.id.ok_or_else(|| CatalogError::NotFound {
                entity_ref: key.clone(),
            })?;
            let doc: D = spec::read_spec(tx, id, entity, &operation)?;
            if !entity::delete_entity(tx, id, &operation)? {
                return Err(CatalogError::NotFound {
                    entity_ref: key.clone(),
                });
            }
            Ok(doc)
        })?;
        tracing::debug!(entity_ref = %key, "deleted entity");
        Ok(deleted)
    }
}

/// The document's kind must match the store it is written through.
fn check_kind<D: Document>(doc: &D) -> CatalogResult<()> {
    let actual = doc.entity().kind;
    if actual != D::KIND {
        return Err(ValidationError::KindMismatch {
            expected: D::KIND,
            actual,
        }
        .into());
    }
    Ok(())
}

/// Natural key for a lookup through `D`'s store. An omitted kind means `D`'s.
fn lookup_key<D: Document>(entity_ref: &EntityRef) -> CatalogResult<EntityRef> {
    if !entity_ref.kind.is_empty() {
        let actual = Kind::from_db_str(&entity_ref.kind)?;
        if actual != D::KIND {
            return Err(ValidationError::KindMismatch {
                expected: D::KIND,
                actual,
            }
            .into());
        }
    }
    Ok(EntityRef::new(
        D::KIND.as_db_str(),
        entity_ref.namespace.clone(),
        entity_ref.name.clone(),
    ))
}

impl CatalogStore for SqliteStore {
    fn create_component(&self, component: &Component) -> CatalogResult<Component> {
        self.create_doc(component)
    }

    fn read_component(&self, entity_ref: &EntityRef) -> CatalogResult<Component> {
        self.read_doc(entity_ref)
    }

    fn update_component(&self, component: &Component) -> CatalogResult<Component> {
        self.update_doc(component)
    }

    fn delete_component(&self, entity_ref: &EntityRef) -> CatalogResult<Component> {
        self.delete_doc(entity_ref)
    }

    fn create_api(&self, api: &Api) -> CatalogResult<Api> {
        self.create_doc(api)
    }

    fn read_api(&self, entity_ref: &EntityRef) -> CatalogResult<Api> {
        self.read_doc(entity_ref)
    }

    fn update_api(&self, api: &Api) -> CatalogResult<Api> {
        self.update_doc(api)
    }

    fn delete_api(&self, entity_ref: &EntityRef) -> CatalogResult<Api> {
        self.delete_doc(entity_ref)
    }

    fn create_user(&self, user: &User) -> CatalogResult<User> {
        self.create_doc(user)
    }

    fn read_user(&self, entity_ref: &EntityRef) -> CatalogResult<User> {
        self.read_doc(entity_ref)
    }

    fn update_user(&self, user: &User) -> CatalogResult<User> {
        self.update_doc(user)
    }

    fn delete_user(&self, entity_ref: &EntityRef) -> CatalogResult<User> {
        self.delete_doc(entity_ref)
    }

    fn create_group(&self, group: &Group) -> CatalogResult<Group> {
        self.create_doc(group)
    }

    fn read_group(&self, entity_ref: &EntityRef) -> CatalogResult<Group> {
        self.read_doc(entity_ref)
    }

    fn update_group(&self, group: &Group) -> CatalogResult<Group> {
        self.update_doc(group)
    }

    fn delete_group(&self, entity_ref: &EntityRef) -> CatalogResult<Group> {
        self.delete_doc(entity_ref)
    }

    fn list(
        &self,
        kind: Kind,
        filters: &[Filter],
        ordering: Ordering,
        pagination: Pagination,
    ) -> CatalogResult<ListPage> {
        if !kind.is_implemented() {
            return Err(ValidationError::UnsupportedKind {
                kind: kind.to_string(),
            }
            .into());
        }
        let operation = format!("list {}", kind);
        self.in_transaction(&operation, TransactionBehavior::Deferred, |tx| {
            list::list_refs(tx, kind, filters, ordering, pagination, &operation)
        })
    }

    fn ping(&self) -> CatalogResult<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(at("ping", StorageStep::Open))
        })??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartograph_core::{ApiSpec, Entity};

    fn api(name: &str) -> Api {
        Api {
            entity: Entity::new(Kind::Api, "default", name),
            spec: ApiSpec {
                api_type: "openapi".to_string(),
                lifecycle: "production".to_string(),
                owner: EntityRef::new("group", "default", "team-a"),
                system: None,
                definition: "openapi: 3.0.0".to_string(),
            },
        }
    }

    #[test]
    fn test_lookup_key_fills_in_kind() -> CatalogResult<()> {
        let key = lookup_key::<Api>(&EntityRef::new("", "default", "a"))?;
        assert_eq!(key, EntityRef::new("api", "default", "a"));
        let key = lookup_key::<Api>(&EntityRef::new("API", "default", "a"))?;
        assert_eq!(key.kind, "api");
        Ok(())
    }

    #[test]
    fn test_lookup_key_rejects_other_kind() {
        assert_eq!(
            lookup_key::<Api>(&EntityRef::new("user", "default", "a")),
            Err(CatalogError::Validation(ValidationError::KindMismatch {
                expected: Kind::Api,
                actual: Kind::User,
            }))
        );
    }

    #[test]
    fn test_create_rejects_wrong_kind() -> CatalogResult<()> {
        let store = SqliteStore::in_memory()?;
        let mut doc = api("a");
        doc.entity.kind = Kind::Component;
        assert!(matches!(
            store.create_api(&doc),
            Err(CatalogError::Validation(ValidationError::KindMismatch { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_failed_spec_row_rolls_back_base_row() -> CatalogResult<()> {
        let store = SqliteStore::in_memory()?;
        let mut doc = api("ownerless");
        doc.spec.owner = EntityRef::default();

        let err = store.create_api(&doc);
        assert!(matches!(
            err,
            Err(CatalogError::Storage(StorageError::StepFailed {
                step: StorageStep::SpecRow,
                ..
            }))
        ));

        let rows: i64 = store.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM entity", [], |row| row.get(0))
                .unwrap_or(-1)
        })?;
        assert_eq!(rows, 0);
        Ok(())
    }

    #[test]
    fn test_missing_spec_row_is_inconsistent() -> CatalogResult<()> {
        let store = SqliteStore::in_memory()?;
        store.create_api(&api("orphan"))?;
        store.with_connection(|conn| conn.execute("DELETE FROM api", []))?
            .map_err(at("test", StorageStep::SpecRow))?;

        assert_eq!(
            store.read_api(&EntityRef::new("api", "default", "orphan")),
            Err(CatalogError::Storage(StorageError::InconsistentState {
                entity_ref: EntityRef::new("api", "default", "orphan"),
                table: "api",
            }))
        );
        Ok(())
    }

    #[test]
    fn test_listing_reserved_kind_is_rejected() -> CatalogResult<()> {
        let store = SqliteStore::in_memory()?;
        assert!(matches!(
            store.list(Kind::System, &[], Ordering::default(), Pagination::all()),
            Err(CatalogError::Validation(ValidationError::UnsupportedKind { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_ping() -> CatalogResult<()> {
        SqliteStore::in_memory()?.ping()
    }
}
