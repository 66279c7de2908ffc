//! Kind-keyed entry points over a [`CatalogStore`].
//!
//! Callers that only learn the kind at runtime (the HTTP layer) route through
//! here instead of matching on [`Kind`] themselves.

use cartograph_core::{CatalogEntity, CatalogResult, EntityRef, Kind, ValidationError};

use crate::CatalogStore;

fn unsupported(kind: Kind) -> ValidationError {
    ValidationError::UnsupportedKind {
        kind: kind.to_string(),
    }
}

pub fn create(store: &dyn CatalogStore, doc: &CatalogEntity) -> CatalogResult<CatalogEntity> {
    Ok(match doc {
        CatalogEntity::Component(c) => CatalogEntity::Component(store.create_component(c)?),
        CatalogEntity::Api(a) => CatalogEntity::Api(store.create_api(a)?),
        CatalogEntity::User(u) => CatalogEntity::User(store.create_user(u)?),
        CatalogEntity::Group(g) => CatalogEntity::Group(store.create_group(g)?),
    })
}

pub fn read(
    store: &dyn CatalogStore,
    kind: Kind,
    entity_ref: &EntityRef,
) -> CatalogResult<CatalogEntity> {
    Ok(match kind {
        Kind::Component => CatalogEntity::Component(store.read_component(entity_ref)?),
        Kind::Api => CatalogEntity::Api(store.read_api(entity_ref)?),
        Kind::User => CatalogEntity::User(store.read_user(entity_ref)?),
        Kind::Group => CatalogEntity::Group(store.read_group(entity_ref)?),
        Kind::System | Kind::Resource => return Err(unsupported(kind).into()),
    })
}

pub fn update(store: &dyn CatalogStore, doc: &CatalogEntity) -> CatalogResult<CatalogEntity> {
    Ok(match doc {
        CatalogEntity::Component(c) => CatalogEntity::Component(store.update_component(c)?),
        CatalogEntity::Api(a) => CatalogEntity::Api(store.update_api(a)?),
        CatalogEntity::User(u) => CatalogEntity::User(store.update_user(u)?),
        CatalogEntity::Group(g) => CatalogEntity::Group(store.update_group(g)?),
    })
}

pub fn delete(
    store: &dyn CatalogStore,
    kind: Kind,
    entity_ref: &EntityRef,
) -> CatalogResult<CatalogEntity> {
    Ok(match kind {
        Kind::Component => CatalogEntity::Component(store.delete_component(entity_ref)?),
        Kind::Api => CatalogEntity::Api(store.delete_api(entity_ref)?),
        Kind::User => CatalogEntity::User(store.delete_user(entity_ref)?),
        Kind::Group => CatalogEntity::Group(store.delete_group(entity_ref)?),
        Kind::System | Kind::Resource => return Err(unsupported(kind).into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;
    use cartograph_core::{CatalogError, Entity, User, UserSpec};

    #[test]
    fn test_round_trip_by_kind() -> CatalogResult<()> {
        let store = SqliteStore::in_memory()?;
        let doc = CatalogEntity::User(User {
            entity: Entity::new(Kind::User, "default", "jdoe"),
            spec: UserSpec::default(),
        });
        let created = create(&store, &doc)?;
        assert_eq!(created.kind(), Kind::User);

        let r = EntityRef::new("user", "default", "jdoe");
        let read_back = read(&store, Kind::User, &r)?;
        assert_eq!(read_back, created);

        delete(&store, Kind::User, &r)?;
        assert!(matches!(
            read(&store, Kind::User, &r),
            Err(CatalogError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_reserved_kind_rejected() -> CatalogResult<()> {
        let store = SqliteStore::in_memory()?;
        let r = EntityRef::new("system", "default", "s");
        assert_eq!(
            read(&store, Kind::System, &r),
            Err(CatalogError::Validation(ValidationError::UnsupportedKind {
                kind: "system".to_string()
            }))
        );
        Ok(())
    }
}
