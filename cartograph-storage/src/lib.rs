//! Cartograph Storage - Store Contract and SQLite Persistence
//!
//! Defines the [`CatalogStore`] abstraction over the catalog and its SQLite
//! implementation. Each entity is a base row plus label, annotation and link
//! child rows and one typed spec row; every operation is a single
//! transaction.

pub mod codec;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod entity;
pub mod list;
pub mod schema;
pub mod spec;
pub mod sqlite;

pub use config::{DbLocation, StoreConfig};
pub use spec::SpecTable;
pub use sqlite::SqliteStore;

use cartograph_core::{
    Api, CatalogResult, Component, EntityRef, Filter, Group, Kind, ListPage, Ordering, Pagination,
    User,
};

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Typed CRUD and listing over the catalog.
///
/// Lookups take a reference whose kind may be omitted; a present kind must
/// name the store's kind. Writes return the document as stored, with its id.
pub trait CatalogStore: Send + Sync {
    // === Component Operations ===

    fn create_component(&self, component: &Component) -> CatalogResult<Component>;
    fn read_component(&self, entity_ref: &EntityRef) -> CatalogResult<Component>;
    fn update_component(&self, component: &Component) -> CatalogResult<Component>;
    /// Delete and return the last stored state.
    fn delete_component(&self, entity_ref: &EntityRef) -> CatalogResult<Component>;

    // === API Operations ===

    fn create_api(&self, api: &Api) -> CatalogResult<Api>;
    fn read_api(&self, entity_ref: &EntityRef) -> CatalogResult<Api>;
    fn update_api(&self, api: &Api) -> CatalogResult<Api>;
    fn delete_api(&self, entity_ref: &EntityRef) -> CatalogResult<Api>;

    // === User Operations ===

    fn create_user(&self, user: &User) -> CatalogResult<User>;
    fn read_user(&self, entity_ref: &EntityRef) -> CatalogResult<User>;
    fn update_user(&self, user: &User) -> CatalogResult<User>;
    fn delete_user(&self, entity_ref: &EntityRef) -> CatalogResult<User>;

    // === Group Operations ===

    fn create_group(&self, group: &Group) -> CatalogResult<Group>;
    fn read_group(&self, entity_ref: &EntityRef) -> CatalogResult<Group>;
    fn update_group(&self, group: &Group) -> CatalogResult<Group>;
    fn delete_group(&self, entity_ref: &EntityRef) -> CatalogResult<Group>;

    // === Listing ===

    /// List references of `kind` matching every filter.
    fn list(
        &self,
        kind: Kind,
        filters: &[Filter],
        ordering: Ordering,
        pagination: Pagination,
    ) -> CatalogResult<ListPage>;

    fn list_components(
        &self,
        filters: &[Filter],
        ordering: Ordering,
        pagination: Pagination,
    ) -> CatalogResult<ListPage> {
        self.list(Kind::Component, filters, ordering, pagination)
    }

    /// Cheap round trip to the backing database.
    fn ping(&self) -> CatalogResult<()>;
}
