//! Cartograph Core - Catalog Types
//!
//! Entity documents, references, listing query types and the error taxonomy
//! shared by the storage and API crates. No I/O lives here.

pub mod entities;
pub mod entity_ref;
pub mod enums;
pub mod error;
pub mod query;

pub use entities::{
    Api, ApiSpec, CatalogEntity, Component, ComponentSpec, Document, Entity, EntityId, Group,
    GroupSpec, Link, Metadata, Profile, User, UserSpec, API_VERSION_V1ALPHA1,
};
pub use entity_ref::EntityRef;
pub use enums::{api_type, component_type, lifecycle, Kind};
pub use error::{
    CatalogError, CatalogResult, EntityRefError, RefSegment, StorageError, StorageStep,
    ValidationError,
};
pub use query::{Filter, FilterKey, ListPage, OrderBy, Ordering, Pagination};
