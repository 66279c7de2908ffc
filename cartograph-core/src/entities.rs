//! Catalog documents
//!
//! Every document is an [`Entity`] envelope (apiVersion, kind, metadata)
//! flattened together with a kind-specific `spec`. The storage id is carried
//! in memory but is never part of the wire form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{EntityRef, Kind};

/// Storage-assigned entity identifier.
pub type EntityId = i64;

/// apiVersion written by [`Entity::new`].
pub const API_VERSION_V1ALPHA1: &str = "backstage.io/v1alpha1";

// ============================================================================
// ENVELOPE
// ============================================================================

/// External link attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Descriptive metadata shared by all kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Ordered; position is preserved by storage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Entity envelope common to every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub api_version: String,
    pub kind: Kind,
    pub metadata: Metadata,
}

impl Entity {
    pub fn new(kind: Kind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            api_version: API_VERSION_V1ALPHA1.to_string(),
            kind,
            metadata: Metadata {
                name: name.into(),
                namespace: namespace.into(),
                ..Metadata::default()
            },
        }
    }

    /// Natural key of this entity.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(
            self.kind.as_db_str(),
            self.metadata.namespace.clone(),
            self.metadata.name.clone(),
        )
    }
}

// ============================================================================
// SPECS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub component_type: String,
    pub lifecycle: String,
    pub owner: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcomponent_of: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides_apis: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes_apis: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_of: Vec<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(rename = "type")]
    pub api_type: String,
    pub lifecycle: String,
    pub owner: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<EntityRef>,
    #[serde(default)]
    pub definition: String,
}

/// Contact details for users and groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.email.is_none() && self.picture.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    #[serde(default, skip_serializing_if = "Profile::is_empty")]
    pub profile: Profile,
    #[serde(default)]
    pub member_of: Vec<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(rename = "type")]
    pub group_type: String,
    #[serde(default, skip_serializing_if = "Profile::is_empty")]
    pub profile: Profile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityRef>,
    #[serde(default)]
    pub children: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<EntityRef>,
}

// ============================================================================
// TYPED DOCUMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(flatten)]
    pub entity: Entity,
    pub spec: ComponentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Api {
    #[serde(flatten)]
    pub entity: Entity,
    pub spec: ApiSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub entity: Entity,
    pub spec: UserSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    pub entity: Entity,
    pub spec: GroupSpec,
}

/// Shared access to the envelope of a typed document.
pub trait Document: Clone + Send + Sync + 'static {
    /// Kind stored by this document type.
    const KIND: Kind;

    fn entity(&self) -> &Entity;

    fn entity_mut(&mut self) -> &mut Entity;

    fn into_catalog_entity(self) -> CatalogEntity;
}

macro_rules! impl_document {
    ($doc:ident, $kind:expr) => {
        impl Document for $doc {
            const KIND: Kind = $kind;

            fn entity(&self) -> &Entity {
                &self.entity
            }

            fn entity_mut(&mut self) -> &mut Entity {
                &mut self.entity
            }

            fn into_catalog_entity(self) -> CatalogEntity {
                CatalogEntity::$doc(self)
            }
        }
    };
}

impl_document!(Component, Kind::Component);
impl_document!(Api, Kind::Api);
impl_document!(User, Kind::User);
impl_document!(Group, Kind::Group);

/// Any stored document, keyed by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CatalogEntity {
    Component(Component),
    Api(Api),
    User(User),
    Group(Group),
}

impl CatalogEntity {
    pub fn kind(&self) -> Kind {
        match self {
            CatalogEntity::Component(_) => Kind::Component,
            CatalogEntity::Api(_) => Kind::Api,
            CatalogEntity::User(_) => Kind::User,
            CatalogEntity::Group(_) => Kind::Group,
        }
    }

    pub fn entity(&self) -> &Entity {
        match self {
            CatalogEntity::Component(c) => &c.entity,
            CatalogEntity::Api(a) => &a.entity,
            CatalogEntity::User(u) => &u.entity,
            CatalogEntity::Group(g) => &g.entity,
        }
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        match self {
            CatalogEntity::Component(c) => &mut c.entity,
            CatalogEntity::Api(a) => &mut a.entity,
            CatalogEntity::User(u) => &mut u.entity,
            CatalogEntity::Group(g) => &mut g.entity,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        self.entity().entity_ref()
    }
}
