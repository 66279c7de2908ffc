//! Cartograph Test Utilities
//!
//! Shared test infrastructure for the cartograph workspace:
//! - Proptest generators for references and documents
//! - Fully populated fixtures for every stored kind
//! - Assertions over the error taxonomy

pub use cartograph_core::{
    Api, ApiSpec, CatalogError, CatalogResult, Component, ComponentSpec, Entity, EntityRef, Group,
    GroupSpec, Kind, Link, Profile, StorageError, User, UserSpec, ValidationError,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for catalog types.

    use super::*;
    use proptest::prelude::*;

    /// A name-like segment: no `:`, `/`, or spaces.
    pub fn arb_segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9._-]{0,20}".prop_map(|s| s)
    }

    /// Any implemented kind.
    pub fn arb_kind() -> impl Strategy<Value = Kind> {
        prop_oneof![
            Just(Kind::Component),
            Just(Kind::Api),
            Just(Kind::User),
            Just(Kind::Group),
        ]
    }

    /// A fully qualified reference.
    pub fn arb_entity_ref() -> impl Strategy<Value = EntityRef> {
        (arb_kind(), arb_segment(), arb_segment())
            .prop_map(|(kind, namespace, name)| EntityRef::new(kind.as_db_str(), namespace, name))
    }

    /// Label or annotation map.
    pub fn arb_key_values() -> impl Strategy<Value = std::collections::BTreeMap<String, String>> {
        prop::collection::btree_map(arb_segment(), "[a-zA-Z0-9 ]{0,20}", 0..5)
    }

    /// Links with distinct URLs.
    pub fn arb_links() -> impl Strategy<Value = Vec<Link>> {
        prop::collection::btree_set(arb_segment(), 0..4).prop_map(|names| {
            names
                .into_iter()
                .map(|n| Link {
                    url: format!("https://example.com/{}", n),
                    title: Some(n),
                    icon: None,
                    link_type: None,
                })
                .collect()
        })
    }

    /// Envelope with random child rows.
    pub fn arb_entity(kind: Kind) -> impl Strategy<Value = Entity> {
        (
            arb_segment(),
            arb_segment(),
            prop::option::of("[a-zA-Z0-9 ]{1,40}"),
            arb_key_values(),
            arb_key_values(),
            prop::collection::vec(arb_segment(), 0..4),
            arb_links(),
        )
            .prop_map(
                move |(namespace, name, title, labels, annotations, tags, links)| {
                    let mut entity = Entity::new(kind, namespace, name);
                    entity.metadata.title = title;
                    entity.metadata.labels = labels;
                    entity.metadata.annotations = annotations;
                    entity.metadata.tags = tags;
                    entity.metadata.links = links;
                    entity
                },
            )
    }

    pub fn arb_component() -> impl Strategy<Value = Component> {
        (
            arb_entity(Kind::Component),
            prop::option::of(arb_entity_ref()),
            prop::collection::vec(arb_entity_ref(), 0..4),
            prop::collection::vec(arb_entity_ref(), 0..4),
        )
            .prop_map(|(entity, system, provides_apis, depends_on)| Component {
                entity,
                spec: ComponentSpec {
                    component_type: "service".to_string(),
                    lifecycle: "production".to_string(),
                    owner: EntityRef::new("group", "default", "owners"),
                    system,
                    subcomponent_of: None,
                    provides_apis,
                    consumes_apis: Vec::new(),
                    depends_on,
                    dependency_of: Vec::new(),
                },
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Fully populated documents for every stored kind.

    use super::*;

    pub const API_VERSION: &str = "backstage.io/v1alpha1";

    pub fn owner() -> EntityRef {
        EntityRef::new("user", "default", "owner")
    }

    pub fn system() -> EntityRef {
        EntityRef::new("system", "default", "down")
    }

    pub fn link(n: u32) -> Link {
        Link {
            url: format!("http://example.com/url{}", n),
            title: Some(format!("link{}", n)),
            icon: Some(format!("icon{}", n)),
            link_type: Some(format!("linktype{}", n)),
        }
    }

    /// Envelope with labels, annotations, tags and two links.
    pub fn full_entity(kind: Kind, namespace: &str, name: &str) -> Entity {
        let mut entity = Entity::new(kind, namespace, name);
        entity.api_version = API_VERSION.to_string();
        entity.metadata.title = Some(format!("{} title", name));
        entity.metadata.description = Some(format!("{} description", name));
        for (k, v) in [("key1", "value1"), ("key2", "value2"), ("key3", "value3")] {
            entity.metadata.labels.insert(k.to_string(), v.to_string());
        }
        for (k, v) in [("keya", "valuea"), ("keyb", "valueb"), ("keyc", "valuec")] {
            entity.metadata.annotations.insert(k.to_string(), v.to_string());
        }
        entity.metadata.tags = vec!["tag1".to_string(), "tag2".to_string(), "tag3".to_string()];
        entity.metadata.links = vec![link(1), link(2)];
        entity
    }

    pub fn full_component(namespace: &str, name: &str, component_type: &str) -> Component {
        Component {
            entity: full_entity(Kind::Component, namespace, name),
            spec: ComponentSpec {
                component_type: component_type.to_string(),
                lifecycle: "production".to_string(),
                owner: owner(),
                system: Some(system()),
                subcomponent_of: Some(EntityRef::new("component", "default", "parent")),
                provides_apis: vec![
                    EntityRef::new("api", "default", "api1"),
                    EntityRef::new("api", "default", "api2"),
                ],
                consumes_apis: vec![EntityRef::new("api", "default", "api3")],
                depends_on: vec![
                    EntityRef::new("resource", "default", "resource1"),
                    EntityRef::new("resource", "default", "resource2"),
                ],
                dependency_of: vec![EntityRef::new("component", "default", "consumer")],
            },
        }
    }

    pub fn full_api(namespace: &str, name: &str) -> Api {
        Api {
            entity: full_entity(Kind::Api, namespace, name),
            spec: ApiSpec {
                api_type: "openapi".to_string(),
                lifecycle: "production".to_string(),
                owner: owner(),
                system: Some(system()),
                definition: "openapi: 3.0.0\ninfo:\n  title: test\n".to_string(),
            },
        }
    }

    pub fn full_user(namespace: &str, name: &str) -> User {
        User {
            entity: full_entity(Kind::User, namespace, name),
            spec: UserSpec {
                profile: Profile {
                    display_name: Some("Jane Doe".to_string()),
                    email: Some("jane@example.com".to_string()),
                    picture: Some("http://example.com/jane.png".to_string()),
                },
                member_of: vec![EntityRef::new("group", "default", "group")],
            },
        }
    }

    pub fn full_group(namespace: &str, name: &str) -> Group {
        Group {
            entity: full_entity(Kind::Group, namespace, name),
            spec: GroupSpec {
                group_type: "team".to_string(),
                profile: Profile {
                    display_name: Some("The Team".to_string()),
                    email: Some("team@example.com".to_string()),
                    picture: None,
                },
                parent: Some(EntityRef::new("group", "default", "org")),
                children: vec![EntityRef::new("group", "default", "subteam")],
                members: vec![owner()],
            },
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over [`CatalogError`] variants.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::NotFound { .. }) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Conflict { .. }) => {}
            other => panic!("Expected Conflict, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }
}
