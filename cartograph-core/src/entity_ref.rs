//! Entity references: `kind:namespace/name`
//!
//! A reference names an entity by its composite natural key. The kind and
//! namespace prefixes are optional, so `owner`, `default/owner` and
//! `user:default/owner` are all valid. Empty fields are treated as absent.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{EntityRefError, RefSegment};

/// Composite reference to a catalog entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a reference in `kind:namespace/name` form.
    ///
    /// The string is split on the first `:` and then on the first `/` of the
    /// remainder. A delimiter with nothing before it is an error, as is an
    /// empty name.
    pub fn parse(input: &str) -> Result<Self, EntityRefError> {
        let empty = |segment: RefSegment| EntityRefError::EmptySegment {
            segment,
            input: input.to_string(),
        };

        let mut rest = input;
        let mut kind = "";
        if let Some((k, r)) = rest.split_once(':') {
            if k.is_empty() {
                return Err(empty(RefSegment::Kind));
            }
            kind = k;
            rest = r;
        }

        let mut namespace = "";
        if let Some((ns, r)) = rest.split_once('/') {
            if ns.is_empty() {
                return Err(empty(RefSegment::Namespace));
            }
            namespace = ns;
            rest = r;
        }

        if rest.is_empty() {
            return Err(empty(RefSegment::Name));
        }

        Ok(Self::new(kind, namespace, rest))
    }

    /// True when kind, namespace and name are all empty.
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.namespace.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.kind.is_empty() {
            write!(f, "{}:", self.kind)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        write!(f, "{}", self.name)
    }
}

impl FromStr for EntityRef {
    type Err = EntityRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// SERDE
// ============================================================================

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RefVisitor;

        impl<'de> de::Visitor<'de> for RefVisitor {
            type Value = EntityRef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an entity reference string such as kind:namespace/name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityRef, E> {
                EntityRef::parse(v).map_err(|e| {
                    E::custom(format!("failed to parse entity reference from {:?}: {}", v, e))
                })
            }
        }

        deserializer.deserialize_str(RefVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_full_reference() {
        let r = EntityRef::new("component", "default", "billing");
        assert_eq!(r.to_string(), "component:default/billing");
    }

    #[test]
    fn test_format_omits_empty_prefixes() {
        assert_eq!(EntityRef::new("", "ns", "name").to_string(), "ns/name");
        assert_eq!(EntityRef::new("user", "", "jdoe").to_string(), "user:jdoe");
        assert_eq!(EntityRef::new("", "", "jdoe").to_string(), "jdoe");
    }

    #[test]
    fn test_parse_partial_forms() -> Result<(), EntityRefError> {
        assert_eq!(
            EntityRef::parse("user:default/owner")?,
            EntityRef::new("user", "default", "owner")
        );
        assert_eq!(EntityRef::parse("default/owner")?, EntityRef::new("", "default", "owner"));
        assert_eq!(EntityRef::parse("user:owner")?, EntityRef::new("user", "", "owner"));
        assert_eq!(EntityRef::parse("owner")?, EntityRef::new("", "", "owner"));
        Ok(())
    }

    #[test]
    fn test_parse_splits_on_first_delimiters() -> Result<(), EntityRefError> {
        let r = EntityRef::parse("a:b/c/d:e")?;
        assert_eq!(r, EntityRef::new("a", "b", "c/d:e"));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        let cases = [
            ("", RefSegment::Name),
            (":ns/name", RefSegment::Kind),
            ("kind:/name", RefSegment::Namespace),
            ("kind:ns/", RefSegment::Name),
            ("kind:", RefSegment::Name),
        ];
        for (input, expected) in cases {
            match EntityRef::parse(input) {
                Err(EntityRefError::EmptySegment { segment, .. }) => {
                    assert_eq!(segment, expected, "input {:?}", input)
                }
                Ok(r) => panic!("{:?} parsed unexpectedly as {:?}", input, r),
            }
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(EntityRef::default().is_empty());
        assert!(!EntityRef::new("", "", "x").is_empty());
    }

    #[test]
    fn test_serde_as_string() -> Result<(), serde_json::Error> {
        let r = EntityRef::new("api", "default", "api1");
        let json = serde_json::to_string(&r)?;
        assert_eq!(json, "\"api:default/api1\"");
        let back: EntityRef = serde_json::from_str(&json)?;
        assert_eq!(back, r);
        Ok(())
    }

    #[test]
    fn test_deserialize_rejects_non_string() {
        assert!(serde_json::from_str::<EntityRef>("42").is_err());
        assert!(serde_yaml::from_str::<EntityRef>("{kind: api}").is_err());
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        let err = serde_yaml::from_str::<EntityRef>("\":ns/name\"");
        assert!(err.is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = String> {
            "[a-z][a-z0-9-]{0,12}"
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_format_parse_round_trip(
                kind in proptest::option::of(segment()),
                namespace in proptest::option::of(segment()),
                name in segment(),
            ) {
                let r = EntityRef::new(
                    kind.unwrap_or_default(),
                    namespace.unwrap_or_default(),
                    name,
                );
                let parsed = EntityRef::parse(&r.to_string());
                prop_assert_eq!(parsed, Ok(r));
            }
        }
    }
}
