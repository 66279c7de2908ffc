//! Column codecs for references and tags.
//!
//! A single reference is stored as its canonical string, with an absent or
//! empty reference stored as NULL. A reference list is stored as one
//! space-separated string. Tags are stored comma-joined. Neither delimiter
//! can appear inside an item, so encoding rejects items that contain it.

use rusqlite::types::ValueRef;

use cartograph_core::{EntityRef, ValidationError};

const REF_LIST_SEPARATOR: char = ' ';
const TAG_SEPARATOR: char = ',';

/// Encode an optional reference column. Empty references become NULL.
pub fn encode_ref(entity_ref: Option<&EntityRef>) -> Option<String> {
    entity_ref
        .filter(|r| !r.is_empty())
        .map(|r| r.to_string())
}

/// Decode an optional reference column. NULL and empty text decode to `None`.
pub fn decode_ref(column: &str, value: ValueRef<'_>) -> Result<Option<EntityRef>, ValidationError> {
    match text(column, value)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Ok(Some(EntityRef::parse(s)?)),
    }
}

/// Encode a reference list column, dropping empty references.
///
/// Returns `None` (NULL) when nothing remains.
pub fn encode_refs(refs: &[EntityRef]) -> Result<Option<String>, ValidationError> {
    let mut encoded = Vec::with_capacity(refs.len());
    for r in refs.iter().filter(|r| !r.is_empty()) {
        let s = r.to_string();
        if s.contains(REF_LIST_SEPARATOR) {
            return Err(ValidationError::ReferenceContainsSpace { reference: s });
        }
        encoded.push(s);
    }
    if encoded.is_empty() {
        return Ok(None);
    }
    Ok(Some(encoded.join(" ")))
}

/// Decode a reference list column. NULL decodes to an empty list.
pub fn decode_refs(column: &str, value: ValueRef<'_>) -> Result<Vec<EntityRef>, ValidationError> {
    let Some(s) = text(column, value)? else {
        return Ok(Vec::new());
    };
    s.split(REF_LIST_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(|part| EntityRef::parse(part).map_err(ValidationError::from))
        .collect()
}

/// Encode tags comma-joined; no tags is NULL. An empty tag has no stored
/// form and is rejected.
pub fn encode_tags(tags: &[String]) -> Result<Option<String>, ValidationError> {
    for tag in tags {
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag);
        }
        if tag.contains(TAG_SEPARATOR) {
            return Err(ValidationError::TagContainsDelimiter { tag: tag.clone() });
        }
    }
    if tags.is_empty() {
        return Ok(None);
    }
    Ok(Some(tags.join(",")))
}

pub fn decode_tags(tags: Option<String>) -> Vec<String> {
    match tags {
        Some(s) if !s.is_empty() => s.split(TAG_SEPARATOR).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn text<'a>(column: &str, value: ValueRef<'a>) -> Result<Option<&'a str>, ValidationError> {
    let non_text = || ValidationError::NonTextColumn {
        column: column.to_string(),
    };
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).map(Some).map_err(|_| non_text()),
        _ => Err(non_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartograph_core::{EntityRefError, RefSegment};

    fn r(kind: &str, ns: &str, name: &str) -> EntityRef {
        EntityRef::new(kind, ns, name)
    }

    #[test]
    fn test_empty_ref_is_null() {
        assert_eq!(encode_ref(None), None);
        assert_eq!(encode_ref(Some(&EntityRef::default())), None);
        assert_eq!(
            encode_ref(Some(&r("user", "default", "owner"))).as_deref(),
            Some("user:default/owner")
        );
    }

    #[test]
    fn test_decode_ref_null_and_text() -> Result<(), ValidationError> {
        assert_eq!(decode_ref("owner", ValueRef::Null)?, None);
        assert_eq!(
            decode_ref("owner", ValueRef::Text(b"group:default/team-a"))?,
            Some(r("group", "default", "team-a"))
        );
        Ok(())
    }

    #[test]
    fn test_decode_ref_rejects_non_text() {
        assert_eq!(
            decode_ref("system", ValueRef::Integer(7)),
            Err(ValidationError::NonTextColumn {
                column: "system".to_string()
            })
        );
    }

    #[test]
    fn test_decode_ref_rejects_malformed() {
        assert_eq!(
            decode_ref("owner", ValueRef::Text(b"user:/x")),
            Err(ValidationError::InvalidReference(EntityRefError::EmptySegment {
                segment: RefSegment::Namespace,
                input: "user:/x".to_string(),
            }))
        );
    }

    #[test]
    fn test_ref_list_drops_empty_refs() -> Result<(), ValidationError> {
        let refs = vec![
            r("api", "default", "api1"),
            EntityRef::default(),
            r("api", "default", "api2"),
        ];
        assert_eq!(
            encode_refs(&refs)?.as_deref(),
            Some("api:default/api1 api:default/api2")
        );
        assert_eq!(encode_refs(&[EntityRef::default()])?, None);
        assert_eq!(encode_refs(&[])?, None);
        Ok(())
    }

    #[test]
    fn test_ref_list_rejects_spaces() {
        let refs = vec![r("api", "default", "my api")];
        assert!(matches!(
            encode_refs(&refs),
            Err(ValidationError::ReferenceContainsSpace { .. })
        ));
    }

    #[test]
    fn test_decode_ref_list() -> Result<(), ValidationError> {
        assert!(decode_refs("members", ValueRef::Null)?.is_empty());
        assert_eq!(
            decode_refs("members", ValueRef::Text(b"user:default/a  user:default/b"))?,
            vec![r("user", "default", "a"), r("user", "default", "b")]
        );
        assert!(decode_refs("members", ValueRef::Real(1.5)).is_err());
        Ok(())
    }

    #[test]
    fn test_tags() -> Result<(), ValidationError> {
        let tags = vec!["tag1".to_string(), "tag2".to_string()];
        let encoded = encode_tags(&tags)?;
        assert_eq!(encoded.as_deref(), Some("tag1,tag2"));
        assert_eq!(decode_tags(encoded), tags);
        assert_eq!(encode_tags(&[])?, None);
        assert!(decode_tags(None).is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_tag_rejected() {
        assert_eq!(encode_tags(&["".to_string()]), Err(ValidationError::EmptyTag));
        assert_eq!(
            encode_tags(&["a".to_string(), String::new()]),
            Err(ValidationError::EmptyTag)
        );
    }

    #[test]
    fn test_tag_with_comma_rejected() {
        let tags = vec!["a,b".to_string()];
        assert_eq!(
            encode_tags(&tags),
            Err(ValidationError::TagContainsDelimiter {
                tag: "a,b".to_string()
            })
        );
    }
}
