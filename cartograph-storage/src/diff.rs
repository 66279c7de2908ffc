//! Three-way partition of child collections for updates.
//!
//! Given the stored rows and the desired rows, work out which to insert,
//! which to update in place and which to delete. Nothing here touches the
//! database.

use std::collections::{BTreeMap, HashSet};

use cartograph_core::Link;

/// Changes turning one key/value map into another.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MapDiff<'a> {
    pub insert: Vec<(&'a str, &'a str)>,
    pub update: Vec<(&'a str, &'a str)>,
    pub delete: Vec<&'a str>,
}

impl MapDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Diff labels or annotations by key. Keys whose value is unchanged are left alone.
pub fn diff_map<'a>(
    current: &'a BTreeMap<String, String>,
    desired: &'a BTreeMap<String, String>,
) -> MapDiff<'a> {
    let mut diff = MapDiff::default();
    for (k, v) in desired {
        match current.get(k) {
            None => diff.insert.push((k.as_str(), v.as_str())),
            Some(old) if old != v => diff.update.push((k.as_str(), v.as_str())),
            Some(_) => {}
        }
    }
    diff.delete = current
        .keys()
        .filter(|k| !desired.contains_key(*k))
        .map(String::as_str)
        .collect();
    diff
}

/// A link together with the position it should be stored at.
#[derive(Debug, PartialEq, Eq)]
pub struct PositionedLink<'a> {
    pub position: i64,
    pub link: &'a Link,
}

/// Changes turning one link list into another, keyed by URL.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LinkDiff<'a> {
    pub insert: Vec<PositionedLink<'a>>,
    /// Existing URLs; position and attributes are rewritten.
    pub update: Vec<PositionedLink<'a>>,
    pub delete: Vec<&'a str>,
}

/// Diff links by URL. Every surviving link is updated so its stored position
/// follows the desired order.
pub fn diff_links<'a>(current: &'a [Link], desired: &'a [Link]) -> LinkDiff<'a> {
    let existing: HashSet<&str> = current.iter().map(|l| l.url.as_str()).collect();
    let mut diff = LinkDiff::default();
    let mut kept: HashSet<&str> = HashSet::with_capacity(desired.len());

    for (position, link) in desired.iter().enumerate() {
        let entry = PositionedLink {
            position: position as i64,
            link,
        };
        if existing.contains(link.url.as_str()) {
            diff.update.push(entry);
        } else {
            diff.insert.push(entry);
        }
        kept.insert(link.url.as_str());
    }

    diff.delete = current
        .iter()
        .map(|l| l.url.as_str())
        .filter(|url| !kept.contains(url))
        .collect();
    diff
}
