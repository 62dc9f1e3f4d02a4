//! Insertion-ordered map keyed by component tag.
//!
//! Lines, sources and propulsors are addressed by string tags and must be
//! iterated in the order they were defined, so the map keeps a plain vector of
//! entries. Collections here are small (a handful of entries), which makes a
//! linear lookup cheaper than hashing.

use crate::{PfError, PfResult};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for TagMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> TagMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry; tags must be unique.
    pub fn insert(&mut self, tag: impl Into<String>, value: T) -> PfResult<()> {
        let tag = tag.into();
        if self.contains(&tag) {
            return Err(PfError::DuplicateTag { tag });
        }
        self.entries.push((tag, value));
        Ok(())
    }

    /// Insert or overwrite, keeping the original position on overwrite.
    pub fn upsert(&mut self, tag: impl Into<String>, value: T) {
        let tag = tag.into();
        match self.index_of(&tag) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((tag, value)),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index_of(tag).is_some()
    }

    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.entries.iter().position(|(t, _)| t == tag)
    }

    pub fn get(&self, tag: &str) -> Option<&T> {
        self.entries.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v)
    }

    /// Like [`TagMap::get`], but reports the missing tag as an error.
    pub fn require(&self, tag: &str) -> PfResult<&T> {
        self.get(tag).ok_or_else(|| PfError::UnknownTag {
            tag: tag.to_string(),
        })
    }

    pub fn require_mut(&mut self, tag: &str) -> PfResult<&mut T> {
        self.get_mut(tag).ok_or_else(|| PfError::UnknownTag {
            tag: tag.to_string(),
        })
    }

    pub fn get_index(&self, index: usize) -> Option<(&str, &T)> {
        self.entries.get(index).map(|(t, v)| (t.as_str(), v))
    }

    pub fn first(&self) -> Option<(&str, &T)> {
        self.get_index(0)
    }

    /// Split into the first entry and the rest, all mutable.
    pub fn split_first_mut(&mut self) -> Option<(&mut T, Vec<(&str, &mut T)>)> {
        let (first, rest) = self.entries.split_first_mut()?;
        let rest = rest.iter_mut().map(|(t, v)| (t.as_str(), v)).collect();
        Some((&mut first.1, rest))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(t, v)| (t.as_str(), v))
    }
}

impl<T> FromIterator<(String, T)> for TagMap<T> {
    /// Later duplicates overwrite earlier ones in place.
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = TagMap::new();
        for (tag, value) in iter {
            map.upsert(tag, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut map = TagMap::new();
        map.insert("zeta", 1).unwrap();
        map.insert("alpha", 2).unwrap();
        map.insert("mid", 3).unwrap();
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn rejects_duplicates() {
        let mut map = TagMap::new();
        map.insert("bus", 1).unwrap();
        let err = map.insert("bus", 2).unwrap_err();
        assert_eq!(
            err,
            PfError::DuplicateTag {
                tag: "bus".to_string()
            }
        );
        assert_eq!(map.get("bus"), Some(&1));
    }

    #[test]
    fn split_first_mut_gives_disjoint_borrows() {
        let mut map = TagMap::new();
        map.insert("a", 1.0).unwrap();
        map.insert("b", 2.0).unwrap();
        map.insert("c", 3.0).unwrap();
        let (first, rest) = map.split_first_mut().unwrap();
        for (_, v) in rest {
            *v = *first;
        }
        assert!(map.values().all(|v| *v == 1.0));
    }

    #[test]
    fn require_reports_missing_tag() {
        let map: TagMap<u8> = TagMap::new();
        assert!(matches!(map.require("x"), Err(PfError::UnknownTag { .. })));
    }
}
