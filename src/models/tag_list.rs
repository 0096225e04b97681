// TagList - ordered set of free-form tags stored as a JSON text column

use serde::{Deserialize, Deserializer, Serialize};

/// Ordered set of strings. Insertion order is kept, the first occurrence of a
/// tag wins and blank entries are dropped.
///
/// SQLite has no array column, so the list crosses the store boundary as a JSON
/// array string through [`TagList::encode`] and [`TagList::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into().trim().to_string();
        if tag.is_empty() || self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn encode(&self) -> String {
        // A Vec<String> always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let items: Vec<String> = serde_json::from_str(raw)?;
        Ok(items.into_iter().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for TagList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = TagList::new();
        for tag in iter {
            list.insert(tag);
        }
        list
    }
}

impl TryFrom<String> for TagList {
    type Error = serde_json::Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        TagList::decode(&raw)
    }
}

// A JSON `null` reads as the empty list
impl<'de> Deserialize<'de> for TagList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(items.unwrap_or_default().into_iter().collect())
    }
}
