//! Description → category lookup for free-text bills.

use homebudget_core::{Result, UNKNOWN_CATEGORY};
use std::collections::HashMap;

/// Source of user-defined categories, keyed by lowercase description.
pub trait CategoryStore: Send + Sync {
    fn category_for(&self, description: &str) -> Result<Option<String>>;
}

/// In-memory category table, usually built from the `[categories]` config section.
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    entries: HashMap<String, String>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, description: &str, category: impl Into<String>) {
        self.entries
            .insert(normalize(description), category.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        for (description, category) in iter {
            map.insert(description.as_ref(), category);
        }
        map
    }
}

impl CategoryStore for CategoryMap {
    fn category_for(&self, description: &str) -> Result<Option<String>> {
        Ok(self.entries.get(&normalize(description)).cloned())
    }
}

/// Category for `description`, or `"-"` when the store has none.
pub fn resolve_category(store: &dyn CategoryStore, description: &str) -> Result<String> {
    Ok(store
        .category_for(description)?
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
}

fn normalize(description: &str) -> String {
    description.trim().to_lowercase()
}
