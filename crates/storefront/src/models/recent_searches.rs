//! Recently submitted search queries.

use serde::{Deserialize, Serialize};

/// Most recent first, de-duplicated ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches(Vec<String>);

impl RecentSearches {
    pub const MAX_ENTRIES: usize = 5;
    pub const MAX_QUERY_LENGTH: usize = 100;

    /// Record a submitted query. Blank queries are ignored; a repeated query
    /// moves to the front with its latest spelling.
    pub fn record(&mut self, query: &str) {
        let query: String = query
            .trim()
            .chars()
            .take(Self::MAX_QUERY_LENGTH)
            .collect();
        if query.is_empty() {
            return;
        }
        let folded = query.to_lowercase();
        self.0.retain(|existing| existing.to_lowercase() != folded);
        self.0.insert(0, query);
        self.0.truncate(Self::MAX_ENTRIES);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
