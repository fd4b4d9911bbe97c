//! Types for the dataset catalog (per-item sync state across runs).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Normalize a display name into a storage-safe identifier.
///
/// Lowercases, collapses runs of non-word characters into single hyphens and
/// strips leading/trailing hyphens. Idempotent: re-slugging a slug is a no-op.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let collapsed = NON_WORD.replace_all(&lowered, "-");
    collapsed.trim_matches('-').to_string()
}

/// The full set of tracked items plus run metadata, persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// When the last successful discovery merge happened.
    pub modified_at: DateTime<Utc>,
    /// Identifier of the remote catalog (e.g. a Socrata domain).
    pub source_id: String,
    /// Items keyed by their stable remote id. Key always equals `item.id`.
    pub items: HashMap<String, CatalogItem>,
}

impl Catalog {
    /// Create an empty catalog for the given source.
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            modified_at: Utc::now(),
            source_id: source_id.into(),
            items: HashMap::new(),
        }
    }

    /// Insert an item, keyed by its id.
    pub fn insert(&mut self, item: CatalogItem) {
        self.items.insert(item.id.clone(), item);
    }

    /// Ids of items whose content should be (re-)fetched, sorted for stable
    /// dispatch order.
    pub fn pending_updates(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .values()
            .filter(|i| i.needs_update)
            .map(|i| i.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// All item ids, sorted for stable dispatch order.
    pub fn item_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// One dataset entry tracked by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable identifier assigned by the remote source.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Normalized identifier derived from `display_name`; used in storage keys.
    pub slug: String,
    /// Reference to the item on the remote source (metadata only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    /// Modification timestamp extracted from the remote resource headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_remote: Option<DateTime<Utc>>,
    /// When the most recent metadata probe ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_header_check: Option<DateTime<Utc>>,
    /// When the most recent successful transfer to storage completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    /// True when content should be (re-)fetched.
    #[serde(default)]
    pub needs_update: bool,
}

impl CatalogItem {
    /// Create a freshly discovered item with no sync history.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        source_link: Option<String>,
    ) -> Self {
        let display_name = display_name.into();
        let slug = slugify(&display_name);
        Self {
            id: id.into(),
            display_name,
            slug,
            source_link,
            last_modified_remote: None,
            last_header_check: None,
            last_saved: None,
            needs_update: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_example() {
        assert_eq!(slugify("Crime Data 2020!!"), "crime-data-2020");
    }

    #[test]
    fn test_slugify_idempotent() {
        let names = [
            "Crime Data 2020!!",
            "  Leading & trailing  ",
            "already-a-slug",
            "Mixed_CASE words",
        ];
        for name in names {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("a   b---c!!!d"), "a-b-c-d");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_item_gets_slug_from_display_name() {
        let item = CatalogItem::new("abcd-1234", "Restaurant Inspections (2024)", None);
        assert_eq!(item.slug, "restaurant-inspections-2024");
        assert!(!item.needs_update);
        assert!(item.last_saved.is_none());
    }

    #[test]
    fn test_catalog_insert_keys_by_id() {
        let mut catalog = Catalog::new("data.example.gov");
        catalog.insert(CatalogItem::new("abcd-1234", "One", None));
        catalog.insert(CatalogItem::new("efgh-5678", "Two", None));
        assert_eq!(catalog.items.len(), 2);
        assert_eq!(catalog.items["abcd-1234"].id, "abcd-1234");
    }

    #[test]
    fn test_pending_updates_sorted() {
        let mut catalog = Catalog::new("data.example.gov");
        for id in ["zzzz-0000", "aaaa-0000", "mmmm-0000"] {
            let mut item = CatalogItem::new(id, id, None);
            item.needs_update = true;
            catalog.insert(item);
        }
        let fresh = CatalogItem::new("nnnn-0000", "no update", None);
        catalog.insert(fresh);

        assert_eq!(
            catalog.pending_updates(),
            vec!["aaaa-0000", "mmmm-0000", "zzzz-0000"]
        );
    }

    #[test]
    fn test_serialization_skips_absent_history() {
        let item = CatalogItem::new("abcd-1234", "One", None);
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("last_saved"));
        assert!(!json.contains("last_modified_remote"));

        let parsed: CatalogItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "abcd-1234");
        assert!(parsed.last_saved.is_none());
    }
}
