//! Merging a freshly discovered catalog into previously persisted state.
//!
//! Previous record wins on conflict, missing fields are filled from the newly
//! discovered record. Items that disappeared from the remote listing are
//! retained: remote deletions never purge local history.

use chrono::{DateTime, Utc};

use super::types::{Catalog, CatalogItem};

/// Combine a previously persisted catalog with a freshly discovered one.
///
/// Pure function; the caller is responsible for persisting the result. The
/// returned catalog's `modified_at` is the supplied merge time.
pub fn merge(previous: Option<&Catalog>, discovered: Catalog, now: DateTime<Utc>) -> Catalog {
    let Some(previous) = previous else {
        let mut fresh = discovered;
        fresh.modified_at = now;
        return fresh;
    };

    let mut merged = Catalog {
        modified_at: now,
        source_id: if previous.source_id.is_empty() {
            discovered.source_id.clone()
        } else {
            previous.source_id.clone()
        },
        items: std::collections::HashMap::with_capacity(
            previous.items.len().max(discovered.items.len()),
        ),
    };

    for (id, fresh) in discovered.items {
        let item = match previous.items.get(&id) {
            Some(prev) => merge_item(prev, &fresh),
            None => fresh,
        };
        merged.items.insert(id, item);
    }

    // Items known only from previous runs survive the merge.
    for (id, prev) in &previous.items {
        merged
            .items
            .entry(id.clone())
            .or_insert_with(|| prev.clone());
    }

    merged
}

/// Field-level merge of one item: previous wins, gaps filled from discovered.
fn merge_item(previous: &CatalogItem, discovered: &CatalogItem) -> CatalogItem {
    CatalogItem {
        id: previous.id.clone(),
        display_name: pick_string(&previous.display_name, &discovered.display_name),
        slug: pick_string(&previous.slug, &discovered.slug),
        source_link: previous
            .source_link
            .clone()
            .or_else(|| discovered.source_link.clone()),
        last_modified_remote: previous
            .last_modified_remote
            .or(discovered.last_modified_remote),
        last_header_check: previous.last_header_check.or(discovered.last_header_check),
        last_saved: previous.last_saved.or(discovered.last_saved),
        needs_update: previous.needs_update,
    }
}

fn pick_string(previous: &str, discovered: &str) -> String {
    if previous.is_empty() {
        discovered.to_string()
    } else {
        previous.to_string()
    }
}
