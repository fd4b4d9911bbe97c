//! Change detection from remote resource headers.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::source::ResourceHeaders;

use super::types::CatalogItem;

/// Parse an HTTP-date (`Last-Modified` style) header value.
pub fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Apply the result of a metadata probe to an item.
///
/// Sets `needs_update` when no remote modification time was ever recorded,
/// when no transfer has ever completed, or when the observed modification
/// time differs from the recorded one. A missing or unparseable header fails
/// open toward re-fetching; it never silently skips an item. Always stamps
/// `last_header_check`. The caller persists the catalog.
pub fn apply_headers(item: &mut CatalogItem, headers: &ResourceHeaders, now: DateTime<Utc>) {
    let observed = headers.last_modified.as_deref().and_then(parse_http_date);

    item.needs_update = match (observed, item.last_modified_remote, item.last_saved) {
        (None, _, _) => {
            debug!(item = %item.id, "Unparseable modification header, scheduling re-fetch");
            true
        }
        (Some(_), None, _) => true,
        (Some(_), Some(_), None) => true,
        (Some(new), Some(prev), Some(_)) => new != prev,
    };

    if observed.is_some() {
        item.last_modified_remote = observed;
    }
    item.last_header_check = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;

    const HTTP_DATE: &str = "Tue, 15 Nov 1994 08:12:31 GMT";
    const LATER_HTTP_DATE: &str = "Wed, 16 Nov 1994 08:12:31 GMT";

    fn headers(last_modified: Option<&str>) -> ResourceHeaders {
        ResourceHeaders {
            last_modified: last_modified.map(str::to_owned),
            content_type: None,
        }
    }

    #[test]
    fn test_first_probe_sets_needs_update() {
        let mut item = CatalogItem::new("abcd-1234", "One", None);
        let now = Utc::now();
        apply_headers(&mut item, &headers(Some(HTTP_DATE)), now);

        assert!(item.needs_update);
        assert_eq!(item.last_header_check, Some(now));
        assert_eq!(item.last_modified_remote, parse_http_date(HTTP_DATE));
    }

    #[test]
    fn test_unchanged_after_save_clears_needs_update() {
        let mut item = CatalogItem::new("abcd-1234", "One", None);
        item.last_modified_remote = parse_http_date(HTTP_DATE);
        item.last_saved = Some(Utc::now());
        item.needs_update = true;

        apply_headers(&mut item, &headers(Some(HTTP_DATE)), Utc::now());
        assert!(!item.needs_update);
    }

    #[test]
    fn test_changed_modification_time_sets_needs_update() {
        let mut item = CatalogItem::new("abcd-1234", "One", None);
        item.last_modified_remote = parse_http_date(HTTP_DATE);
        item.last_saved = Some(Utc::now());

        apply_headers(&mut item, &headers(Some(LATER_HTTP_DATE)), Utc::now());
        assert!(item.needs_update);
        assert_eq!(item.last_modified_remote, parse_http_date(LATER_HTTP_DATE));
    }

    #[test]
    fn test_never_saved_sets_needs_update() {
        let mut item = CatalogItem::new("abcd-1234", "One", None);
        item.last_modified_remote = parse_http_date(HTTP_DATE);
        item.last_saved = None;

        apply_headers(&mut item, &headers(Some(HTTP_DATE)), Utc::now());
        assert!(item.needs_update);
    }

    #[test]
    fn test_unparseable_header_fails_open() {
        let mut item = CatalogItem::new("abcd-1234", "One", None);
        item.last_modified_remote = parse_http_date(HTTP_DATE);
        item.last_saved = Some(Utc::now());

        apply_headers(&mut item, &headers(Some("not a date")), Utc::now());
        assert!(item.needs_update);
        // Recorded value is kept so a later parseable probe can compare.
        assert_eq!(item.last_modified_remote, parse_http_date(HTTP_DATE));

        apply_headers(&mut item, &headers(None), Utc::now());
        assert!(item.needs_update);
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date(HTTP_DATE).unwrap();
        assert_eq!(parsed.timestamp(), 784887151);
        assert!(parse_http_date("").is_none());
    }
}
