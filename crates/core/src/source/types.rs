//! Types returned by catalog sources.

/// Metadata extracted from a resource probe. Raw header values; parsing into
/// timestamps is the change detector's job.
#[derive(Debug, Clone, Default)]
pub struct ResourceHeaders {
    /// Raw `Last-Modified` header value, if the source sent one.
    pub last_modified: Option<String>,
    /// Raw `Content-Type` header value.
    pub content_type: Option<String>,
}
