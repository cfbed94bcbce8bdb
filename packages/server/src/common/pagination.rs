//! Offset pagination for list endpoints.
//!
//! ```rust,ignore
//! let page = Page::from_query(params.limit, params.offset);
//! let rows = Notification::find_feed(user_id, page, pool).await?;
//! ```

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query string shape shared by paginated routes.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Validated limit/offset pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamp caller input: limit to `1..=MAX_PAGE_SIZE`, offset to `>= 0`.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Self::from_query(query.limit, query.offset)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::from_query(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Page::default(), Page { limit: 20, offset: 0 });
        assert_eq!(Page::from_query(Some(0), Some(-5)), Page { limit: 1, offset: 0 });
        assert_eq!(Page::from_query(Some(500), Some(40)), Page { limit: 100, offset: 40 });
    }
}
