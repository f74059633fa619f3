//! Offset paging in Snowflake's `OFFSET ... FETCH` form.
//!
//! ```rust
//! use glacier_query::Pagination;
//!
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(), "OFFSET 10 ROWS FETCH NEXT 20 ROWS ONLY");
//!
//! assert_eq!(Pagination::first(5).to_sql(), "FETCH FIRST 5 ROWS ONLY");
//! assert_eq!(Pagination::new().skip(3).to_sql(), "OFFSET 3 ROWS FETCH NEXT NULL ROWS ONLY");
//! ```

/// Pagination with constant bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of rows to skip.
    pub skip: Option<u64>,
    /// Maximum number of rows to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of rows to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of rows to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// The first N rows.
    pub fn first(n: u64) -> Self {
        Self::new().take(n)
    }

    /// A page (1-indexed).
    pub fn page(page: u64, page_size: u64) -> Self {
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        Self::new().skip(skip).take(page_size)
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Generate the paging clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(48);
        let skip = self.skip.map(|n| n.to_string());
        let take = self.take.map(|n| n.to_string());
        write_paging(&mut sql, skip.as_deref(), take.as_deref());
        sql
    }
}

/// Write a paging clause from already-rendered bounds.
///
/// With an offset the limit becomes `FETCH NEXT`, and a missing limit is
/// written as `NULL` (no upper bound). Without an offset a limit is `FETCH FIRST`.
pub fn write_paging(buffer: &mut String, offset: Option<&str>, limit: Option<&str>) {
    match (offset, limit) {
        (Some(offset), limit) => {
            buffer.push_str("OFFSET ");
            buffer.push_str(offset);
            buffer.push_str(" ROWS FETCH NEXT ");
            buffer.push_str(limit.unwrap_or("NULL"));
            buffer.push_str(" ROWS ONLY");
        }
        (None, Some(limit)) => {
            buffer.push_str("FETCH FIRST ");
            buffer.push_str(limit);
            buffer.push_str(" ROWS ONLY");
        }
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_offset_and_limit() {
        let mut sql = String::new();
        write_paging(&mut sql, Some(":p0"), Some(":p1"));
        assert_eq!(sql, "OFFSET :p0 ROWS FETCH NEXT :p1 ROWS ONLY");
    }

    #[test]
    fn test_offset_without_limit() {
        let mut sql = String::new();
        write_paging(&mut sql, Some("5"), None);
        assert_eq!(sql, "OFFSET 5 ROWS FETCH NEXT NULL ROWS ONLY");
    }

    #[test]
    fn test_limit_only() {
        assert_eq!(Pagination::first(10).to_sql(), "FETCH FIRST 10 ROWS ONLY");
    }

    #[test]
    fn test_page() {
        let page = Pagination::page(3, 25);
        assert_eq!(page.skip, Some(50));
        assert_eq!(page.take, Some(25));
        assert!(Pagination::new().is_empty());
        assert_eq!(Pagination::new().to_sql(), "");
    }

    #[test]
    fn test_page_offset_saturates() {
        let page = Pagination::page(u64::MAX, 2);
        assert_eq!(page.skip, Some(u64::MAX));
        assert_eq!(page.take, Some(2));
        assert_eq!(Pagination::page(0, 10).skip, Some(0));
    }
}
