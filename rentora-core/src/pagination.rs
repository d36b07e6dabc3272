use serde::{Deserialize, Serialize};

/// Page/limit pair as it arrives on the query string. Both optional:
/// omitting them returns the unpaged result set, matching the listing
/// endpoints' contract.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

impl PageParams {
    /// OFFSET for the query, or zero when either half is missing.
    pub fn offset(&self) -> i64 {
        match (self.limit, self.page) {
            (Some(limit), Some(page)) if limit > 0 && page > 0 => (page - 1) * limit,
            _ => 0,
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!((self.limit, self.page), (Some(l), Some(p)) if l > 0 && p > 0)
    }

    /// Fills in the configured limit when a page was requested without
    /// one; a request with neither stays unpaged.
    pub fn with_default_limit(mut self, default_limit: i64) -> Self {
        if self.page.is_some() && self.limit.is_none() {
            self.limit = Some(default_limit);
        }
        self
    }
}

/// Standard paginated envelope: items plus the totals every listing
/// endpoint reports.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: i64, params: PageParams) -> Self {
        let current_page = params.page.unwrap_or(1).max(1);
        let total_pages = match params.limit {
            Some(limit) if limit > 0 => (total_items + limit - 1) / limit,
            _ => 1,
        };
        Self { items, total_items, current_page, total_pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_zero_without_both_params() {
        assert_eq!(PageParams { limit: Some(10), page: None }.offset(), 0);
        assert_eq!(PageParams { limit: None, page: Some(3) }.offset(), 0);
    }

    #[test]
    fn offset_counts_from_page_one() {
        let params = PageParams { limit: Some(25), page: Some(3) };
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn default_limit_applies_only_when_paged() {
        let params = PageParams { limit: None, page: Some(2) }.with_default_limit(20);
        assert_eq!(params.limit, Some(20));
        assert_eq!(params.offset(), 20);

        let unpaged = PageParams::default().with_default_limit(20);
        assert_eq!(unpaged.limit, None);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PageParams { limit: Some(10), page: Some(1) };
        let page = Paginated::new(vec![1, 2, 3], 21, params);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 1);
    }
}
