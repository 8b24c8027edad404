use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// Page number / page size taken from `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Pages past the last representable offset are capped, they come back empty.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .clamp(1, MAX_PAGE_SIZE);

        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1).min(i64::MAX / limit),
            limit,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if rows.len() <= 0 {
            return Self::no_rows(total_rows, request);
        }

        let next = if request.offset().saturating_add(rows.len() as i64) < total_rows {
            Some(request.page.saturating_add(1))
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous: (request.page > 1).then(|| request.page - 1),
            results: rows,
        }
    }

    pub fn no_rows(total_rows: i64, request: PageRequest) -> Self {
        Self {
            count: total_rows,
            next: None,
            previous: (request.page > 1 && total_rows > 0).then(|| request.page - 1),
            results: vec![],
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageContext<U> {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_and_clamps() {
        let request = PageRequest::new(None, None, 6);
        assert_eq!(request, PageRequest { page: 1, limit: 6 });

        let request = PageRequest::new(Some(0), Some(100_000), 6);
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, MAX_PAGE_SIZE);

        assert_eq!(PageRequest::new(Some(3), Some(10), 6).offset(), 20);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let request = PageRequest::new(Some(i64::MAX), Some(6), 6);
        assert!(request.offset() >= 0);
        assert_eq!(request.page, i64::MAX / 6);

        let request = PageRequest::new(Some(i64::MAX), Some(1), 6);
        assert_eq!(request.offset(), i64::MAX - 1);

        let page = PageContext::from_rows(vec![1], 3, request);
        assert_eq!(page.next, None);
    }

    #[test]
    fn links_follow_the_total() {
        let request = PageRequest::new(Some(2), Some(2), 6);
        let page = PageContext::from_rows(vec![3, 4], 5, request);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let request = PageRequest::new(Some(3), Some(2), 6);
        let page = PageContext::from_rows(vec![5], 5, request);
        assert_eq!(page.next, None);
        assert_eq!(page.count, 5);
    }

    #[test]
    fn empty_page() {
        let page: PageContext<i32> = PageContext::no_rows(0, PageRequest::new(None, None, 6));
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }
}
