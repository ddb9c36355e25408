//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl Pagination {
    /// Largest page size a client may request
    pub const MAX_PER_PAGE: u32 = 100;

    /// Page size clamped to `1..=MAX_PER_PAGE`
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    /// Row offset for the requested page (pages start at 1)
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u32;
        let total_pages = if total_items == 0 {
            0
        } else {
            ((total_items + u64::from(per_page) - 1) / u64::from(per_page)) as u32
        };

        Self {
            data,
            pagination: PaginationMeta {
                page: pagination.page.max(1),
                per_page,
                total_items,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offsets() {
        let p = Pagination { page: 3, per_page: 10 };
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination { page: 0, per_page: 1000 };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_paginated_response_pages() {
        let p = Pagination { page: 1, per_page: 20 };
        let resp = PaginatedResponse::new(vec![1, 2, 3], &p, 41);
        assert_eq!(resp.pagination.total_pages, 3);

        let empty: PaginatedResponse<i32> = PaginatedResponse::new(vec![], &p, 0);
        assert_eq!(empty.pagination.total_pages, 0);
    }
}
