//! Common types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub type EntityId = Uuid;

pub fn new_id() -> EntityId {
    Uuid::new_v4()
}

/// One-based page request, clamped to sane bounds on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps_bounds() {
        let p = Pagination::new(0, 10_000);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination::new(3, 25);
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }
}
