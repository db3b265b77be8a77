use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Page-number pagination query, as received from clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PaginationRequest {
    pub fn offset(&self) -> i64 {
        get_pagination_offset(self.page, self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub next_page: Option<i64>,
    pub prev_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

fn clamp(page: i64, limit: i64) -> (i64, i64) {
    (page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
}

/// Clamps `page >= 1`, `limit` to `1..=100` and `total >= 0`.
pub fn calculate_pagination(page: i64, limit: i64, total: i64) -> PaginationMeta {
    let (page, limit) = clamp(page, limit);
    let total = total.max(0);
    let total_pages = total / limit + i64::from(total % limit != 0);

    let has_next_page = page < total_pages;
    let has_prev_page = page > 1;

    PaginationMeta {
        page,
        limit,
        total,
        total_pages,
        has_next_page,
        has_prev_page,
        next_page: has_next_page.then_some(page + 1),
        prev_page: has_prev_page.then_some(page - 1),
    }
}

/// Row offset for a page, with the same clamping as [`calculate_pagination`].
pub fn get_pagination_offset(page: i64, limit: i64) -> i64 {
    let (page, limit) = clamp(page, limit);
    (page - 1).saturating_mul(limit)
}
