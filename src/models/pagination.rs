//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            page_size: Some(DEFAULT_PAGE_SIZE),
        }
    }
}

impl PaginationParams {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.map(|p| p as i64),
            page_size: per_page.map(|p| p as i64),
        }
    }

    /// 页码从 1 开始，非法值按 1 处理
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// 每页数量限制在 1..=MAX_PAGE_SIZE
    pub fn page_size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn get_offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }

    pub fn get_limit(&self) -> i64 {
        self.page_size()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(LotteryPage = PaginatedResponse<super::LotterySummaryResponse>)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total: i64) -> Self {
        let page_size = params.page_size();
        let total_pages = (total + page_size - 1) / page_size;
        Self {
            data,
            page: params.page(),
            page_size,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let params = PaginationParams::new(Some(3), Some(10));
        assert_eq!(params.get_offset(), 20);
        assert_eq!(params.get_limit(), 10);
    }

    #[test]
    fn test_invalid_values_are_clamped() {
        let params = PaginationParams::new(Some(0), Some(1000));
        assert_eq!(params.page(), 1);
        assert_eq!(params.get_limit(), MAX_PAGE_SIZE);
        assert_eq!(params.get_offset(), 0);

        let params = PaginationParams::new(None, Some(0));
        assert_eq!(params.get_limit(), 1);
    }

    #[test]
    fn test_total_pages() {
        let params = PaginationParams::new(Some(1), Some(20));
        let page = PaginatedResponse::new(vec![1, 2, 3], &params, 41);
        assert_eq!(page.total_pages, 3);
        let empty = PaginatedResponse::<i32>::new(vec![], &params, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
