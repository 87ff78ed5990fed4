//! 分页计算

use serde::{Deserialize, Serialize};

/// 分页上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PagingLimits {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// 已校验的页请求，页码从1开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    /// 按上限收敛页码和页大小，非正值收敛为1
    pub fn clamped(number: Option<i64>, size: Option<i64>, limits: &PagingLimits) -> Self {
        let number = number.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let max = limits.max_page_size.max(1) as i64;
        let size = size
            .unwrap_or(limits.default_page_size as i64)
            .clamp(1, max) as u32;
        Self { number, size }
    }

    /// 窗口起点（从0开始，包含）
    pub fn offset(&self) -> i64 {
        (self.number as i64 - 1) * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }
}

/// 分页查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: PageRequest) -> Self {
        let total_count = total_count.max(0);
        let total_pages = total_pages(total_count, page.size);
        Self {
            items,
            total_count,
            page_number: page.number,
            page_size: page.size,
            total_pages,
            has_previous_page: page.number > 1,
            has_next_page: (page.number as i64) < total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
        }
    }
}

/// 总页数 = ceil(total / size)
pub fn total_pages(total_count: i64, page_size: u32) -> i64 {
    if page_size == 0 {
        return 0;
    }
    let size = page_size as i64;
    (total_count + size - 1) / size
}
