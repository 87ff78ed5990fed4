//! 实体存储接口

use async_trait::async_trait;
use clinic_core::{EntityRecord, Result};

use crate::filter::{EntityQuery, Predicate};

/// 一页数据行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRows {
    pub records: Vec<EntityRecord>,
    /// 随页数据返回的窗口计数；页为空时无法得到
    pub total_count: Option<i64>,
}

/// 实体表数据源
///
/// 所有方法都是单次往返，不在实现内部重试。
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// 存储名称，用于日志和健康检查
    fn name(&self) -> &str;

    /// 按条件取一页，按编号降序
    async fn fetch_page(&self, query: &EntityQuery) -> Result<PageRows>;

    /// 按条件计数
    async fn count(&self, predicate: &Predicate) -> Result<i64>;

    /// 按编号查找（不过滤停用状态）
    async fn find(&self, entity_no: i32) -> Result<Option<EntityRecord>>;

    /// 当前最大编号
    async fn max_entity_no(&self) -> Result<Option<i32>>;

    /// 插入新记录，编号已存在时返回 `ConcurrentAllocationConflict`
    async fn insert(&self, record: &EntityRecord) -> Result<()>;

    /// 按编号插入或整行更新
    async fn upsert(&self, record: &EntityRecord) -> Result<()>;

    /// 更新状态标记，返回是否命中
    async fn set_status(&self, entity_no: i32, active: bool) -> Result<bool>;

    /// 连通性检查
    async fn ping(&self) -> Result<()>;
}
