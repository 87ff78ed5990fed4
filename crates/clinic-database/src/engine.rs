//! 实体分页查询引擎
//!
//! 校验过滤条件、构造查询、取页并组装分页结果；同时承担实体登记、
//! 更新与软删除流程。每次存储往返都受查询超时约束，错误原样返回给调用方。

use clinic_core::{
    ClinicError, EntityFilter, EntityRecord, PagedResult, PagingLimits, Result,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::filter::EntityQuery;
use crate::store::EntityStore;

/// 默认查询超时
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// 实体查询引擎
#[derive(Clone)]
pub struct EntityQueryEngine {
    store: Arc<dyn EntityStore>,
    limits: PagingLimits,
    query_timeout: Duration,
}

impl EntityQueryEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            limits: PagingLimits::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, limits: PagingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn limits(&self) -> &PagingLimits {
        &self.limits
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.query_timeout, operation)
            .await
            .map_err(|_| ClinicError::Timeout(self.query_timeout))?
    }

    /// 分页搜索实体
    pub async fn search(&self, filter: &EntityFilter) -> Result<PagedResult<EntityRecord>> {
        let filter = filter.normalize(&self.limits)?;
        let query = EntityQuery::from_filter(&filter);

        let rows = self.bounded(self.store.fetch_page(&query)).await?;
        let total_count = match rows.total_count {
            Some(total) => total,
            // 越过末页时窗口计数为空，按同一条件单独计数
            None if filter.page.number > 1 => {
                self.bounded(self.store.count(&query.predicate)).await?
            }
            None => 0,
        };

        debug!(
            page = filter.page.number,
            size = filter.page.size,
            returned = rows.records.len(),
            total = total_count,
            "Entity search completed"
        );

        Ok(PagedResult::new(rows.records, total_count, filter.page))
    }

    /// 按编号获取实体（包括已停用的）
    pub async fn get(&self, entity_no: i32) -> Result<EntityRecord> {
        ensure_positive(entity_no)?;
        self.bounded(self.store.find(entity_no))
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("entity {}", entity_no)))
    }

    /// 下一个可用编号：当前最大编号加一，表为空时为1
    ///
    /// 仅供参考，并发调用可能得到相同的值，由插入时的主键约束兜底。
    pub async fn next_identifier(&self) -> Result<i32> {
        let max = self.bounded(self.store.max_entity_no()).await?;
        match max {
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| ClinicError::Internal("entity number space exhausted".to_string())),
            None => Ok(1),
        }
    }

    /// 登记新实体，返回分配的编号
    ///
    /// 编号冲突时重新分配一次，仍冲突则返回 `ConcurrentAllocationConflict`。
    pub async fn register(&self, mut record: EntityRecord) -> Result<i32> {
        record.prepare_for_save()?;
        record.status.get_or_insert(true);

        let mut retried = false;
        loop {
            record.entity_no = self.next_identifier().await?;
            match self.bounded(self.store.insert(&record)).await {
                Ok(()) => {
                    info!(entity_no = record.entity_no, "Entity registered");
                    return Ok(record.entity_no);
                }
                Err(e) if e.is_retryable_allocation() && !retried => {
                    warn!(entity_no = record.entity_no, "Entity number taken, allocating again");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 更新已有实体（整行写入）
    ///
    /// 请求未带状态时沿用已存储的状态，已停用的实体不会因更新而恢复。
    pub async fn update(&self, entity_no: i32, mut record: EntityRecord) -> Result<()> {
        ensure_positive(entity_no)?;
        record.prepare_for_save()?;

        let Some(stored) = self.bounded(self.store.find(entity_no)).await? else {
            return Err(ClinicError::NotFound(format!("entity {}", entity_no)));
        };

        if record.status.is_none() {
            record.status = stored.status;
        }
        record.entity_no = entity_no;
        self.bounded(self.store.upsert(&record)).await?;
        info!(entity_no, "Entity updated");
        Ok(())
    }

    /// 软删除：状态置为停用
    pub async fn deactivate(&self, entity_no: i32) -> Result<()> {
        ensure_positive(entity_no)?;
        if !self.bounded(self.store.set_status(entity_no, false)).await? {
            return Err(ClinicError::NotFound(format!("entity {}", entity_no)));
        }
        info!(entity_no, "Entity deactivated");
        Ok(())
    }

    /// 存储连通性
    pub async fn health(&self) -> Result<()> {
        self.bounded(self.store.ping()).await
    }
}

fn ensure_positive(entity_no: i32) -> Result<()> {
    if entity_no <= 0 {
        return Err(ClinicError::Validation(
            "Entity number must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
