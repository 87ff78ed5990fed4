//! 内存实体存储
//!
//! 以列映射后的数据行保存实体，查询条件在数据行上求值，与SQL实现语义一致。
//! 用于测试和无数据库的演示模式。

use async_trait::async_trait;
use clinic_core::{ClinicError, EntityRecord, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::filter::{EntityQuery, Predicate};
use crate::mapping::{map_row, MemoryRow};
use crate::store::{EntityStore, PageRows};

/// 内存实体存储
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    rows: RwLock<BTreeMap<i32, MemoryRow>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_records(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.write().await;
            for record in records {
                rows.insert(record.entity_no, MemoryRow::from_record(&record));
            }
        }
        store
    }

    /// 直接写入原始数据行，可用于构造异常数据
    pub async fn put_row(&self, entity_no: i32, row: MemoryRow) {
        self.rows.write().await.insert(entity_no, row);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_page(&self, query: &EntityQuery) -> Result<PageRows> {
        let rows = self.rows.read().await;

        let mut matched = Vec::new();
        for row in rows.values().rev() {
            if query.predicate.matches(row)? {
                matched.push(row);
            }
        }

        let total = matched.len() as i64;
        let records = matched
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .map(map_row)
            .collect::<Result<Vec<_>>>()?;

        // 与窗口计数一致：空页拿不到总数
        let total_count = if records.is_empty() { None } else { Some(total) };
        Ok(PageRows {
            records,
            total_count,
        })
    }

    async fn count(&self, predicate: &Predicate) -> Result<i64> {
        let rows = self.rows.read().await;
        let mut count = 0;
        for row in rows.values() {
            if predicate.matches(row)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn find(&self, entity_no: i32) -> Result<Option<EntityRecord>> {
        let rows = self.rows.read().await;
        rows.get(&entity_no).map(map_row).transpose()
    }

    async fn max_entity_no(&self) -> Result<Option<i32>> {
        Ok(self.rows.read().await.keys().next_back().copied())
    }

    async fn insert(&self, record: &EntityRecord) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&record.entity_no) {
            return Err(ClinicError::ConcurrentAllocationConflict(record.entity_no));
        }
        rows.insert(record.entity_no, MemoryRow::from_record(record));
        Ok(())
    }

    async fn upsert(&self, record: &EntityRecord) -> Result<()> {
        self.rows
            .write()
            .await
            .insert(record.entity_no, MemoryRow::from_record(record));
        Ok(())
    }

    async fn set_status(&self, entity_no: i32, active: bool) -> Result<bool> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get(&entity_no) else {
            return Ok(false);
        };
        let mut record = map_row(row)?;
        record.status = Some(active);
        record.modified_date = Some(chrono::Utc::now());
        rows.insert(entity_no, MemoryRow::from_record(&record));
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{EntityFilter, PagingLimits};

    fn patient(entity_no: i32) -> EntityRecord {
        let mut record = EntityRecord::with_type("PAT");
        record.entity_no = entity_no;
        record
    }

    #[tokio::test]
    async fn test_page_is_ordered_by_identifier_descending() {
        let store = MemoryEntityStore::with_records((1..=5).map(patient)).await;
        let filter = EntityFilter::page(1, 3).normalize(&PagingLimits::default()).unwrap();
        let page = store.fetch_page(&EntityQuery::from_filter(&filter)).await.unwrap();

        let ids: Vec<_> = page.records.iter().map(|r| r.entity_no).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert_eq!(page.total_count, Some(5));
    }

    #[tokio::test]
    async fn test_empty_page_has_no_window_count() {
        let store = MemoryEntityStore::with_records((1..=5).map(patient)).await;
        let filter = EntityFilter::page(9, 3).normalize(&PagingLimits::default()).unwrap();
        let page = store.fetch_page(&EntityQuery::from_filter(&filter)).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_count, None);
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_conflict() {
        let store = MemoryEntityStore::new();
        store.insert(&patient(1)).await.unwrap();
        let err = store.insert(&patient(1)).await.unwrap_err();
        assert!(err.is_retryable_allocation());
    }

    #[tokio::test]
    async fn test_set_status_on_missing_row() {
        let store = MemoryEntityStore::new();
        assert!(!store.set_status(7, false).await.unwrap());
    }
}
