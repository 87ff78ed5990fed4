//! PostgreSQL 实体存储

use async_trait::async_trait;
use clinic_core::{ClinicError, EntityRecord, Result};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::connection::DatabasePool;
use crate::filter::{EntityQuery, Predicate};
use crate::mapping::{
    map_row, ColumnValue, FieldKind, ENTITY_COLUMNS, ENTITY_TABLE, KEY_COLUMN, STATUS_COLUMN,
    TYPE_CODE_COLUMN,
};
use crate::store::{EntityStore, PageRows};

/// PostgreSQL 实体存储
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: DatabasePool,
}

impl PgEntityStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// 建表语句，由列映射表生成
    pub fn create_table_sql() -> String {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {} INTEGER PRIMARY KEY",
            ENTITY_TABLE, KEY_COLUMN
        );
        for column in ENTITY_COLUMNS {
            sql.push_str(&format!(",\n    {} {}", column.name, column.kind.sql_type()));
        }
        sql.push_str("\n)");
        sql
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(&Self::create_table_sql())
            .execute(pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 索引语句：类型代码与状态列
    ///
    /// 子串搜索 `ILIKE '%term%'` 用不上 btree 索引，搜索列不建索引；
    /// 需要加速时应建 pg_trgm 的 GIN 索引。
    pub fn index_sql() -> Vec<String> {
        [TYPE_CODE_COLUMN, STATUS_COLUMN]
            .into_iter()
            .map(|column| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})",
                    table = ENTITY_TABLE,
                    column = column
                )
            })
            .collect()
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        for index_sql in Self::index_sql() {
            sqlx::query(&index_sql)
                .execute(pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    /// INSERT 语句，列顺序与列映射表一致
    pub fn insert_sql(record: &EntityRecord) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("INSERT INTO ");
        qb.push(ENTITY_TABLE).push(" (").push(KEY_COLUMN);
        for column in ENTITY_COLUMNS {
            qb.push(", ").push(column.name);
        }
        qb.push(") VALUES (").push_bind(record.entity_no);
        for column in ENTITY_COLUMNS {
            qb.push(", ");
            push_column_bind(&mut qb, column.kind, (column.get)(record));
        }
        qb.push(")");
        qb
    }

    /// INSERT ... ON CONFLICT DO UPDATE 语句
    pub fn upsert_sql(record: &EntityRecord) -> QueryBuilder<'static, Postgres> {
        let mut qb = Self::insert_sql(record);
        qb.push(" ON CONFLICT (").push(KEY_COLUMN).push(") DO UPDATE SET ");
        for (i, column) in ENTITY_COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(column.name).push(" = EXCLUDED.").push(column.name);
        }
        qb
    }
}

fn push_column_bind(qb: &mut QueryBuilder<'static, Postgres>, kind: FieldKind, value: Option<ColumnValue>) {
    match (kind, value) {
        (_, Some(ColumnValue::Text(v))) => qb.push_bind(v),
        (_, Some(ColumnValue::Int(v))) => qb.push_bind(v),
        (_, Some(ColumnValue::Bool(v))) => qb.push_bind(v),
        (_, Some(ColumnValue::Date(v))) => qb.push_bind(v),
        (_, Some(ColumnValue::Timestamp(v))) => qb.push_bind(v),
        (FieldKind::Text, None) => qb.push_bind(None::<String>),
        (FieldKind::Int, None) => qb.push_bind(None::<i32>),
        (FieldKind::Bool, None) => qb.push_bind(None::<bool>),
        (FieldKind::Date, None) => qb.push_bind(None::<chrono::NaiveDate>),
        (FieldKind::Timestamp, None) => qb.push_bind(None::<chrono::DateTime<chrono::Utc>>),
    };
}

#[async_trait]
impl EntityStore for PgEntityStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn fetch_page(&self, query: &EntityQuery) -> Result<PageRows> {
        let rows = query.page_sql().build().fetch_all(self.pool.pool()).await?;

        let total_count = match rows.first() {
            Some(row) => Some(row.try_get::<i64, _>("total_count")?),
            None => None,
        };
        let records = rows.iter().map(map_row).collect::<Result<Vec<_>>>()?;

        Ok(PageRows {
            records,
            total_count,
        })
    }

    async fn count(&self, predicate: &Predicate) -> Result<i64> {
        let count = EntityQuery::count_sql(predicate)
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.pool())
            .await?;
        Ok(count)
    }

    async fn find(&self, entity_no: i32) -> Result<Option<EntityRecord>> {
        let sql = format!("SELECT * FROM {} WHERE {} = $1", ENTITY_TABLE, KEY_COLUMN);
        let row = sqlx::query(&sql)
            .bind(entity_no)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn max_entity_no(&self) -> Result<Option<i32>> {
        let sql = format!("SELECT MAX({}) FROM {}", KEY_COLUMN, ENTITY_TABLE);
        let max = sqlx::query_scalar::<_, Option<i32>>(&sql)
            .fetch_one(self.pool.pool())
            .await?;
        Ok(max)
    }

    async fn insert(&self, record: &EntityRecord) -> Result<()> {
        Self::insert_sql(record)
            .build()
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
                if duplicate {
                    ClinicError::ConcurrentAllocationConflict(record.entity_no)
                } else {
                    ClinicError::from(e)
                }
            })?;
        Ok(())
    }

    async fn upsert(&self, record: &EntityRecord) -> Result<()> {
        Self::upsert_sql(record)
            .build()
            .execute(self.pool.pool())
            .await?;
        Ok(())
    }

    async fn set_status(&self, entity_no: i32, active: bool) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET {} = $1, modified_date = NOW() WHERE {} = $2",
            ENTITY_TABLE, STATUS_COLUMN, KEY_COLUMN
        );
        let result = sqlx::query(&sql)
            .bind(active)
            .bind(entity_no)
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool.pool()).await?;
        Ok(())
    }
}
