//! 可组合的查询条件
//!
//! 条件树只引用编译期常量列名，调用方的值一律以参数绑定，不拼接进SQL文本。
//! 同一棵条件树既能生成SQL，也能直接在内存数据行上求值。

use clinic_core::{NormalizedFilter, PageRequest, Result};
use sqlx::{Postgres, QueryBuilder};

use crate::mapping::{
    ColumnValue, FieldKind, RawRow, ENTITY_TABLE, KEY_COLUMN, SEARCHABLE_COLUMNS, STATUS_COLUMN,
    TYPE_CODE_COLUMN,
};

/// 查询条件
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// 全部满足；空列表匹配所有行
    All(Vec<Predicate>),
    /// 任一满足；空列表不匹配任何行
    Any(Vec<Predicate>),
    /// 精确相等
    Equals { column: &'static str, value: String },
    /// 不区分大小写的子串匹配
    ContainsIgnoreCase { column: &'static str, term: String },
    /// 布尔列不为 false（空值视为满足）
    NotFalse { column: &'static str },
}

impl Predicate {
    pub fn match_all() -> Self {
        Predicate::All(Vec::new())
    }

    /// 由规范化后的过滤条件构造：类型相等 AND (各搜索列子串匹配 OR) AND 未停用
    pub fn from_filter(filter: &NormalizedFilter) -> Self {
        let mut clauses = Vec::new();

        if let Some(code) = &filter.entity_type_code {
            clauses.push(Predicate::Equals {
                column: TYPE_CODE_COLUMN,
                value: code.clone(),
            });
        }

        if let Some(term) = &filter.search_term {
            clauses.push(Predicate::Any(
                SEARCHABLE_COLUMNS
                    .iter()
                    .map(|column| Predicate::ContainsIgnoreCase {
                        column: *column,
                        term: term.clone(),
                    })
                    .collect(),
            ));
        }

        if !filter.include_inactive {
            clauses.push(Predicate::NotFalse {
                column: STATUS_COLUMN,
            });
        }

        Predicate::All(clauses)
    }

    /// 追加到SQL，列名带 `e.` 别名
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::All(parts) => push_group(qb, parts, " AND ", "TRUE"),
            Predicate::Any(parts) => push_group(qb, parts, " OR ", "FALSE"),
            Predicate::Equals { column, value } => {
                qb.push("e.").push(*column).push(" = ").push_bind(value.clone());
            }
            Predicate::ContainsIgnoreCase { column, term } => {
                qb.push("e.")
                    .push(*column)
                    .push(" ILIKE ")
                    .push_bind(like_pattern(term));
            }
            Predicate::NotFalse { column } => {
                qb.push("e.").push(*column).push(" IS DISTINCT FROM FALSE");
            }
        }
    }

    /// 在内存数据行上求值，语义与生成的SQL一致
    pub fn matches<R: RawRow + ?Sized>(&self, row: &R) -> Result<bool> {
        match self {
            Predicate::All(parts) => {
                for part in parts {
                    if !part.matches(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(parts) => {
                for part in parts {
                    if part.matches(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Equals { column, value } => {
                Ok(row.read_text(column)?.as_deref() == Some(value.as_str()))
            }
            Predicate::ContainsIgnoreCase { column, term } => Ok(row
                .read_text(column)?
                .map(|text| text.to_lowercase().contains(&term.to_lowercase()))
                .unwrap_or(false)),
            Predicate::NotFalse { column } => {
                let value = row.read(column, FieldKind::Bool)?;
                Ok(value != Some(ColumnValue::Bool(false)))
            }
        }
    }
}

fn push_group(qb: &mut QueryBuilder<'_, Postgres>, parts: &[Predicate], separator: &str, empty: &str) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        part.push_sql(qb);
    }
    qb.push(")");
}

/// 转义 LIKE 通配符后包裹为子串模式（PostgreSQL 默认转义符为反斜杠）
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// 一次分页查询：条件 + 页窗口，按编号降序
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    pub predicate: Predicate,
    pub page: PageRequest,
}

impl EntityQuery {
    pub fn from_filter(filter: &NormalizedFilter) -> Self {
        Self {
            predicate: Predicate::from_filter(filter),
            page: filter.page,
        }
    }

    /// 分页查询，窗口计数随页数据一并返回
    pub fn page_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT e.*, COUNT(*) OVER () AS total_count FROM ");
        qb.push(ENTITY_TABLE).push(" e WHERE ");
        self.predicate.push_sql(&mut qb);
        qb.push(" ORDER BY e.").push(KEY_COLUMN).push(" DESC");
        qb.push(" LIMIT ").push_bind(self.page.limit());
        qb.push(" OFFSET ").push_bind(self.page.offset());
        qb
    }

    /// 与分页查询同条件的总数查询
    pub fn count_sql(predicate: &Predicate) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(ENTITY_TABLE).push(" e WHERE ");
        predicate.push_sql(&mut qb);
        qb
    }
}
