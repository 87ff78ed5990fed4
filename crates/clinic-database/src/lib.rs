//! # 诊所数据库模块
//!
//! 负责实体表的存取：PostgreSQL连接池、列映射表、可组合的查询条件、
//! 存储接口（PostgreSQL与内存两种实现）以及分页查询引擎。

pub mod connection;
pub mod engine;
pub mod filter;
pub mod mapping;
pub mod memory;
pub mod queries;
pub mod store;

// 重新导出主要类型
pub use connection::{DatabasePool, DatabaseSettings};
pub use engine::EntityQueryEngine;
pub use filter::{EntityQuery, Predicate};
pub use mapping::{map_row, ColumnValue, FieldKind, MemoryRow, RawRow};
pub use memory::MemoryEntityStore;
pub use queries::PgEntityStore;
pub use store::{EntityStore, PageRows};
