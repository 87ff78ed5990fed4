//! 错误定义模块

use std::time::Duration;
use thiserror::Error;

/// 诊所系统统一错误类型
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("数据源不可用: {0}")]
    SourceUnavailable(String),

    #[error("数据源超时: {0:?}")]
    Timeout(Duration),

    #[error("数据行格式错误: 列 {column}: {reason}")]
    MalformedRow { column: String, reason: String },

    #[error("实体编号分配冲突: {0}")]
    ConcurrentAllocationConflict(i32),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl ClinicError {
    pub fn malformed(column: impl Into<String>, reason: impl Into<String>) -> Self {
        ClinicError::MalformedRow {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// 编号分配冲突时调用方可以重新分配一次
    pub fn is_retryable_allocation(&self) -> bool {
        matches!(self, ClinicError::ConcurrentAllocationConflict(_))
    }

    /// 错误种类名称，用于指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            ClinicError::Config(_) => "config",
            ClinicError::Validation(_) => "validation",
            ClinicError::SourceUnavailable(_) => "source_unavailable",
            ClinicError::Timeout(_) => "timeout",
            ClinicError::MalformedRow { .. } => "malformed_row",
            ClinicError::ConcurrentAllocationConflict(_) => "allocation_conflict",
            ClinicError::NotFound(_) => "not_found",
            ClinicError::Database(_) => "database",
            ClinicError::Io(_) => "io",
            ClinicError::Serialization(_) => "serialization",
            ClinicError::Internal(_) => "internal",
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_) => ClinicError::SourceUnavailable(err.to_string()),
            sqlx::Error::ColumnNotFound(column) => {
                ClinicError::malformed(column, "column not present in row")
            }
            sqlx::Error::ColumnDecode { index, source } => {
                ClinicError::malformed(index, source.to_string())
            }
            sqlx::Error::Decode(source) => ClinicError::malformed("<unknown>", source.to_string()),
            other => ClinicError::Database(other.to_string()),
        }
    }
}

/// 诊所系统统一结果类型
pub type Result<T> = std::result::Result<T, ClinicError>;
