//! # 诊所 Web 模块
//!
//! 提供实体管理 REST 接口、药品目录接口、健康检查和 Prometheus 指标。

pub mod drugs;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use error::ApiError;
pub use extract::{ApiJson, ApiQuery};
pub use metrics::WebMetrics;
pub use server::{AppState, WebServer};
