//! # Clinic Core
//!
//! 诊所管理系统的核心模块，提供实体数据结构、分页计算和统一的错误定义。

pub mod error;
pub mod models;
pub mod paging;

pub use error::{ClinicError, Result};
pub use models::*;
pub use paging::{PageRequest, PagedResult, PagingLimits};
