//! 请求提取器
//!
//! 包装 axum 的 `Query` 与 `Json`，解析失败时转成 `ClinicError::Validation`，
//! 与其他错误使用同一响应格式并计入错误指标。

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use clinic_core::ClinicError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// 查询参数
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

/// JSON 请求体
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

fn rejected(state: &AppState, message: String) -> ApiError {
    debug!("Rejected request input: {}", message);
    let err = ClinicError::Validation(message);
    state.metrics.record_error(&err);
    ApiError(err)
}

#[async_trait]
impl<T> FromRequestParts<Arc<AppState>> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(rejected(state, rejection.body_text())),
        }
    }
}

#[async_trait]
impl<T> FromRequest<Arc<AppState>> for ApiJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejected(state, rejection.body_text())),
        }
    }
}
