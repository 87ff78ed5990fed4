//! HTTP处理器

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use clinic_core::{ClinicError, EntityFilter, EntityRecord, PagedResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::server::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// 记录失败种类后转换为 HTTP 错误
fn failed(state: &AppState, err: ClinicError) -> ApiError {
    state.metrics.record_error(&err);
    ApiError(err)
}

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "MiniClinic API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "entities": "/api/entity",
            "drugs": "/api/drugs"
        }
    }))
}

/// 健康检查处理器，探测底层存储
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let store = state.engine.store_name().to_string();
    match state.engine.health().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "store": store,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "store": store,
                    "message": e.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
    }
}

/// 实体分页查询处理器
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<EntityFilter>,
) -> ApiResult<Json<PagedResult<EntityRecord>>> {
    state.metrics.record_request("search");

    let started = Instant::now();
    let result = state.engine.search(&filter).await;
    state.metrics.observe_search(started.elapsed());

    result.map(Json).map_err(|e| failed(&state, e))
}

/// 单个实体查询处理器
pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(entity_no): Path<i32>,
) -> ApiResult<Json<EntityRecord>> {
    state.metrics.record_request("get");
    state
        .engine
        .get(entity_no)
        .await
        .map(Json)
        .map_err(|e| failed(&state, e))
}

/// 实体登记处理器，编号由服务端分配
pub async fn create_entity(
    State(state): State<Arc<AppState>>,
    ApiJson(record): ApiJson<EntityRecord>,
) -> ApiResult<impl IntoResponse> {
    state.metrics.record_request("register");

    let entity_no = state
        .engine
        .register(record)
        .await
        .map_err(|e| failed(&state, e))?;

    info!("Entity {} registered via API", entity_no);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/entity/{}", entity_no))],
        Json(json!({ "entityNo": entity_no })),
    ))
}

/// 实体更新处理器
pub async fn update_entity(
    State(state): State<Arc<AppState>>,
    Path(entity_no): Path<i32>,
    ApiJson(record): ApiJson<EntityRecord>,
) -> ApiResult<StatusCode> {
    state.metrics.record_request("update");
    state
        .engine
        .update(entity_no, record)
        .await
        .map_err(|e| failed(&state, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// 实体软删除处理器
pub async fn delete_entity(
    State(state): State<Arc<AppState>>,
    Path(entity_no): Path<i32>,
) -> ApiResult<StatusCode> {
    state.metrics.record_request("deactivate");
    state
        .engine
        .deactivate(entity_no)
        .await
        .map_err(|e| failed(&state, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Prometheus 指标处理器
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let body = state.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use crate::metrics::WebMetrics;
    use crate::server::{create_app, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use clinic_core::EntityRecord;
    use clinic_database::{EntityQueryEngine, MemoryEntityStore};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn record(entity_no: i32, type_code: &str, first: &str, last: &str) -> EntityRecord {
        let mut record = EntityRecord::with_type(type_code);
        record.entity_no = entity_no;
        record.first_name = Some(first.to_string());
        record.last_name = Some(last.to_string());
        record.status = Some(true);
        record
    }

    async fn test_app(records: Vec<EntityRecord>) -> (Router, Arc<AppState>) {
        let store = MemoryEntityStore::with_records(records).await;
        let state = Arc::new(AppState {
            engine: EntityQueryEngine::new(Arc::new(store)),
            metrics: WebMetrics::new().unwrap(),
        });
        (create_app(state.clone()), state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_list_entities_page_shape() {
        let records = (1..=25)
            .map(|n| record(n, "PAT", &format!("Name{}", n), "Doe"))
            .collect();
        let (app, state) = test_app(records).await;

        let (status, body) = send(&app, Method::GET, "/api/entity?pageNumber=3&pageSize=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], 25);
        assert_eq!(body["totalPages"], 3);
        assert_eq!(body["pageNumber"], 3);
        assert_eq!(body["hasPreviousPage"], true);
        assert_eq!(body["hasNextPage"], false);
        assert_eq!(body["items"].as_array().unwrap().len(), 5);
        assert_eq!(body["items"][0]["entityNo"], 5);
        assert_eq!(state.metrics.requests("search"), 1);
    }

    #[tokio::test]
    async fn test_list_entities_search_and_type() {
        let (app, _) = test_app(vec![
            record(1, "PAT", "Alice", "Smith"),
            record(2, "STA", "Bob", "Smith"),
            record(3, "PAT", "Carol", "Jones"),
        ])
        .await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/entity?searchTerm=smith&entityTypeCode=PAT",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["items"][0]["fName"], "Alice");
    }

    #[tokio::test]
    async fn test_invalid_type_code_is_bad_request() {
        let (app, _) = test_app(vec![]).await;
        let (status, body) = send(&app, Method::GET, "/api/entity?entityTypeCode=P%25T", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_get_missing_entity_is_not_found() {
        let (app, state) = test_app(vec![record(1, "PAT", "Alice", "Smith")]).await;
        let (status, _) = send(&app, Method::GET, "/api/entity/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let rendered = state.metrics.render().unwrap();
        assert!(rendered.contains("clinic_errors_total{kind=\"not_found\"} 1"));
    }

    #[tokio::test]
    async fn test_entity_lifecycle() {
        let (app, _) = test_app(vec![record(7, "PAT", "Alice", "Smith")]).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/entity",
            Some(json!({ "entityTypeCode": "PAT", "fName": "Dan", "lName": "Brown" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entityNo"], 8);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/entity/8",
            Some(json!({ "entityTypeCode": "PAT", "fName": "Daniel", "lName": "Brown", "status": true })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, "/api/entity/8", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fName"], "Daniel");

        let (status, _) = send(&app, Method::DELETE, "/api/entity/8", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/api/entity", None).await;
        assert_eq!(body["totalCount"], 1);
        let (_, body) = send(&app, Method::GET, "/api/entity?includeInactive=true", None).await;
        assert_eq!(body["totalCount"], 2);
    }

    #[tokio::test]
    async fn test_register_accepts_browser_timestamp_dates() {
        let (app, _) = test_app(vec![]).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/entity",
            Some(json!({
                "entityTypeCode": "PAT",
                "fName": "Anne",
                "dob": "1990-05-17T00:00:00.000Z",
                "dor": "2024-02-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/entity/{}", body["entityNo"]);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dob"], "1990-05-17");
        assert_eq!(body["dor"], "2024-02-01");
    }

    #[tokio::test]
    async fn test_unparseable_query_uses_error_envelope() {
        let (app, state) = test_app(vec![]).await;

        let (status, body) = send(&app, Method::GET, "/api/entity?pageNumber=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);
        assert_eq!(body["status"], 400);

        let rendered = state.metrics.render().unwrap();
        assert!(rendered.contains("clinic_errors_total{kind=\"validation\"} 1"));
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let (app, state) = test_app(vec![]).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/entity")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"entityTypeCode":"PAT","dob":"17/05/1990"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], true);
        assert_eq!(body["status"], 400);
        assert!(body["message"].as_str().unwrap().contains("dob"));

        let (status, _) = send(&app, Method::GET, "/api/entity", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.metrics.requests("register"), 0);
    }

    #[tokio::test]
    async fn test_health_reports_store() {
        let (app, _) = test_app(vec![]).await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_drug_routes() {
        let (app, _) = test_app(vec![]).await;

        let (status, body) = send(&app, Method::GET, "/api/drugs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 20);

        let (status, body) = send(&app, Method::GET, "/api/drugs/code/drug-016", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Aspirin");

        let (status, body) = send(&app, Method::GET, "/api/drugs/manufacturer/merck", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) = send(&app, Method::GET, "/api/drugs/type/Vaccine", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _) = test_app(vec![]).await;
        send(&app, Method::GET, "/api/entity", None).await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("clinic_requests_total{operation=\"search\"} 1"));
    }
}
