//! Web服务器

use axum::{routing::get, Router};
use clinic_core::Result;
use clinic_database::EntityQueryEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::drugs::{drug_by_code, drugs_by_manufacturer, drugs_by_type, list_drugs};
use crate::handlers::{
    api_root, create_entity, delete_entity, get_entity, health, list_entities, metrics_handler,
    update_entity,
};
use crate::metrics::WebMetrics;

/// 处理器共享状态
pub struct AppState {
    pub engine: EntityQueryEngine,
    pub metrics: WebMetrics,
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        let app = create_app(state);
        Self { addr, app }
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;

        Ok(())
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))

        // 健康检查与指标
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))

        // API路由
        .nest("/api", api_routes())

        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// 实体与药品路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/entity", get(list_entities).post(create_entity))
        .route(
            "/entity/:entity_no",
            get(get_entity).put(update_entity).delete(delete_entity),
        )
        .route("/drugs", get(list_drugs))
        .route("/drugs/code/:code", get(drug_by_code))
        .route("/drugs/type/:type", get(drugs_by_type))
        .route("/drugs/manufacturer/:manufacturer", get(drugs_by_manufacturer))
}
