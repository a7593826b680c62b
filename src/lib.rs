/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// CORS 中间件构建
pub mod cors;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// request_id 中间件
pub mod request_id;

/// OpenAPI 文档
pub mod openapi;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::AppError;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;

/// 组装完整路由：业务接口 + 探活 + 文档，外加 request_id 与 CORS 中间件。
pub fn build_app(state: AppState, cors: &config::CorsConfig) -> Router {
    let mut app = Router::<AppState>::new()
        .merge(features::health::create_health_router())
        .merge(features::qr::create_qr_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware));

    // CORS 放在最外层，预检请求不进入业务路由
    if let Some(layer) = cors::build_cors_layer(cors) {
        app = app.layer(layer);
    }
    app
}
