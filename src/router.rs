use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::{
    AppState,
    middleware::{report_errors, security_headers, track_requests},
    routes::{system, user},
};

// 用户相关的路由
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", post(user::create_user))
        .route(
            "/user/{id}",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        // 批量获取用户
        .route("/users", get(user::get_users))
}

// 健康检查和监控
pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(user_routes())
        .merge(system_routes())
        .layer(from_fn_with_state(state.clone(), report_errors))
        .layer(from_fn(track_requests))
        .layer(from_fn(security_headers))
        .layer(TimeoutLayer::new(state.config.read_timeout()));

    // 开发环境允许所有来源
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    router.with_state(state)
}
