use std::sync::Arc;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use service::UserService;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod service;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub config: Arc<Config>,
    /// 未安装 Prometheus recorder 时 `/metrics` 返回 404
    pub metrics: Option<PrometheusHandle>,
}
