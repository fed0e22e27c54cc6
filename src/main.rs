use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use user_service::{
    AppState,
    cache::RedisCache,
    config::Config,
    database::{self, PgUserStore},
    logging,
    router::create_router,
    service::UserService,
};

#[tokio::main]
async fn main() {
    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 初始化日志，guard 需要保持到进程退出
    let _log_guard = logging::init(&config).expect("Failed to initialize logging");

    // 设置数据库连接池
    let pool = database::connect(&config)
        .await
        .expect("Failed to connect to Postgres");
    database::migrate(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database connection initialized");

    // 设置 Redis 客户端，连接失败不阻止启动，请求会直接读数据库
    let cache = RedisCache::new(&config).expect("Failed to create Redis client");
    match cache.ping().await {
        Ok(()) => tracing::info!("Redis connection initialized"),
        Err(e) => tracing::error!(error = %e, "Failed to connect to Redis"),
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    };

    let mut users = UserService::new(
        Arc::new(PgUserStore::new(pool)),
        Arc::new(cache),
        config.cache_expiration(),
    );
    if let Some(limit) = config.batch_max_concurrency {
        users = users.with_batch_limit(limit);
    }

    // 设置应用状态
    let state = AppState {
        users,
        config: Arc::new(config),
        metrics,
    };

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    let app = create_router(state);

    // 启动服务器
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
