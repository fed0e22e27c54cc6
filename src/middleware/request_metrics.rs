use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// 按方法、路由模板和状态码统计请求数
pub async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    // 使用路由模板而不是原始路径，避免 /user/1、/user/2 各自成为一个标签
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;

    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method,
        "endpoint" => endpoint,
        "status" => response.status().as_u16().to_string(),
    )
    .increment(1);

    response
}
