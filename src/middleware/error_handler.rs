use axum::{
    Json,
    body::{Body, to_bytes},
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{
    AppState,
    error::{ErrorDiagnostic, ErrorResponse},
};

// 错误响应体都很小，超过这个大小说明不是我们生成的
const MAX_ERROR_BODY: usize = 64 * 1024;

/// 记录失败的请求，并在非生产环境把调用栈附加到错误响应中
pub async fn report_errors(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = next.run(req).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let diagnostic = response.extensions().get::<ErrorDiagnostic>().cloned();
    let detail = diagnostic.as_ref().map(|d| d.detail.as_str()).unwrap_or("-");
    if status.is_server_error() {
        error!(status = status.as_u16(), %method, %path, detail, "Request error");
    } else {
        warn!(status = status.as_u16(), %method, %path, detail, "Request error");
    }

    match diagnostic {
        Some(diagnostic) if !state.config.is_production => {
            attach_stack(response, diagnostic.render_stack()).await
        }
        _ => response,
    }
}

async fn attach_stack(response: Response, stack: String) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let Ok(mut payload) = serde_json::from_slice::<ErrorResponse>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    payload.stack = Some(stack);

    // 重新构建 body，长度已经变化
    parts.headers.remove(header::CONTENT_LENGTH);
    let rebuilt = Json(payload).into_response();
    let (_, body) = rebuilt.into_parts();
    Response::from_parts(parts, body)
}
