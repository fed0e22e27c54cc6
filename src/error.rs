use std::backtrace::Backtrace;
use std::error::Error as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::UserId;

/// 数据库错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// 缓存错误，只在读写路径内部记录，不会返回给调用方
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadInput(String),
    #[error("User {0} not found")]
    NotFound(UserId),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// 批量查询中任意一个失败都会折叠成这个错误，不暴露具体的ID
    #[error("{failed} lookup(s) failed in batch fetch")]
    BatchFailed { failed: usize },
    #[error("internal error: {0}")]
    Internal(String),
}

/// 错误响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// 随错误响应一起传递给中间件的诊断信息
///
/// `detail` 总会被记录到日志；`stack` 只在非生产环境写入响应体。
/// 调用栈在这里只采集不解析符号，生产环境不会付出格式化的开销。
#[derive(Debug, Clone)]
pub struct ErrorDiagnostic {
    pub detail: String,
    stack: Arc<Backtrace>,
}

impl ErrorDiagnostic {
    /// 解析符号并格式化调用栈
    pub fn render_stack(&self) -> String {
        self.stack.to_string()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::BatchFailed { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // 数据库和内部错误的细节只写日志
    fn public_message(&self) -> String {
        match self {
            AppError::BadInput(msg) => msg.clone(),
            AppError::NotFound(_) => "User not found".into(),
            AppError::Store(_) => "Database operation failed".into(),
            AppError::BatchFailed { .. } => "Error fetching some users".into(),
            AppError::Internal(_) => "Internal server error".into(),
        }
    }

    fn diagnostic(&self) -> ErrorDiagnostic {
        let mut detail = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        ErrorDiagnostic {
            detail,
            stack: Arc::new(Backtrace::force_capture()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadInput(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            status: status.as_u16(),
            message: self.public_message(),
            stack: None,
        });

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(self.diagnostic());
        response
    }
}
