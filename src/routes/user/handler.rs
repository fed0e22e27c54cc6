use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    models::{NewUser, User, UserId, UserIds, UserPatch},
};

/// 获取用户信息
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    let user = state.users.get(id).await?;
    Ok(Json(user))
}

/// 创建用户
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(input) = payload?;
    let user = state.users.create(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// 更新用户
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    let Json(patch) = payload?;
    let user = state.users.update(id, patch).await?;
    Ok(Json(user))
}

/// 删除用户
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_user_id(&id)?;
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 批量获取用户，请求体为 `{"ids": [..]}`
#[axum::debug_handler]
pub async fn get_users(
    State(state): State<AppState>,
    payload: Result<Json<UserIds>, JsonRejection>,
) -> Result<Json<Vec<User>>, AppError> {
    let Json(UserIds { ids }) = payload?;
    let users = state.users.get_many(&ids).await?;
    Ok(Json(users))
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse::<UserId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadInput(format!("Invalid user id: {raw}")))
}
