use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use models::{UserPatch, UserRecord};
use serde::Deserialize;
use tracing::info;

use crate::envelope::Envelope;
use crate::errors::JsonApiError;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub name: Option<String>,
}

type ApiResult<T> = Result<Envelope<T>, JsonApiError>;

/// Ids are numeric; anything else cannot name an existing record.
fn parse_id(raw: &str) -> Result<u64, JsonApiError> {
    raw.parse::<u64>()
        .map_err(|_| JsonApiError::not_found(format!("not found: user {}", raw)))
}

/// A segment that does not even decode (e.g. `%FF`) is a malformed request.
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<u64, JsonApiError> {
    let Path(raw) = path.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    parse_id(&raw)
}

fn required_name(name: Option<String>) -> Result<String, JsonApiError> {
    match name {
        Some(n) if !n.trim().is_empty() => Ok(n),
        _ => Err(JsonApiError::bad_request("name is required")),
    }
}

/// 列出所有用户
pub async fn list_users(State(state): State<AppState>) -> Envelope<Vec<UserRecord>> {
    let users = state.users.list_all().await;
    info!(count = users.len(), "list users");
    Envelope::ok(users)
}

/// 获取单个用户
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<UserRecord> {
    let id = path_id(path)?;
    state
        .users
        .find_by_id(id)
        .await
        .map(Envelope::ok)
        .ok_or_else(|| JsonApiError::not_found(format!("not found: user {}", id)))
}

/// 按名称登录
pub async fn login(
    State(state): State<AppState>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> ApiResult<UserRecord> {
    let Query(q) = query.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    let name = required_name(q.name)?;
    state
        .users
        .find_by_name(&name)
        .await
        .map(Envelope::ok)
        .ok_or_else(|| JsonApiError::not_found(format!("not found: user named {}", name)))
}

/// 创建用户：只接收 name，其余字段由服务端按模板生成
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> ApiResult<UserRecord> {
    let Json(input) = payload.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    let name = required_name(input.name)?;
    let created = state.users.create(&name).await?;
    Ok(Envelope::created(created))
}

/// 浅合并更新
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<UserRecord> {
    let id = path_id(path)?;
    let Json(patch) = payload.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
    let updated = state.users.update(id, patch).await?;
    Ok(Envelope::ok(updated))
}

/// 重置为默认值（保留 id 与 name）
pub async fn reset_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<UserRecord> {
    let id = path_id(path)?;
    let reset = state.users.reset_to_default(id).await?;
    Ok(Envelope::ok(reset))
}

/// 删除用户，返回被删除的记录
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<UserRecord> {
    let id = path_id(path)?;
    let removed = state.users.remove(id).await?;
    Ok(Envelope::ok(removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_id_is_not_found() {
        let err = parse_id("abc").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
        assert_eq!(parse_id("17").unwrap(), 17);
    }

    #[test]
    fn blank_name_is_bad_request() {
        assert!(required_name(None).is_err());
        assert!(required_name(Some("  ".into())).is_err());
        assert_eq!(required_name(Some("Ann".into())).unwrap(), "Ann");
    }
}
