use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Uniform response body: `{ data, serverTime, statusCode, message }`.
///
/// `statusCode` always mirrors the HTTP status of the response carrying it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub server_time: i64,
    pub status_code: u16,
    pub message: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self::success(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Self {
        Self::success(StatusCode::CREATED, data)
    }

    fn success(status: StatusCode, data: T) -> Self {
        Self {
            data: Some(data),
            server_time: Utc::now().timestamp_millis(),
            status_code: status.as_u16(),
            message: "ok".into(),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            server_time: Utc::now().timestamp_millis(),
            status_code: status.as_u16(),
            message: message.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_has_null_data() {
        let v =
            serde_json::to_value(Envelope::<()>::failure(StatusCode::NOT_FOUND, "gone")).unwrap();
        assert!(v["data"].is_null());
        assert_eq!(v["statusCode"], 404);
        assert_eq!(v["message"], "gone");
        assert!(v["serverTime"].as_i64().unwrap() > 0);
    }

    #[test]
    fn created_mirrors_status() {
        let e = Envelope::created(1u8);
        assert_eq!(e.status_code, 201);
        assert_eq!(e.message, "ok");
        assert_eq!(e.into_response().status(), StatusCode::CREATED);
    }
}
