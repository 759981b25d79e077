//! Turns transport failures and non-success statuses into the message the user sees.

use pgpt_core::error::BAD_REQUEST_FALLBACK;
use pgpt_core::ServiceError;
use reqwest::StatusCode;
use serde_json::Value;

/// A request that produced no HTTP status at all.
pub fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_builder() || err.is_body() || err.is_decode() {
        return ServiceError::Client(err.to_string());
    }
    tracing::debug!("Backend unreachable: {}", err);
    ServiceError::Unreachable
}

/// A response that came back with a non-success status.
pub fn status_error(status: StatusCode, body: &str) -> ServiceError {
    let payload: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        payload
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    match status {
        StatusCode::UNPROCESSABLE_ENTITY => ServiceError::InvalidInput,
        StatusCode::BAD_REQUEST => ServiceError::BadRequest(
            field("detail").unwrap_or_else(|| BAD_REQUEST_FALLBACK.to_string()),
        ),
        _ => {
            if let Some(message) = field("error") {
                return ServiceError::Backend(message);
            }
            let plain_body = if payload.is_none() && !body.trim().is_empty() {
                Some(body.trim().to_string())
            } else {
                None
            };
            let detail = field("message")
                .or_else(|| field("detail"))
                .or(plain_body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            ServiceError::Server {
                status: status.as_u16(),
                detail,
            }
        }
    }
}

/// A success status whose body did not match the expected shape.
pub fn decode_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Client(err.to_string())
}
