use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, Result};

/// A request body decoded according to its `Content-Type`: JSON or
/// `application/x-www-form-urlencoded`. Anything else is a 400.
pub struct JsonOrForm<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or("").trim().to_ascii_lowercase());

        match content_type.as_deref() {
            Some("application/json") => {
                let body = Bytes::from_request(req, state)
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                let value = sonic_rs::from_slice(&body)
                    .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?;
                Ok(Self(value))
            }
            Some("application/x-www-form-urlencoded") => {
                let Form(value) = Form::<T>::from_request(req, state)
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                Ok(Self(value))
            }
            _ => Err(AppError::Validation(
                "Expected an application/json or form-encoded body".to_string(),
            )),
        }
    }
}

/// Serializes `body` with sonic-rs into a JSON response.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response> {
    let body = sonic_rs::to_string(body)
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// A `302 Found` redirect, which browsers follow with a GET after a form POST.
pub fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Response body for actions that have nothing else to return.
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
pub async fn health() -> Result<Response> {
    json_response(StatusCode::OK, &HealthResponse { status: "ok" })
}
