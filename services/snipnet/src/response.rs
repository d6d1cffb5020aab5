//! JSON response envelope shared by every endpoint

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{status, message, data?}` wrapper around every response body
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: false,
            message: message.into(),
            data,
        }
    }
}

/// Successful response with a payload
pub fn respond<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    (status, Json(Envelope::success(message, data))).into_response()
}

/// Successful response without a payload
pub fn acknowledge(status: StatusCode, message: impl Into<String>) -> Response {
    let body: Envelope<()> = Envelope {
        status: true,
        message: message.into(),
        data: None,
    };
    (status, Json(body)).into_response()
}
