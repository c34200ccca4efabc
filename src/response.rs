// src/response.rs

use serde::Serialize;

/// Uniform response envelope wrapping every payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str, data: Option<T>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            data,
        }
    }
}
