//! Error types for the Dead Man's Snitch client.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Base error type for Snitcher operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Connecting to or reading from the server took longer than the timeout.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Invalid username/password or API key.
    #[error("Authentication failed: {0}")]
    Authentication(ApiError),

    /// The credentials are valid but not allowed to perform the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(ApiError),

    #[error("Not found: {0}")]
    NotFound(ApiError),

    /// The attributes sent were rejected by the server.
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Plan limit reached: {0}")]
    PlanLimitReached(ApiError),

    #[error("Account on hold: {0}")]
    AccountOnHold(ApiError),

    /// 5xx responses. The body is kept as-is since it may not be JSON.
    #[error("Internal server error (HTTP {status})")]
    InternalServer { status: u16, body: String },

    /// Any other error response from the API.
    #[error("API error: {0}")]
    Api(ApiError),

    /// A successful response carried a payload that could not be decoded.
    #[error("Invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client was given unusable configuration or arguments.
    #[error("{0}")]
    Config(String),
}

/// Raised when the API returns an error response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// Value of the `type` field of the error payload, or `http_<status>`.
    pub error_type: String,
    pub message: String,
    pub status_code: Option<u16>,
    pub response_data: Option<Value>,
}

impl ApiError {
    pub fn new(
        error_type: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        response_data: Option<Value>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            status_code,
            response_data,
        }
    }
}

/// A `resource_invalid` error with the per-field messages from the payload.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{api}")]
pub struct ValidationError {
    pub api: ApiError,
    /// Field path (e.g. `type.interval`) to message.
    pub errors: BTreeMap<String, String>,
}

impl ValidationError {
    /// Collects the `validations: [{attribute, message}]` array of an error
    /// payload. Entries without an attribute are skipped.
    pub fn from_api(api: ApiError) -> Self {
        let errors = api
            .response_data
            .as_ref()
            .and_then(|d| d.get("validations"))
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let attribute = item.get("attribute")?.as_str()?;
                        let message = item
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or_default();
                        Some((attribute.to_string(), message.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { api, errors }
    }
}

impl Error {
    /// Picks the most specific error for an API error response.
    ///
    /// The wire `type` decides first; unknown or missing types fall back on
    /// the HTTP status.
    pub fn from_response(status: StatusCode, api: ApiError) -> Self {
        match api.error_type.as_str() {
            "sign_in_incorrect" | "api_key_invalid" => Error::Authentication(api),
            "unauthorized" | "forbidden" => Error::Unauthorized(api),
            "resource_not_found" | "not_found" => Error::NotFound(api),
            "resource_invalid" => Error::Validation(ValidationError::from_api(api)),
            "plan_limit_reached" => Error::PlanLimitReached(api),
            "account_on_hold" => Error::AccountOnHold(api),
            _ => match status {
                StatusCode::UNAUTHORIZED => Error::Authentication(api),
                StatusCode::FORBIDDEN => Error::Unauthorized(api),
                StatusCode::NOT_FOUND => Error::NotFound(api),
                StatusCode::UNPROCESSABLE_ENTITY => {
                    Error::Validation(ValidationError::from_api(api))
                }
                _ => Error::Api(api),
            },
        }
    }

    /// Maps a transport error, separating timeouts from other failures.
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e)
        } else {
            Error::Transport(e)
        }
    }

    /// The API error payload behind this error, if it came from one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Authentication(api)
            | Error::Unauthorized(api)
            | Error::NotFound(api)
            | Error::PlanLimitReached(api)
            | Error::AccountOnHold(api)
            | Error::Api(api) => Some(api),
            Error::Validation(v) => Some(&v.api),
            _ => None,
        }
    }

    /// The wire `type` of an API error.
    pub fn error_type(&self) -> Option<&str> {
        self.api_error().map(|api| api.error_type.as_str())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::InternalServer { status, .. } => Some(*status),
            Error::Timeout(e) | Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => self.api_error().and_then(|api| api.status_code),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
