//! Fetching an account's API key with its username and password.

use std::time::Duration;

use reqwest::Method;

use crate::client::DEFAULT_ENDPOINT;
use crate::error::{ApiError, Error, Result};
use crate::request::{Credentials, Requester, DEFAULT_TIMEOUT};

/// Options for [`get_api_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOptions {
    /// API host to ask, defaults to [`DEFAULT_ENDPOINT`].
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Retrieves the API key of the account identified by `username` and
/// `password`.
///
/// Bad credentials fail with [`Error::Authentication`].
pub async fn get_api_key(username: &str, password: &str, options: &KeyOptions) -> Result<String> {
    let credentials = Credentials::Basic {
        username: username.to_string(),
        password: password.to_string(),
    };
    let requester =
        Requester::new(&options.endpoint, Some(credentials))?.with_timeout(options.timeout);
    let req = requester.request(Method::GET, "/v1/api_key", &[]);
    let payload = requester.send(req).await?;

    payload
        .as_ref()
        .and_then(|p| p.get("api_key"))
        .and_then(|k| k.as_str())
        .map(String::from)
        .ok_or_else(|| {
            Error::Api(ApiError::new(
                "invalid_response",
                "Response did not include an api_key",
                None,
                payload.clone(),
            ))
        })
}
