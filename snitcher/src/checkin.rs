//! Check-ins: the liveness ping a monitored job sends when it runs.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::request::Requester;

/// Production check-in host.
pub const DEFAULT_CHECKIN_ENDPOINT: &str = "https://nosnch.in";

/// Optional parameters of a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckinOptions {
    /// Short note shown with the check-in. Keep it under 256 characters.
    pub message: Option<String>,
    /// Exit status of the job. Blank and `0` mean success and are not sent.
    pub status: Option<String>,
    /// Overrides the client's timeout for this check-in.
    pub timeout: Option<Duration>,
}

impl CheckinOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Accepts process exit codes as well as strings.
    pub fn status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn query(&self) -> Vec<(&str, &str)> {
        let mut query = Vec::new();
        if let Some(message) = &self.message {
            query.push(("m", message.as_str()));
        }
        if let Some(status) = self.status.as_deref().map(str::trim) {
            if !status.is_empty() && status != "0" {
                query.push(("s", status));
            }
        }
        query
    }

    /// Fills in status and message from the outcome of the checked work,
    /// keeping anything already set.
    fn with_outcome<T, E: fmt::Display>(mut self, outcome: &std::result::Result<T, E>) -> Self {
        match outcome {
            Ok(_) => {
                self.status.get_or_insert_with(|| "0".to_string());
            }
            Err(e) => {
                self.status.get_or_insert_with(|| "1".to_string());
                self.message.get_or_insert_with(|| e.to_string());
            }
        }
        self
    }
}

/// Client for sending check-ins. No credentials are needed.
#[derive(Clone, Debug)]
pub struct CheckinClient {
    requester: Requester,
}

impl CheckinClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            requester: Requester::new(DEFAULT_CHECKIN_ENDPOINT, None)?,
        })
    }

    /// Send check-ins to another host, e.g. a regional one or a test double.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.requester = self.requester.with_endpoint(endpoint)?;
        Ok(self)
    }

    /// Copy of this client whose check-ins time out after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            requester: self.requester.clone().with_timeout(timeout),
        }
    }

    pub fn endpoint(&self) -> &Url {
        self.requester.endpoint()
    }

    pub fn timeout(&self) -> Duration {
        self.requester.timeout()
    }

    /// Binds a token to this client.
    pub fn handle(&self, token: impl Into<String>) -> Result<CheckinHandle> {
        CheckinHandle::new(self.clone(), token)
    }

    /// Check in, returning whether the server answered with a 2xx status.
    ///
    /// Timeouts and transport errors are returned as errors; any other
    /// response yields `Ok(false)`.
    pub async fn try_checkin(&self, token: &str, options: &CheckinOptions) -> Result<bool> {
        if token.trim().is_empty() {
            return Err(Error::Config("Snitch token must not be empty".to_string()));
        }
        let path = format!("/{}", urlencoding::encode(token));
        let mut req = self
            .requester
            .request(Method::GET, &path, &options.query());
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }
        let status = self.requester.send_for_status(req).await?;
        if !status.is_success() {
            warn!(token = %token, status = %status, "Check-in was not accepted");
        }
        Ok(status.is_success())
    }

    /// Check in on a best-effort basis. Every failure, including timeouts,
    /// is logged and reported as `false`.
    pub async fn checkin(&self, token: &str, options: &CheckinOptions) -> bool {
        match self.try_checkin(token, options).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(token = %token, error = %e, "Check-in failed");
                false
            }
        }
    }

    /// Runs `work`, checks in with its outcome, and returns the outcome.
    ///
    /// On success the status defaults to `0`. On failure it defaults to `1`
    /// and the message to the error's text. The error is returned after the
    /// check-in whether or not the check-in went through.
    pub async fn wrap<F, T, E>(
        &self,
        token: &str,
        options: CheckinOptions,
        work: F,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let outcome = work.await;
        let options = options.with_outcome(&outcome);
        self.checkin(token, &options).await;
        outcome
    }
}

/// A check-in client bound to one Snitch token.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use snitcher::{CheckinClient, CheckinOptions};
///
/// let backups = CheckinClient::new()?.handle("c2354d53d2")?;
/// let copied = backups
///     .wrap(CheckinOptions::new(), async { copy_files().await })
///     .await?;
/// # let _ = copied;
/// # Ok(())
/// # }
/// # async fn copy_files() -> Result<usize, std::io::Error> { Ok(3) }
/// ```
#[derive(Clone, Debug)]
pub struct CheckinHandle {
    client: CheckinClient,
    token: String,
}

impl CheckinHandle {
    /// Fails with [`Error::Config`] when the token is blank.
    pub fn new(client: CheckinClient, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::Config(
                "A Snitch token is required to check in".to_string(),
            ));
        }
        Ok(Self { client, token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn checkin(&self, options: &CheckinOptions) -> bool {
        self.client.checkin(&self.token, options).await
    }

    pub async fn try_checkin(&self, options: &CheckinOptions) -> Result<bool> {
        self.client.try_checkin(&self.token, options).await
    }

    pub async fn wrap<F, T, E>(&self, options: CheckinOptions, work: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.client.wrap(&self.token, options, work).await
    }
}
