//! HTTP client for the Dead Man's Snitch management API.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::request::{Credentials, Requester};
use crate::snitch::{Snitch, SnitchAttributes};
use crate::tags;

/// Production API host.
pub const DEFAULT_ENDPOINT: &str = "https://api.deadmanssnitch.com";

const SNITCHES: &str = "/v1/snitches";

/// Filters for [`Client::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnitchFilter {
    /// Only Snitches carrying every one of these tags are returned.
    pub tags: Vec<String>,
}

impl SnitchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags::normalize(tags);
        self
    }
}

/// Dead Man's Snitch API client.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    requester: Requester,
}

impl Client {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_auth(Credentials::ApiKey(api_key.into()))
    }

    /// Create a client that authenticates with an account's username and
    /// password instead of an API key.
    pub fn with_credentials(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::with_auth(Credentials::Basic {
            username: username.into(),
            password: password.into(),
        })
    }

    fn with_auth(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            requester: Requester::new(DEFAULT_ENDPOINT, Some(credentials))?,
        })
    }

    /// Use a different API host, e.g. a staging server or a test double.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.requester = self.requester.with_endpoint(endpoint)?;
        Ok(self)
    }

    /// Copy of this client whose calls time out after `timeout`.
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

    /// List the Snitches on the account, optionally filtered by tags.
    pub async fn list(&self, filter: &SnitchFilter) -> Result<Vec<Snitch>> {
        let tags = tags::normalize(&filter.tags).join(",");
        let query: Vec<(&str, &str)> = if tags.is_empty() {
            vec![]
        } else {
            vec![("tags", tags.as_str())]
        };
        let req = self.requester.request(Method::GET, SNITCHES, &query);
        let payload = self.requester.send(req).await?;
        snitch_list(payload)
    }

    /// Get a single Snitch by its token.
    pub async fn get(&self, token: &str) -> Result<Snitch> {
        let path = snitch_path(token)?;
        let req = self.requester.request(Method::GET, &path, &[]);
        snitch(self.requester.send(req).await?)
    }

    /// Create a new Snitch. `name` and an interval are required by the API.
    pub async fn create(&self, attributes: &SnitchAttributes) -> Result<Snitch> {
        let req = self
            .requester
            .request(Method::POST, SNITCHES, &[])
            .json(&attributes.to_body());
        snitch(self.requester.send(req).await?)
    }

    /// Update the attributes that are set in `attributes`, leaving the rest
    /// unchanged.
    pub async fn update(&self, token: &str, attributes: &SnitchAttributes) -> Result<Snitch> {
        let path = snitch_path(token)?;
        let req = self
            .requester
            .request(Method::PATCH, &path, &[])
            .json(&attributes.to_body());
        snitch(self.requester.send(req).await?)
    }

    /// Add tags to a Snitch. Returns every tag now on the Snitch.
    pub async fn add_tags<I, S>(&self, token: &str, tags: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = format!("{}/tags", snitch_path(token)?);
        let req = self
            .requester
            .request(Method::POST, &path, &[])
            .json(&tags::normalize(tags));
        tag_list(self.requester.send(req).await?)
    }

    /// Remove one tag from a Snitch. Returns the remaining tags.
    pub async fn remove_tag(&self, token: &str, tag: &str) -> Result<Vec<String>> {
        let path = tag_path(token, tag)?;
        let req = self.requester.request(Method::DELETE, &path, &[]);
        tag_list(self.requester.send(req).await?)
    }

    /// Replace all tags on a Snitch.
    pub async fn replace_tags<I, S>(&self, token: &str, tags: I) -> Result<Snitch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update(token, &SnitchAttributes::new().tags(tags)).await
    }

    /// Remove every tag from a Snitch.
    pub async fn clear_tags(&self, token: &str) -> Result<Snitch> {
        self.update(token, &SnitchAttributes::new().clear_tags()).await
    }

    /// Pause a Snitch. The API only allows this while the Snitch is failed
    /// or errored.
    pub async fn pause(&self, token: &str) -> Result<()> {
        let path = format!("{}/pause", snitch_path(token)?);
        let req = self.requester.request(Method::POST, &path, &[]);
        self.requester.send(req).await?;
        Ok(())
    }

    /// Delete a Snitch.
    pub async fn delete(&self, token: &str) -> Result<()> {
        let path = snitch_path(token)?;
        let req = self.requester.request(Method::DELETE, &path, &[]);
        self.requester.send(req).await?;
        Ok(())
    }
}

fn snitch_path(token: &str) -> Result<String> {
    if token.trim().is_empty() {
        return Err(Error::Config("Snitch token must not be empty".to_string()));
    }
    Ok(format!("{}/{}", SNITCHES, urlencoding::encode(token)))
}

fn tag_path(token: &str, tag: &str) -> Result<String> {
    if tag.trim().is_empty() {
        return Err(Error::Config("Tag must not be empty".to_string()));
    }
    Ok(format!(
        "{}/tags/{}",
        snitch_path(token)?,
        urlencoding::encode(tag)
    ))
}

fn snitch(payload: Option<Value>) -> Result<Snitch> {
    Snitch::from_json(payload.unwrap_or(Value::Null))
}

fn snitch_list(payload: Option<Value>) -> Result<Vec<Snitch>> {
    Ok(serde_json::from_value(
        payload.unwrap_or_else(|| Value::Array(vec![])),
    )?)
}

fn tag_list(payload: Option<Value>) -> Result<Vec<String>> {
    Ok(serde_json::from_value(
        payload.unwrap_or_else(|| Value::Array(vec![])),
    )?)
}
