//! Snitch records returned by the API and the attributes sent to it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::tags;

/// Reporting status of a Snitch. Assigned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Healthy,
    Paused,
    Failed,
    Errored,
    /// A status this version of the library does not know about.
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Healthy => "healthy",
            Status::Paused => "paused",
            Status::Failed => "failed",
            Status::Errored => "errored",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Status::Pending),
            "healthy" => Ok(Status::Healthy),
            "paused" => Ok(Status::Paused),
            "failed" => Ok(Status::Failed),
            "errored" => Ok(Status::Errored),
            _ => Err(Error::Config(format!("Unknown snitch status: {s}"))),
        }
    }
}

/// How often a Snitch is expected to check in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "15_minute")]
    FifteenMinute,
    #[serde(rename = "30_minute")]
    ThirtyMinute,
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
    /// An interval this version of the library does not know about.
    #[serde(rename = "unknown")]
    #[serde(other)]
    Unknown,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::FifteenMinute,
        Interval::ThirtyMinute,
        Interval::Hourly,
        Interval::Daily,
        Interval::Weekly,
        Interval::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FifteenMinute => "15_minute",
            Interval::ThirtyMinute => "30_minute",
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
            Interval::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Interval::ALL.iter().map(|i| i.as_str()).collect();
                Error::Config(format!(
                    "Invalid interval. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.as_str().to_string()
    }
}

/// A monitored job as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnitchPayload", into = "SnitchPayload")]
pub struct Snitch {
    /// Unique token identifying the Snitch.
    pub token: String,
    /// Resource path, e.g. `/v1/snitches/c2354d53d3`.
    pub href: Option<String>,
    pub name: String,
    pub tags: Vec<String>,
    pub status: Status,
    pub interval: Interval,
    /// Free-form notes, usually instructions for when the job goes missing.
    pub notes: Option<String>,
    /// Addresses alerted instead of the account defaults. Empty means the
    /// defaults are used.
    pub alert_email: Vec<String>,
    pub checked_in_at: Option<String>,
    pub created_at: Option<String>,
    /// URL used to check in this Snitch.
    pub check_in_url: Option<String>,
}

impl Snitch {
    /// Decodes a Snitch from a JSON payload.
    pub fn from_json(payload: Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }

    /// `checked_in_at` as a timestamp, if present and RFC 3339.
    pub fn checked_in_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.checked_in_at.as_deref())
    }

    /// `created_at` as a timestamp, if present and RFC 3339.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnitchPayload {
    #[serde(default)]
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    href: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    status: Option<Status>,
    #[serde(rename = "type")]
    kind: SnitchType,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    alert_email: Option<Vec<String>>,
    #[serde(default)]
    checked_in_at: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    check_in_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnitchType {
    interval: Interval,
}

impl TryFrom<SnitchPayload> for Snitch {
    type Error = String;

    fn try_from(p: SnitchPayload) -> std::result::Result<Self, Self::Error> {
        if p.token.is_empty() {
            return Err("snitch payload is missing a token".to_string());
        }
        Ok(Snitch {
            token: p.token,
            href: p.href,
            name: p.name,
            tags: p.tags.unwrap_or_default(),
            status: p.status.unwrap_or(Status::Unknown),
            interval: p.kind.interval,
            notes: p.notes,
            alert_email: p.alert_email.unwrap_or_default(),
            checked_in_at: p.checked_in_at,
            created_at: p.created_at,
            check_in_url: p.check_in_url,
        })
    }
}

impl From<Snitch> for SnitchPayload {
    fn from(s: Snitch) -> Self {
        SnitchPayload {
            token: s.token,
            href: s.href,
            name: s.name,
            tags: Some(s.tags),
            status: Some(s.status),
            kind: SnitchType {
                interval: s.interval,
            },
            notes: s.notes,
            alert_email: Some(s.alert_email),
            checked_in_at: s.checked_in_at,
            created_at: s.created_at,
            check_in_url: s.check_in_url,
        }
    }
}

/// Attributes for creating or updating a Snitch.
///
/// Only the fields that are set are sent, so the same value works as a
/// partial update.
///
/// ```
/// use snitcher::{Interval, SnitchAttributes};
///
/// let attrs = SnitchAttributes::new()
///     .name("Daily Backups")
///     .interval(Interval::Daily)
///     .tags(["backups", "maintenance"]);
/// let body = attrs.to_body();
/// assert_eq!(body["type"]["interval"], "daily");
/// assert!(body.get("interval").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnitchAttributes {
    pub name: Option<String>,
    /// `Some(None)` clears the notes on update.
    pub notes: Option<Option<String>>,
    /// `Some(vec![])` clears every tag on update.
    pub tags: Option<Vec<String>>,
    pub alert_email: Option<Vec<String>>,
    /// Shorthand for `type.interval`; ignored when `type_interval` is set.
    pub interval: Option<String>,
    pub type_interval: Option<String>,
}

impl SnitchAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds attributes from a JSON object using the API's field names.
    ///
    /// Recognised keys are `name`, `notes`, `tags`, `alert_email`, `interval`
    /// and `type.interval`; anything else is ignored. `tags` may be a string
    /// or nested arrays, and `"tags": null` clears the tags. `"notes": null`
    /// is sent as-is and clears the notes.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Config(
                "snitch attributes must be a JSON object".to_string(),
            ));
        };
        Ok(Self {
            name: string_field(&map, "name"),
            notes: map.get("notes").map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }),
            tags: map.get("tags").map(tags::from_json),
            alert_email: map.get("alert_email").map(string_list),
            interval: string_field(&map, "interval"),
            type_interval: map
                .get("type")
                .and_then(|t| t.as_object())
                .and_then(|t| string_field(t, "interval")),
        })
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(Some(notes.into()));
        self
    }

    /// Removes the notes from the Snitch on update.
    pub fn clear_notes(mut self) -> Self {
        self.notes = Some(None);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = Some(tags::normalize(tags));
        self
    }

    /// Removes every tag from the Snitch on update.
    pub fn clear_tags(mut self) -> Self {
        self.tags = Some(Vec::new());
        self
    }

    pub fn alert_email<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alert_email = Some(emails.into_iter().map(Into::into).collect());
        self
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    /// Sets `type.interval` explicitly. Takes precedence over [`Self::interval`].
    pub fn type_interval(mut self, interval: impl Into<String>) -> Self {
        self.type_interval = Some(interval.into());
        self
    }

    /// JSON request body for the API.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(notes) = &self.notes {
            let notes = notes.clone().map_or(Value::Null, Value::String);
            body.insert("notes".into(), notes);
        }
        if let Some(tags) = &self.tags {
            body.insert("tags".into(), tags::normalize(tags).into());
        }
        if let Some(emails) = &self.alert_email {
            body.insert("alert_email".into(), emails.clone().into());
        }
        if let Some(interval) = self.type_interval.as_ref().or(self.interval.as_ref()) {
            let mut kind = Map::new();
            kind.insert("interval".into(), Value::String(interval.clone()));
            body.insert("type".into(), Value::Object(kind));
        }
        Value::Object(body)
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}
