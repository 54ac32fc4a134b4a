//! Dead Man's Snitch client library.
//!
//! Sends check-ins for monitored jobs and wraps the management API for
//! creating, listing, tagging, pausing and deleting Snitches.

pub mod checkin;
pub mod client;
pub mod error;
pub mod key;
pub mod request;
pub mod snitch;
pub mod tags;

pub use checkin::{CheckinClient, CheckinHandle, CheckinOptions, DEFAULT_CHECKIN_ENDPOINT};
pub use client::{Client, SnitchFilter, DEFAULT_ENDPOINT};
pub use error::{ApiError, Error, Result, ValidationError};
pub use key::{get_api_key, KeyOptions};
pub use request::{user_agent, Credentials, DEFAULT_TIMEOUT};
pub use snitch::{Interval, Snitch, SnitchAttributes, Status};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
