use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::export::DOWNLOADS_PER_DISK_WRITE;
use crate::constants::request::{
    DEFAULT_API_BASE_URL, FAILURE_BACKOFF_SECONDS, MAX_ATTEMPTS, MAX_DOWNLOADS_PER_SECOND,
    RATE_LIMITER_DELAY_SECONDS, REQUEST_TIMEOUT_SECONDS,
};
use crate::constants::snapshot::{DEFAULT_SNAPSHOT_BASE_URL, SNAPSHOT_TIMEOUT_SECONDS};
use crate::errors::ExportError;

/// Describes a nested container field split into its own table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubEntitySpec {
    /// Field on the detail record holding the nested container object.
    pub container: &'static str,
    /// Column name used in the derived table for the parent identifier.
    pub parent_key: &'static str,
    /// Parent field copied alongside the identifier for readability.
    pub display_field: &'static str,
    /// Keys inside the container whose list-of-object values become columns.
    pub lists: &'static [&'static str],
    /// Attribute removed from every object in those lists.
    pub stripped_attribute: &'static str,
}

/// Static per-category behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Category {
    /// Category path segment, also used as the file name prefix.
    pub name: &'static str,
    /// Extra query parameters appended to every detail request.
    pub extra_params: &'static [(&'static str, &'static str)],
    /// Nested field exported to a separate table, if any.
    pub sub_entity: Option<SubEntitySpec>,
    /// One-field wrapper object unwrapped on the `keywords` column, if any.
    pub keyword_wrapper: Option<&'static str>,
}

/// Movie records carry credits and keywords in one request.
pub const MOVIE: Category = Category {
    name: "movie",
    extra_params: &[("append_to_response", "credits,keywords")],
    sub_entity: Some(SubEntitySpec {
        container: "credits",
        parent_key: "movie_id",
        display_field: "title",
        lists: &["cast", "crew"],
        stripped_attribute: "profile_path",
    }),
    keyword_wrapper: Some("keywords"),
};

/// All categories processed by a full run, in order.
pub const CATEGORIES: &[Category] = &[MOVIE];

/// Pacing and retry limits for detail requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum GET attempts per URL.
    pub max_attempts: usize,
    /// Extra pause after a rate-limited response.
    pub rate_limit_cooldown: Duration,
    /// Pause after every response, regardless of outcome.
    pub min_interval: Duration,
    /// Pause after a non-success response before retrying.
    pub failure_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            rate_limit_cooldown: Duration::from_secs(RATE_LIMITER_DELAY_SECONDS),
            min_interval: Duration::from_secs(1) / MAX_DOWNLOADS_PER_SECOND,
            failure_backoff: Duration::from_secs(FAILURE_BACKOFF_SECONDS),
        }
    }
}

/// Top-level run configuration.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Detail endpoint root, without a trailing slash.
    pub api_base_url: String,
    /// Snapshot hosting root, without a trailing slash.
    pub snapshot_base_url: String,
    /// Directory holding the id cache and output tables.
    pub output_dir: PathBuf,
    /// Categories processed by a full run.
    pub categories: Vec<Category>,
    /// Detail request pacing.
    pub retry: RetryPolicy,
    /// Successful fetches between disk writes.
    pub flush_every: usize,
    /// Whole-request timeout for a single detail GET, body included.
    pub request_timeout: Duration,
    /// Whole-download timeout for a snapshot file.
    pub snapshot_timeout: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            snapshot_base_url: DEFAULT_SNAPSHOT_BASE_URL.to_string(),
            output_dir: PathBuf::from("."),
            categories: CATEGORIES.to_vec(),
            retry: RetryPolicy::default(),
            flush_every: DOWNLOADS_PER_DISK_WRITE,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECONDS),
            snapshot_timeout: Duration::from_secs(SNAPSHOT_TIMEOUT_SECONDS),
        }
    }
}

impl ExportConfig {
    /// Reject settings that would stall or never flush.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.flush_every == 0 {
            return Err(ExportError::Configuration(
                "flush_every must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ExportError::Configuration(
                "retry.max_attempts must be greater than zero".to_string(),
            ));
        }
        if self.categories.is_empty() {
            return Err(ExportError::Configuration(
                "at least one category must be configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Provider credentials read once at startup.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Provider API key sent with every detail request.
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read `{"api_key": "..."}` from `path`.
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            ExportError::Configuration(format!(
                "failed reading credential file {}: {err}",
                path.display()
            ))
        })?;
        let credentials: Credentials = serde_json::from_str(&raw)?;
        if credentials.api_key.trim().is_empty() {
            return Err(ExportError::Configuration(format!(
                "credential file {} has an empty api_key",
                path.display()
            )));
        }
        Ok(credentials)
    }
}
