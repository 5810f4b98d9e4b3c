//! Core data types for SecurityTrails lookups.
//!
//! This module defines the resolved runtime configuration, output modes,
//! DNS record types and the result produced by one remote call.

use crate::error::TrailsError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// One unit of input: a single trimmed, non-empty line (usually a domain).
pub type WorkItem = String;

/// Default SecurityTrails API base.
pub const DEFAULT_BASE_URL: &str = "https://api.securitytrails.com/v1/";

/// Default number of concurrent workers. Keep it low; the API rate limits.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default number of hostnames per submit request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One meaningful field per line (e.g. one subdomain per line)
    #[default]
    List,

    /// The raw JSON payload returned by the API, one document per result
    Json,
}

/// DNS record types supported by the historical DNS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    #[default]
    A,
    Aaaa,
    Mx,
    Ns,
    Soa,
    Txt,
}

impl RecordType {
    /// Path segment used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "a",
            RecordType::Aaaa => "aaaa",
            RecordType::Mx => "mx",
            RecordType::Ns => "ns",
            RecordType::Soa => "soa",
            RecordType::Txt => "txt",
        }
    }

    /// The field holding the record value inside a `values[]` entry.
    pub fn value_field(&self) -> &'static str {
        match self {
            RecordType::A => "ip",
            RecordType::Aaaa => "ipv6",
            RecordType::Mx => "host",
            RecordType::Ns => "nameserver",
            RecordType::Soa => "email",
            RecordType::Txt => "value",
        }
    }

    /// All supported record types, in display order.
    pub fn all() -> [RecordType; 6] {
        [
            RecordType::A,
            RecordType::Aaaa,
            RecordType::Mx,
            RecordType::Ns,
            RecordType::Soa,
            RecordType::Txt,
        ]
    }
}

/// Resolved configuration, immutable for the lifetime of a run.
///
/// Built once by the caller (usually the CLI after merging flags,
/// environment and config files) and shared read-only with every worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailsConfig {
    /// SecurityTrails API key, sent as the `APIKEY` header
    pub api_key: String,

    /// API base URL, always ending with `/`
    pub base_url: String,

    /// Number of workers pulling from the input channel
    /// Default: 2
    pub concurrency: usize,

    /// Output format for successful results
    /// Default: list
    pub output_mode: OutputMode,

    /// Hostnames per submit request
    /// Default: 100
    pub batch_size: usize,

    /// Record type for historical DNS lookups
    /// Default: a
    pub record_type: RecordType,

    /// Query for the DSL endpoint
    pub query: Option<String>,

    /// Per-request timeout; `None` waits indefinitely
    /// Default: 30 seconds
    pub timeout: Option<Duration>,
}

impl Default for TrailsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            output_mode: OutputMode::List,
            batch_size: DEFAULT_BATCH_SIZE,
            record_type: RecordType::A,
            query: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl TrailsConfig {
    /// Set the API key.
    pub fn with_api_key<K: Into<String>>(mut self, key: K) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the API base URL. A trailing `/` is added when missing.
    pub fn with_base_url<U: Into<String>>(mut self, url: U) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    /// Set the worker count. Zero is kept as-is and rejected by `validate`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the output mode.
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Set the submit batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the historical DNS record type.
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the DSL query.
    pub fn with_query<Q: Into<String>>(mut self, query: Q) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the configuration before any worker starts.
    pub fn validate(&self) -> Result<(), TrailsError> {
        if self.api_key.trim().is_empty() {
            return Err(TrailsError::config(
                "No SecurityTrails API key found. Set SECURITYTRAILS_KEY or add [securitytrails] key to the config file",
            ));
        }

        if self.concurrency == 0 {
            return Err(TrailsError::config("Concurrency must be at least 1"));
        }

        if self.batch_size == 0 {
            return Err(TrailsError::config("Batch size must be at least 1"));
        }

        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(TrailsError::config(format!(
                "Invalid base URL '{}': must start with http:// or https://",
                self.base_url
            )));
        }

        reqwest::Url::parse(&self.base_url).map_err(|e| {
            TrailsError::config(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        Ok(())
    }
}

/// The decoded response of one remote call.
///
/// Tagged with the item(s) it was issued for so output stays traceable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteResult {
    /// The item(s) the call was made for (empty for single-shot commands)
    pub items: Vec<WorkItem>,

    /// Flattened listing used in `list` mode
    pub lines: Vec<String>,

    /// The payload exactly as decoded, used in `json` mode
    pub raw: serde_json::Value,
}

impl RemoteResult {
    /// Create a result for the given items.
    pub fn new(items: &[WorkItem], lines: Vec<String>, raw: serde_json::Value) -> Self {
        Self {
            items: items.to_vec(),
            lines,
            raw,
        }
    }
}

impl FromStr for OutputMode {
    type Err = TrailsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" => Ok(OutputMode::List),
            "json" => Ok(OutputMode::Json),
            other => Err(TrailsError::config(format!(
                "Invalid output format '{}'. Use 'list' or 'json'",
                other
            ))),
        }
    }
}

impl FromStr for RecordType {
    type Err = TrailsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        RecordType::all()
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                TrailsError::config(format!(
                    "Invalid DNS record type '{}'. Use one of: a, aaaa, mx, ns, soa, txt",
                    s
                ))
            })
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::List => write!(f, "list"),
            OutputMode::Json => write!(f, "json"),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
