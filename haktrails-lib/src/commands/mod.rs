//! SecurityTrails command handlers.
//!
//! Every command is a [`Handler`]: it knows how to build its request from
//! the work item(s) and configuration, and how to flatten the decoded
//! response. The shared [`invoke`] step sends the request, classifies the
//! HTTP status and decodes the body, so handlers stay pure and testable.

/// Per-domain lookups (subdomains, tags, whois, ...)
pub mod domain;

/// Historical DNS and WHOIS lookups
pub mod history;

/// Account-level single-shot commands (ping, usage, dsl)
pub mod account;

/// Batched hostname submission
pub mod submit;

use crate::client::{ApiRequest, Transport};
use crate::error::TrailsError;
use crate::types::{RemoteResult, TrailsConfig, WorkItem};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How the engine feeds a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One request per input line, through the worker pool
    PerItem,
    /// Input lines are grouped by the batch accumulator
    Batched,
    /// One request, no input
    Single,
}

/// The capability shared by all commands.
pub trait Handler: Send + Sync {
    /// Command name as typed on the command line.
    fn name(&self) -> &'static str;

    fn mode(&self) -> DispatchMode {
        DispatchMode::PerItem
    }

    /// Build the single request for `items` (one item for per-item
    /// commands, the whole batch for submit, empty for single-shot).
    fn build_request(&self, items: &[WorkItem], config: &TrailsConfig)
        -> Result<ApiRequest, TrailsError>;

    /// Flatten a decoded response. Missing fields produce no lines.
    ///
    /// `config` is the same configuration the request was built from.
    fn parse_response(
        &self,
        items: &[WorkItem],
        config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError>;
}

/// Label used in logs and error records for a group of items.
pub fn label_for(handler: &dyn Handler, items: &[WorkItem]) -> String {
    if items.is_empty() {
        handler.name().to_string()
    } else {
        items.join(",")
    }
}

/// Perform exactly one remote call for `items`.
///
/// 401/403 become [`TrailsError::Auth`], other non-2xx statuses
/// [`TrailsError::Status`], and an undecodable body [`TrailsError::Decode`].
/// Nothing is retried.
pub async fn invoke(
    handler: &dyn Handler,
    transport: &dyn Transport,
    items: &[WorkItem],
    config: &TrailsConfig,
) -> Result<RemoteResult, TrailsError> {
    let label = label_for(handler, items);
    let request = handler.build_request(items, config)?;
    let response = transport.send(&request, &label).await?;

    if !response.is_success() {
        return Err(TrailsError::from_status(
            label,
            response.status,
            error_message(&response.body),
        ));
    }

    let body: Value = serde_json::from_str(&response.body)
        .map_err(|e| TrailsError::decode(label.as_str(), format!("invalid JSON: {}", e)))?;

    handler
        .parse_response(items, config, body)
        .map_err(|e| e.for_item(label))
}

/// Pull the API's `message` field out of an error body, if it has one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

/// Maps command names to handlers.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn Handler>>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in SecurityTrails command.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(domain::Subdomains));
        registry.register(Arc::new(domain::AssociatedDomains));
        registry.register(Arc::new(domain::AssociatedIps));
        registry.register(Arc::new(domain::Company));
        registry.register(Arc::new(domain::Details));
        registry.register(Arc::new(domain::Tags));
        registry.register(Arc::new(domain::Whois));
        registry.register(Arc::new(history::HistoricalDns));
        registry.register(Arc::new(history::HistoricalWhois));
        registry.register(Arc::new(submit::Submit));
        registry.register(Arc::new(account::Dsl));
        registry.register(Arc::new(account::Ping));
        registry.register(Arc::new(account::Usage));
        registry
    }

    /// Add or replace a handler under its own name.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Look up a handler by command name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    /// All registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// First item of a per-item invocation.
pub(crate) fn single_item<'a>(
    handler: &dyn Handler,
    items: &'a [WorkItem],
) -> Result<&'a str, TrailsError> {
    match items {
        [item] => Ok(item.as_str()),
        _ => Err(TrailsError::internal(format!(
            "{} expects exactly one item, got {}",
            handler.name(),
            items.len()
        ))),
    }
}

/// String values of `field` for every object in the array at `pointer`.
pub(crate) fn field_values(body: &Value, pointer: &str, field: &str) -> Vec<String> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get(field))
                .filter_map(scalar_to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Strings of the array at `pointer`.
pub(crate) fn string_array(body: &Value, pointer: &str) -> Vec<String> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(scalar_to_string).collect())
        .unwrap_or_default()
}

/// Render a JSON scalar as plain text; objects, arrays and null are skipped.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedTransport;
    use super::*;
    use serde_json::json;

    fn items(list: &[&str]) -> Vec<WorkItem> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_registry_has_every_command() {
        let registry = CommandRegistry::builtin();
        let names = registry.names();
        for expected in [
            "subdomains",
            "associateddomains",
            "associatedips",
            "company",
            "details",
            "tags",
            "whois",
            "historicaldns",
            "historicalwhois",
            "submit",
            "dsl",
            "ping",
            "usage",
        ] {
            assert!(names.contains(&expected), "missing command {}", expected);
        }
        assert_eq!(names.len(), 13);
        assert!(registry.get("banner").is_none());
    }

    #[test]
    fn test_dispatch_modes() {
        let registry = CommandRegistry::builtin();
        assert_eq!(registry.get("tags").unwrap().mode(), DispatchMode::PerItem);
        assert_eq!(registry.get("submit").unwrap().mode(), DispatchMode::Batched);
        assert_eq!(registry.get("ping").unwrap().mode(), DispatchMode::Single);
        assert_eq!(registry.get("dsl").unwrap().mode(), DispatchMode::Single);
    }

    #[test]
    fn test_every_per_item_command_builds_a_request() {
        let registry = CommandRegistry::builtin();
        let config = TrailsConfig::default().with_api_key("k");
        for name in registry.names() {
            let handler = registry.get(name).unwrap();
            if handler.mode() != DispatchMode::PerItem {
                continue;
            }
            let request = handler
                .build_request(&items(&["example.com"]), &config)
                .unwrap();
            assert!(
                request.path.contains("example.com") || request.body.is_some(),
                "{} request does not reference the item",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_invoke_classifies_auth_failure() {
        let transport = FixedTransport::new(403, r#"{"message": "You are not authorized"}"#);
        let handler = domain::Subdomains;
        let config = TrailsConfig::default().with_api_key("bad");

        let err = invoke(&handler, &transport, &items(&["bad.com"]), &config)
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(err.item(), Some("bad.com"));
    }

    #[tokio::test]
    async fn test_invoke_reports_status_message() {
        let transport = FixedTransport::new(429, r#"{"message": "rate limit exceeded"}"#);
        let config = TrailsConfig::default().with_api_key("k");

        let err = invoke(&domain::Tags, &transport, &items(&["a.com"]), &config)
            .await
            .unwrap_err();

        match err {
            TrailsError::Status {
                item,
                status,
                message,
            } => {
                assert_eq!(item, "a.com");
                assert_eq!(status, 429);
                assert_eq!(message, "rate limit exceeded");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_rejects_undecodable_body() {
        let transport = FixedTransport::new(200, "<html>gateway</html>");
        let config = TrailsConfig::default().with_api_key("k");

        let err = invoke(&domain::Tags, &transport, &items(&["a.com"]), &config)
            .await
            .unwrap_err();

        assert!(matches!(err, TrailsError::Decode { .. }));
        assert_eq!(err.item(), Some("a.com"));
    }

    #[tokio::test]
    async fn test_invoke_success_sends_one_request() {
        let transport = FixedTransport::new(200, r#"{"tags": ["cdn", "mail"]}"#);
        let config = TrailsConfig::default().with_api_key("k");

        let result = invoke(&domain::Tags, &transport, &items(&["a.com"]), &config)
            .await
            .unwrap();

        assert_eq!(result.lines, vec!["cdn", "mail"]);
        assert_eq!(result.items, items(&["a.com"]));
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_field_values_skips_missing_and_non_scalars() {
        let body = json!({"records": [
            {"hostname": "a.example"},
            {"other": 1},
            {"hostname": {"nested": true}},
            {"hostname": "b.example"}
        ]});
        assert_eq!(
            field_values(&body, "/records", "hostname"),
            vec!["a.example", "b.example"]
        );
        assert!(field_values(&body, "/missing", "hostname").is_empty());
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
