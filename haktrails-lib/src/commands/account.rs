//! Single-shot commands that don't read input.

use super::{field_values, scalar_to_string, DispatchMode, Handler};
use crate::client::ApiRequest;
use crate::error::TrailsError;
use crate::types::{RemoteResult, TrailsConfig, WorkItem};
use serde_json::{json, Value};

/// `ping`: checks that the API key is accepted.
pub struct Ping;

impl Handler for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Single
    }

    fn build_request(&self, _items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        Ok(ApiRequest::get("ping"))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        Ok(RemoteResult::new(
            items,
            vec![format!("success: {}", success)],
            body,
        ))
    }
}

/// `account/usage`: monthly quota consumption.
pub struct Usage;

impl Handler for Usage {
    fn name(&self) -> &'static str {
        "usage"
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Single
    }

    fn build_request(&self, _items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        Ok(ApiRequest::get("account/usage"))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let lines = ["current_monthly_usage", "allowed_monthly_usage"]
            .into_iter()
            .filter_map(|key| {
                body.get(key)
                    .and_then(scalar_to_string)
                    .map(|value| format!("{}: {}", key, value))
            })
            .collect();
        Ok(RemoteResult::new(items, lines, body))
    }
}

/// `domains/list` with a DSL query: matching hostnames.
pub struct Dsl;

impl Handler for Dsl {
    fn name(&self) -> &'static str {
        "dsl"
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Single
    }

    fn build_request(&self, _items: &[WorkItem], config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let query = config
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| TrailsError::config("The dsl command requires a non-empty --query"))?;

        Ok(ApiRequest::post("domains/list", json!({ "query": query })))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let lines = field_values(&body, "/records", "hostname");
        Ok(RemoteResult::new(items, lines, body))
    }
}
