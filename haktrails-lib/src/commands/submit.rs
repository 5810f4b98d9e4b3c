//! Batched hostname submission.

use super::{DispatchMode, Handler};
use crate::client::ApiRequest;
use crate::error::TrailsError;
use crate::types::{RemoteResult, TrailsConfig, WorkItem};
use serde_json::{json, Value};

/// `submit/hostnames`: contributes discovered hostnames to SecurityTrails.
///
/// Receives a whole batch from the accumulator and sends it in one request.
pub struct Submit;

impl Handler for Submit {
    fn name(&self) -> &'static str {
        "submit"
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Batched
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        if items.is_empty() {
            return Err(TrailsError::internal("refusing to submit an empty batch"));
        }
        Ok(ApiRequest::post(
            "submit/hostnames",
            json!({ "hostnames": items }),
        ))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let lines = vec![format!("submitted {} hostnames", items.len())];
        Ok(RemoteResult::new(items, lines, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_sends_whole_batch() {
        let items = vec!["a.com".to_string(), "b.com".to_string()];
        let request = Submit
            .build_request(&items, &TrailsConfig::default())
            .unwrap();
        assert_eq!(request.path, "submit/hostnames");
        assert_eq!(request.body.unwrap()["hostnames"], json!(["a.com", "b.com"]));
    }

    #[test]
    fn test_submit_never_sends_empty_batch() {
        assert!(Submit.build_request(&[], &TrailsConfig::default()).is_err());
    }

    #[test]
    fn test_submit_summary_line() {
        let items = vec!["a.com".to_string()];
        let result = Submit
            .parse_response(&items, &TrailsConfig::default(), json!({}))
            .unwrap();
        assert_eq!(result.lines, vec!["submitted 1 hostnames"]);
    }
}
