//! Historical DNS and WHOIS lookups.

use super::domain::{distinct, path_segment};
use super::{field_values, single_item, Handler};
use crate::client::ApiRequest;
use crate::error::TrailsError;
use crate::types::{RecordType, RemoteResult, TrailsConfig, WorkItem};
use serde_json::Value;

/// `history/{d}/dns/{type}`: every value the record type has held.
///
/// The record type comes from the configuration (`--type`).
pub struct HistoricalDns;

impl Handler for HistoricalDns {
    fn name(&self) -> &'static str {
        "historicaldns"
    }

    fn build_request(&self, items: &[WorkItem], config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!(
            "history/{}/dns/{}",
            domain, config.record_type
        )))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let record_type = config.record_type;
        let echoed = body
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| t.split(['/', '_']).next())
            .and_then(|t| t.parse::<RecordType>().ok());
        if let Some(echoed) = echoed.filter(|t| *t != record_type) {
            tracing::debug!(
                "historicaldns asked for {} but the response says {}",
                record_type,
                echoed
            );
        }
        let field = record_type.value_field();

        let lines = body
            .get("records")
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .flat_map(|record| field_values(record, "/values", field))
                    .collect()
            })
            .unwrap_or_default();

        Ok(RemoteResult::new(items, lines, body))
    }
}

/// `history/{d}/whois`: contact emails seen across past registrations.
pub struct HistoricalWhois;

impl Handler for HistoricalWhois {
    fn name(&self) -> &'static str {
        "historicalwhois"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!("history/{}/whois", domain)))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let emails = body
            .pointer("/result/items")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .flat_map(|entry| field_values(entry, "/contact", "email"))
                    .collect()
            })
            .unwrap_or_default();

        Ok(RemoteResult::new(items, distinct(emails), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one(item: &str) -> Vec<WorkItem> {
        vec![item.to_string()]
    }

    #[test]
    fn test_historical_dns_uses_configured_type() {
        let config = TrailsConfig::default()
            .with_api_key("k")
            .with_record_type(RecordType::Mx);
        let request = HistoricalDns.build_request(&one("a.com"), &config).unwrap();
        assert_eq!(request.path, "history/a.com/dns/mx");

        let default = HistoricalDns
            .build_request(&one("a.com"), &TrailsConfig::default())
            .unwrap();
        assert_eq!(default.path, "history/a.com/dns/a");
    }

    #[test]
    fn test_historical_dns_a_records() {
        let body = json!({
            "type": "a/ipv4",
            "records": [
                {"first_seen": "2020-01-01", "values": [{"ip": "1.1.1.1"}, {"ip": "2.2.2.2"}]},
                {"first_seen": "2018-05-02", "values": [{"ip": "3.3.3.3"}]}
            ]
        });
        let result = HistoricalDns
            .parse_response(&one("a.com"), &TrailsConfig::default(), body)
            .unwrap();
        assert_eq!(result.lines, vec!["1.1.1.1", "2.2.2.2", "3.3.3.3"]);
    }

    fn mx_config() -> TrailsConfig {
        TrailsConfig::default().with_record_type(RecordType::Mx)
    }

    #[test]
    fn test_historical_dns_mx_records() {
        let body = json!({
            "type": "mx",
            "records": [{"values": [{"host": "mx1.a.com", "mx_count": 1}]}]
        });
        let result = HistoricalDns
            .parse_response(&one("a.com"), &mx_config(), body)
            .unwrap();
        assert_eq!(result.lines, vec!["mx1.a.com"]);
    }

    #[test]
    fn test_historical_dns_without_type_field_uses_configured_type() {
        let body = json!({"records": [{"values": [{"host": "mx1.a.com"}, {"host": "mx2.a.com"}]}]});
        let result = HistoricalDns
            .parse_response(&one("a.com"), &mx_config(), body)
            .unwrap();
        assert_eq!(result.lines, vec!["mx1.a.com", "mx2.a.com"]);
    }

    #[test]
    fn test_historical_dns_configured_type_wins_over_echo() {
        let body = json!({
            "type": "aaaa/ipv6",
            "records": [{"values": [{"host": "mx1.a.com", "ipv6": "::1"}]}]
        });
        let result = HistoricalDns
            .parse_response(&one("a.com"), &mx_config(), body)
            .unwrap();
        assert_eq!(result.lines, vec!["mx1.a.com"]);
    }

    #[test]
    fn test_historical_whois_distinct_emails() {
        let body = json!({"result": {"items": [
            {"contact": [{"type": "registrant", "email": "old@a.com"}]},
            {"contact": [{"type": "registrant", "email": "new@a.com"}, {"type": "admin", "email": "old@a.com"}]},
            {"contact": []}
        ]}});
        let result = HistoricalWhois
            .parse_response(&one("a.com"), &TrailsConfig::default(), body)
            .unwrap();
        assert_eq!(result.lines, vec!["old@a.com", "new@a.com"]);
    }
}
