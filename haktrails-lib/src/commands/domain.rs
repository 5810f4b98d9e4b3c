//! Per-domain lookups.
//!
//! Each handler issues one request per input line and flattens the parts
//! of the response that are useful in a pipeline.

use super::{field_values, scalar_to_string, single_item, string_array, Handler};
use crate::client::ApiRequest;
use crate::error::TrailsError;
use crate::types::{RecordType, RemoteResult, TrailsConfig, WorkItem};
use serde_json::{json, Value};

/// Encode an item as a single URL path segment.
///
/// Reserved characters (`/`, `?`, `#`, `%`, whitespace) are
/// percent-encoded. Empty items and the dot segments `.` and `..` cannot be
/// expressed as a segment and are rejected.
pub(crate) fn path_segment(item: &str) -> Result<String, TrailsError> {
    if matches!(item, "" | "." | "..") {
        return Err(TrailsError::invalid_item(item, "not usable as a path segment"));
    }

    let mut url = reqwest::Url::parse("http://localhost/")
        .map_err(|e| TrailsError::internal(format!("segment encoder: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| TrailsError::internal("segment encoder has no path"))?
        .pop_if_empty()
        .push(item);

    Ok(url.path().trim_start_matches('/').to_string())
}

/// `domain/{d}/subdomains`: prints each subdomain as an FQDN.
pub struct Subdomains;

impl Handler for Subdomains {
    fn name(&self) -> &'static str {
        "subdomains"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!(
            "domain/{}/subdomains?children_only=false",
            domain
        )))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let domain = single_item(self, items)?;
        let lines = string_array(&body, "/subdomains")
            .into_iter()
            .map(|label| format!("{}.{}", label, domain))
            .collect();
        Ok(RemoteResult::new(items, lines, body))
    }
}

/// `domain/{d}/associated`: domains sharing ownership signals.
pub struct AssociatedDomains;

impl Handler for AssociatedDomains {
    fn name(&self) -> &'static str {
        "associateddomains"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!("domain/{}/associated", domain)))
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

/// `ips/list` filtered by PTR: IPs whose reverse DNS mentions the domain.
pub struct AssociatedIps;

impl Handler for AssociatedIps {
    fn name(&self) -> &'static str {
        "associatedips"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = single_item(self, items)?;
        Ok(ApiRequest::post(
            "ips/list",
            json!({ "filter": { "ptr_part": domain } }),
        ))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let lines = field_values(&body, "/records", "ip");
        Ok(RemoteResult::new(items, lines, body))
    }
}

/// `company/{d}`: the company currently associated with the domain.
pub struct Company;

impl Handler for Company {
    fn name(&self) -> &'static str {
        "company"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!("company/{}", domain)))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let lines = body
            .pointer("/record/current_company")
            .and_then(scalar_to_string)
            .into_iter()
            .collect();
        Ok(RemoteResult::new(items, lines, body))
    }
}

/// `domain/{d}`: current DNS records, one `domain type value` line each.
pub struct Details;

impl Handler for Details {
    fn name(&self) -> &'static str {
        "details"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!("domain/{}", domain)))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let domain = single_item(self, items)?;
        let mut lines = Vec::new();
        for record_type in RecordType::all() {
            let pointer = format!("/current_dns/{}/values", record_type.as_str());
            for value in field_values(&body, &pointer, current_dns_field(record_type)) {
                lines.push(format!("{} {} {}", domain, record_type, value));
            }
        }
        Ok(RemoteResult::new(items, lines, body))
    }
}

/// Field holding the value in `current_dns`. Differs from the history
/// endpoint only for MX.
fn current_dns_field(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::Mx => "hostname",
        other => other.value_field(),
    }
}

/// `domain/{d}/tags`: classification tags.
pub struct Tags;

impl Handler for Tags {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!("domain/{}/tags", domain)))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let lines = string_array(&body, "/tags");
        Ok(RemoteResult::new(items, lines, body))
    }
}

/// `domain/{d}/whois`: current registration data.
pub struct Whois;

impl Handler for Whois {
    fn name(&self) -> &'static str {
        "whois"
    }

    fn build_request(&self, items: &[WorkItem], _config: &TrailsConfig) -> Result<ApiRequest, TrailsError> {
        let domain = path_segment(single_item(self, items)?)?;
        Ok(ApiRequest::get(format!("domain/{}/whois", domain)))
    }

    fn parse_response(
        &self,
        items: &[WorkItem],
        _config: &TrailsConfig,
        body: Value,
    ) -> Result<RemoteResult, TrailsError> {
        let mut lines = Vec::new();

        for (label, key) in [
            ("registrar", "registrarName"),
            ("created", "createdDate"),
            ("expires", "expiresDate"),
        ] {
            if let Some(value) = body.get(key).and_then(scalar_to_string) {
                lines.push(format!("{}: {}", label, value));
            }
        }

        for server in string_array(&body, "/nameServers") {
            lines.push(format!("nameserver: {}", server));
        }

        for email in distinct(field_values(&body, "/contacts", "email")) {
            lines.push(format!("email: {}", email));
        }

        Ok(RemoteResult::new(items, lines, body))
    }
}

/// Keep the first occurrence of each value, preserving order.
pub(crate) fn distinct(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiMethod;

    fn one(item: &str) -> Vec<WorkItem> {
        vec![item.to_string()]
    }

    fn config() -> TrailsConfig {
        TrailsConfig::default().with_api_key("k")
    }

    #[test]
    fn test_subdomains_request_and_flatten() {
        let request = Subdomains.build_request(&one("a.com"), &config()).unwrap();
        assert_eq!(request.method, ApiMethod::Get);
        assert_eq!(request.path, "domain/a.com/subdomains?children_only=false");

        let body = json!({"subdomains": ["www", "api"], "subdomain_count": 2});
        let result = Subdomains.parse_response(&one("a.com"), &config(), body.clone()).unwrap();
        assert_eq!(result.lines, vec!["www.a.com", "api.a.com"]);
        assert_eq!(result.raw, body);
    }

    #[test]
    fn test_subdomains_missing_field_is_empty() {
        let result = Subdomains
            .parse_response(&one("a.com"), &config(), json!({"endpoint": "/v1/domain"}))
            .unwrap();
        assert!(result.lines.is_empty());
    }

    #[test]
    fn test_reserved_characters_are_percent_encoded() {
        let request = Tags.build_request(&one("a.com/x"), &config()).unwrap();
        assert_eq!(request.path, "domain/a.com%2Fx/tags");
        let request = Tags.build_request(&one("a b.com"), &config()).unwrap();
        assert_eq!(request.path, "domain/a%20b.com/tags");
        let request = Tags.build_request(&one("a.com?x#y"), &config()).unwrap();
        assert_eq!(request.path, "domain/a.com%3Fx%23y/tags");
        let request = Tags.build_request(&one("50%.com"), &config()).unwrap();
        assert_eq!(request.path, "domain/50%25.com/tags");
    }

    #[test]
    fn test_rejects_dot_segments() {
        for item in [".", ".."] {
            let err = Tags.build_request(&one(item), &config()).unwrap_err();
            assert_eq!(err.item(), Some(item));
        }
    }

    #[test]
    fn test_per_item_handlers_reject_batches() {
        let items = vec!["a.com".to_string(), "b.com".to_string()];
        assert!(Tags.build_request(&items, &config()).is_err());
    }

    #[test]
    fn test_associated_domains() {
        let body = json!({"records": [{"hostname": "sister.com"}, {"hostname": "brother.net"}]});
        let result = AssociatedDomains.parse_response(&one("a.com"), &config(), body).unwrap();
        assert_eq!(result.lines, vec!["sister.com", "brother.net"]);
    }

    #[test]
    fn test_associated_ips_posts_ptr_filter() {
        let request = AssociatedIps.build_request(&one("a.com"), &config()).unwrap();
        assert_eq!(request.method, ApiMethod::Post);
        assert_eq!(request.path, "ips/list");
        assert_eq!(request.body.unwrap()["filter"]["ptr_part"], "a.com");

        let body = json!({"records": [{"ip": "1.2.3.4", "ptr": "x.a.com"}]});
        let result = AssociatedIps.parse_response(&one("a.com"), &config(), body).unwrap();
        assert_eq!(result.lines, vec!["1.2.3.4"]);
    }

    #[test]
    fn test_company() {
        let body = json!({"record": {"current_company": "Acme Corp"}});
        let result = Company.parse_response(&one("a.com"), &config(), body).unwrap();
        assert_eq!(result.lines, vec!["Acme Corp"]);

        let empty = Company
            .parse_response(&one("a.com"), &config(), json!({"record": {}}))
            .unwrap();
        assert!(empty.lines.is_empty());
    }

    #[test]
    fn test_details_flattens_current_dns() {
        let body = json!({
            "hostname": "a.com",
            "current_dns": {
                "a": {"values": [{"ip": "1.1.1.1"}, {"ip": "2.2.2.2"}]},
                "mx": {"values": [{"hostname": "mx.a.com", "priority": 10}]},
                "ns": {"values": [{"nameserver": "ns1.a.com"}]},
                "txt": {"values": [{"value": "v=spf1 -all"}]}
            }
        });
        let result = Details.parse_response(&one("a.com"), &config(), body).unwrap();
        assert_eq!(
            result.lines,
            vec![
                "a.com a 1.1.1.1",
                "a.com a 2.2.2.2",
                "a.com mx mx.a.com",
                "a.com ns ns1.a.com",
                "a.com txt v=spf1 -all",
            ]
        );
    }

    #[test]
    fn test_tags() {
        let result = Tags
            .parse_response(&one("a.com"), &config(), json!({"tags": ["cdn", "mail"]}))
            .unwrap();
        assert_eq!(result.lines, vec!["cdn", "mail"]);
    }

    #[test]
    fn test_whois_flatten() {
        let body = json!({
            "registrarName": "Example Registrar",
            "createdDate": 1262304000000u64,
            "nameServers": ["ns1.a.com", "ns2.a.com"],
            "contacts": [
                {"type": "registrant", "email": "owner@a.com"},
                {"type": "admin", "email": "OWNER@a.com"},
                {"type": "tech", "email": "tech@a.com"}
            ]
        });
        let result = Whois.parse_response(&one("a.com"), &config(), body).unwrap();
        assert_eq!(
            result.lines,
            vec![
                "registrar: Example Registrar",
                "created: 1262304000000",
                "nameserver: ns1.a.com",
                "nameserver: ns2.a.com",
                "email: owner@a.com",
                "email: tech@a.com",
            ]
        );
    }
}
