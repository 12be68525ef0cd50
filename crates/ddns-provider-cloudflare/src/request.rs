//! Cloudflare v4 request builders and response envelope
//!
//! Everything here is pure: requests are plain values so they can be
//! inspected in tests without a server.

use ddns_core::error::{ApiMessage, ProviderError};
use ddns_core::model::RecordSpec;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;

/// Records requested per listing page (Cloudflare's maximum is 5000, default 100)
pub const PAGE_SIZE: u32 = 100;

/// A Cloudflare API call, relative to the API base URL
///
/// The path is kept as raw segments; each one is percent-encoded when the
/// final URL is built, so ids can never add segments, a query or a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// `GET /zones/{zone}/dns_records?page=N&per_page=100`
    pub fn list_records(zone_id: &str, page: u32) -> Self {
        Self {
            method: Method::GET,
            segments: records_segments(zone_id),
            query: vec![("page", page.to_string()), ("per_page", PAGE_SIZE.to_string())],
            body: None,
        }
    }

    /// `POST /zones/{zone}/dns_records`
    pub fn create_record(zone_id: &str, spec: &RecordSpec) -> Self {
        Self {
            method: Method::POST,
            segments: records_segments(zone_id),
            query: Vec::new(),
            body: Some(record_body(spec)),
        }
    }

    /// `PUT /zones/{zone}/dns_records/{id}`
    pub fn update_record(zone_id: &str, record_id: &str, spec: &RecordSpec) -> Self {
        Self {
            method: Method::PUT,
            segments: record_segments(zone_id, record_id),
            query: Vec::new(),
            body: Some(record_body(spec)),
        }
    }

    /// `DELETE /zones/{zone}/dns_records/{id}`
    pub fn delete_record(zone_id: &str, record_id: &str) -> Self {
        Self {
            method: Method::DELETE,
            segments: record_segments(zone_id, record_id),
            query: Vec::new(),
            body: None,
        }
    }

    /// Resolve against `base_url`, appending the encoded path segments
    pub fn url(&self, base_url: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(base_url).map_err(|e| {
            ProviderError::transport(format!("Invalid API base URL {}: {}", base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|()| {
                ProviderError::transport(format!("API base URL cannot take a path: {}", base_url))
            })?
            .pop_if_empty()
            .extend(&self.segments);

        Ok(url)
    }
}

fn records_segments(zone_id: &str) -> Vec<String> {
    vec![
        "zones".to_string(),
        zone_id.to_string(),
        "dns_records".to_string(),
    ]
}

fn record_segments(zone_id: &str, record_id: &str) -> Vec<String> {
    let mut segments = records_segments(zone_id);
    segments.push(record_id.to_string());
    segments
}

fn record_body(spec: &RecordSpec) -> Value {
    serde_json::json!({
        "type": spec.record_type.as_str(),
        "name": spec.name,
        "content": spec.content,
        "proxied": spec.proxied,
    })
}

/// Standard Cloudflare response wrapper
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

/// Pagination block of list responses
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResultInfo {
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::error::ProviderStatus;
    use ddns_core::model::{ObservedRecord, RecordType};

    const BASE: &str = "https://api.cloudflare.com/client/v4";

    fn path_of(req: &ApiRequest) -> String {
        req.url(BASE).unwrap().path().to_string()
    }

    fn spec() -> RecordSpec {
        RecordSpec {
            name: "home.example.com".to_string(),
            record_type: RecordType::Aaaa,
            content: "2001:db8::1".to_string(),
            proxied: true,
        }
    }

    #[test]
    fn list_request_is_paginated() {
        let req = ApiRequest::list_records("zone123", 2);

        assert_eq!(req.method, Method::GET);
        assert_eq!(path_of(&req), "/client/v4/zones/zone123/dns_records");
        assert_eq!(
            req.query,
            vec![("page", "2".to_string()), ("per_page", "100".to_string())]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn create_request_carries_record_body() {
        let req = ApiRequest::create_record("zone123", &spec());

        assert_eq!(req.method, Method::POST);
        assert_eq!(path_of(&req), "/client/v4/zones/zone123/dns_records");
        assert_eq!(
            req.body,
            Some(serde_json::json!({
                "type": "AAAA",
                "name": "home.example.com",
                "content": "2001:db8::1",
                "proxied": true,
            }))
        );
    }

    #[test]
    fn update_and_delete_address_the_record_id() {
        let update = ApiRequest::update_record("zone123", "rec9", &spec());
        let delete = ApiRequest::delete_record("zone123", "rec9");

        assert_eq!(update.method, Method::PUT);
        assert_eq!(path_of(&update), "/client/v4/zones/zone123/dns_records/rec9");
        assert!(update.body.is_some());

        assert_eq!(delete.method, Method::DELETE);
        assert_eq!(path_of(&delete), "/client/v4/zones/zone123/dns_records/rec9");
        assert!(delete.body.is_none());
    }

    #[test]
    fn reserved_characters_in_ids_are_encoded() {
        let delete = ApiRequest::delete_record("zone/1", "rec?x=1#frag");

        let url = delete.url(BASE).unwrap();

        assert_eq!(
            url.path(),
            "/client/v4/zones/zone%2F1/dns_records/rec%3Fx=1%23frag"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn trailing_slash_on_base_is_not_doubled() {
        let req = ApiRequest::list_records("zone123", 1);

        let url = req.url("http://127.0.0.1:8080/").unwrap();

        assert_eq!(url.as_str(), "http://127.0.0.1:8080/zones/zone123/dns_records");
    }

    #[test]
    fn unparsable_base_url_is_rejected() {
        let err = ApiRequest::list_records("zone123", 1)
            .url("not a url")
            .unwrap_err();

        assert_eq!(err.status, ProviderStatus::Transport);
    }

    #[test]
    fn envelope_parses_listing_page() {
        let json = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": [
                {"id": "r1", "name": "home.example.com", "type": "A", "content": "1.2.3.4",
                 "proxied": false, "ttl": 1, "zone_id": "zone123"},
                {"id": "r2", "name": "home.example.com", "type": "MX", "content": "mail.example.com",
                 "priority": 10}
            ],
            "result_info": {"page": 1, "per_page": 100, "count": 2, "total_count": 2, "total_pages": 1}
        }"#;

        let envelope: Envelope<Vec<ObservedRecord>> = serde_json::from_str(json).unwrap();

        assert!(envelope.success);
        let records = envelope.result.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].record_type, "MX");
        assert!(!records[1].proxied);
        let info = envelope.result_info.unwrap();
        assert_eq!((info.page, info.total_pages), (1, 1));
    }

    #[test]
    fn envelope_parses_errors() {
        let json = r#"{
            "success": false,
            "errors": [{"code": 9109, "message": "Invalid access token"}],
            "messages": [],
            "result": null
        }"#;

        let envelope: Envelope<Value> = serde_json::from_str(json).unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.errors, vec![ApiMessage::new(9109, "Invalid access token")]);
        assert!(envelope.result.is_none());
    }
}
