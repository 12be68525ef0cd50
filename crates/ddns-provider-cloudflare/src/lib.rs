// # Cloudflare Record Store
//
// This crate provides the Cloudflare `RecordStore` implementation for the
// DDNS record synchronizer.
//
// ## Behavior
//
// - One zone per store, fixed at construction
// - Listing walks pages 1..=`result_info.total_pages`; a reply for any
//   other page than the one requested is an invalid response
// - Every provider-reported `{code, message}` is carried in the returned error
// - NO retry logic (a failed write is reported in the run summary)
// - NO caching (every run lists the zone afresh)
//
// ## Security Requirements
//
// - API key and token NEVER appear in logs or Debug output
// - Credentials MUST be provided via environment variables only
// - Store construction MUST fail fast if a credential is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

pub mod request;

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::error::{ApiMessage, ProviderError};
use ddns_core::model::{ObservedRecord, RecordSpec};
use ddns_core::traits::{RecordStore, RecordStoreFactory};
use ddns_core::{Error, Result};
use request::{ApiRequest, Envelope};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare authentication scheme
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Scoped API token, sent as a bearer token
    ApiToken(String),
    /// Global API key, sent as `X-Auth-Key` / `X-Auth-Email`
    ApiKey { key: String, email: String },
}

impl Credentials {
    fn validate(&self) -> Result<()> {
        match self {
            Credentials::ApiToken(token) if token.is_empty() => {
                Err(Error::config("Cloudflare API token cannot be empty"))
            }
            Credentials::ApiKey { key, email } if key.is_empty() || email.is_empty() => Err(
                Error::config("Cloudflare API key and email cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::ApiToken(token) => builder.bearer_auth(token),
            Credentials::ApiKey { key, email } => builder
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }
}

// Custom Debug implementation that hides the secrets
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiToken(_) => f.debug_tuple("ApiToken").field(&"<REDACTED>").finish(),
            Credentials::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
        }
    }
}

/// Record store backed by the Cloudflare v4 `dns_records` resource
#[derive(Debug)]
pub struct CloudflareRecordStore {
    credentials: Credentials,

    /// Zone identifier (`CLOUDFLARE_ZONES`)
    zone_id: String,

    /// API base URL, overridable for tests
    base_url: String,

    client: reqwest::Client,
}

impl CloudflareRecordStore {
    /// Create a store for `zone_id`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a credential or the zone is empty,
    /// or if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, zone_id: impl Into<String>) -> Result<Self> {
        credentials.validate()?;

        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone id cannot be empty"));
        }

        Ok(Self {
            credentials,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client: build_client(DEFAULT_HTTP_TIMEOUT)?,
        })
    }

    /// Point the store at another API root (mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client timeout
    pub fn with_http_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Send one request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<Envelope<T>, ProviderError> {
        let url = request.url(&self.base_url)?;
        tracing::debug!("Cloudflare request: {} {}", request.method, url.path());

        let mut builder = self.client.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = self
            .credentials
            .apply(builder)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let messages = error_messages(&bytes);
            log_error_status(status, &messages);
            return Err(ProviderError::http(status.as_u16(), messages));
        }

        let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            tracing::warn!(
                "Cloudflare reported failure with HTTP {}: {:?}",
                status.as_u16(),
                envelope.errors
            );
            return Err(ProviderError::http(status.as_u16(), envelope.errors));
        }

        Ok(envelope)
    }
}

#[async_trait]
impl RecordStore for CloudflareRecordStore {
    async fn list(&self) -> std::result::Result<Vec<ObservedRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let envelope: Envelope<Vec<ObservedRecord>> = self
                .send(ApiRequest::list_records(&self.zone_id, page))
                .await?;

            let batch = envelope
                .result
                .ok_or_else(|| ProviderError::invalid_response("Listing has no result array"))?;
            tracing::debug!("Listed page {} with {} record(s)", page, batch.len());
            records.extend(batch);

            let Some(info) = envelope.result_info else {
                break;
            };
            if info.page != page {
                return Err(ProviderError::invalid_response(format!(
                    "Requested listing page {} but received page {}",
                    page, info.page
                )));
            }
            if page >= info.total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    async fn create(&self, spec: &RecordSpec) -> std::result::Result<ObservedRecord, ProviderError> {
        let envelope: Envelope<ObservedRecord> = self
            .send(ApiRequest::create_record(&self.zone_id, spec))
            .await?;

        envelope
            .result
            .ok_or_else(|| ProviderError::invalid_response("Create response has no record"))
    }

    async fn update(
        &self,
        id: &str,
        spec: &RecordSpec,
    ) -> std::result::Result<ObservedRecord, ProviderError> {
        let envelope: Envelope<ObservedRecord> = self
            .send(ApiRequest::update_record(&self.zone_id, id, spec))
            .await?;

        envelope
            .result
            .ok_or_else(|| ProviderError::invalid_response("Update response has no record"))
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), ProviderError> {
        let _: Envelope<Value> = self
            .send(ApiRequest::delete_record(&self.zone_id, id))
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout()
    } else {
        ProviderError::transport(format!("HTTP request failed: {}", err))
    }
}

/// Extract `errors` from a failed response, falling back to the raw body
fn error_messages(body: &[u8]) -> Vec<ApiMessage> {
    if let Ok(envelope) = serde_json::from_slice::<Envelope<Value>>(body) {
        return envelope.errors;
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![ApiMessage::local(text)]
    }
}

fn log_error_status(status: StatusCode, messages: &[ApiMessage]) {
    match status.as_u16() {
        401 | 403 => tracing::warn!(
            "Authentication failed: invalid credentials or insufficient permissions. Status: {} {:?}",
            status,
            messages
        ),
        404 => tracing::warn!("Zone or record not found. Status: {} {:?}", status, messages),
        409 => tracing::warn!("Conflicting record. Status: {} {:?}", status, messages),
        429 => tracing::warn!("Rate limit exceeded. Status: {}", status),
        500..=599 => tracing::warn!(
            "Cloudflare server error (transient): {} {:?}",
            status,
            messages
        ),
        _ => tracing::warn!("Cloudflare request failed: {} {:?}", status, messages),
    }
}

/// Factory for creating Cloudflare record stores
pub struct CloudflareFactory;

impl RecordStoreFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_key,
                api_email,
                zone_id,
            } => {
                let credentials = match (api_token, api_key, api_email) {
                    (Some(token), _, _) if !token.is_empty() => {
                        Credentials::ApiToken(token.clone())
                    }
                    (_, Some(key), Some(email)) => Credentials::ApiKey {
                        key: key.clone(),
                        email: email.clone(),
                    },
                    _ => {
                        return Err(Error::config(
                            "Cloudflare requires an API token, or an API key and email",
                        ));
                    }
                };

                Ok(Box::new(CloudflareRecordStore::new(
                    credentials,
                    zone_id.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare record store with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_cloudflare::register(&registry);
/// assert!(registry.has_record_store("cloudflare"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_record_store("cloudflare", Box::new(CloudflareFactory));
}
