//! Test doubles and common utilities for engine contract tests
//!
//! The in-memory record store behaves like a provider zone: creates assign
//! ids, updates and deletes address records by id. Failures and delays can
//! be injected per host name.

#![allow(dead_code)]

use ddns_core::error::{ApiMessage, Error, ProviderError, Result};
use ddns_core::model::{DesiredHost, DesiredState, DiscoveredAddresses, ObservedRecord, RecordSpec, RecordType};
use ddns_core::traits::{AddressSource, RecordStore};
use ddns_core::EngineConfig;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory zone with call counters and fault injection
///
/// Clones share all state, so a test can keep a handle after boxing one
/// copy into the engine.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<Mutex<Vec<ObservedRecord>>>,
    next_id: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    write_calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    fail_list: Arc<Mutex<bool>>,
    failing_names: Arc<Mutex<HashSet<String>>>,
    slow_names: Arc<Mutex<HashMap<String, Duration>>>,
    write_delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<ObservedRecord>) -> Self {
        let store = Self::default();
        *store.records.lock().unwrap() = records;
        store
    }

    /// Make every write touching `name` fail with an API error
    pub fn fail_writes_for(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    /// Make every write touching `name` take `delay`
    pub fn slow_writes_for(&self, name: &str, delay: Duration) {
        self.slow_names
            .lock()
            .unwrap()
            .insert(name.to_string(), delay);
    }

    /// Make every write take `delay` (for concurrency measurements)
    pub fn delay_all_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Make the listing call fail
    pub fn fail_list(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    pub fn records(&self) -> Vec<ObservedRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn write_call_count(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn before_write(&self, name: &str) -> std::result::Result<(), ProviderError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .slow_names
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .or(*self.write_delay.lock().unwrap());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_names.lock().unwrap().contains(name) {
            return Err(ProviderError::http(
                400,
                vec![ApiMessage::new(81057, "Record already exists.")],
            ));
        }
        Ok(())
    }

    fn name_of(&self, id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone())
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(&self) -> std::result::Result<Vec<ObservedRecord>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_list.lock().unwrap() {
            return Err(ProviderError::http(
                403,
                vec![ApiMessage::new(9103, "Unknown X-Auth-Key or X-Auth-Email")],
            ));
        }
        Ok(self.records())
    }

    async fn create(&self, spec: &RecordSpec) -> std::result::Result<ObservedRecord, ProviderError> {
        self.before_write(&spec.name).await?;

        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = ObservedRecord {
            id,
            name: spec.name.clone(),
            record_type: spec.record_type.to_string(),
            content: spec.content.clone(),
            proxied: spec.proxied,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        spec: &RecordSpec,
    ) -> std::result::Result<ObservedRecord, ProviderError> {
        self.before_write(&spec.name).await?;

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ProviderError::http(404, vec![ApiMessage::new(81044, "Record does not exist.")]))?;
        record.name = spec.name.clone();
        record.record_type = spec.record_type.to_string();
        record.content = spec.content.clone();
        record.proxied = spec.proxied;
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), ProviderError> {
        let name = self.name_of(id).unwrap_or_default();
        self.before_write(&name).await?;

        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Address source returning fixed addresses
pub struct StaticAddressSource {
    addresses: DiscoveredAddresses,
    calls: Arc<AtomicUsize>,
}

impl StaticAddressSource {
    pub fn new(a: Option<&str>, aaaa: Option<&str>) -> Self {
        Self {
            addresses: DiscoveredAddresses::new(a.map(str::to_string), aaaa.map(str::to_string)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl AddressSource for StaticAddressSource {
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.addresses.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Address source that always fails
pub struct FailingAddressSource;

#[async_trait::async_trait]
impl AddressSource for FailingAddressSource {
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        Err(Error::discovery("echo service unreachable"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Address source that never answers in time
pub struct HangingAddressSource;

#[async_trait::async_trait]
impl AddressSource for HangingAddressSource {
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(DiscoveredAddresses::default())
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

pub fn record(id: &str, name: &str, record_type: &str, content: &str) -> ObservedRecord {
    ObservedRecord {
        id: id.to_string(),
        name: name.to_string(),
        record_type: record_type.to_string(),
        content: content.to_string(),
        proxied: false,
    }
}

pub fn desired(hosts: &[(&str, &[RecordType])]) -> DesiredState {
    DesiredState::new(
        hosts
            .iter()
            .map(|(name, types)| DesiredHost::new(name, types.iter().copied(), false).unwrap()),
    )
    .unwrap()
}

pub fn addresses(a: Option<&str>, aaaa: Option<&str>) -> DiscoveredAddresses {
    DiscoveredAddresses::new(a.map(str::to_string), aaaa.map(str::to_string))
}

/// Engine settings tuned for tests (short timeout)
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        operation_timeout_ms: 200,
        ..EngineConfig::default()
    }
}
