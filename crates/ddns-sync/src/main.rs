// # ddns-sync - One-shot DDNS record synchronizer
//
// This binary is a THIN integration layer only. All reconciliation logic
// lives in ddns-core; this crate:
// 1. Reads configuration from environment variables
// 2. Loads the desired host map
// 3. Registers the record store and address source
// 4. Runs one reconciliation pass and maps its result to an exit code
//
// Scheduling (cron, systemd timer) is left to the host.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Cloudflare
// - `CLOUDFLARE_AUTH_KEY` / `CLOUDFLARE_AUTH_EMAIL`: Global API key and account email
// - `CLOUDFLARE_API_TOKEN`: Scoped API token (alternative to the key pair)
// - `CLOUDFLARE_ZONES`: Zone identifier (required)
//
// ### Hosts
// - `DDNS_HOSTS_FILE`: JSON host map path (default: /etc/ddns/hosts.json)
// - `DDNS_HOSTS`: Inline JSON host map (takes precedence over the file)
//
// ### Address discovery
// - `DDNS_IPV4_URLS` / `DDNS_IPV6_URLS`: Comma-separated echo service URLs;
//   an empty value disables the family
// - `DDNS_IPV6_SOURCE`: `http` or `interface` (default: http). With
//   `interface`, AAAA comes from the global address on a local interface
//   and `DDNS_IPV6_URLS` is not used
// - `DDNS_INTERFACE`: Interface to read with `DDNS_IPV6_SOURCE=interface`
//   (default: all interfaces)
//
// ### Engine
// - `DDNS_MODE`: `live` or `dry-run` (default: live)
// - `DDNS_OPERATION_TIMEOUT_MS`: Timeout per network call (default: 30000)
// - `DDNS_MAX_CONCURRENCY`: Concurrent write operations, 1-32 (default: 4)
// - `DDNS_DELETE_UNWANTED`: Delete address records of unwanted types (default: true)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export CLOUDFLARE_AUTH_KEY=your_key
// export CLOUDFLARE_AUTH_EMAIL=you@example.com
// export CLOUDFLARE_ZONES=023e105f4ecef8ad9ca31a8372d0c353
// export DDNS_HOSTS='{"home.example.com": {"types": ["A", "AAAA"]}}'
//
// ddns-sync
// ```

use anyhow::{Context, Result};
use ddns_core::config::{load_hosts_file, parse_hosts};
use ddns_core::{
    AddressSourceConfig, DdnsConfig, DesiredState, EngineConfig, ProviderConfig, ProviderRegistry,
    RunSummary, SyncEngine,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::task::JoinHandle;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Default location of the host map
const DEFAULT_HOSTS_FILE: &str = "/etc/ddns/hosts.json";

/// Exit codes for the possible run results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Every planned operation succeeded (or nothing to do)
    Success = 0,
    /// Configuration error, reported before any network call
    ConfigError = 1,
    /// Discovery or listing failed; nothing was written
    RunAborted = 2,
    /// The run completed but one or more operations failed
    OperationsFailed = 3,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DdnsExitCode {
    /// Map a run result to its exit code
    fn for_run(result: &ddns_core::Result<RunSummary>) -> Self {
        match result {
            Ok(summary) if summary.is_success() => DdnsExitCode::Success,
            Ok(_) => DdnsExitCode::OperationsFailed,
            Err(e) if e.is_config() => DdnsExitCode::ConfigError,
            Err(_) => DdnsExitCode::RunAborted,
        }
    }
}

/// Where IPv6 addresses are discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ipv6Source {
    Http,
    Interface,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    api_token: Option<String>,
    api_key: Option<String>,
    api_email: Option<String>,
    zone_id: String,
    hosts_file: PathBuf,
    hosts_inline: Option<String>,
    dry_run: bool,
    operation_timeout_ms: u64,
    max_concurrency: usize,
    delete_unwanted: bool,
    ipv4_urls: Option<Vec<String>>,
    ipv6_urls: Option<Vec<String>>,
    ipv6_source: Ipv6Source,
    interface: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (environment in production)
    ///
    /// Empty values count as unset, except for the URL lists where an empty
    /// value disables the family.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dry_run = match var("DDNS_MODE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let ipv6_source = match var("DDNS_IPV6_SOURCE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("http") => Ipv6Source::Http,
            Some("interface") => Ipv6Source::Interface,
            Some(other) => anyhow::bail!(
                "DDNS_IPV6_SOURCE '{}' is not valid. Valid sources: http, interface",
                other
            ),
        };

        Ok(Self {
            api_token: var("CLOUDFLARE_API_TOKEN"),
            api_key: var("CLOUDFLARE_AUTH_KEY"),
            api_email: var("CLOUDFLARE_AUTH_EMAIL"),
            zone_id: var("CLOUDFLARE_ZONES").unwrap_or_default(),
            hosts_file: var("DDNS_HOSTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HOSTS_FILE)),
            hosts_inline: var("DDNS_HOSTS"),
            dry_run,
            operation_timeout_ms: parse_number(
                "DDNS_OPERATION_TIMEOUT_MS",
                var("DDNS_OPERATION_TIMEOUT_MS"),
                EngineConfig::default().operation_timeout_ms,
            )?,
            max_concurrency: parse_number(
                "DDNS_MAX_CONCURRENCY",
                var("DDNS_MAX_CONCURRENCY"),
                EngineConfig::default().max_concurrency,
            )?,
            delete_unwanted: match var("DDNS_DELETE_UNWANTED") {
                None => EngineConfig::default().delete_unwanted,
                Some(value) => parse_bool("DDNS_DELETE_UNWANTED", &value)?,
            },
            ipv4_urls: lookup("DDNS_IPV4_URLS").map(|v| split_urls(&v)),
            ipv6_urls: lookup("DDNS_IPV6_URLS").map(|v| split_urls(&v)),
            ipv6_source,
            interface: var("DDNS_INTERFACE").map(|v| v.trim().to_string()),
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Core configuration assembled from the environment
    fn ddns_config(&self) -> DdnsConfig {
        DdnsConfig {
            address_source: self.address_source(),
            provider: ProviderConfig::Cloudflare {
                api_token: self.api_token.clone(),
                api_key: self.api_key.clone(),
                api_email: self.api_email.clone(),
                zone_id: self.zone_id.clone(),
            },
            engine: EngineConfig {
                operation_timeout_ms: self.operation_timeout_ms,
                max_concurrency: self.max_concurrency,
                dry_run: self.dry_run,
                delete_unwanted: self.delete_unwanted,
                ..EngineConfig::default()
            },
        }
    }

    /// Address source for the selected IPv6 discovery
    ///
    /// Interface discovery is layered behind the IPv4-only echo services,
    /// unless IPv4 lookups are disabled altogether.
    fn address_source(&self) -> AddressSourceConfig {
        match self.ipv6_source {
            Ipv6Source::Http => AddressSourceConfig::Http {
                ipv4_urls: self.ipv4_urls.clone(),
                ipv6_urls: self.ipv6_urls.clone(),
            },
            Ipv6Source::Interface => {
                let interface = AddressSourceConfig::Interface {
                    interface: self.interface.clone(),
                };
                if self.ipv4_urls.as_ref().is_some_and(|urls| urls.is_empty()) {
                    return interface;
                }
                AddressSourceConfig::Layered {
                    sources: vec![
                        AddressSourceConfig::Http {
                            ipv4_urls: self.ipv4_urls.clone(),
                            ipv6_urls: Some(Vec::new()),
                        },
                        interface,
                    ],
                }
            }
        }
    }

    /// Validate the configuration
    ///
    /// Credentials, zone, URL schemes and numeric ranges are checked by the
    /// core configuration types; the log level is checked here.
    fn validate(&self) -> Result<()> {
        if self.zone_id.is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_ZONES is required. \
                Set it via: export CLOUDFLARE_ZONES=your_zone_id"
            );
        }

        if self.api_token.is_none() && (self.api_key.is_none() || self.api_email.is_none()) {
            anyhow::bail!(
                "Cloudflare credentials are required. Set CLOUDFLARE_AUTH_KEY and \
                CLOUDFLARE_AUTH_EMAIL, or CLOUDFLARE_API_TOKEN"
            );
        }

        self.ddns_config().validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Load the desired host map, preferring the inline value
    fn load_hosts(&self) -> Result<DesiredState> {
        match &self.hosts_inline {
            Some(json) => parse_hosts(json).context("Invalid DDNS_HOSTS"),
            None => load_hosts_file(&self.hosts_file)
                .with_context(|| format!("Invalid host map {}", self.hosts_file.display())),
        }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer. Got: {}", key, v)),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddns-sync v{}", env!("CARGO_PKG_VERSION"));

    let desired = match config.load_hosts() {
        Ok(desired) => desired,
        Err(e) => {
            error!("{:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!("Updating the following hosts:");
    for host in desired.hosts() {
        let types: Vec<&str> = host.wanted_types().iter().map(|t| t.as_str()).collect();
        info!("  {} - {}", host.name(), types.join(","));
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RunAborted.into();
        }
    };

    let result = rt.block_on(run_once(config.ddns_config(), desired));

    match &result {
        Ok(summary) if summary.is_success() => info!("Sync completed successfully"),
        Ok(summary) => {
            for (operation, err) in summary.failures() {
                error!("Failed: {} ({})", operation, err);
            }
            error!(
                "Sync completed with {} failed operation(s)",
                summary.counts.failed
            );
        }
        Err(e) => error!("Sync aborted: {}", e),
    }

    DdnsExitCode::for_run(&result).into()
}

/// Wire collaborators through the registry and run one pass
async fn run_once(config: DdnsConfig, desired: DesiredState) -> ddns_core::Result<RunSummary> {
    let registry = ProviderRegistry::new();

    // Register built-in collaborators
    #[cfg(feature = "cloudflare")]
    ddns_provider_cloudflare::register(&registry);

    #[cfg(feature = "http")]
    ddns_ip_http::register(&registry);

    #[cfg(feature = "interface")]
    ddns_ip_local::register(&registry);

    let address_source = registry.create_address_source(&config.address_source)?;
    let record_store = registry.create_record_store(&config.provider)?;

    let (engine, mut events) = SyncEngine::new(address_source, record_store, desired, config.engine)?;

    // Drain engine events so the channel never fills up
    let monitor = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let result = engine.run().await;

    drop(engine);
    join_monitor(monitor).await;

    result
}

/// Wait for the event monitor; returns `false` if it did not finish cleanly
async fn join_monitor(monitor: JoinHandle<()>) -> bool {
    match monitor.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Event monitor task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CLOUDFLARE_AUTH_KEY", "global_key"),
            ("CLOUDFLARE_AUTH_EMAIL", "ops@example.com"),
            ("CLOUDFLARE_ZONES", "zone123"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&base_vars())).unwrap();

        assert!(config.validate().is_ok());
        assert!(!config.dry_run);
        assert_eq!(config.operation_timeout_ms, 30_000);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.delete_unwanted);
        assert_eq!(config.hosts_file, PathBuf::from(DEFAULT_HOSTS_FILE));
        assert!(config.ipv4_urls.is_none());
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn test_engine_settings_from_env() {
        let mut vars = base_vars();
        vars.extend([
            ("DDNS_MODE", "DRY-RUN"),
            ("DDNS_OPERATION_TIMEOUT_MS", "5000"),
            ("DDNS_MAX_CONCURRENCY", "8"),
            ("DDNS_DELETE_UNWANTED", "false"),
            ("DDNS_LOG_LEVEL", "debug"),
        ]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        let engine = config.ddns_config().engine;

        assert!(engine.dry_run);
        assert_eq!(engine.operation_timeout_ms, 5000);
        assert_eq!(engine.max_concurrency, 8);
        assert!(!engine.delete_unwanted);
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("DDNS_MODE", "sometimes"),
            ("DDNS_MAX_CONCURRENCY", "many"),
            ("DDNS_DELETE_UNWANTED", "maybe"),
        ] {
            let mut vars = base_vars();
            vars.push((key, value));
            assert!(
                Config::from_lookup(lookup(&vars)).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_out_of_range_concurrency_fails_validation() {
        let mut vars = base_vars();
        vars.push(("DDNS_MAX_CONCURRENCY", "64"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("CLOUDFLARE_AUTH_KEY", "global_key"),
            ("CLOUDFLARE_ZONES", "zone123"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_lookup(lookup(&[("CLOUDFLARE_API_TOKEN", "scoped")])).unwrap();
        assert!(config.validate().is_err(), "zone is required");

        let config = Config::from_lookup(lookup(&[
            ("CLOUDFLARE_API_TOKEN", "scoped"),
            ("CLOUDFLARE_ZONES", "zone123"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_lists() {
        let mut vars = base_vars();
        vars.extend([
            ("DDNS_IPV4_URLS", "https://a.example/ip, https://b.example/ip"),
            ("DDNS_IPV6_URLS", ""),
        ]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(
            config.ipv4_urls,
            Some(vec![
                "https://a.example/ip".to_string(),
                "https://b.example/ip".to_string()
            ])
        );
        assert_eq!(config.ipv6_urls, Some(Vec::new()));
        assert!(config.validate().is_ok());

        // Later entries win in the lookup map
        vars.push(("DDNS_IPV4_URLS", ""));
        let both_disabled = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(both_disabled.validate().is_err());
    }

    #[test]
    fn test_ipv6_from_interface() {
        let mut vars = base_vars();
        vars.extend([("DDNS_IPV6_SOURCE", "Interface"), ("DDNS_INTERFACE", "eth0")]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.validate().is_ok());

        match config.ddns_config().address_source {
            AddressSourceConfig::Layered { sources } => {
                assert!(matches!(
                    &sources[0],
                    AddressSourceConfig::Http { ipv4_urls: None, ipv6_urls: Some(v6) } if v6.is_empty()
                ));
                assert!(matches!(
                    &sources[1],
                    AddressSourceConfig::Interface { interface: Some(name) } if name == "eth0"
                ));
            }
            other => panic!("expected layered source, got {:?}", other),
        }

        // IPv4 lookups disabled leaves the interface alone
        vars.push(("DDNS_IPV4_URLS", ""));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(matches!(
            config.ddns_config().address_source,
            AddressSourceConfig::Interface { .. }
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_ipv6_source() {
        let mut vars = base_vars();
        vars.push(("DDNS_IPV6_SOURCE", "netlink"));

        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut vars = base_vars();
        vars.push(("DDNS_LOG_LEVEL", "verbose"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hosts_loaded_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"home.example.com": {{"types": ["A", "AAAA"]}}, "vpn.example.com": {{"types": ["A"]}}}}"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let mut vars = base_vars();
        vars.push(("DDNS_HOSTS_FILE", path.as_str()));

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        let desired = config.load_hosts().unwrap();

        assert_eq!(desired.len(), 2);
        assert_eq!(desired.hosts()[0].name(), "home.example.com");
    }

    #[test]
    fn test_inline_hosts_take_precedence() {
        let mut vars = base_vars();
        vars.extend([
            ("DDNS_HOSTS_FILE", "/nonexistent/hosts.json"),
            ("DDNS_HOSTS", r#"{"inline.example.com": {"types": ["AAAA"], "proxied": true}}"#),
        ]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        let desired = config.load_hosts().unwrap();

        assert_eq!(desired.len(), 1);
        assert!(desired.hosts()[0].proxied());
    }

    #[test]
    fn test_missing_hosts_file_is_error() {
        let mut vars = base_vars();
        vars.push(("DDNS_HOSTS_FILE", "/nonexistent/hosts.json"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert!(config.load_hosts().is_err());
    }

    #[test]
    fn test_exit_codes() {
        use ddns_core::{
            OperationOutcome, OperationStatus, ProviderError, RecordOperation, RecordSpec,
            RecordType,
        };

        let ok = RunSummary::default();
        assert_eq!(DdnsExitCode::for_run(&Ok(ok)), DdnsExitCode::Success);

        let failed = RunSummary::new(
            vec![OperationOutcome {
                operation: RecordOperation::Create(RecordSpec {
                    name: "home.example.com".to_string(),
                    record_type: RecordType::A,
                    content: "203.0.113.7".to_string(),
                    proxied: false,
                }),
                status: OperationStatus::Failed(ProviderError::timeout()),
            }],
            Vec::new(),
        );
        assert_eq!(
            DdnsExitCode::for_run(&Ok(failed)),
            DdnsExitCode::OperationsFailed
        );

        assert_eq!(
            DdnsExitCode::for_run(&Err(ddns_core::Error::discovery("no address"))),
            DdnsExitCode::RunAborted
        );
        assert_eq!(
            DdnsExitCode::for_run(&Err(ProviderError::http(403, Vec::new()).into())),
            DdnsExitCode::RunAborted
        );
        assert_eq!(
            DdnsExitCode::for_run(&Err(ddns_core::Error::config("bad"))),
            DdnsExitCode::ConfigError
        );
        assert_eq!(DdnsExitCode::OperationsFailed as u8, 3);
    }

    async fn crashing_monitor() {
        panic!("event monitor crashed");
    }

    #[tokio::test]
    async fn test_monitor_failure_is_reported() {
        let clean = tokio::spawn(async {});
        assert!(join_monitor(clean).await);

        let panicked = tokio::spawn(crashing_monitor());
        assert!(!join_monitor(panicked).await);
    }
}
