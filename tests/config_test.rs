//! Tests for configuration loading

use serial_test::serial;
use std::io::Write;

use tiercrawl::config::{CacheBackend, Config, VisitedScope};

const ENV_KEYS: &[&str] = &[
    "PORT",
    "TIERCRAWL_BIND_ADDRESS",
    "TIERCRAWL_MAX_WORKERS",
    "TIERCRAWL_MAX_PAGES_PER_WINDOW",
    "TIERCRAWL_CACHE_BACKEND",
    "TIERCRAWL_PROBE_RETRIES",
    "TIERCRAWL_CACHE_TTL",
    "REDIS_URL",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert_eq!(config.server.bind_address.port(), 8080);
    assert_eq!(config.quota.max_workers, 10);
    assert_eq!(config.quota.max_pages_per_window, 100);
    assert_eq!(config.tiers.paid_pool_size, 5);
    assert_eq!(config.tiers.free_pool_size, 2);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    std::env::set_var("PORT", "9090");
    std::env::set_var("TIERCRAWL_MAX_WORKERS", "20");
    std::env::set_var("TIERCRAWL_MAX_PAGES_PER_WINDOW", "500");
    std::env::set_var("TIERCRAWL_CACHE_BACKEND", "memory");
    std::env::set_var("REDIS_URL", "redis://cache:6379");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.server.bind_address.port(), 9090);
    assert_eq!(config.quota.max_workers, 20);
    assert_eq!(config.quota.max_pages_per_window, 500);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.url, "redis://cache:6379");
}

#[test]
#[serial]
fn test_invalid_port_rejected() {
    clear_env();
    std::env::set_var("PORT", "not-a-port");
    let result = Config::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_unparsable_numeric_override_rejected() {
    clear_env();
    std::env::set_var("TIERCRAWL_MAX_WORKERS", "ten");
    let result = Config::from_env();
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("TIERCRAWL_MAX_WORKERS"));

    std::env::set_var("TIERCRAWL_CACHE_TTL", "-5");
    let result = Config::from_env();
    clear_env();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_numeric_override_tolerates_whitespace() {
    clear_env();
    std::env::set_var("TIERCRAWL_PROBE_RETRIES", " 4 ");
    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.probe.max_retries, 4);
}

#[test]
#[serial]
fn test_unknown_cache_backend_rejected() {
    clear_env();
    std::env::set_var("TIERCRAWL_CACHE_BACKEND", "memcached");
    let result = Config::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_from_toml_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
bind_address = "127.0.0.1:3000"

[quota]
max_workers = 12
max_pages_per_window = 40

[probe]
max_retries = 2
retry_interval_ms = 250

[fetch]
max_depth = 2
visited_scope = "process"
visited_max_entries = 1000

[cache]
backend = "memory"
ttl_secs = 600
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.bind_address.to_string(), "127.0.0.1:3000");
    assert_eq!(config.quota.max_workers, 12);
    assert_eq!(config.quota.max_pages_per_window, 40);
    assert_eq!(config.probe.max_retries, 2);
    assert_eq!(config.probe.retry_interval_ms, 250);
    assert_eq!(config.fetch.max_depth, 2);
    assert_eq!(config.fetch.visited_scope, VisitedScope::Process);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.ttl_secs, 600);
    // Untouched sections keep their defaults
    assert_eq!(config.tiers.paid_worker_cost, 5);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_missing_file_is_error() {
    let result = Config::from_file(std::path::Path::new("/nonexistent/tiercrawl.toml"));
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_sample_config_parses() {
    clear_env();
    let config = Config::from_file(std::path::Path::new("config.toml")).unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_rules() {
    let mut config = Config::default();
    config.probe.max_retries = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.tiers.free_pool_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.tiers.paid_worker_cost = 11;
    assert!(config.validate().is_err());
}
