use std::collections::HashMap;
use std::path::PathBuf;

use jobpool::config::{Config, NUM_THREADS_VAR, PoolConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn pool_defaults_to_available_parallelism() {
    let config = PoolConfig::from_lookup(lookup(&[])).unwrap();
    let cpus = std::thread::available_parallelism().unwrap().get();
    assert_eq!(config.num_workers, cpus);
    assert_eq!(config.results_dir, PathBuf::from("results"));
    assert_eq!(config.event_capacity, 1024);
}

#[test]
fn pool_size_comes_from_thread_variable() {
    let config = PoolConfig::from_lookup(lookup(&[
        (NUM_THREADS_VAR, "3"),
        ("RESULTS_DIR", "/tmp/jobpool-results"),
    ]))
    .unwrap();
    assert_eq!(config.num_workers, 3);
    assert_eq!(config.results_dir, PathBuf::from("/tmp/jobpool-results"));
}

#[test]
fn malformed_pool_size_is_rejected() {
    for bad in ["zero", "0", "-2", ""] {
        let result = PoolConfig::from_lookup(lookup(&[(NUM_THREADS_VAR, bad)]));
        assert!(result.is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn process_config_defaults_log_level() {
    let config = Config::from_lookup(lookup(&[("OTEL_ENDPOINT", "http://localhost:4317")])).unwrap();
    assert_eq!(config.log_level, "info");
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
}

#[test]
fn with_workers_never_goes_below_one() {
    let config = PoolConfig::default().with_workers(0);
    assert_eq!(config.num_workers, 1);
}

#[test]
fn config_from_env_reads_process_environment() {
    unsafe {
        std::env::set_var(NUM_THREADS_VAR, "2");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.pool.num_workers, 2);

    unsafe {
        std::env::remove_var(NUM_THREADS_VAR);
    }
}
