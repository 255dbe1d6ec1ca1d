use std::env;
use std::sync::{Mutex, OnceLock};

use cofoundry_cli::commands::{migrate, seed, smoke};
use serde_json::Value;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const MANAGED_VARS: &[&str] = &[
    "COFOUNDRY_DATABASE_URL",
    "COFOUNDRY_SERVER_ENVIRONMENT",
    "COFOUNDRY_AUTH_DEV_BYPASS",
    "OPENAI_API_KEY",
    "AZURE_OPENAI_API_KEY",
    "AZURE_OPENAI_ENDPOINT",
    "AZURE_OPENAI_DEPLOYMENT",
];

fn with_env(vars: &[(&str, &str)], run: impl FnOnce()) {
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock");
    for var in MANAGED_VARS {
        env::remove_var(var);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    run();

    for var in MANAGED_VARS {
        env::remove_var(var);
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("COFOUNDRY_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_failure_for_a_bad_database_url() {
    with_env(&[("COFOUNDRY_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_the_demo_dataset() {
    with_env(&[("COFOUNDRY_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("entrepreneur: user-entrepreneur-001"));
        assert!(message.contains("lender: user-lender-001"));
        assert!(message.contains("verification: all checks passed"));
    });
}

#[test]
fn smoke_passes_end_to_end_against_memory_database() {
    with_env(&[("COFOUNDRY_DATABASE_URL", "sqlite::memory:")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 0, "expected smoke pass: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "pass");

        let check_names = payload["checks"]
            .as_array()
            .expect("checks array")
            .iter()
            .map(|check| check["name"].as_str().unwrap_or("").to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            check_names,
            vec!["config_validation", "db_connectivity", "migration_visibility", "seed_round_trip"]
        );
    });
}

#[test]
fn smoke_fails_cleanly_when_config_is_invalid() {
    with_env(
        &[
            ("COFOUNDRY_SERVER_ENVIRONMENT", "production"),
            ("COFOUNDRY_AUTH_DEV_BYPASS", "true"),
            ("COFOUNDRY_DATABASE_URL", "sqlite::memory:"),
        ],
        || {
            let result = smoke::run();
            assert_eq!(result.exit_code, 1, "expected smoke failure");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "fail");
            assert_eq!(payload["checks"][0]["name"], "config_validation");
            assert_eq!(payload["checks"][0]["status"], "fail");
            assert_eq!(payload["checks"][1]["status"], "skipped");
        },
    );
}
