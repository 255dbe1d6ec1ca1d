use std::time::Instant;

use crate::commands::CommandResult;
use cofoundry_core::config::{AppConfig, LoadOptions};
use cofoundry_db::{connect_with_settings, migrations, DemoSeedDataset};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config_started = Instant::now();
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms: config_started.elapsed().as_millis() as u64,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms: config_started.elapsed().as_millis() as u64,
                message: error.to_string(),
            });
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("seed_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("seed_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let db_started = Instant::now();
    // Single connection: an in-memory database exists per connection, so the
    // migrate/seed/verify sequence must share one.
    let db_result = runtime
        .block_on(connect_with_settings(&config.database.url, 1, config.database.timeout_secs));

    let pool = match db_result {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("connected using `{}`", config.database.url),
            });
            pool
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("failed to connect: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("seed_round_trip"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let migration_started = Instant::now();
    let migration_result = runtime.block_on(migrations::run_pending(&pool));
    match migration_result {
        Ok(()) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Pass,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: "pending migrations applied".to_string(),
        }),
        Err(error) => {
            checks.push(SmokeCheck {
                name: "migration_visibility",
                status: SmokeStatus::Fail,
                elapsed_ms: migration_started.elapsed().as_millis() as u64,
                message: error.to_string(),
            });
            checks.push(skipped("seed_round_trip"));
            runtime.block_on(pool.close());
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    let seed_started = Instant::now();
    let seed_result = runtime.block_on(async {
        DemoSeedDataset::load(&pool).await?;
        DemoSeedDataset::verify(&pool).await
    });
    match seed_result {
        Ok(verification) if verification.all_present => checks.push(SmokeCheck {
            name: "seed_round_trip",
            status: SmokeStatus::Pass,
            elapsed_ms: seed_started.elapsed().as_millis() as u64,
            message: "demo dataset loaded and verified".to_string(),
        }),
        Ok(verification) => {
            let failed = verification
                .checks
                .iter()
                .filter(|(_, passed)| !passed)
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ");
            checks.push(SmokeCheck {
                name: "seed_round_trip",
                status: SmokeStatus::Fail,
                elapsed_ms: seed_started.elapsed().as_millis() as u64,
                message: format!("verification failed: {failed}"),
            });
        }
        Err(error) => checks.push(SmokeCheck {
            name: "seed_round_trip",
            status: SmokeStatus::Fail,
            elapsed_ms: seed_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        }),
    }

    runtime.block_on(pool.close());
    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to an earlier failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);
    let status = if failed { SmokeStatus::Fail } else { SmokeStatus::Pass };
    let summary = if failed {
        "one or more smoke checks failed".to_string()
    } else {
        "all smoke checks passed".to_string()
    };

    let report = SmokeReport { command: "smoke", status, summary, total_elapsed_ms, checks };
    let output = serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| format!("{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"{error}\"}}"));

    CommandResult { exit_code: if failed { 1 } else { 0 }, output }
}
