use std::collections::HashSet;

use cofoundry_db::DemoSeedDataset;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

#[test]
fn seed_contract_matches_seed_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = DemoSeedDataset::SQL;
    let contract = DemoSeedDataset::contract();
    let mut user_types_seen = HashSet::new();

    require!(contract.len() == 4, "demo contract should cover four roles");

    for user in contract {
        require!(
            user_types_seen.insert(user.user_type),
            "duplicate seeded user type: {}",
            user.user_type
        );
        require!(!user.description.is_empty());
        require!(
            fixture_sql.contains(&format!("'{}'", user.user_id)),
            "seed SQL fixture should include user id {}",
            user.user_id
        );
        require!(
            fixture_sql.contains(&format!("'{}'", user.email)),
            "seed SQL fixture should include email {}",
            user.email
        );
        require!(
            fixture_sql.contains(&format!("'{}'", user.user_type)),
            "seed SQL fixture should include user type {}",
            user.user_type
        );
    }

    for expected_type in ["entrepreneur", "investor", "lender", "grantor"] {
        require!(
            user_types_seen.contains(expected_type),
            "missing canonical seeded role: {expected_type}"
        );
    }

    require!(
        fixture_sql.contains("ON CONFLICT (id) DO UPDATE"),
        "seed SQL must stay idempotent via conflict-update upserts"
    );
    require!(
        !fixture_sql.contains("OR REPLACE"),
        "OR REPLACE would delete parent rows out from under the foreign keys"
    );
    Ok(())
}

#[tokio::test]
async fn seed_verification_fails_on_an_empty_database() {
    let pool =
        cofoundry_db::connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
    cofoundry_db::migrations::run_pending(&pool).await.expect("migrate");

    let verification = DemoSeedDataset::verify(&pool).await.expect("verify runs");
    assert!(!verification.all_present, "verification must fail before seeding");

    DemoSeedDataset::load(&pool).await.expect("load");
    let verification = DemoSeedDataset::verify(&pool).await.expect("verify runs");
    assert!(verification.all_present, "verification must pass after seeding");
}
