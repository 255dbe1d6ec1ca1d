pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use sqlx::Error as SqlxError;
pub use fixtures::{DemoSeedDataset, SeedResult, SeedUserContract, VerificationResult};
