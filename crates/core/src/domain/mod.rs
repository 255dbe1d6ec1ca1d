use chrono::{DateTime, Duration, Utc};

pub mod business_plan;
pub mod commitment;
pub mod goal;
pub mod message;
pub mod organization;
pub mod session;
pub mod user;

/// Next `updated_at` value for a mutated record. Strictly greater than the
/// previous value even when the wall clock has not advanced.
pub fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}
