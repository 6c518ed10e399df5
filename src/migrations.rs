use sqlx::{Pool, Postgres};

// Schema files are compiled in so a fresh database bootstraps itself on
// startup without an external migration step.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_users",
        include_str!("../migrations/0001_create_users.sql"),
    ),
    (
        "0002_create_notifications",
        include_str!("../migrations/0002_create_notifications.sql"),
    ),
    (
        "0003_create_bookings",
        include_str!("../migrations/0003_create_bookings.sql"),
    ),
    (
        "0004_create_maid_operations",
        include_str!("../migrations/0004_create_maid_operations.sql"),
    ),
];

/// Apply all schema files in order. Every statement uses IF NOT EXISTS, so
/// re-running against an up-to-date database is harmless; failures are
/// logged and skipped rather than aborting startup.
pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    for (name, sql) in MIGRATIONS {
        match sqlx::raw_sql(sql).execute(db).await {
            Ok(_) => tracing::info!(migration = name, "schema migration applied"),
            Err(e) => {
                tracing::warn!(migration = name, error = %e, "schema migration skipped");
            }
        }
    }
    Ok(())
}
