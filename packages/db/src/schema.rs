//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// This creates the job table, its fields, and indexes. Safe to run repeatedly.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(JOB_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Job table schema.
///
/// Timestamps are stored as RFC 3339 strings exactly as the wire format carries them;
/// `seq` records insertion order.
const JOB_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS job SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS seq ON job TYPE int;
DEFINE FIELD IF NOT EXISTS requestId ON job TYPE string;
DEFINE FIELD IF NOT EXISTS bookId ON job TYPE string;
DEFINE FIELD IF NOT EXISTS direction ON job TYPE string ASSERT $value IN ["import", "export"];
DEFINE FIELD IF NOT EXISTS `type` ON job TYPE string;
DEFINE FIELD IF NOT EXISTS state ON job TYPE string ASSERT $value IN ["pending", "processing", "finished", "failed"];
DEFINE FIELD IF NOT EXISTS sourceUrl ON job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS resultUrl ON job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS createdAt ON job TYPE string;
DEFINE FIELD IF NOT EXISTS updatedAt ON job TYPE string;

DEFINE INDEX IF NOT EXISTS job_request_id ON job FIELDS requestId UNIQUE;
DEFINE INDEX IF NOT EXISTS job_direction ON job FIELDS direction;
DEFINE INDEX IF NOT EXISTS job_seq ON job FIELDS seq;
"#;
