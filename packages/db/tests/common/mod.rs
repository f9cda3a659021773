use db::{DbConfig, DbError, JobRepository};

/// Every call returns a repository on its own empty in-memory datastore.
pub async fn setup_repo() -> Result<JobRepository, DbError> {
    db::init(&DbConfig::memory()).await
}
