//! Database module
//!
//! Database connection and schema verification utilities. Schema creation
//! lives in migrations outside this crate.

use sqlx::PgPool;

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables and the account number sequence exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = vec!["account_users", "accounts", "transactions"];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    // Account numbers come from a dedicated sequence seeded at 1000000000
    let sequence_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.sequences
            WHERE sequence_schema = 'public' AND sequence_name = 'account_number_seq'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !sequence_exists {
        tracing::error!("Required sequence 'account_number_seq' does not exist");
        return Ok(false);
    }

    Ok(true)
}
