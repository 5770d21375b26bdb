use std::path::Path;

use sqlx::postgres::PgPoolCopyExt;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use crate::error::PipelineError;

/// Destination relation. Column order here is the load order.
pub const USERS_TABLE: &str = "users";
pub const USER_COLUMNS: [&str; 6] = [
    "firstname",
    "lastname",
    "country",
    "username",
    "password",
    "email",
];

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    firstname TEXT NOT NULL,
    lastname TEXT NOT NULL,
    country TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    email TEXT NOT NULL
)
"#;

/// Create the `users` table if it does not exist. Safe to run on every
/// pipeline invocation.
pub async fn ensure_users_table(db: &PgPool) -> Result<(), PipelineError> {
    sqlx::query(CREATE_USERS).execute(db).await?;
    debug!(table = USERS_TABLE, "destination table ensured");
    Ok(())
}

#[derive(Debug, FromRow)]
struct ColumnInfo {
    column_name: String,
}

fn check_columns(actual: &[String]) -> Result<(), PipelineError> {
    let matches = actual.len() == USER_COLUMNS.len()
        && actual
            .iter()
            .zip(USER_COLUMNS.iter())
            .all(|(have, want)| have.as_str() == *want);
    if !matches {
        return Err(PipelineError::SchemaMismatch(format!(
            "users columns are [{}], expected [{}]",
            actual.join(", "),
            USER_COLUMNS.join(", ")
        )));
    }
    Ok(())
}

/// Verify the live table still carries the six expected columns in order.
/// The copy below is positional, so a drifted layout must fail here.
pub async fn verify_users_schema(db: &PgPool) -> Result<(), PipelineError> {
    let columns: Vec<ColumnInfo> = sqlx::query_as::<_, ColumnInfo>(
        r#"
        SELECT column_name::text
        FROM information_schema.columns
        WHERE table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(USERS_TABLE)
    .fetch_all(db)
    .await?;

    let names: Vec<String> = columns.into_iter().map(|c| c.column_name).collect();
    check_columns(&names)
}

/// Append the staged buffer to `users` via COPY FROM STDIN.
///
/// Returns the server-reported row count (one per successful run).
pub async fn copy_user_rows(db: &PgPool, buffer: &Path) -> Result<u64, PipelineError> {
    let data = tokio::fs::read(buffer)
        .await
        .map_err(|e| PipelineError::Connectivity(format!("read transfer buffer: {e}")))?;

    let statement = format!(
        "COPY {} ({}) FROM STDIN WITH (DELIMITER ',')",
        USERS_TABLE,
        USER_COLUMNS.join(", ")
    );
    let mut copy = db.copy_in_raw(&statement).await?;
    copy.send(data).await?;
    let rows = copy.finish().await?;

    info!(rows, table = USERS_TABLE, "copy finished");
    Ok(rows)
}
