//! `form_responses` repository functions.

use sqlx::SqlitePool;

use crate::models::FormResponseRow;
use crate::DbError;

/// Insert a form submission record.
pub async fn append_form_response(
    pool: &SqlitePool,
    record: &FormResponseRow,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO form_responses
            (id, workflow_execution_id, node_id, form_data, submitted_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&record.id)
    .bind(&record.workflow_execution_id)
    .bind(&record.node_id)
    .bind(&record.form_data)
    .bind(&record.submitted_at)
    .execute(pool)
    .await?;

    Ok(())
}
