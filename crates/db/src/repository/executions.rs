//! `workflow_executions` and `node_executions` repository functions.

use sqlx::{Row, SqlitePool};

use crate::models::{NodeExecutionRow, WorkflowExecutionRow};
use crate::DbError;

/// Replace-by-id upsert of a workflow execution record.
pub async fn upsert_workflow_execution(
    pool: &SqlitePool,
    record: &WorkflowExecutionRow,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO workflow_executions
            (id, workflow_name, status, current_node_id, state_data, graph_json,
             parent_execution_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            workflow_name = excluded.workflow_name,
            status = excluded.status,
            current_node_id = excluded.current_node_id,
            state_data = excluded.state_data,
            graph_json = excluded.graph_json,
            parent_execution_id = excluded.parent_execution_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.id)
    .bind(&record.workflow_name)
    .bind(&record.status)
    .bind(&record.current_node_id)
    .bind(&record.state_data)
    .bind(&record.graph_json)
    .bind(&record.parent_execution_id)
    .bind(&record.created_at)
    .bind(&record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a single workflow execution by its primary key.
pub async fn get_workflow_execution(
    pool: &SqlitePool,
    id: &str,
) -> Result<WorkflowExecutionRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowExecutionRow>(
        r#"
        SELECT id, workflow_name, status, current_node_id, state_data, graph_json,
               parent_execution_id, created_at, updated_at
        FROM workflow_executions WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Most recent executions first, capped at `limit`.
pub async fn list_recent_executions(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<WorkflowExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowExecutionRow>(
        r#"
        SELECT id, workflow_name, status, current_node_id, state_data, graph_json,
               parent_execution_id, created_at, updated_at
        FROM workflow_executions ORDER BY created_at DESC LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert a node execution record; returns the generated id.
pub async fn append_node_execution(
    pool: &SqlitePool,
    record: &NodeExecutionRow,
) -> Result<String, DbError> {
    sqlx::query(
        r#"
        INSERT INTO node_executions
            (id, workflow_execution_id, node_id, node_type, node_label, status,
             request_data, response_data, error_message, execution_time_ms,
             started_at, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&record.id)
    .bind(&record.workflow_execution_id)
    .bind(&record.node_id)
    .bind(&record.node_type)
    .bind(&record.node_label)
    .bind(&record.status)
    .bind(&record.request_data)
    .bind(&record.response_data)
    .bind(&record.error_message)
    .bind(record.execution_time_ms)
    .bind(&record.started_at)
    .bind(&record.completed_at)
    .execute(pool)
    .await?;

    Ok(record.id.clone())
}

/// All node executions for one workflow execution, ordered by `started_at`
/// (the monotonicity invariant of §5 lives in how callers assign
/// `started_at`, not in this read path).
pub async fn list_node_executions(
    pool: &SqlitePool,
    workflow_execution_id: &str,
) -> Result<Vec<NodeExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, NodeExecutionRow>(
        r#"
        SELECT id, workflow_execution_id, node_id, node_type, node_label, status,
               request_data, response_data, error_message, execution_time_ms,
               started_at, completed_at
        FROM node_executions WHERE workflow_execution_id = ?1 ORDER BY started_at ASC
        "#,
    )
    .bind(workflow_execution_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count rows in `workflow_executions` — used only by tests to assert
/// invariant 1 (exactly one row minted per top-level `execute`/`resume`).
#[cfg(test)]
pub async fn count_workflow_executions(pool: &SqlitePool) -> Result<i64, DbError> {
    let row = sqlx::query("SELECT COUNT(*) AS c FROM workflow_executions")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get::<i64, _>("c")?)
}
