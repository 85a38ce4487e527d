//! `service_metrics` repository functions.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::ServiceMetricRow;
use crate::DbError;

/// Upsert one service call outcome with an incremental average, in a single
/// statement so concurrent executions touching the same `node_id` cannot
/// lose a count (spec §5: "must not lose counts under concurrent
/// executions"). `ms` is folded into the running average as
/// `(old_avg * old_total + ms) / (old_total + 1)`.
pub async fn update_service_metric(
    pool: &SqlitePool,
    node_id: &str,
    success: bool,
    ms: f64,
) -> Result<(), DbError> {
    let now = Utc::now().to_rfc3339();
    let successes = if success { 1 } else { 0 };
    let failures = if success { 0 } else { 1 };

    sqlx::query(
        r#"
        INSERT INTO service_metrics (node_id, total_calls, successes, failures, avg_time_ms, last_called)
        VALUES (?1, 1, ?2, ?3, ?4, ?5)
        ON CONFLICT(node_id) DO UPDATE SET
            total_calls = service_metrics.total_calls + 1,
            successes = service_metrics.successes + excluded.successes,
            failures = service_metrics.failures + excluded.failures,
            avg_time_ms = (service_metrics.avg_time_ms * service_metrics.total_calls + excluded.avg_time_ms)
                          / (service_metrics.total_calls + 1),
            last_called = excluded.last_called
        "#,
    )
    .bind(node_id)
    .bind(successes)
    .bind(failures)
    .bind(ms)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the running statistics for one node id.
pub async fn get_service_metric(
    pool: &SqlitePool,
    node_id: &str,
) -> Result<ServiceMetricRow, DbError> {
    let row = sqlx::query_as::<_, ServiceMetricRow>(
        r#"
        SELECT node_id, total_calls, successes, failures, avg_time_ms, last_called
        FROM service_metrics WHERE node_id = ?1
        "#,
    )
    .bind(node_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
