//! The `Ledger` trait (spec §4.C) and its one concrete implementation,
//! [`SqliteLedger`]. The trait exists so `engine` depends on an interface,
//! not a driver — the "physical database driver... consumed through narrow
//! interfaces" carve-out of spec §1.

use async_trait::async_trait;

use crate::models::{NodeExecutionRow, ServiceMetricRow, WorkflowExecutionRow};
use crate::repository::{executions, forms, metrics};
use crate::{DbError, DbPool};

/// Execution ledger: the one source of truth for observability and resume.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn upsert_workflow_execution(&self, record: &WorkflowExecutionRow) -> Result<(), DbError>;
    async fn get_workflow_execution(&self, id: &str) -> Result<WorkflowExecutionRow, DbError>;
    async fn list_recent_executions(&self, limit: i64) -> Result<Vec<WorkflowExecutionRow>, DbError>;

    async fn append_node_execution(&self, record: &NodeExecutionRow) -> Result<String, DbError>;
    async fn list_node_executions(&self, workflow_execution_id: &str) -> Result<Vec<NodeExecutionRow>, DbError>;

    async fn append_form_response(&self, record: &crate::models::FormResponseRow) -> Result<(), DbError>;

    async fn update_service_metric(&self, node_id: &str, success: bool, ms: f64) -> Result<(), DbError>;
    async fn get_service_metric(&self, node_id: &str) -> Result<ServiceMetricRow, DbError>;
}

/// SQLite-backed `Ledger`. Cheap to clone — wraps a pooled connection handle.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Expose the underlying pool for callers (e.g. the `cli` `migrate`
    /// subcommand) that need it directly.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn upsert_workflow_execution(&self, record: &WorkflowExecutionRow) -> Result<(), DbError> {
        executions::upsert_workflow_execution(&self.pool, record).await
    }

    async fn get_workflow_execution(&self, id: &str) -> Result<WorkflowExecutionRow, DbError> {
        executions::get_workflow_execution(&self.pool, id).await
    }

    async fn list_recent_executions(&self, limit: i64) -> Result<Vec<WorkflowExecutionRow>, DbError> {
        executions::list_recent_executions(&self.pool, limit).await
    }

    async fn append_node_execution(&self, record: &NodeExecutionRow) -> Result<String, DbError> {
        executions::append_node_execution(&self.pool, record).await
    }

    async fn list_node_executions(&self, workflow_execution_id: &str) -> Result<Vec<NodeExecutionRow>, DbError> {
        executions::list_node_executions(&self.pool, workflow_execution_id).await
    }

    async fn append_form_response(&self, record: &crate::models::FormResponseRow) -> Result<(), DbError> {
        forms::append_form_response(&self.pool, record).await
    }

    async fn update_service_metric(&self, node_id: &str, success: bool, ms: f64) -> Result<(), DbError> {
        metrics::update_service_metric(&self.pool, node_id, success, ms).await
    }

    async fn get_service_metric(&self, node_id: &str) -> Result<ServiceMetricRow, DbError> {
        metrics::get_service_metric(&self.pool, node_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowExecutionRow;
    use crate::pool::{create_pool, run_migrations};
    use chrono::Utc;

    async fn test_ledger() -> SqliteLedger {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteLedger::new(pool)
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let ledger = test_ledger().await;
        let now = Utc::now().to_rfc3339();
        let row = WorkflowExecutionRow {
            id: "exec-1".into(),
            workflow_name: "demo".into(),
            status: "running".into(),
            current_node_id: Some("n1".into()),
            state_data: "{}".into(),
            graph_json: "{}".into(),
            parent_execution_id: None,
            created_at: now.clone(),
            updated_at: now,
        };
        ledger.upsert_workflow_execution(&row).await.unwrap();
        let fetched = ledger.get_workflow_execution("exec-1").await.unwrap();
        assert_eq!(fetched.status, "running");

        let mut updated = row.clone();
        updated.status = "completed".into();
        ledger.upsert_workflow_execution(&updated).await.unwrap();
        let fetched = ledger.get_workflow_execution("exec-1").await.unwrap();
        assert_eq!(fetched.status, "completed");

        let all = executions::count_workflow_executions(ledger.pool()).await.unwrap();
        assert_eq!(all, 1, "upsert must replace, not duplicate, by id");
    }

    #[tokio::test]
    async fn service_metric_upsert_tracks_running_average() {
        let ledger = test_ledger().await;
        ledger.update_service_metric("A", true, 100.0).await.unwrap();
        ledger.update_service_metric("A", false, 200.0).await.unwrap();

        let metric = ledger.get_service_metric("A").await.unwrap();
        assert_eq!(metric.total_calls, 2);
        assert_eq!(metric.successes, 1);
        assert_eq!(metric.failures, 1);
        assert_eq!(metric.total_calls, metric.successes + metric.failures);
        assert!((metric.avg_time_ms - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn get_missing_row_is_not_found() {
        let ledger = test_ledger().await;
        assert!(matches!(
            ledger.get_workflow_execution("nope").await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(
            ledger.get_service_metric("nope").await,
            Err(DbError::NotFound)
        ));
    }
}
