// Audit sink port. The platform's audit-log storage is owned elsewhere;
// this service only emits events toward it, best-effort. A sink failure is
// logged locally and never aborts the request that produced the event.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// One audit event. `detail` is free-form structured context.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub actor_id: i64,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<i64>,
    pub detail: Value,
}

impl AuditEvent {
    pub fn new(actor_id: i64, action: &str, entity: &str, entity_id: Option<i64>) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id,
            detail: Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Deliver one event. Implementations must swallow their own failures -
    /// callers treat this as fire-and-forget.
    async fn log_event(&self, event: AuditEvent);

    /// Record that an actor read somebody else's data (queue contents,
    /// restriction history). Same fire-and-forget contract as `log_event`.
    async fn log_data_access(&self, actor_id: i64, entity: &str, entity_id: Option<i64>);
}
