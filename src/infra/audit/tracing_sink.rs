// Default audit sink: emits events as structured tracing records.
//
// The platform's real audit pipeline subscribes to these downstream; this
// service only guarantees emission, and emission here cannot fail.

use crate::core::audit::{AuditEvent, AuditSink};
use async_trait::async_trait;

pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log_event(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            actor_id = event.actor_id,
            action = %event.action,
            entity = %event.entity,
            entity_id = event.entity_id,
            detail = %event.detail,
            "audit event"
        );
    }

    async fn log_data_access(&self, actor_id: i64, entity: &str, entity_id: Option<i64>) {
        tracing::info!(
            target: "audit",
            actor_id,
            entity = %entity,
            entity_id,
            "data access"
        );
    }
}
