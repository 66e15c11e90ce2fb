// Shared application state handed to every handler.

use crate::core::actions::ActionExecutor;
use crate::core::audit::AuditSink;
use crate::core::messaging::MessagePipeline;
use crate::core::queue::ModerationQueue;
use crate::core::restrictions::RestrictionLedger;
use crate::core::safety::SafetyAnalyzer;
use crate::infra::actions::SqliteActionStore;
use crate::infra::messaging::{SqliteConversationStore, SqliteMessageStore};
use crate::infra::queue::SqliteQueueStore;
use crate::infra::restrictions::SqliteRestrictionStore;
use crate::infra::safety::SqliteTermStore;
use std::sync::Arc;

pub type Pipeline = MessagePipeline<
    SqliteTermStore,
    SqliteRestrictionStore,
    SqliteConversationStore,
    SqliteMessageStore,
>;

pub struct AppState {
    pub analyzer: Arc<SafetyAnalyzer<SqliteTermStore>>,
    pub ledger: Arc<RestrictionLedger<SqliteRestrictionStore>>,
    pub pipeline: Arc<Pipeline>,
    pub queue: Arc<ModerationQueue<SqliteQueueStore>>,
    pub actions: Arc<ActionExecutor<SqliteActionStore>>,
    pub audit: Arc<dyn AuditSink>,
}
