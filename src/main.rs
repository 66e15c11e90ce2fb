// This is the entry point of the content-safety service.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport- and storage-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores, audit sink)
// - `api/` = HTTP-specific adapters (axum routes, identity, error mapping)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize stores and services (dependency injection)
// 3. Seed the default rule set on first run
// 4. Serve the HTTP API

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "api/api_layer.rs"]
mod api;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::api::router::build_router;
use crate::api::state::AppState;
use crate::core::actions::ActionExecutor;
use crate::core::messaging::MessagePipeline;
use crate::core::queue::ModerationQueue;
use crate::core::restrictions::RestrictionLedger;
use crate::core::safety::{NewFlaggedTerm, SafetyAnalyzer};
use crate::infra::actions::SqliteActionStore;
use crate::infra::audit::TracingAuditSink;
use crate::infra::messaging::{SqliteConversationStore, SqliteMessageStore};
use crate::infra::queue::SqliteQueueStore;
use crate::infra::restrictions::SqliteRestrictionStore;
use crate::infra::safety::SqliteTermStore;
use std::path::Path;
use std::sync::Arc;

/// Starter rule set written on first run so a fresh deployment scans
/// something sensible before moderators curate their own rules.
const DEFAULT_FLAGGED_TERMS: &[(&str, &str, i32, bool)] = &[
    ("buy drugs", "dealing", 4, false),
    ("pills for sale", "dealing", 4, false),
    ("free sample", "drugs", 3, false),
    (r"(whatsapp|telegram|signal)\s*(me|number)", "contact_exchange", 3, true),
    (r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b", "contact_exchange", 3, true),
    ("send me a photo", "predatory", 5, false),
    ("keep this secret", "predatory", 5, false),
    ("click this link to win", "spam", 2, false),
    ("limited time offer", "spam", 2, false),
    ("kill yourself", "harmful", 5, false),
];

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Keep the runtime database in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("SAFETY_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory for SQLite files");
    let db_path = format!("{}/safety.db", data_dir);
    if !Path::new(&db_path).exists() {
        std::fs::File::create(&db_path).expect("Failed to create SQLite database file");
    }

    let bind_addr =
        std::env::var("SAFETY_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our stores and services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await
        .expect("Failed to connect to safety DB");

    let term_store = SqliteTermStore::new(pool.clone());
    term_store.migrate().await.expect("Failed to migrate flagged_terms");
    let restriction_store = SqliteRestrictionStore::new(pool.clone());
    restriction_store
        .migrate()
        .await
        .expect("Failed to migrate user_restrictions");
    let conversation_store = SqliteConversationStore::new(pool.clone());
    conversation_store
        .migrate()
        .await
        .expect("Failed to migrate conversations");
    let message_store = SqliteMessageStore::new(pool.clone());
    message_store.migrate().await.expect("Failed to migrate messages");
    let queue_store = SqliteQueueStore::new(pool.clone());
    queue_store
        .migrate()
        .await
        .expect("Failed to migrate moderation_queue");
    let action_store = SqliteActionStore::new(pool.clone());
    action_store
        .migrate()
        .await
        .expect("Failed to migrate moderation_actions");

    let analyzer = Arc::new(SafetyAnalyzer::new(term_store));
    let ledger = Arc::new(RestrictionLedger::new(restriction_store));
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::clone(&analyzer),
        Arc::clone(&ledger),
        conversation_store,
        message_store,
    ));
    let queue = Arc::new(ModerationQueue::new(queue_store));
    let actions = Arc::new(ActionExecutor::new(action_store));

    seed_default_terms(&analyzer).await;

    let state = Arc::new(AppState {
        analyzer,
        ledger,
        pipeline,
        queue,
        actions,
        audit: Arc::new(TracingAuditSink),
    });

    // ========================================================================
    // HTTP SERVER
    // ========================================================================

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("Content-safety service listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

/// Write the starter rule set if the table is empty.
async fn seed_default_terms(analyzer: &SafetyAnalyzer<SqliteTermStore>) {
    let existing = match analyzer.list_terms().await {
        Ok(terms) => terms,
        Err(e) => {
            tracing::warn!("Could not check flagged terms for seeding: {}", e);
            return;
        }
    };
    if !existing.is_empty() {
        return;
    }

    for (term, category, severity, is_regex) in DEFAULT_FLAGGED_TERMS {
        let rule = NewFlaggedTerm {
            term: term.to_string(),
            category: category.to_string(),
            severity: *severity,
            is_regex: *is_regex,
        };
        if let Err(e) = analyzer.upsert_term(rule).await {
            tracing::warn!("Failed to seed flagged term '{}': {}", term, e);
        }
    }
    tracing::info!("Seeded {} default flagged terms", DEFAULT_FLAGGED_TERMS.len());
}
