// Messaging infra - SQLite conversation and message stores.

pub mod sqlite_conversation_store;
pub mod sqlite_message_store;

pub use sqlite_conversation_store::SqliteConversationStore;
pub use sqlite_message_store::SqliteMessageStore;
