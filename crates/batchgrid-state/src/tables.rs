//! redb table definitions for the embedded batch store.
//!
//! Values are the exact bytes the Redis backend would hold under the same
//! key, so records can be moved between backends verbatim.

use redb::TableDefinition;

/// Serialized batch records keyed by `GPBInstances_{service}_{action}`.
pub const BATCHES: TableDefinition<&str, &[u8]> = TableDefinition::new("batches");
