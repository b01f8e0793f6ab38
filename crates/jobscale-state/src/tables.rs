//! redb table definitions for the jobscale job store.
//!
//! Both tables use `{namespace}/{name}` keys and JSON-serialized values,
//! so a `{namespace}/` prefix scan yields one namespace.

use redb::TableDefinition;

/// Scale targets keyed by `{namespace}/{name}`.
pub const TARGETS: TableDefinition<&str, &[u8]> = TableDefinition::new("targets");

/// Job instances keyed by `{namespace}/{name}`.
pub const JOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs");
