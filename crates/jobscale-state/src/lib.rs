//! jobscale-state — embedded job store for jobscale.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and
//! in-memory storage for scale targets and job instances, and implements
//! the `JobClient` capability set on top of it.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns
//! under `{namespace}/{name}` keys, so namespace listing is a prefix scan.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod client;
pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
