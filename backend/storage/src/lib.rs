//! Durable call-record storage for Ringline.
//!
//! `CallStore` is the trait the IVR handlers talk to; `SqliteCallStore` is the
//! production implementation. All mutations run as single statements or
//! transactions behind one connection lock, so concurrent webhook handlers for
//! the same call SID never interleave partial updates.

pub mod sqlite_store;
pub mod store;

pub use sqlite_store::SqliteCallStore;
pub use store::{CallMutator, CallStore, InMemoryCallStore};
