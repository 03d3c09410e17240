//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the overlay data-access contract used by merge and service code.
//! - Isolate SQLite query details from read-time reconciliation.
//!
//! # Invariants
//! - Repository writes durably commit before returning.
//! - A corrupt persisted row degrades to "absent"; it never errors the caller.

pub mod overlay_repo;
