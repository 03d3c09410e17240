//! Read-time reconciliation of remote payloads with the local overlay.
//!
//! # Responsibility
//! - Combine whatever the remote returned with the overlay tables into the
//!   single view callers render.
//! - Keep merge semantics pure: same overlay plus same input, same output.
//!
//! # Invariants
//! - A tombstoned id is excluded from every composed view, whatever its
//!   origin.
//! - Merging an override never removes fields, only adds or replaces them.

pub mod compose;
