//! Domain model for catalog records.
//!
//! # Responsibility
//! - Define the canonical movie record and its partial-patch counterpart.
//! - Resolve the remote API's field-name aliases once, at the serde boundary.
//!
//! # Invariants
//! - Every record is keyed by a normalized string identifier.
//! - Unknown payload fields are carried through unchanged, never dropped.

pub mod movie;
