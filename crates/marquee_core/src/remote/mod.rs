//! Remote catalog access.
//!
//! # Responsibility
//! - Wrap the four catalog HTTP operations behind a trait seam.
//! - Surface failures as structured values the write router can classify on
//!   typed fields instead of message text.

pub mod gateway;
