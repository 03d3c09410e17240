//! Core use-case services.
//!
//! # Responsibility
//! - Route writes to the remote catalog with local-overlay fallback.
//! - Orchestrate fetch-then-merge read flows for list and detail views.
//! - Keep UI layers decoupled from storage and transport details.

pub mod catalog_service;
