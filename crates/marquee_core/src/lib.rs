//! Core engine for Marquee, an offline-tolerant movie-catalog client.
//! This crate is the single source of truth for overlay and merge invariants.

pub mod db;
pub mod logging;
pub mod merge;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use merge::compose::{compose_detail, compose_list, ListFilter};
pub use model::movie::{normalize_id, Movie, MoviePatch, MovieValidationError};
pub use remote::gateway::{
    CatalogGateway, HttpCatalogGateway, RemoteError, RemoteResult, DEFAULT_BASE_URL,
};
pub use repo::overlay_repo::{
    OverlayRepository, RepoError, RepoResult, SqliteOverlayRepository,
};
pub use service::catalog_service::{CatalogService, ServiceError, ServiceResult, WriteOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
